use crate::prelude::{eprintln, println, *};
use crossdoc_core::state::Concern;
use indicatif::{ProgressBar, ProgressStyle};

use crate::services::{AiOptions, HttpSpeechService, OllamaService, SpeechOptions};
use crate::session::Session;

#[derive(Debug, clap::Parser)]
#[command(name = "narrate")]
#[command(about = "Synthesize a spoken narration of a selected passage")]
pub struct App {
    /// PDF files to load
    #[clap(required = true)]
    pub files: Vec<std::path::PathBuf>,

    /// File name of the document the selection comes from
    #[clap(long)]
    pub from: String,

    /// The selected passage
    #[clap(long)]
    pub text: String,

    /// Where to write the synthesized audio
    #[clap(long, default_value = "narration.mp3")]
    pub output: std::path::PathBuf,

    #[clap(flatten)]
    pub ai_options: AiOptions,

    #[clap(flatten)]
    pub speech_options: SpeechOptions,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let mut session = Session::new();
    session.add_documents(&app.files);

    if let Some(error) = &session.state().operations.get(Concern::Files).error {
        eprintln!("{error}");
    }

    let source = session
        .find_document(&app.from)
        .ok_or_else(|| eyre!("no loaded document matches '{}'", app.from))?;
    session.select(&source, &app.text).map_err(|e| eyre!(e))?;

    let assist =
        OllamaService::connect(&app.ai_options).map_err(|e| eyre!("cannot reach AI service: {e}"))?;
    let speech = HttpSpeechService::new(&app.speech_options);

    if global.verbose {
        eprintln!("Ollama URL: {}", app.ai_options.ollama_url);
        eprintln!("Speech URL: {}", app.speech_options.speech_url);
        eprintln!("Voice: {}", app.speech_options.voice);
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner.set_message("Synthesizing narration...");

    session.narrate(&assist, &speech).await;
    spinner.finish_and_clear();

    if let Some(error) = &session.state().operations.get(Concern::Audio).error {
        return Err(eyre!("narration failed: {error}"));
    }

    let audio = session
        .state()
        .audio
        .as_ref()
        .ok_or_eyre("narration produced no audio")?;
    std::fs::write(&app.output, audio)
        .wrap_err_with(|| f!("cannot write {}", app.output.display()))?;

    println!("Wrote {} bytes to {}", audio.len(), app.output.display());

    Ok(())
}
