use crate::prelude::{eprintln, println, *};
use crossdoc_core::state::{Concern, Event};
use crossdoc_core::types::{DocumentId, Heading};
use indicatif::{ProgressBar, ProgressStyle};

use crate::services::{AiOptions, OllamaService};
use crate::session::Session;

#[derive(Debug, clap::Parser)]
#[command(name = "outline")]
#[command(about = "Extract and print the outline of one or more PDF documents")]
pub struct App {
    /// PDF files to load
    #[clap(required = true)]
    pub files: Vec<std::path::PathBuf>,

    /// Also query the AI extraction service; falls back to the heuristic
    /// outline per document on failure
    #[clap(long)]
    pub ai: bool,

    /// Output as JSON
    #[clap(long)]
    pub json: bool,

    #[clap(flatten)]
    pub ai_options: AiOptions,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct OutlineDump<'a> {
    id: &'a DocumentId,
    name: &'a str,
    outline: &'a [Heading],
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let mut session = Session::new();
    session.add_documents(&app.files);

    if let Some(error) = &session.state().operations.get(Concern::Files).error {
        eprintln!("{error}");
    }
    if session.state().documents.is_empty() {
        return Err(eyre!("no documents could be loaded"));
    }

    if app.ai {
        if global.verbose {
            eprintln!("Ollama URL: {}", app.ai_options.ollama_url);
            eprintln!("Model: {}", app.ai_options.model);
        }

        match OllamaService::connect(&app.ai_options) {
            Ok(service) => {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.cyan} {msg}")
                        .unwrap(),
                );
                spinner.enable_steady_tick(std::time::Duration::from_millis(100));
                spinner.set_message("Extracting outlines...");

                session.extract_outlines(&service).await;
                spinner.finish_and_clear();
            }
            Err(e) => session.dispatch(Event::OperationFailed(Concern::Headings, e.to_string())),
        }

        if let Some(error) = &session.state().operations.get(Concern::Headings).error {
            eprintln!("AI extraction unavailable: {error}");
        }
    }

    if app.json {
        let dump: Vec<OutlineDump> = session
            .state()
            .documents
            .iter()
            .map(|doc| OutlineDump {
                id: &doc.id,
                name: &doc.name,
                outline: doc.effective_outline(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    for doc in &session.state().documents {
        println!("{}", doc.name);

        if doc.effective_outline().is_empty() {
            println!("  (no headings detected)");
            continue;
        }

        let mut table = new_table();
        for heading in doc.effective_outline() {
            table.add_row(prettytable::row![
                heading.level,
                f!("p.{}", heading.page),
                heading.text,
                f!("{:?}", heading.source).to_lowercase(),
            ]);
        }
        table.printstd();
    }

    Ok(())
}
