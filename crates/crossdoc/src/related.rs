use crate::prelude::{eprintln, println, *};
use crossdoc_core::state::Concern;
use crossdoc_core::types::RelevantSection;
use indicatif::{ProgressBar, ProgressStyle};

use crate::services::{AiOptions, OllamaService};
use crate::session::Session;

#[derive(Debug, clap::Parser)]
#[command(name = "related")]
#[command(about = "Rank headings in the other documents against a selected passage")]
pub struct App {
    /// PDF files to load (the selection source plus the documents to search)
    #[clap(required = true)]
    pub files: Vec<std::path::PathBuf>,

    /// File name of the document the selection comes from
    #[clap(long)]
    pub from: String,

    /// The selected passage
    #[clap(long)]
    pub text: String,

    /// Skip the AI outline pass and rank against heuristic outlines only
    #[clap(long)]
    pub heuristic_only: bool,

    /// Also summarize insights for the selection
    #[clap(long)]
    pub insights: bool,

    /// Output as JSON
    #[clap(long)]
    pub json: bool,

    #[clap(flatten)]
    pub ai_options: AiOptions,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RelatedDump<'a> {
    relevant_sections: &'a [RelevantSection],
    insights: Option<&'a str>,
}

fn spinner(msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner.set_message(msg);
    spinner
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

    let service =
        OllamaService::connect(&app.ai_options).map_err(|e| eyre!("cannot reach AI service: {e}"))?;

    if global.verbose {
        eprintln!("Ollama URL: {}", app.ai_options.ollama_url);
        eprintln!("Model: {}", app.ai_options.model);
        eprintln!("Selection: {} chars from {}", app.text.len(), source);
    }

    if !app.heuristic_only {
        let progress = spinner("Extracting outlines...");
        session.extract_outlines(&service).await;
        progress.finish_and_clear();
    }

    let progress = spinner("Ranking related sections...");
    session.refresh_relevance(&service).await;
    progress.finish_and_clear();

    if let Some(error) = &session.state().operations.get(Concern::Sections).error {
        return Err(eyre!("ranking failed: {error}"));
    }

    if app.insights {
        let progress = spinner("Summarizing insights...");
        session.generate_insights(&service).await;
        progress.finish_and_clear();

        if let Some(error) = &session.state().operations.get(Concern::Insights).error {
            eprintln!("insights unavailable: {error}");
        }
    }

    if app.json {
        let dump = RelatedDump {
            relevant_sections: &session.state().relevant_sections,
            insights: session.state().insights.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    if session.state().relevant_sections.is_empty() {
        println!("No related sections found.");
    } else {
        let mut table = new_table();
        table.add_row(prettytable::row!["Document", "Page", "Section"]);
        for section in &session.state().relevant_sections {
            let name = session
                .state()
                .document(&section.document_id)
                .map(|d| d.name.as_str())
                .unwrap_or_else(|| section.document_id.as_str());
            table.add_row(prettytable::row![name, section.page, section.title]);
        }
        table.printstd();
    }

    if let Some(insights) = &session.state().insights {
        println!();
        println!("{insights}");
    }

    Ok(())
}
