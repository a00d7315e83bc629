#![allow(unused)]

use crate::prelude::*;
use clap::Parser;

mod error;
mod extract;
mod narrate;
mod outline;
mod prelude;
mod related;
mod relevance;
mod services;
mod session;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Cross-document PDF navigation: outlines, related sections, narration"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "CROSSDOC_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Extract and print document outlines
    Outline(crate::outline::App),

    /// Rank headings in the other documents against a selected passage
    Related(crate::related::App),

    /// Synthesize a spoken narration of a selected passage
    Narrate(crate::narrate::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Outline(sub_app) => crate::outline::run(sub_app, app.global).await,
        SubCommands::Related(sub_app) => crate::related::run(sub_app, app.global).await,
        SubCommands::Narrate(sub_app) => crate::narrate::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
