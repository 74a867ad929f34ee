use clap::Subcommand;
use klar_core::{auth, stats, Config};

use super::{open_store, runtime, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's focus time and breaks
    Today,
}

pub fn run(action: StatsAction) -> CliResult {
    match action {
        StatsAction::Today => runtime()?.block_on(async {
            let config = Config::load_or_default();
            let store = open_store()?;
            let state = auth::restore(&config, store.as_ref()).await;
            let today = stats::load_today(state.client(), store.as_ref(), stats::local_today()).await;
            println!("{}", serde_json::to_string_pretty(&today)?);
            Ok(())
        }),
    }
}
