pub mod auth;
pub mod config;
pub mod stats;
pub mod task;
pub mod timer;

use std::sync::Arc;

use klar_core::window::RenderFn;
use klar_core::{App, Config, HeadlessWindowManager, KeyValueStore, SqliteStore};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Runtime for one command invocation.
pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

/// The on-disk store under the data directory.
pub fn open_store() -> Result<Arc<dyn KeyValueStore>, klar_core::CoreError> {
    Ok(Arc::new(SqliteStore::open()?))
}

/// Launch the app on the on-disk store with headless widget windows.
pub async fn launch_app(render: RenderFn) -> Result<App, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = open_store()?;
    let app = App::launch(config, store, move |bus, bridge| {
        Arc::new(HeadlessWindowManager::new(bus.clone(), bridge.clone(), render))
    })
    .await?;
    Ok(app)
}
