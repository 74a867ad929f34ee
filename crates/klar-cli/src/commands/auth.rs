use std::sync::Arc;

use clap::Subcommand;
use klar_core::{auth, Config, Snapshot, WidgetKind};
use serde_json::json;

use super::{launch_app, open_store, runtime, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Verify and store a backend token
    Login {
        /// Bearer token issued by the backend's OAuth flow
        #[arg(long)]
        token: String,
    },
    /// Remove the stored credential
    Logout,
    /// Check authentication status
    Status,
}

/// Login and logout never open widget windows.
fn no_widgets(_: WidgetKind, _: &Snapshot) {}

pub fn run(action: AuthAction) -> CliResult {
    runtime()?.block_on(async {
        match action {
            AuthAction::Login { token } => {
                let mut app = launch_app(Arc::new(no_widgets)).await?;
                let result = app.login(token.trim()).await;
                if result.is_ok() {
                    if let Some(user) = app.user() {
                        println!("Logged in as {} <{}>", user.name, user.email);
                    }
                }
                app.shutdown().await;
                result?;
            }
            AuthAction::Logout => {
                let mut app = launch_app(Arc::new(no_widgets)).await?;
                let result = app.logout().await;
                app.shutdown().await;
                result?;
                println!("Logged out");
            }
            AuthAction::Status => {
                let config = Config::load_or_default();
                let store = open_store()?;
                let state = auth::restore(&config, store.as_ref()).await;
                let status = json!({
                    "authenticated": state.user().is_some(),
                    "user": state.user(),
                    "baseUrl": config.api.base_url,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
        }
        Ok(())
    })
}
