//! Bearer-credential authentication.
//!
//! The OAuth handshake happens elsewhere; this module only receives the
//! resulting token, verifies it against `/auth/me` and keeps it in the local
//! store. A credential the server rejects is always removed.

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::CoreError;
use crate::storage::{keys, Config, KeyValueStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AuthState {
    Anonymous,
    Authenticated { user: User, client: ApiClient },
}

impl AuthState {
    pub fn client(&self) -> Option<&ApiClient> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated { client, .. } => Some(client),
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated { user, .. } => Some(user),
        }
    }
}

fn clear_credential(store: &dyn KeyValueStore) {
    if let Err(e) = store.remove(keys::AUTH_TOKEN) {
        tracing::warn!("failed to clear stored credential: {e}");
    }
}

/// Verify `token` and, on success, store it.
///
/// # Errors
/// Returns the backend error when the token is rejected or the server is
/// unreachable. A rejected token is also removed from the store.
pub async fn login(config: &Config, store: &dyn KeyValueStore, token: &str) -> Result<AuthState, CoreError> {
    let client = ApiClient::new(&config.api.base_url, token, config.request_timeout())?;
    match client.current_user().await {
        Ok(user) => {
            store.set(keys::AUTH_TOKEN, token)?;
            tracing::info!(user = %user.id, "authenticated");
            Ok(AuthState::Authenticated { user, client })
        }
        Err(e) => {
            if e.is_auth_failure() {
                clear_credential(store);
            }
            Err(e.into())
        }
    }
}

/// Resume the stored credential, if any. Any failure ends anonymous; only a
/// rejected credential is forgotten.
pub async fn restore(config: &Config, store: &dyn KeyValueStore) -> AuthState {
    let token = match store.get(keys::AUTH_TOKEN) {
        Ok(Some(token)) if !token.trim().is_empty() => token,
        Ok(_) => return AuthState::Anonymous,
        Err(e) => {
            tracing::warn!("failed to read stored credential: {e}");
            return AuthState::Anonymous;
        }
    };
    match login(config, store, &token).await {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("could not resume session, continuing anonymously: {e}");
            AuthState::Anonymous
        }
    }
}

/// Tell the backend and forget the credential. The local credential is
/// removed even when the request fails.
pub async fn logout(state: &AuthState, store: &dyn KeyValueStore) {
    if let Some(client) = state.client() {
        if let Err(e) = client.logout().await {
            tracing::warn!("logout request failed: {e}");
        }
    }
    clear_credential(store);
}
