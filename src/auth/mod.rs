//! Signed-in identity shared by every mounted module.
//!
//! The container owns login; modules only read the identity and react to
//! `authChanged`. Each module holds its own [`AuthSyncEngine`] and they
//! converge through the bus the same way locale does.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::bus::events::{AuthChanged, AUTH_CHANGED};
use crate::bus::EventBus;
use crate::state::{ChangeSource, ChannelCodec, SharedStateChannel, Update};
use crate::storage::{keys, StorageService};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Identity has an empty user id")]
    MissingUserId,
}

/// `{ "user": identity | null }` on the wire.
///
/// A payload without a `user` field is rejected rather than read as logout.
struct AuthCodec;

impl ChannelCodec<Option<Identity>> for AuthCodec {
    fn encode(&self, value: &Option<Identity>) -> Value {
        let user = value
            .as_ref()
            .and_then(|identity| serde_json::to_value(identity).ok());
        serde_json::to_value(AuthChanged { user }).unwrap_or(Value::Null)
    }

    fn decode(&self, detail: &Value) -> Option<Option<Identity>> {
        detail.get("user")?;
        let payload = serde_json::from_value::<AuthChanged>(detail.clone()).ok()?;
        match payload.user {
            None | Some(Value::Null) => Some(None),
            Some(user) => match serde_json::from_value::<Identity>(user) {
                Ok(identity) if !identity.user_id.is_empty() => Some(Some(identity)),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring auth broadcast with malformed identity");
                    None
                }
            },
        }
    }
}

/// Identity state for one mounted module.
///
/// Login and logout are broadcast on `authChanged` and persisted under
/// `authIdentity`; logout removes the key.
pub struct AuthSyncEngine {
    channel: SharedStateChannel<Option<Identity>>,
}

impl AuthSyncEngine {
    pub fn new(bus: &EventBus, storage: &StorageService) -> Self {
        let initial = restore(storage);

        let persist = storage.clone();
        let channel = SharedStateChannel::builder(bus, AUTH_CHANGED, initial)
            .on_change(move |identity: &Option<Identity>, source| {
                match identity {
                    Some(identity) => {
                        if let Err(e) = persist.set_json(keys::AUTH_IDENTITY, identity) {
                            tracing::warn!(error = %e, "Failed to persist identity");
                        }
                    }
                    None => persist.remove(keys::AUTH_IDENTITY),
                }
                let user = identity.as_ref().map(|i| i.user_id.as_str()).unwrap_or("-");
                match source {
                    ChangeSource::Local => tracing::info!(user = %user, "Identity changed"),
                    ChangeSource::Broadcast => {
                        tracing::debug!(user = %user, "Identity adopted from broadcast")
                    }
                }
            })
            .build_with_codec(AuthCodec);

        Self { channel }
    }

    /// Adopt `identity` everywhere.
    pub fn login(&self, identity: Identity) -> Result<(), AuthError> {
        if identity.user_id.is_empty() {
            return Err(AuthError::MissingUserId);
        }
        self.channel.set(Update::Value(Some(identity)));
        Ok(())
    }

    /// Clear the identity everywhere. A no-op change is still broadcast.
    pub fn logout(&self) {
        self.channel.set(Update::Value(None));
    }

    pub fn identity(&self) -> Option<Identity> {
        self.channel.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.identity().is_some_and(|i| i.has_role(role))
    }

    /// Stop following broadcasts. Also happens on drop.
    pub fn close(&self) {
        self.channel.close();
    }
}

fn restore(storage: &StorageService) -> Option<Identity> {
    let identity = storage.get_json::<Identity>(keys::AUTH_IDENTITY)?;
    if identity.user_id.is_empty() {
        tracing::warn!("Persisted identity has no user id, treating as signed out");
        return None;
    }
    Some(identity)
}
