//! Caller identity injected into every backend request.
//!
//! The Mini App host hands the client an URL-encoded init data string whose
//! `user` field is a JSON object carrying the numeric Telegram user id. When no
//! host identity is available the configured fallback id is used instead.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Identity used when the host provides none.
pub const FALLBACK_USER_ID: i64 = 12345;

/// Where the caller's identity comes from.
///
/// SEC-015: init data carries the host's auth hash, so `Debug` never prints it.
#[derive(Default)]
pub enum HostIdentity {
    /// No host platform available.
    #[default]
    Absent,
    /// Identity fixed by configuration (e.g. `TELEPULSE_USER_ID`).
    Fixed(i64),
    /// Raw Telegram WebApp init data.
    InitData(SecretString),
}

impl std::fmt::Debug for HostIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostIdentity::Absent => f.write_str("Absent"),
            HostIdentity::Fixed(id) => f.debug_tuple("Fixed").field(id).finish(),
            HostIdentity::InitData(_) => f.write_str("InitData([REDACTED])"),
        }
    }
}

#[derive(Deserialize)]
struct InitDataUser {
    id: i64,
}

impl HostIdentity {
    /// Resolve the host user id, if the host provides a usable one.
    pub fn user_id(&self) -> Option<i64> {
        match self {
            HostIdentity::Absent => None,
            HostIdentity::Fixed(id) => Some(*id),
            HostIdentity::InitData(raw) => user_id_from_init_data(raw.expose_secret()),
        }
    }

    /// Resolve the id to send, falling back to `fallback` when the host has none.
    pub fn resolve(&self, fallback: i64) -> i64 {
        self.user_id().unwrap_or(fallback)
    }
}

fn user_id_from_init_data(init_data: &str) -> Option<i64> {
    let user_json = url::form_urlencoded::parse(init_data.as_bytes())
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.into_owned())?;

    match serde_json::from_str::<InitDataUser>(&user_json) {
        Ok(user) => Some(user.id),
        Err(e) => {
            tracing::warn!(error = %e, "Host init data has an unreadable user field");
            None
        }
    }
}
