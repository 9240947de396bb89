use super::Storage;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Storage key holding the serialized session credential
pub const AUTH_KEY: &str = "auth";

#[derive(Debug, Serialize, Deserialize)]
struct Auth {
    token: String,
}

/// Read the session token. A missing, unparsable or empty entry means "no credential".
pub fn read_token(storage: &dyn Storage) -> Option<String> {
    let raw = match storage.get_item(AUTH_KEY) {
        Some(raw) => raw,
        None => {
            log::debug!("No '{AUTH_KEY}' entry in storage");
            return None;
        }
    };

    match serde_json::from_str::<Auth>(&raw) {
        Ok(auth) if !auth.token.is_empty() => Some(auth.token),
        Ok(_) => {
            log::debug!("Stored credential has an empty token");
            None
        }
        Err(err) => {
            log::debug!("Stored credential could not be parsed: {err}");
            None
        }
    }
}

pub fn write_token(storage: &dyn Storage, token: &str) -> Result<()> {
    let encoded = serde_json::to_string(&Auth {
        token: token.to_string(),
    })?;
    storage.set_item(AUTH_KEY, &encoded)
}

pub fn clear_token(storage: &dyn Storage) -> Result<()> {
    storage.remove_item(AUTH_KEY)
}
