use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A consumer asked for a context whose provider is not mounted in the session
    #[error("{0} must be used within its provider")]
    OutsideProvider(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Could not encode config: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
