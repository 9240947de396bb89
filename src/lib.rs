//! Lovelink real-time notification client
//!
//! Opens the notification socket with the credential found in persisted client
//! storage and keeps a bounded log of recent notifications plus an unread
//! counter for the UI.
//!
//! - [`socket`]: connection manager, channel and transports
//! - [`notifications`]: notification store and its provider
//! - [`session`]: scope object tying both together
//! - [`storage`]: persisted key/value storage and the `auth` credential

pub mod config;
pub mod error;
pub mod helpers;
pub mod notifications;
pub mod session;
pub mod socket;
pub mod storage;

pub use error::{Error, Result};
pub use session::{Session, SocketContext};
