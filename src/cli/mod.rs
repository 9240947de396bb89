use anyhow::{anyhow, Result};
use chrono::Utc;
use colored::Colorize;
use lovelink::{
    config::Config,
    helpers::{self, INFO, SUCCESS, WARN},
    notifications::NotificationStore,
    socket::{ConnectionState, WebSocketTransport},
    storage::{self, FileStorage},
    Session,
};
use rustls::crypto::ring;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

pub fn login(config: &Config, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(anyhow!("Token must not be empty"));
    }

    let storage = FileStorage::new(config.storage_path());
    storage::write_token(&storage, token)
        .map_err(|e| anyhow!("Failed to store credential: {}", e))?;

    println!("{} Credential saved to {}", *SUCCESS, storage.path().display());
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    let storage = FileStorage::new(config.storage_path());
    storage::clear_token(&storage).map_err(|e| anyhow!("Failed to remove credential: {}", e))?;

    println!("{} Logged out", *SUCCESS);
    Ok(())
}

pub fn status(config: &Config) -> Result<()> {
    let storage = FileStorage::new(config.storage_path());
    let logged_in = storage::read_token(&storage).is_some();

    println!("{} server:     {}", *INFO, config.server_url);
    println!("{} endpoint:   {}", *INFO, lovelink::socket::endpoint(&config.server_url));
    println!("{} storage:    {}", *INFO, storage.path().display());
    if logged_in {
        println!("{} credential: {}", *INFO, "present".green());
    } else {
        println!("{} credential: {}", *INFO, "missing (guest)".yellow());
    }
    Ok(())
}

pub fn listen(config: &Config, limit: Option<u64>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow!("Failed to start async runtime: {}", e))?;
    runtime.block_on(run_listener(config, limit))
}

async fn run_listener(config: &Config, limit: Option<u64>) -> Result<()> {
    let _ = ring::default_provider().install_default();

    let storage = FileStorage::new(config.storage_path());
    let mut session = Session::mount(config, &storage, Arc::new(WebSocketTransport::new()));

    let Some(channel) = session.use_socket().channel else {
        println!(
            "{} No credential stored, run `lovelink login <token>` first",
            *WARN
        );
        return Ok(());
    };

    let store = session.provide_notifications();
    println!("{} Connecting to {}", *INFO, channel.endpoint());

    watch_notifications(&store, channel.watch_state(), limit, tokio::signal::ctrl_c()).await;

    println!(
        "{} {} kept, {}",
        *INFO,
        store.len(),
        helpers::format_unread(store.unread_count())
    );
    session.unmount();
    Ok(())
}

/// Print notifications until `shutdown` resolves, the channel goes down, or
/// `limit` notifications have arrived. Returns how many arrived.
async fn watch_notifications<F: Future>(
    store: &NotificationStore,
    mut state: watch::Receiver<ConnectionState>,
    limit: Option<u64>,
    shutdown: F,
) -> u64 {
    let mut unread = store.subscribe();
    let mut received: u64 = 0;

    // Anything that happened before we started watching still gets handled
    unread.mark_changed();
    state.mark_changed();

    // Polled across iterations so a signal between wakeups is not lost
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                println!();
                break;
            }

            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                match current {
                    ConnectionState::Connected => println!("{} Connected", *SUCCESS),
                    ConnectionState::Disconnected => {
                        println!("{} Disconnected", *WARN);
                        break;
                    }
                    _ => {}
                }
            }

            changed = unread.changed() => {
                if changed.is_err() {
                    break;
                }
                let count = *unread.borrow_and_update();
                let now = Utc::now();

                // Several events may land between wakeups; print everything new, oldest first
                let fresh = count.saturating_sub(received) as usize;
                let notifications = store.notifications();
                for notification in notifications.iter().take(fresh).rev() {
                    println!(
                        "{} {} [{}]",
                        *INFO,
                        helpers::format_notification(notification, now),
                        helpers::format_unread(count)
                    );
                }
                received = count;

                if limit.is_some_and(|limit| received >= limit) {
                    break;
                }
            }
        }
    }

    received
}
