//! Chat front-end: adapters that receive commands and deliver findings.
//!
//! Adapters are pluggable through [`ChannelAdapter`]. This module owns the
//! routing from inbound messages to [`WatchManager`] commands and the bot
//! lifecycle (resume, listen, shut down).

pub mod commands;
pub mod discord;
pub mod traits;

use crate::channels::commands::{handle_command, parse_command};
use crate::channels::traits::{ChannelAdapter, ChannelInboundMessage, ChannelOutboundMessage};
use crate::watch::{IdentityResolver, SubscriberId, WatchManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Buffered inbound messages between the listener and the router.
const INBOUND_QUEUE_SIZE: usize = 64;

/// Listener failures in a row before the bot gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// A connection that stayed up this long resets the failure count.
const STABLE_CONNECTION: Duration = Duration::from_secs(60);

/// Handle every command in `inbound_rx` until the channel closes.
pub async fn serve(
    adapter: &dyn ChannelAdapter,
    manager: &WatchManager,
    prefix: &str,
    mut inbound_rx: mpsc::Receiver<ChannelInboundMessage>,
) {
    while let Some(message) = inbound_rx.recv().await {
        let Some(command) = parse_command(&message.text, prefix) else {
            continue;
        };
        info!(channel = %message.channel, sender = %message.sender, ?command, "command received");

        let sender = SubscriberId::from(message.sender.as_str());
        let reply = handle_command(manager, &sender, command).await;
        let outbound = ChannelOutboundMessage {
            reply_target: message.reply_target,
            text: reply.text,
            tone: reply.tone,
        };
        if let Err(err) = adapter.send(outbound).await {
            warn!("failed to send {} reply: {err}", adapter.id());
        }
    }
}

/// Run the bot until the listener gives up or ctrl-c is received.
///
/// Persisted watches are resumed before the listener starts. Every polling
/// task is stopped before returning; persisted records are kept.
///
/// # Errors
///
/// Returns an error if the task store cannot be read, the listener fails
/// repeatedly, or the ctrl-c handler cannot be installed.
pub async fn run_bot(
    adapter: Arc<dyn ChannelAdapter>,
    manager: Arc<WatchManager>,
    resolver: &dyn IdentityResolver,
    prefix: &str,
) -> anyhow::Result<()> {
    let report = manager.resume_all(resolver).await?;
    for skipped in &report.skipped {
        warn!(subscriber = %skipped.subscriber, "watch not resumed: {}", skipped.reason);
    }

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_SIZE);
    let listener = tokio::spawn(listen_with_restarts(Arc::clone(&adapter), inbound_tx));
    info!(channel = adapter.id(), "bot started");

    let result = tokio::select! {
        () = serve(adapter.as_ref(), &manager, prefix, inbound_rx) => {
            match listener.await {
                Ok(result) => result,
                Err(err) => Err(anyhow::anyhow!("listener task failed: {err}")),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            listener.abort();
            signal.map_err(anyhow::Error::from)
        }
    };

    manager.shutdown().await;
    info!("bot stopped");
    result
}

async fn listen_with_restarts(
    adapter: Arc<dyn ChannelAdapter>,
    inbound_tx: mpsc::Sender<ChannelInboundMessage>,
) -> anyhow::Result<()> {
    let mut backoff_secs = 2u64;
    let mut failures = 0u32;

    loop {
        let started = tokio::time::Instant::now();
        let result = adapter.run(inbound_tx.clone()).await;
        if inbound_tx.is_closed() {
            return Ok(());
        }
        if started.elapsed() >= STABLE_CONNECTION {
            failures = 0;
            backoff_secs = 2;
        }
        failures += 1;

        match result {
            Ok(()) => warn!("channel {} stopped; restarting", adapter.id()),
            Err(err) if failures >= MAX_CONSECUTIVE_FAILURES => {
                return Err(err.context(format!(
                    "channel {} failed {failures} times in a row",
                    adapter.id()
                )));
            }
            Err(err) => warn!(
                "channel {} failed: {err}; retrying in {backoff_secs}s",
                adapter.id()
            ),
        }

        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
        backoff_secs = backoff_secs.saturating_mul(2).min(60);
    }
}
