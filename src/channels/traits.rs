use async_trait::async_trait;
use tokio::sync::mpsc;

/// Inbound message received from a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInboundMessage {
    pub channel: String,
    pub sender: String,
    pub reply_target: String,
    pub text: String,
}

/// How a reply is presented. Adapters that support styling map this to colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTone {
    Success,
    Failure,
}

/// Reply sent back to the channel a command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutboundMessage {
    pub reply_target: String,
    pub text: String,
    pub tone: MessageTone,
}

/// Channel adapter contract. New chat front-ends only need to implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Stable channel identifier (e.g. `discord`).
    fn id(&self) -> &'static str;

    /// Send a reply to the channel-specific target.
    async fn send(&self, message: ChannelOutboundMessage) -> anyhow::Result<()>;

    /// Receive inbound messages and forward them until the connection ends.
    async fn run(&self, inbound_tx: mpsc::Sender<ChannelInboundMessage>) -> anyhow::Result<()>;

    /// Best-effort health probe.
    async fn health_check(&self) -> anyhow::Result<bool>;
}
