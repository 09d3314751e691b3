use async_trait::async_trait;

/// Abstract outbound send towards the chat network. Best effort: the caller
/// logs failures and never retries.
#[async_trait]
pub trait DeliveryChannel: Send + Sync + 'static {
    async fn deliver(&self, target: &str, text: &str) -> anyhow::Result<()>;
}
