use async_trait::async_trait;

use crate::error::PortError;

/// Cache collaborator.
#[async_trait]
pub trait Cache: Send + Sync + 'static {
    /// Drops every key. Flushing an empty cache is a no-op.
    async fn flush_all(&self) -> Result<(), PortError>;
}
