use futures::future::{self, BoxFuture, FutureExt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("Moving sessions between board columns is not wired to a backend")]
    NotWired,
    #[error("Move rejected: {0}")]
    Rejected(String),
}

/// Backing mutation for dragging a session to another board column.
pub trait SessionMover: Send + Sync {
    fn move_session(&self, session_id: i64, new_group: String) -> BoxFuture<'_, Result<(), MoveError>>;
}

/// Default mover until the booking platform exposes a matching mutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnwiredMover;

impl SessionMover for UnwiredMover {
    fn move_session(&self, session_id: i64, new_group: String) -> BoxFuture<'_, Result<(), MoveError>> {
        tracing::debug!(session_id, %new_group, "board move requested but not wired");
        future::ready(Err(MoveError::NotWired)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unwired_mover_reports_not_wired() {
        let result = UnwiredMover.move_session(7, "completed".to_string()).await;
        assert!(matches!(result, Err(MoveError::NotWired)));
    }
}
