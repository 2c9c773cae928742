/*
 * Responsibility
 * - request 単位の deadline (caller が決める)
 * - store / hashing の future をこの deadline で打ち切る
 */
use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};

#[derive(Debug, thiserror::Error)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    /// Runs `fut` until the deadline. The future is dropped (cancelled) when it elapses.
    pub async fn run<F: Future>(self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        timeout_at(self.at, fut).await.map_err(|_| DeadlineExceeded)
    }
}
