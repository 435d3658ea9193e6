use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::values::FormValues;

/// Failure reported by a submission operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubmitError {
    message: String,
}

impl SubmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Receives the full accumulated values once the final step validates.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, values: &FormValues) -> Result<(), SubmitError>;
}

/// Adapts a plain callback into a [`Submitter`].
pub struct FnSubmitter<F>(pub F);

#[async_trait]
impl<F> Submitter for FnSubmitter<F>
where
    F: Fn(&FormValues) -> Result<(), SubmitError> + Send + Sync,
{
    async fn submit(&self, values: &FormValues) -> Result<(), SubmitError> {
        (self.0)(values)
    }
}

/// Waits a fixed delay before handing the values to the inner submitter.
pub struct DelayedSubmitter<S> {
    inner: S,
    delay: Duration,
}

impl<S> DelayedSubmitter<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Submitter> Submitter for DelayedSubmitter<S> {
    async fn submit(&self, values: &FormValues) -> Result<(), SubmitError> {
        if !self.delay.is_zero() {
            tracing::debug!(delay_ms = self.delay.as_millis() as u64, "delaying submission");
            tokio::time::sleep(self.delay).await;
        }
        self.inner.submit(values).await
    }
}
