// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::JobError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Cancellation scope of one pipeline run.
///
/// Cloned into every worker. Tripping it (explicitly, through a parent
/// token, or by letting the deadline pass) unblocks every pending emit and
/// recv in the run. The span is the one all run logs are recorded under.
#[derive(Debug, Clone)]
pub struct RunScope {
    token: CancellationToken,
    deadline: Option<Instant>,
    span: Span,
}

impl RunScope {
    /// A standalone scope with an optional overall timeout.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::child_of(&CancellationToken::new(), timeout, Span::current())
    }

    /// A scope that is also cancelled whenever `parent` is. A timeout too
    /// large to represent as an instant leaves the scope without a deadline.
    pub fn child_of(parent: &CancellationToken, timeout: Option<Duration>, span: Span) -> Self {
        Self {
            token: parent.child_token(),
            deadline: timeout.and_then(|timeout| Instant::now().checked_add(timeout)),
            span,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Non-blocking check, for loops between suspension points.
    pub fn check(&self) -> Result<(), JobError> {
        if self.token.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(JobError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the scope is tripped, with the reason.
    pub async fn cancelled(&self) -> JobError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => JobError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => JobError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                JobError::Cancelled
            }
        }
    }
}
