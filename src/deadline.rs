use std::future::Future;
use std::time::{Duration, Instant};

use tracing::warn;

/// Wall-clock budget shared by every stage of a run (or a whole batch).
///
/// Stages are started only while budget remains and are abandoned when it
/// runs out mid-flight; either way the stage counts as failed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self { at: Some(Instant::now() + budget) }
    }

    pub fn unbounded() -> Self {
        Self { at: None }
    }

    /// `None` once the budget is spent.
    pub fn remaining(&self) -> Option<Duration> {
        match self.at {
            None => Some(Duration::MAX),
            Some(at) => at.checked_duration_since(Instant::now()).filter(|d| !d.is_zero()),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_none()
    }

    /// Run one stage under the remaining budget.
    pub async fn run<F: Future>(&self, stage: &str, fut: F) -> Option<F::Output> {
        let Some(left) = self.remaining() else {
            warn!("Budget exhausted, not starting {}", stage);
            return None;
        };
        if self.at.is_none() {
            return Some(fut.await);
        }
        match tokio::time::timeout(left, fut).await {
            Ok(out) => Some(out),
            Err(_) => {
                warn!("{} abandoned after {:.1}s: budget exhausted", stage, left.as_secs_f64());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exhausted_budget_never_polls_stage() {
        let deadline = Deadline::after(Duration::ZERO);
        let mut started = false;
        let out = deadline
            .run("probe", async {
                started = true;
                1
            })
            .await;
        assert_eq!(out, None);
        assert!(!started);
        assert!(deadline.is_exhausted());
    }

    #[tokio::test]
    async fn slow_stage_is_abandoned() {
        let deadline = Deadline::after(Duration::from_millis(20));
        let out = deadline
            .run("slow", tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn unbounded_runs_to_completion() {
        let out = Deadline::unbounded().run("fast", async { "done" }).await;
        assert_eq!(out, Some("done"));
    }
}
