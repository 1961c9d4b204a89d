//! One time budget covering connect, authenticate and read

use super::errors::{FetchError, FetchStage};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.budget
    }

    /// Time left, or `Timeout` attributed to `stage`
    pub fn remaining(&self, stage: FetchStage) -> Result<Duration, FetchError> {
        let remaining = self.budget.saturating_sub(self.elapsed());
        if remaining.is_zero() {
            return Err(self.timeout(stage));
        }
        Ok(remaining)
    }

    pub fn timeout(&self, stage: FetchStage) -> FetchError {
        FetchError::Timeout {
            stage,
            elapsed_ms: self.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_remaining_shrinks_and_expires() {
        let deadline = Deadline::start(Duration::from_secs(60));
        let remaining = deadline.remaining(FetchStage::Connect).unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(!deadline.is_expired());

        let expired = Deadline::start(Duration::ZERO);
        assert!(expired.is_expired());
        assert_matches!(
            expired.remaining(FetchStage::Transfer),
            Err(FetchError::Timeout { stage: FetchStage::Transfer, .. })
        );
    }
}
