use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::error::SpeechError;

/// Shared flag telling a synthesis job that its unit was superseded.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn check_cancelled(&self, stage: &'static str) -> Result<(), SpeechError> {
        if self.is_cancelled() {
            return Err(SpeechError::Cancelled { stage });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_cancellation() {
        let token = CancellationToken::new();
        let worker_side = token.clone();
        assert!(worker_side.check_cancelled("synthesis").is_ok());

        token.cancel();

        assert!(worker_side.is_cancelled());
        assert!(matches!(
            worker_side.check_cancelled("playback"),
            Err(SpeechError::Cancelled { stage: "playback" })
        ));
    }
}
