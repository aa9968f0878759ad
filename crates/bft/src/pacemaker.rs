//! View driver.

use crate::error::PacemakerError;
use chainbft_types::QuorumCert;
use tracing::debug;

/// Tracks the current view and advances it as certificates arrive.
pub trait Pacemaker: Send + Sync {
    /// Move to `qc.proposal_view + 1` if that is ahead of the current view.
    ///
    /// Returns whether the view changed. Never decreases the view.
    fn advance_view(&mut self, qc: Option<&QuorumCert>) -> Result<bool, PacemakerError>;

    fn current_view(&self) -> u64;
}

/// Monotonic counter pacemaker.
#[derive(Debug, Clone, Default)]
pub struct DefaultPacemaker {
    current_view: u64,
}

impl DefaultPacemaker {
    pub fn new(initial_view: u64) -> Self {
        Self {
            current_view: initial_view,
        }
    }
}

impl Pacemaker for DefaultPacemaker {
    fn advance_view(&mut self, qc: Option<&QuorumCert>) -> Result<bool, PacemakerError> {
        let qc = qc.ok_or(PacemakerError::NilQc)?;
        let next = qc.proposal_view().saturating_add(1);
        if next <= self.current_view {
            return Ok(false);
        }
        debug!(
            old_view = self.current_view,
            new_view = next,
            "Pacemaker advanced"
        );
        self.current_view = next;
        Ok(true)
    }

    fn current_view(&self) -> u64 {
        self.current_view
    }
}
