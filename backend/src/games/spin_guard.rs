use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use upgrade_shared::shared_upgrade_game::SpinError;

/// One in-flight spin per connection.
#[derive(Clone, Default)]
pub struct SpinGuard {
    in_flight: Arc<AtomicBool>,
}

/// Held for the duration of a settlement. Dropping it, on any path including
/// unwinding, clears the guard.
#[must_use]
pub struct SpinPermit {
    in_flight: Arc<AtomicBool>,
}

impl SpinGuard {
    pub fn try_acquire(&self) -> Result<SpinPermit, SpinError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SpinError::InProgress)?;
        Ok(SpinPermit { in_flight: self.in_flight.clone() })
    }

    pub fn is_spinning(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for SpinPermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
