//! Per-call time budget and cooperative cancellation.
//!
//! Long-running calculators poll [`Budget::exhausted`] between units of work
//! (one instance, one permutation, one resample). Nothing is interrupted
//! mid-unit, so an exhausted call leaves the calculator untouched.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Budget {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Budget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Budget that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: None,
        }
    }

    /// Attach a flag another thread may set to stop the call.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.deadline.is_some() || self.cancel.is_some()
    }

    pub fn exhausted(&self) -> bool {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_expires() {
        let budget = Budget::unbounded();
        assert!(!budget.is_bounded());
        assert!(!budget.exhausted());
    }

    #[test]
    fn zero_timeout_is_exhausted() {
        let budget = Budget::with_timeout(Duration::from_millis(0));
        assert!(budget.exhausted());
    }

    #[test]
    fn cancel_flag_stops_the_call() {
        let flag = Arc::new(AtomicBool::new(false));
        let budget = Budget::with_timeout(Duration::from_secs(3600)).with_cancel_flag(flag.clone());
        assert!(!budget.exhausted());
        flag.store(true, Ordering::Relaxed);
        assert!(budget.exhausted());
    }
}
