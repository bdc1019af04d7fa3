use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cp_core::ids::{RunId, ThreadId, UserId};

/// An observable cooperative-cancellation flag. Cloning shares the same
/// underlying flag; the stream loop polls it at each event boundary.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct RunRecord {
    pub run_id: RunId,
    pub user_id: UserId,
    pub thread_id: ThreadId,
    pub workflow_name: String,
    pub cancel_flag: CancelFlag,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloned_flag_shares_state() {
        let flag = CancelFlag::new();
        let cloned = flag.clone();
        assert!(!cloned.is_set());
        flag.set();
        assert!(cloned.is_set());
    }
}
