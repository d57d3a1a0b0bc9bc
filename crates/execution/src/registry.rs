use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Shared between [`crate::ExecutionRunner`] (which arms a deferred timeout
/// timer per dispatched execution) and [`crate::ExecutionCallbacks`] (which
/// cancels it on a terminal status callback). Cancellation is best-effort:
/// the timer itself re-checks the execution's status before acting, so a
/// timer that already fired before cancellation reached it is still a no-op.
#[derive(Default)]
pub struct TimerRegistry {
    handles: Mutex<HashMap<Uuid, AbortHandle>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self, execution_uuid: Uuid, handle: AbortHandle) {
        self.handles.lock().insert(execution_uuid, handle);
    }

    /// Aborts and forgets the timer for `execution_uuid`, if one is armed.
    pub fn cancel(&self, execution_uuid: Uuid) {
        if let Some(handle) = self.handles.lock().remove(&execution_uuid) {
            handle.abort();
        }
    }

    pub fn forget(&self, execution_uuid: Uuid) {
        self.handles.lock().remove(&execution_uuid);
    }
}
