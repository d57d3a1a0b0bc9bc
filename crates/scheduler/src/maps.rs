use std::collections::HashMap;

use uuid::Uuid;

/// Task uuid -> its cron entry id, and group uuid -> its (start, end)
/// window entry id pair. Guarded by a single lock in [`crate::Scheduler`].
#[derive(Default)]
pub struct SchedulerMaps {
    pub tasks: HashMap<Uuid, Uuid>,
    pub groups: HashMap<Uuid, (Uuid, Uuid)>,
}
