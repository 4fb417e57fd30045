use std::sync::Arc;

use crate::gateway::SheetGateway;
use crate::locks::KeyedLocks;

/// Entry point for every rating operation.
///
/// The store handle is passed in once and shared by all requests; the lock
/// table serializes writes that target the same logical row. Operations are
/// implemented next to the engine they belong to (`upsert`, `lookup`,
/// `aggregate`).
pub struct RankingService {
    pub(crate) gateway: Arc<dyn SheetGateway>,
    pub(crate) locks: KeyedLocks,
}

impl RankingService {
    pub fn new(gateway: Arc<dyn SheetGateway>) -> Self {
        RankingService {
            gateway,
            locks: KeyedLocks::new(),
        }
    }

    pub fn gateway(&self) -> &dyn SheetGateway {
        self.gateway.as_ref()
    }
}

pub(crate) fn rating_lock_key(user_key: &str, spot_name: &str) -> String {
    format!("rating\u{1f}{user_key}\u{1f}{spot_name}")
}

pub(crate) fn mapping_lock_key(user_key: &str) -> String {
    format!("mapping\u{1f}{user_key}")
}
