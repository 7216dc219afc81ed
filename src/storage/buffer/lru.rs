use super::replacer::{FrameId, Replacer};
use std::collections::{BTreeMap, HashMap};

/// Least-recently-used replacer keyed by a logical access clock.
#[derive(Debug, Default)]
pub struct LruReplacer {
    clock: u64,
    /// Access time -> frame, oldest first
    by_time: BTreeMap<u64, FrameId>,
    /// Frame -> its latest access time
    last_access: HashMap<FrameId, u64>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Replacer for LruReplacer {
    fn evict(&mut self) -> Option<FrameId> {
        let (_, frame_id) = self.by_time.pop_first()?;
        self.last_access.remove(&frame_id);
        Some(frame_id)
    }

    fn record_access(&mut self, frame_id: FrameId) {
        self.clock += 1;
        if let Some(old) = self.last_access.insert(frame_id, self.clock) {
            self.by_time.remove(&old);
        }
        self.by_time.insert(self.clock, frame_id);
    }

    fn remove(&mut self, frame_id: FrameId) {
        if let Some(old) = self.last_access.remove(&frame_id) {
            self.by_time.remove(&old);
        }
    }

    fn size(&self) -> usize {
        self.last_access.len()
    }
}
