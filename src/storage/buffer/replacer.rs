use std::fmt::Debug;

pub type FrameId = usize;

/// Eviction policy for buffer pool frames.
pub trait Replacer: Send + Sync + Debug {
    /// Select a frame to evict and stop tracking it. Returns None if no
    /// frame can be evicted.
    fn evict(&mut self) -> Option<FrameId>;

    /// Record that a frame was just used, making it evictable.
    fn record_access(&mut self, frame_id: FrameId);

    /// Stop tracking a frame.
    fn remove(&mut self, frame_id: FrameId);

    /// Get the number of evictable frames.
    fn size(&self) -> usize;
}
