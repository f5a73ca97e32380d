//! External collaborators (§6): DMA engine, memory-slab allocator,
//! completion-notification queue, and cache maintenance. None of these are
//! owned by this crate — they're implemented by the platform integration
//! layer and handed to [`crate::device::Device`] at construction.

/// Drives the ping-pong DMA transfers feeding each FIFO's output queue.
/// `fifo_b` selects which of the two independent DMA channels/streams a
/// call targets (`false` = FIFO A, `true` = FIFO B).
pub trait DmaEngine {
    /// Starts both configured channels from a stopped state.
    fn start_all(&mut self);
    /// Resumes a paused channel without reinitializing its descriptors.
    fn resume_all(&mut self);
    /// Pauses active channels, retaining their current descriptor state.
    fn pause_all(&mut self);
    /// Stops and tears down both channels.
    fn stop_all(&mut self);
    /// Re-arms the named channel's next descriptor with a freshly
    /// allocated buffer handle.
    fn requeue(&mut self, fifo_b: bool, buffer: u32);
}

/// Allocates fixed-size buffers from a caller-owned memory pool. Returns
/// `None` under exhaustion rather than blocking, matching the original
/// driver's non-blocking `k_mem_slab_alloc` call from IRQ context.
pub trait MemSlab {
    fn alloc(&mut self, size: u32) -> Option<u32>;
    fn free(&mut self, handle: u32);
}

/// Bounded FIFO of completed-buffer handles between the IRQ callback and
/// [`crate::device::Device::read`]. Capacity 2 matches a ping-pong pair;
/// implementors may allow more.
pub trait MsgQueue {
    fn new() -> Self;
    fn send(&mut self, handle: u32) -> Result<(), u32>;
    /// Blocks (implementation-defined mechanism) for up to `timeout_ticks`
    /// for a handle to become available. `0` means "don't block".
    fn receive(&mut self, timeout_ticks: u32) -> Option<u32>;
}

/// Cache invalidation/flush hook for platforms where DMA and CPU don't
/// share coherent memory. A coherent platform implements this as a no-op.
pub trait CacheMaintenance {
    fn invalidate(&mut self, buffer: u32, len: u32);
    fn flush(&mut self, buffer: u32, len: u32);
}

#[cfg(test)]
pub mod test_support {
    use super::{CacheMaintenance, DmaEngine, MemSlab, MsgQueue};
    use heapless::Deque;

    #[derive(Default)]
    pub struct NullDma {
        pub requeued: Deque<(bool, u32), 8>,
    }

    impl DmaEngine for NullDma {
        fn start_all(&mut self) {}
        fn resume_all(&mut self) {}
        fn pause_all(&mut self) {}
        fn stop_all(&mut self) {}
        fn requeue(&mut self, fifo_b: bool, buffer: u32) {
            let _ = self.requeued.push_back((fifo_b, buffer));
        }
    }

    pub struct NullMemSlab;

    impl MemSlab for NullMemSlab {
        fn alloc(&mut self, _size: u32) -> Option<u32> {
            Some(0)
        }
        fn free(&mut self, _handle: u32) {}
    }

    pub struct NullCache;

    impl CacheMaintenance for NullCache {
        fn invalidate(&mut self, _buffer: u32, _len: u32) {}
        fn flush(&mut self, _buffer: u32, _len: u32) {}
    }

    #[derive(Default)]
    pub struct VecMsgQueue {
        pending: Deque<u32, 4>,
    }

    impl MsgQueue for VecMsgQueue {
        fn new() -> Self {
            Self::default()
        }
        fn send(&mut self, handle: u32) -> Result<(), u32> {
            self.pending.push_back(handle).map_err(|_| handle)
        }
        fn receive(&mut self, _timeout_ticks: u32) -> Option<u32> {
            self.pending.pop_front()
        }
    }
}
