use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::FrameBuffer;

/// Single-slot, latest-wins frame hand-off between the UI (producer) and the
/// GPU-context owner (consumer).
///
/// - `submit` overwrites whatever is pending; there is no queue and no
///   back-pressure, so the consumer always renders the freshest frame.
/// - `consume` moves the pending frame out and empties the slot.
///
/// Both sides hold the lock only for a swap. Scheduling a repaint after
/// `submit` is the caller's job.
#[derive(Debug, Default)]
pub struct FrameBus {
    slot: Mutex<Option<FrameBuffer>>,
    dropped: AtomicU64,
}

impl FrameBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `frame`, replacing any frame not yet consumed.
    pub fn submit(&self, frame: FrameBuffer) {
        let replaced = self.slot.lock().replace(frame);
        if replaced.is_some() {
            let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            log::trace!("frame bus: unconsumed frame overwritten ({n} total)");
        }
        // `replaced` is dropped here, outside the critical section.
    }

    /// Moves the pending frame into `out`.
    ///
    /// Returns `false` and leaves `out` untouched if nothing is pending.
    pub fn consume(&self, out: &mut FrameBuffer) -> bool {
        match self.take() {
            Some(frame) => {
                *out = frame;
                true
            }
            None => false,
        }
    }

    /// Takes the pending frame, if any.
    pub fn take(&self) -> Option<FrameBuffer> {
        self.slot.lock().take()
    }

    /// `true` if a submitted frame is waiting to be consumed.
    pub fn has_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Number of frames that were overwritten before anyone consumed them.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
