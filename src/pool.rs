//! Lock-free index structures backing the particle pool.
//!
//! Both structures mirror the count-prefixed buffers used by the GPU kernels:
//! word 0 is the length, followed by `capacity` index slots. On the CPU the
//! length lives in its own `AtomicU32` so parallel slot updates can push
//! without locks.
//!
//! Each structure is single-phase: during a simulation step the tombstone
//! stack is push-only and the render list append-only; during ingestion the
//! tombstone stack is pop-only. Mixing push and pop concurrently is not
//! supported and the engine never does it.

use std::sync::atomic::{AtomicU32, Ordering};

/// LIFO stack of free slot indices.
#[derive(Debug)]
pub struct TombstoneStack {
    len: AtomicU32,
    slots: Box<[AtomicU32]>,
}

impl TombstoneStack {
    /// A full stack holding every index in `0..capacity`.
    ///
    /// Indices are stored so that `pop` hands out the highest index first,
    /// same as the GPU buffer built at reset.
    pub fn full(capacity: u32) -> Self {
        let slots: Box<[AtomicU32]> = (0..capacity).map(AtomicU32::new).collect();
        Self {
            len: AtomicU32::new(capacity),
            slots,
        }
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a freed index. Returns `false` if the stack is already full,
    /// which means an index was freed twice.
    pub fn push(&self, index: u32) -> bool {
        let capacity = self.capacity();
        let reserved = self
            .len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |len| {
                (len < capacity).then_some(len + 1)
            });
        match reserved {
            Ok(slot) => {
                self.slots[slot as usize].store(index, Ordering::Release);
                true
            }
            Err(_) => false,
        }
    }

    /// Pop a free index, or `None` when the pool is exhausted.
    pub fn pop(&self) -> Option<u32> {
        self.len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |len| len.checked_sub(1))
            .ok()
            .map(|prev| self.slots[(prev - 1) as usize].load(Ordering::Acquire))
    }

    /// Indices currently on the stack, bottom first.
    pub fn to_vec(&self) -> Vec<u32> {
        let len = self.len() as usize;
        self.slots[..len]
            .iter()
            .map(|s| s.load(Ordering::Acquire))
            .collect()
    }

    /// Count-prefixed words in the layout the GPU kernels expect.
    pub fn to_gpu_words(&self) -> Vec<u32> {
        let mut words = Vec::with_capacity(self.slots.len() + 1);
        words.push(self.len());
        words.extend(self.slots.iter().map(|s| s.load(Ordering::Acquire)));
        words
    }
}

/// Count-prefixed words of a full free list, as uploaded to the GPU at reset.
///
/// Same layout as [`TombstoneStack::to_gpu_words`] on a fresh stack, without
/// building the atomics first.
pub fn full_free_list_words(capacity: u32) -> Vec<u32> {
    std::iter::once(capacity).chain(0..capacity).collect()
}

/// Per-tick list of slot indices that survived and should be drawn.
#[derive(Debug)]
pub struct RenderIndexList {
    count: AtomicU32,
    slots: Box<[AtomicU32]>,
}

impl RenderIndexList {
    pub fn with_capacity(capacity: u32) -> Self {
        let slots: Box<[AtomicU32]> = (0..capacity).map(|_| AtomicU32::new(0)).collect();
        Self {
            count: AtomicU32::new(0),
            slots,
        }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard the previous tick's contents.
    pub fn clear(&mut self) {
        *self.count.get_mut() = 0;
    }

    /// Append from any thread. Order between concurrent appends is unspecified.
    pub fn push(&self, index: u32) -> bool {
        let capacity = self.slots.len() as u32;
        let reserved = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            });
        match reserved {
            Ok(slot) => {
                self.slots[slot as usize].store(index, Ordering::Release);
                true
            }
            Err(_) => false,
        }
    }

    pub fn to_vec(&self) -> Vec<u32> {
        let len = self.len() as usize;
        self.slots[..len]
            .iter()
            .map(|s| s.load(Ordering::Acquire))
            .collect()
    }
}
