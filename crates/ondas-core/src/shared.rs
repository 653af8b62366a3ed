//! Shared-buffer publication for resize-on-the-fly.
//!
//! Large buffers that a GUI or analysis thread may resize while the audio
//! thread reads them are shared through a [`SharedBuffer`]: readers take a
//! cheap owning snapshot of the current block, writers publish a replacement
//! block, and the old block is freed when its last snapshot drops. Readers
//! never allocate and never block beyond one short lock.
//!
//! [`SpinLock`] is the minimal test-and-set lock used to serialise resizes;
//! it is also usable on its own.

/// Busy-wait test-and-set lock.
///
/// Deliberately tiny: no guard type, no poisoning, no re-entrancy. Callers
/// pair [`acquire`](Self::acquire) (or a successful
/// [`attempt`](Self::attempt)) with [`release`](Self::release). Not `Clone`:
/// a copied lock would guard nothing.
#[derive(Debug, Default)]
pub struct SpinLock {
    flag: core::sync::atomic::AtomicBool,
}

impl SpinLock {
    /// Creates an unlocked lock.
    pub const fn new() -> Self {
        Self {
            flag: core::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Spins until the lock is taken.
    pub fn acquire(&self) {
        use core::sync::atomic::Ordering;
        while self
            .flag
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
    }

    /// Takes the lock if it is free; returns whether it was taken.
    pub fn attempt(&self) -> bool {
        use core::sync::atomic::Ordering;
        self.flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the lock.
    pub fn release(&self) {
        self.flag.store(false, core::sync::atomic::Ordering::Release);
    }
}

#[cfg(feature = "std")]
pub use self::buffer::SharedBuffer;

#[cfg(feature = "std")]
mod buffer {
    use std::sync::{Arc, Mutex, MutexGuard};

    use super::SpinLock;

    /// Shared-ownership buffer with atomic block replacement.
    ///
    /// The current block is an `Arc<[T]>` snapshot behind a short
    /// current-lock. [`access`](Self::access) clones the Arc (an atomic
    /// increment, no allocation) so the block outlives the reader's
    /// critical section regardless of concurrent resizes. A resize is
    /// serialised by a separate spin lock, allocates only when the size
    /// actually changes, and swaps the published pointer; readers holding
    /// the old snapshot keep a valid, unchanged block until they drop it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ondas_core::SharedBuffer;
    ///
    /// let shared: SharedBuffer<f64> = SharedBuffer::new(1024);
    /// let snapshot = shared.access(Some(1024)).unwrap();
    ///
    /// shared.resize(4096, false);
    /// assert_eq!(snapshot.len(), 1024); // old block still alive
    /// assert_eq!(shared.access(None).unwrap().len(), 4096);
    /// ```
    #[derive(Debug)]
    pub struct SharedBuffer<T> {
        current: Mutex<Arc<[T]>>,
        resize_lock: SpinLock,
    }

    impl<T: Clone + Default> SharedBuffer<T> {
        /// Creates a buffer holding `size` default-initialised elements.
        pub fn new(size: usize) -> Self {
            Self {
                current: Mutex::new(zeroed(size)),
                resize_lock: SpinLock::new(),
            }
        }

        /// Returns an owning snapshot of the current block.
        ///
        /// With `required` set, returns `None` unless the block has exactly
        /// that many elements, which lets a caller detect that a resize it
        /// depends on has not happened yet (or has been superseded).
        pub fn access(&self, required: Option<usize>) -> Option<Arc<[T]>> {
            let block = self.lock_current().clone();
            match required {
                Some(size) if block.len() != size => None,
                _ => Some(block),
            }
        }

        /// Publishes a block of `size` elements, reusing the current one if
        /// it already matches. Returns a snapshot of the published block
        /// when `acquire` is set.
        ///
        /// Resizes are serialised; concurrent readers keep their old
        /// snapshots until they drop them.
        pub fn resize(&self, size: usize, acquire: bool) -> Option<Arc<[T]>> {
            self.resize_lock.acquire();

            let needs_swap = self.lock_current().len() != size;
            if needs_swap {
                // Allocate outside the current-lock; readers only ever wait
                // on the pointer swap itself.
                let fresh = zeroed(size);
                #[cfg(feature = "tracing")]
                tracing::debug!("shared_buffer resize: {size} elements");
                *self.lock_current() = fresh;
            }
            let handle = acquire.then(|| self.lock_current().clone());

            self.resize_lock.release();
            handle
        }

        /// Current block size in elements.
        pub fn len(&self) -> usize {
            self.lock_current().len()
        }

        /// Whether the current block is empty.
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        fn lock_current(&self) -> MutexGuard<'_, Arc<[T]>> {
            // A poisoned lock only means a panicking thread died mid-swap;
            // the Arc inside is still coherent.
            match self.current.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            }
        }
    }

    fn zeroed<T: Clone + Default>(size: usize) -> Arc<[T]> {
        vec![T::default(); size].into()
    }
}
