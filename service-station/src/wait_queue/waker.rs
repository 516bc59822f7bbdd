use std::cell::UnsafeCell;
use std::task::Waker;

const NUM_WAKERS: usize = 32;

/// A `Waker` slot that relies on the wait queue mutex for synchronization.
///
/// All methods require that the caller holds the owning resource's waiter
/// mutex.
pub(crate) struct SafeWakerCell {
    waker: UnsafeCell<Option<Waker>>,
}

impl SafeWakerCell {
    pub(crate) fn new() -> Self {
        Self {
            waker: UnsafeCell::new(None),
        }
    }

    /// Stores `waker`, skipping the clone when the stored one would wake the
    /// same task.
    ///
    /// # Safety
    ///
    /// The caller must hold the wait queue mutex.
    pub(crate) unsafe fn register_under_lock(&self, waker: &Waker) {
        let slot = &mut *self.waker.get();
        match slot {
            Some(current) if current.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        }
    }

    /// Takes the waker from this cell, leaving `None` in its place.
    ///
    /// # Safety
    ///
    /// The caller must hold the wait queue mutex.
    pub(crate) unsafe fn take_under_lock(&self) -> Option<Waker> {
        (*self.waker.get()).take()
    }

    /// # Safety
    ///
    /// The caller must hold the wait queue mutex.
    #[cfg(test)]
    pub(crate) unsafe fn has_waker_under_lock(&self) -> bool {
        (*self.waker.get()).is_some()
    }
}

// Safety: every access goes through the `*_under_lock` methods, whose callers
// hold the wait queue mutex. `Waker` itself is Send + Sync.
unsafe impl Send for SafeWakerCell {}
unsafe impl Sync for SafeWakerCell {}

/// A stack-allocated batch of wakers, woken once the wait queue mutex has
/// been released.
pub(crate) struct WakeList {
    wakers: [Option<Waker>; NUM_WAKERS],
    count: usize,
}

impl WakeList {
    pub(crate) fn new() -> Self {
        Self {
            wakers: [const { None }; NUM_WAKERS],
            count: 0,
        }
    }

    pub(crate) fn can_push(&self) -> bool {
        self.count < NUM_WAKERS
    }

    pub(crate) fn was_full(&self) -> bool {
        self.count == NUM_WAKERS
    }

    /// Adds a waker to the list.
    ///
    /// # Panics
    ///
    /// Panics if the list already holds 32 wakers. Check [`can_push()`](Self::can_push) first.
    pub(crate) fn push(&mut self, waker: Waker) {
        assert!(self.can_push(), "WakeList is full");
        self.wakers[self.count] = Some(waker);
        self.count += 1;
    }

    pub(crate) fn wake_all(&mut self) {
        for slot in &mut self.wakers[..self.count] {
            if let Some(waker) = slot.take() {
                waker.wake();
            }
        }
        self.count = 0;
    }
}

impl Drop for WakeList {
    fn drop(&mut self) {
        self.wake_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::Wake;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_wake_list_wakes_each_waker_once() {
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let mut list = WakeList::new();
        for _ in 0..NUM_WAKERS {
            list.push(Waker::from(Arc::clone(&counter)));
        }
        assert!(list.was_full());
        assert!(!list.can_push());

        list.wake_all();
        assert_eq!(counter.0.load(Ordering::SeqCst), NUM_WAKERS);

        list.wake_all();
        assert_eq!(counter.0.load(Ordering::SeqCst), NUM_WAKERS);
        assert!(list.can_push());
    }

    #[test]
    fn test_register_skips_equivalent_waker() {
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&counter));
        let cell = SafeWakerCell::new();
        unsafe {
            assert!(!cell.has_waker_under_lock());
            cell.register_under_lock(&waker);
            cell.register_under_lock(&waker);
            assert!(cell.has_waker_under_lock());
            cell.take_under_lock().unwrap().wake();
            assert!(!cell.has_waker_under_lock());
        }
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
