//! FIFO wait queue for tasks blocked on a [`CountingResource`](crate::CountingResource).
//!
//! Every mutation of the queue and every waiter state transition happens while
//! the resource's waiter mutex is held. Wakers are collected into a
//! stack-allocated [`WakeList`](waker::WakeList) and woken after the mutex is
//! released.

pub(crate) mod queue;
pub(crate) mod waiter;
pub(crate) mod waker;

pub(crate) use queue::WaitQueue;
pub(crate) use waiter::WaiterHandle;
