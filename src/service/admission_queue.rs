use crate::config::QueueFullPolicy;
use crate::error::QueueError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Semaphore;

/// Bounded FIFO shared by the admission path (writer) and the worker pool
/// (readers).
///
/// `items` holds one permit per queued element and never exceeds the deque
/// length; `slots` holds one permit per free position and is only consulted
/// under [`QueueFullPolicy::Block`].
pub struct AdmissionQueue<T> {
    buf: Mutex<VecDeque<T>>,
    capacity: usize,
    policy: QueueFullPolicy,
    items: Semaphore,
    slots: Semaphore,
}

impl<T> AdmissionQueue<T> {
    pub fn new(capacity: usize, policy: QueueFullPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            policy,
            items: Semaphore::new(0),
            slots: Semaphore::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> QueueFullPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.items.is_closed()
    }

    /// Places `item` at the back of the queue.
    ///
    /// Under `Block` this waits for a free slot; dropping the returned future
    /// while it waits leaves the queue untouched. Under `DropOldest` it never
    /// waits and hands back the evicted element, if any.
    pub async fn enqueue(&self, item: T) -> Result<Option<T>, QueueError> {
        match self.policy {
            QueueFullPolicy::Block => {
                let permit = self.slots.acquire().await.map_err(|_| QueueError::Closed)?;
                permit.forget();
                {
                    let mut buf = self.buf.lock();
                    if self.items.is_closed() {
                        return Err(QueueError::Closed);
                    }
                    buf.push_back(item);
                }
                self.items.add_permits(1);
                Ok(None)
            }
            QueueFullPolicy::DropOldest => {
                let evicted = {
                    let mut buf = self.buf.lock();
                    if self.items.is_closed() {
                        return Err(QueueError::Closed);
                    }
                    let evicted = if buf.len() >= self.capacity {
                        buf.pop_front()
                    } else {
                        None
                    };
                    buf.push_back(item);
                    evicted
                };
                if evicted.is_none() {
                    self.items.add_permits(1);
                }
                Ok(evicted)
            }
        }
    }

    /// Takes the front element, waiting while the queue is empty. Returns
    /// `None` once the queue has been closed.
    pub async fn dequeue(&self) -> Option<T> {
        let permit = self.items.acquire().await.ok()?;
        permit.forget();
        let item = self.buf.lock().pop_front();
        if item.is_some() && self.policy == QueueFullPolicy::Block {
            self.slots.add_permits(1);
        }
        item
    }

    /// Closes the queue, wakes every waiter and returns whatever was still
    /// queued.
    pub fn close(&self) -> Vec<T> {
        let drained: Vec<T> = {
            let mut buf = self.buf.lock();
            self.items.close();
            self.slots.close();
            buf.drain(..).collect()
        };
        drained
    }
}
