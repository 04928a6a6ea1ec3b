use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Instant;

use tokio::sync::Semaphore;

/// Pending is what is remembered about an issued request until its reply arrives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pending {
    pub issued_at: Instant,
    pub is_read: bool,
}

/// OutstandingRequests belongs to one simulated client. It holds the admission permits that
/// bound how many requests the client may have in flight, and the issue time and kind of every
/// request that has not completed.
///
/// A permit is taken by the issuer through `RateShaper` and given back by `complete()`, after
/// the entry is removed. Thus the number of entries never exceeds the bound given to `new()`.
pub struct OutstandingRequests {
    admission: Semaphore,
    pending: Mutex<HashMap<i32, Pending>>,
}

impl OutstandingRequests {
    pub fn new(bound: usize) -> OutstandingRequests {
        OutstandingRequests {
            admission: Semaphore::new(bound),
            pending: Mutex::new(HashMap::with_capacity(bound)),
        }
    }

    pub fn admission(&self) -> &Semaphore {
        &self.admission
    }

    /// insert records request `id` as issued. It must be called before the request is sent.
    /// An entry already present with the same id is replaced and returned.
    pub fn insert(&self, id: i32, issued_at: Instant, is_read: bool) -> Option<Pending> {
        self.lock().insert(id, Pending { issued_at, is_read })
    }

    /// complete removes request `id` and gives its admission permit back.
    /// It returns None if `id` is not outstanding, in which case no permit is released.
    pub fn complete(&self, id: i32) -> Option<Pending> {
        let p = self.lock().remove(&id)?;
        self.admission.add_permits(1);
        Some(p)
    }

    /// len returns the number of requests in flight.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// close wakes up an issuer blocked on admission and makes every later admission fail.
    pub fn close(&self) {
        self.admission.close();
    }

    pub fn is_closed(&self) -> bool {
        self.admission.is_closed()
    }

    // The map is only touched by single insert/remove/len calls, a panic can not leave it
    // half updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<i32, Pending>> {
        match self.pending.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
