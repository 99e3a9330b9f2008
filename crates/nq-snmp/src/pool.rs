//! Shared free-list of reusable sessions.
//!
//! A checkout is exclusive to one round trip. The `PooledSession` guard puts
//! the session back when dropped, which covers early returns, panics and
//! cancelled futures alike. A session dropped mid-exchange is reset first.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::session::{SessionFactory, SnmpSession};

struct PoolInner {
    idle: Mutex<Vec<Box<dyn SnmpSession>>>,
    factory: Arc<dyn SessionFactory>,
    capacity: usize,
    in_use: AtomicUsize,
    created: AtomicUsize,
}

/// Cheaply cloneable handle to the shared pool.
#[derive(Clone)]
pub struct SessionPool {
    inner: Arc<PoolInner>,
}

impl SessionPool {
    /// `capacity` bounds how many idle sessions are retained; checkouts
    /// beyond it create extra sessions that are dropped on return.
    pub fn new(factory: Arc<dyn SessionFactory>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(Vec::new()),
                factory,
                capacity: capacity.max(1),
                in_use: AtomicUsize::new(0),
                created: AtomicUsize::new(0),
            }),
        }
    }

    /// Take an idle session or create a new one.
    pub fn checkout(&self) -> PooledSession {
        let reused = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop();
        let session = match reused {
            Some(session) => session,
            None => {
                self.inner.created.fetch_add(1, Ordering::Relaxed);
                trace!("creating new session");
                self.inner.factory.create()
            }
        };
        self.inner.in_use.fetch_add(1, Ordering::Relaxed);
        PooledSession {
            session: Some(session),
            pool: Arc::clone(&self.inner),
            in_flight: false,
        }
    }

    /// Idle sessions ready for checkout.
    pub fn available(&self) -> usize {
        self.inner
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Sessions currently checked out.
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Relaxed)
    }

    /// Sessions created over the pool's lifetime.
    pub fn created(&self) -> usize {
        self.inner.created.load(Ordering::Relaxed)
    }
}

/// RAII checkout; derefs to the session.
pub struct PooledSession {
    session: Option<Box<dyn SnmpSession>>,
    pool: Arc<PoolInner>,
    in_flight: bool,
}

impl PooledSession {
    /// Mark an exchange as started; if the guard is dropped before
    /// [`finish`](Self::finish) the session is reset before reuse.
    pub fn begin(&mut self) {
        self.in_flight = true;
    }

    pub fn finish(&mut self) {
        self.in_flight = false;
    }
}

impl Deref for PooledSession {
    type Target = dyn SnmpSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_deref().expect("session held until drop")
    }
}

impl DerefMut for PooledSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_deref_mut().expect("session held until drop")
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        self.pool.in_use.fetch_sub(1, Ordering::Relaxed);
        let Some(mut session) = self.session.take() else {
            return;
        };
        if self.in_flight {
            trace!("session returned mid-exchange, resetting");
            session.reset();
        }
        let mut idle = self
            .pool
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if idle.len() < self.pool.capacity {
            idle.push(session);
        }
    }
}
