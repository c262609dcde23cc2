//! Free list of reusable [`Request`] wrappers.

use std::borrow::Borrow;
use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

use super::{RawRequest, Request};

/// Default number of idle wrappers kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 256;

/// Pool of request wrappers.
///
/// A wrapper leaves the pool through [`acquire`](Self::acquire) as a
/// [`PooledRequest`] guard, which is its single owner for the lifetime of one
/// request. Only the pool puts wrappers back, and it always runs
/// `cleanup_multipart` and `reset` first, so no field of a previous request
/// can be observed by the next one.
pub struct RequestPool {
    idle: Mutex<Vec<Request>>,
    max_idle: usize,
}

impl RequestPool {
    /// Creates a pool keeping at most [`DEFAULT_MAX_IDLE`] idle wrappers.
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Creates a pool keeping at most `max_idle` idle wrappers.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Takes a wrapper (reusing an idle one when available) and populates it.
    pub fn acquire(&self, raw: RawRequest) -> PooledRequest<'_> {
        let mut req = self.idle.lock().pop().unwrap_or_default();
        req.populate_into(raw);
        PooledRequest {
            req: Some(req),
            pool: self,
        }
    }

    /// Number of idle wrappers.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, mut req: Request) {
        req.cleanup_multipart();
        req.reset();

        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(req);
        }
    }
}

impl Default for RequestPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive handle on a pooled [`Request`].
///
/// The wrapper returns to the pool, reset, when the guard is dropped or
/// [`release`](Self::release)d. Release only after the response for the
/// request has been fully written.
pub struct PooledRequest<'p> {
    // Some until released
    req: Option<Request>,
    pool: &'p RequestPool,
}

impl PooledRequest<'_> {
    /// Returns the wrapper to the pool now.
    pub fn release(mut self) {
        if let Some(req) = self.req.take() {
            self.pool.release(req);
        }
    }
}

impl Deref for PooledRequest<'_> {
    type Target = Request;

    fn deref(&self) -> &Request {
        match &self.req {
            Some(req) => req,
            None => unreachable!("pooled request used after release"),
        }
    }
}

impl DerefMut for PooledRequest<'_> {
    fn deref_mut(&mut self) -> &mut Request {
        match &mut self.req {
            Some(req) => req,
            None => unreachable!("pooled request used after release"),
        }
    }
}

impl Borrow<Request> for PooledRequest<'_> {
    fn borrow(&self) -> &Request {
        self
    }
}

impl Drop for PooledRequest<'_> {
    fn drop(&mut self) {
        if let Some(req) = self.req.take() {
            self.pool.release(req);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Uri};

    fn raw(path: &'static str) -> RawRequest {
        RawRequest::new(Method::GET, Uri::from_static(path))
            .with_header("accept-language", "en-GB")
    }

    #[test]
    fn acquire_populates() {
        let pool = RequestPool::new();
        let req = pool.acquire(raw("/orders"));
        assert_eq!(req.path, "/orders");
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn drop_returns_reset_wrapper() {
        let pool = RequestPool::new();
        {
            let req = pool.acquire(raw("/orders"));
            assert_eq!(req.locale().unwrap().language, "en");
        }
        assert_eq!(pool.idle_count(), 1);

        let idle = pool.idle.lock();
        assert!(idle[0].path.is_empty());
        assert!(!idle[0].is_negotiation_cached());
        assert!(idle[0].unwrap().is_none());
    }

    #[test]
    fn reused_wrapper_does_not_see_previous_request() {
        let pool = RequestPool::new();
        let first = pool.acquire(raw("/first"));
        let _ = first.locale();
        first.release();

        let second = pool.acquire(RawRequest::new(Method::GET, Uri::from_static("/second")));
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(second.path, "/second");
        assert!(second.locale().is_none());
    }

    #[test]
    fn idle_list_is_bounded() {
        let pool = RequestPool::with_max_idle(1);
        let a = pool.acquire(raw("/a"));
        let b = pool.acquire(raw("/b"));
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }
}
