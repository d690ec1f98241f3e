//! Resilience helpers.
//!
//! The server has no timeouts or retries on the request path; the only
//! retried operation is `accept`, which backs off between failures.

pub mod backoff;
