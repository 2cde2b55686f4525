use thiserror::Error;

/// Errors reported by [`Builder::add`](crate::Builder::add)
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The interval's `beg` was strictly greater than its `end`
    #[error("invalid interval: beg is greater than end")]
    InvalidInterval,
    /// Adding the interval would exceed the builder's maximum capacity
    #[error("capacity overflow: too many intervals for a single tree")]
    CapacityOverflow,
}
