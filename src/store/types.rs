//! Store error types.

use thiserror::Error;

/// Sprite store errors.
///
/// These cover transient I/O only. "No sprite available for this id" is not
/// an error; it is reported as `Ok(None)` and persisted as a negative
/// marker. A transient I/O failure is surfaced to the immediate caller and
/// deliberately *not* persisted as a marker, so the id stays eligible for
/// retry on the next access.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure reading or writing the cache directory
    #[error("sprite store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
