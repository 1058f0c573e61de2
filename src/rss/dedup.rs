//! Duplicate detection for post inserts.

use crate::error::GatorError;

/// Store messages that mean the row already exists.
const DUPLICATE_MARKERS: [&str; 3] = ["unique constraint failed", "duplicate key", "already exists"];

/// How an insert failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertErrorKind {
    /// The post is already stored; skip it quietly.
    Duplicate,
    /// A real failure worth logging.
    Other,
}

/// Classify an insert error.
///
/// A typed [`GatorError::Conflict`] is always a duplicate. Other errors fall
/// back to matching the message text, for drivers that do not expose the
/// violation kind.
pub fn classify_insert_error(err: &GatorError) -> InsertErrorKind {
    if matches!(err, GatorError::Conflict(_)) {
        return InsertErrorKind::Duplicate;
    }

    let message = err.to_string().to_lowercase();
    if DUPLICATE_MARKERS.iter().any(|m| message.contains(m)) {
        InsertErrorKind::Duplicate
    } else {
        InsertErrorKind::Other
    }
}
