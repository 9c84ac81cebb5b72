//! Message record types and input validation.

use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// Maximum message length in characters (`VARCHAR(255)` column).
pub const MAX_MESSAGE_LEN: usize = 255;

/// User-facing message for empty or whitespace-only text.
pub const MESSAGE_REQUIRED: &str = "Message is required";

/// User-facing message for text over [`MAX_MESSAGE_LEN`].
pub const MESSAGE_TOO_LONG: &str = "Message must be at most 255 characters";

/// A persisted HelloWorld message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct HelloMessage {
    /// Store-assigned id, positive and monotonic.
    pub id: i64,
    /// Message text, never empty after trimming.
    pub message: String,
}

/// Check message text before it reaches persistence.
///
/// The text is returned unchanged; trimming only decides emptiness.
pub fn validate_message(text: &str) -> StoreResult<&str> {
    if text.trim().is_empty() {
        return Err(StoreError::Validation(MESSAGE_REQUIRED));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(StoreError::Validation(MESSAGE_TOO_LONG));
    }
    Ok(text)
}
