//! Request DTOs for the key-value API
//!
//! Defines the shape and limits of incoming requests.

use serde::Deserialize;

use crate::error::{KvError, Result};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

/// Query string of `PUT /put/*key`
///
/// # Fields
/// - `value`: the value to store; when absent or empty the request body is used
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PutQuery {
    #[serde(default)]
    pub value: Option<String>,
}

impl PutQuery {
    /// Picks the value to store: a non-empty `?value=` wins over the body.
    pub fn into_value(self, body: &[u8]) -> Vec<u8> {
        match self.value {
            Some(value) if !value.is_empty() => value.into_bytes(),
            _ => body.to_vec(),
        }
    }
}

/// Validates a key taken from the request path.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidRequest("Missing key".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(KvError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Validates a value before it is written.
pub fn validate_value(value: &[u8]) -> Result<()> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(KvError::InvalidRequest(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }
    Ok(())
}
