//! Device token policy.

use crate::error::ValidationError;

/// Token length used by the deployed sensor firmware.
pub const DEFAULT_TOKEN_LEN: usize = 32;

/// Shape constraints on device tokens.
///
/// Only the transport checks this; the resolver itself does an exact lookup
/// and never depends on the length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Expected number of characters.
    pub expected_len: usize,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            expected_len: DEFAULT_TOKEN_LEN,
        }
    }
}

impl TokenPolicy {
    /// Create a policy with the given expected length.
    pub fn new(expected_len: usize) -> Self {
        Self { expected_len }
    }

    /// Check that `token` has the expected length.
    pub fn check(&self, token: &str) -> Result<(), ValidationError> {
        let actual = token.chars().count();
        if actual == self.expected_len {
            Ok(())
        } else {
            Err(ValidationError::TokenLength {
                expected: self.expected_len,
                actual,
            })
        }
    }
}
