//! Secret handling utilities.
//!
//! Re-exports secrecy types and provides the bearer-token wrapper used
//! wherever an APS access token is held or passed along.

use std::fmt;

pub use secrecy::{ExposeSecret, SecretString};

/// A bearer credential issued by APS.
///
/// The token text never appears in `Debug` output.
pub struct AccessToken {
    secret: SecretString,
    /// Lifetime in seconds as reported by the issuer.
    pub expires_in: u64,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            secret: SecretString::from(token.into()),
            expires_in,
        }
    }

    /// The raw token text, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl Clone for AccessToken {
    fn clone(&self) -> Self {
        Self::new(self.expose(), self.expires_in)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}
