//! 2-legged token cache.
//!
//! Tokens are cached per scope string and handed out again until shortly
//! before they expire.

use dashmap::DashMap;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::config::secrets::AccessToken;

/// Refresh this long before the issuer's expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Token response from `/authentication/v2/token`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

struct CachedToken {
    token: AccessToken,
    refresh_at: Instant,
}

#[derive(Default)]
pub struct TokenCache {
    tokens: DashMap<String, CachedToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cached token for `scopes`, if one is still fresh. The remaining
    /// lifetime is reported in `expires_in`.
    pub fn get(&self, scopes: &str) -> Option<AccessToken> {
        let entry = self.tokens.get(scopes)?;
        let remaining = entry
            .refresh_at
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())?;
        Some(AccessToken::new(
            entry.token.expose(),
            (remaining + EXPIRY_MARGIN).as_secs(),
        ))
    }

    pub fn put(&self, scopes: &str, token: AccessToken) {
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        self.tokens.insert(
            scopes.to_string(),
            CachedToken {
                token,
                refresh_at: Instant::now() + lifetime,
            },
        );
    }
}
