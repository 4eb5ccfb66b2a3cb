use crate::errors::AppError;
use sha2::{Digest, Sha256};

/// Identity presented by a request.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    /// Raw `x-api-key` header value, if any.
    pub api_key: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(String),
}

/// Decides whether a caller may manage prospect records.
pub trait PermissionGate: Send + Sync {
    fn can_manage_prospects(&self, caller: &Caller) -> Access;

    /// `can_manage_prospects` as a `Result`, for use with `?` on write paths.
    fn require_manage_prospects(&self, caller: &Caller) -> Result<(), AppError> {
        match self.can_manage_prospects(caller) {
            Access::Allow => Ok(()),
            Access::Deny(reason) if caller.api_key.is_none() => Err(AppError::Unauthorized(reason)),
            Access::Deny(reason) => Err(AppError::Forbidden(reason)),
        }
    }
}

/// Grants access to callers presenting the configured management key.
///
/// Keys are compared by SHA-256 digest so comparison time does not depend on
/// how many leading characters match.
#[derive(Clone)]
pub struct ApiKeyGate {
    key_digest: Vec<u8>,
}

impl ApiKeyGate {
    pub fn new(manage_key: &str) -> Self {
        Self {
            key_digest: Sha256::digest(manage_key.as_bytes()).to_vec(),
        }
    }
}

impl PermissionGate for ApiKeyGate {
    fn can_manage_prospects(&self, caller: &Caller) -> Access {
        match caller.api_key.as_deref() {
            None => Access::Deny("missing x-api-key header".to_string()),
            Some(key) => {
                let digest = Sha256::digest(key.as_bytes());
                if digest.as_slice() == self.key_digest.as_slice() {
                    Access::Allow
                } else {
                    Access::Deny("api key cannot manage prospects".to_string())
                }
            }
        }
    }
}

impl std::fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGate").finish_non_exhaustive()
    }
}
