//! API-key authentication.
//!
//! Keys are configured as comma-separated `key:tenant:user:role` entries, for example
//! `k3y-abc:acme:u-17:admin,k3y-def:acme:u-18:staff`. Each key resolves to a [`Principal`].

use clinic_types::TenantId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Role {
    Staff,
    Admin,
}

impl Role {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: String,
    pub tenant_id: TenantId,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("API key is missing")]
    MissingKey,
    #[error("API key is invalid")]
    InvalidKey,
    /// Entries are reported by position so the key itself never reaches a log.
    #[error("API key entry {position} is malformed: {reason}")]
    MalformedEntry { position: usize, reason: String },
    #[error("API key entry {position} duplicates an earlier key")]
    DuplicateKey { position: usize },
}

struct KeyEntry {
    digest: [u8; 32],
    principal: Principal,
}

/// Resolves API keys to principals.
#[derive(Default)]
pub struct ApiKeyRegistry {
    entries: Vec<KeyEntry>,
}

impl fmt::Debug for ApiKeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyRegistry")
            .field("keys", &self.entries.len())
            .finish()
    }
}

fn digest(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

/// Compares two digests without an early exit.
fn digests_equal(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl ApiKeyRegistry {
    /// Parses a `key:tenant:user:role` list. An empty or blank spec gives an empty registry.
    pub fn parse(spec: &str) -> Result<Self, AuthError> {
        let mut registry = Self::default();
        for (i, raw) in spec.split(',').enumerate() {
            let entry = raw.trim();
            if entry.is_empty() {
                continue;
            }
            let position = i + 1;
            let malformed = |reason: &str| AuthError::MalformedEntry {
                position,
                reason: reason.to_string(),
            };

            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let [key, tenant, user, role] = parts.as_slice() else {
                return Err(malformed("expected key:tenant:user:role"));
            };
            if key.is_empty() || user.is_empty() {
                return Err(malformed("key and user must not be empty"));
            }
            let tenant_id = TenantId::new(tenant).map_err(|e| malformed(&e.to_string()))?;
            let role = Role::parse(role).ok_or_else(|| malformed("role must be staff or admin"))?;

            let digest = digest(key);
            if registry.entries.iter().any(|e| e.digest == digest) {
                return Err(AuthError::DuplicateKey { position });
            }
            registry.entries.push(KeyEntry {
                digest,
                principal: Principal {
                    user_id: user.to_string(),
                    tenant_id,
                    role,
                },
            });
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves `key` to its principal.
    ///
    /// Every configured key is compared, so the time taken does not depend on which entry
    /// (if any) matches.
    pub fn authenticate(&self, key: &str) -> Result<Principal, AuthError> {
        if key.trim().is_empty() {
            return Err(AuthError::MissingKey);
        }
        let candidate = digest(key.trim());
        let mut found = None;
        for entry in &self.entries {
            if digests_equal(&entry.digest, &candidate) {
                found = Some(&entry.principal);
            }
        }
        found.cloned().ok_or(AuthError::InvalidKey)
    }
}
