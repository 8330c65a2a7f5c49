use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub const ADMIN_KEY_PREFIX: &str = "sk_admin_";
pub const TENANT_KEY_PREFIX: &str = "sk_store_";

/// Characters of the plaintext persisted for display purposes.
pub const DISPLAY_PREFIX_LEN: usize = 16;

const SECRET_BYTES: usize = 24;
const TENANT_ID_PREFIX_LEN: usize = 6;

/// Credential shape, recognized by prefix alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Admin,
    Tenant,
}

/// Classifies a plaintext key by its prefix.
pub fn classify_key(raw: &str) -> Result<KeyKind> {
    if raw.starts_with(ADMIN_KEY_PREFIX) {
        Ok(KeyKind::Admin)
    } else if raw.starts_with(TENANT_KEY_PREFIX) {
        Ok(KeyKind::Tenant)
    } else {
        Err(Error::InvalidKey)
    }
}

/// SHA-256 of the plaintext as lowercase hex. Tenant keys are looked up by
/// exact equality on this value.
#[must_use]
pub fn hash_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Generates a new tenant key: `sk_store_<tenantIdPrefix>_<secret>` where the
/// secret is 24 bytes of CSPRNG output, base64url-encoded without padding.
/// The plaintext is returned exactly once; callers persist only the hash and
/// the display prefix.
#[must_use]
pub fn generate_key(tenant_id: &str) -> String {
    let id_prefix: String = tenant_id
        .chars()
        .filter(|c| *c != '-')
        .take(TENANT_ID_PREFIX_LEN)
        .collect();

    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret = URL_SAFE_NO_PAD.encode(bytes);

    format!("{TENANT_KEY_PREFIX}{id_prefix}_{secret}")
}

/// First 16 characters of the plaintext, for display.
#[must_use]
pub fn display_prefix(raw: &str) -> String {
    raw.chars().take(DISPLAY_PREFIX_LEN).collect()
}

/// Constant-time string equality for the configured admin key.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_key() {
        assert_eq!(classify_key("sk_admin_secret").unwrap(), KeyKind::Admin);
        assert_eq!(classify_key("sk_store_abc123_xyz").unwrap(), KeyKind::Tenant);
        assert!(matches!(classify_key("bearer xyz"), Err(Error::InvalidKey)));
        assert!(matches!(classify_key(""), Err(Error::InvalidKey)));
    }

    #[test]
    fn test_hash_key_is_lowercase_hex() {
        let hash = hash_key("sk_store_abc123_secret");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
        // Deterministic
        assert_eq!(hash, hash_key("sk_store_abc123_secret"));
        assert_ne!(hash, hash_key("sk_store_abc123_other"));
    }

    #[test]
    fn test_generate_key_format() {
        let tenant_id = "0e8dd29c-66bc-4a5c-9838-9bfe2bd421f1";
        let key = generate_key(tenant_id);

        assert!(key.starts_with("sk_store_0e8dd2_"));
        let secret = key.rsplit('_').next().unwrap();
        // 24 bytes of base64url without padding is 32 characters.
        assert_eq!(secret.len(), 32);
        assert!(!secret.contains('='));
    }

    #[test]
    fn test_generate_key_unique() {
        let tenant_id = "0e8dd29c-66bc-4a5c-9838-9bfe2bd421f1";
        assert_ne!(generate_key(tenant_id), generate_key(tenant_id));
    }

    #[test]
    fn test_display_prefix() {
        let key = generate_key("0e8dd29c-66bc-4a5c-9838-9bfe2bd421f1");
        let prefix = display_prefix(&key);
        assert_eq!(prefix.len(), 16);
        assert!(key.starts_with(&prefix));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("sk_admin_x", "sk_admin_x"));
        assert!(!constant_time_eq("sk_admin_x", "sk_admin_y"));
        assert!(!constant_time_eq("sk_admin_x", "sk_admin_xx"));
        assert!(constant_time_eq("", ""));
    }
}
