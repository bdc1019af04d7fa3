use aes_gcm::{Aes256Gcm, KeyInit};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

#[derive(Debug)]
pub struct KeyError(pub String);

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid credentials encryption key: {}", self.0)
    }
}

impl std::error::Error for KeyError {}

/// Decode a base64-encoded 256-bit key from process configuration into a
/// ready-to-use cipher. The key never touches the database alongside the
/// ciphertext it protects.
pub fn cipher_from_base64(encoded: &str) -> Result<Aes256Gcm, KeyError> {
    let bytes = BASE64.decode(encoded).map_err(|e| KeyError(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(KeyError(format!(
            "expected a 32-byte key, got {} bytes",
            bytes.len()
        )));
    }
    Aes256Gcm::new_from_slice(&bytes).map_err(|e| KeyError(e.to_string()))
}
