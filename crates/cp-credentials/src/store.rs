use aes_gcm::aead::{Aead, AeadCore, OsRng};
use aes_gcm::Aes256Gcm;
use cp_core::error::AppError;
use cp_core::ids::UserId;
use cp_storage::CredentialRepository;

use crate::cookies::CookieSet;

/// Mediates encrypted-at-rest access to per-user browser cookies. Plaintext
/// never touches storage; it exists only in memory between `decrypt` and the
/// moment a session injects it.
#[derive(Clone)]
pub struct CredentialStore {
    repo: CredentialRepository,
    cipher: Aes256Gcm,
}

impl CredentialStore {
    pub fn new(repo: CredentialRepository, cipher: Aes256Gcm) -> Self {
        Self { repo, cipher }
    }

    pub async fn put(&self, user_id: &UserId, cookies: &CookieSet) -> Result<(), AppError> {
        let plaintext = serde_json::to_vec(cookies)
            .map_err(|e| AppError::Internal(format!("cookie serialization failed: {e}")))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|e| AppError::Internal(format!("credential encryption failed: {e}")))?;

        let mut blob = Vec::with_capacity(nonce.len() + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        self.repo.put(user_id, &blob).await
    }

    /// Returns `Ok(None)` when the user has never captured credentials, and
    /// `Err(AppError::CorruptCredentials)` when stored ciphertext no longer
    /// decrypts under the current key.
    pub async fn get(&self, user_id: &UserId) -> Result<Option<CookieSet>, AppError> {
        let Some(row) = self.repo.get(user_id).await? else {
            return Ok(None);
        };

        const NONCE_LEN: usize = 12;
        if row.encrypted_cookies.len() < NONCE_LEN {
            return Err(AppError::CorruptCredentials);
        }
        let (nonce_bytes, ciphertext) = row.encrypted_cookies.split_at(NONCE_LEN);
        let nonce = aes_gcm::Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| AppError::CorruptCredentials)?;

        let cookies: CookieSet = serde_json::from_slice(&plaintext)
            .map_err(|_| AppError::CorruptCredentials)?;
        Ok(Some(cookies))
    }

    pub async fn delete(&self, user_id: &UserId) -> Result<(), AppError> {
        self.repo.delete(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::Cookie;
    use crate::key::cipher_from_base64;

    fn sample_cookie_set() -> CookieSet {
        CookieSet {
            cookies: vec![Cookie {
                name: "session".into(),
                value: "abc123".into(),
                domain: ".example.com".into(),
                path: "/".into(),
                secure: true,
                http_only: true,
                same_site: Some("Lax".into()),
                expires_at: None,
            }],
        }
    }

    fn test_cipher() -> Aes256Gcm {
        let key = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [7u8; 32]);
        cipher_from_base64(&key).unwrap()
    }

    #[test]
    fn encrypt_decrypt_round_trips_in_memory() {
        let cipher = test_cipher();
        let cookies = sample_cookie_set();
        let plaintext = serde_json::to_vec(&cookies).unwrap();
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher.encrypt(&nonce, plaintext.as_ref()).unwrap();
        let decrypted = cipher.decrypt(&nonce, ciphertext.as_ref()).unwrap();
        let round_tripped: CookieSet = serde_json::from_slice(&decrypted).unwrap();
        assert_eq!(round_tripped, cookies);
    }
}
