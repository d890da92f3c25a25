//! Per-hand card keys and token sealing.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};
use tablesync_protocol::CardToken;

use crate::CardError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Holds one ChaCha20-Poly1305 key per hand, indexed by
/// `"<room_id>:<hand_id>"`.
///
/// Keys never leave the store; clients only ever see sealed tokens. A hand's
/// key is retired when the next hand is dealt, which makes stale tokens
/// permanently unopenable.
#[derive(Default)]
pub struct CardKeyStore {
    keys: HashMap<String, Key>,
}

impl CardKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh random key under `key_id`, replacing any key
    /// already registered there.
    pub fn create_card_key(&mut self, key_id: impl Into<String>) {
        let key_id = key_id.into();
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        if self.keys.insert(key_id.clone(), key).is_some() {
            tracing::warn!(key_id = %key_id, "card key replaced");
        } else {
            tracing::debug!(key_id = %key_id, "card key created");
        }
    }

    /// Seals a card under the hand key, producing a wire-safe token.
    ///
    /// Every call draws a fresh nonce, so sealing the same card twice
    /// yields different tokens.
    ///
    /// # Errors
    /// Returns [`CardError::KeyNotFound`] if no key exists under `key_id`.
    pub fn encrypt_card(
        &self,
        card: &str,
        key_id: &str,
    ) -> Result<CardToken, CardError> {
        let key = self
            .keys
            .get(key_id)
            .ok_or_else(|| CardError::KeyNotFound(key_id.to_string()))?;
        let cipher = ChaCha20Poly1305::new(key);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, card.as_bytes())
            .map_err(|e| CardError::Seal(e.to_string()))?;

        // The cipher appends the 16-byte tag to the ciphertext; the wire
        // format carries them as separate fields.
        let split = sealed.len() - TAG_LEN;
        Ok(CardToken {
            key_id: key_id.to_string(),
            iv: BASE64.encode(nonce),
            tag: BASE64.encode(&sealed[split..]),
            ciphertext: BASE64.encode(&sealed[..split]),
            slot: None,
        })
    }

    /// Opens a sealed token, failing hard on any alteration.
    ///
    /// # Errors
    /// - [`CardError::KeyNotFound`] — the hand key is gone or never existed
    /// - [`CardError::Malformed`] — a field is not valid base64 or has the
    ///   wrong length
    /// - [`CardError::Tamper`] — authentication failed
    pub fn decrypt_card(&self, token: &CardToken) -> Result<String, CardError> {
        let key = self
            .keys
            .get(&token.key_id)
            .ok_or_else(|| CardError::KeyNotFound(token.key_id.clone()))?;

        let iv = decode_field("iv", &token.iv)?;
        let tag = decode_field("tag", &token.tag)?;
        let ciphertext = decode_field("ciphertext", &token.ciphertext)?;
        if iv.len() != NONCE_LEN {
            return Err(CardError::Malformed(format!(
                "iv must be {NONCE_LEN} bytes, got {}",
                iv.len()
            )));
        }
        if tag.len() != TAG_LEN {
            return Err(CardError::Malformed(format!(
                "tag must be {TAG_LEN} bytes, got {}",
                tag.len()
            )));
        }

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);
        let cipher = ChaCha20Poly1305::new(key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|_| CardError::Tamper)?;
        String::from_utf8(plaintext)
            .map_err(|_| CardError::Malformed("card is not utf-8".into()))
    }

    /// Drops the key under `key_id`. Returns whether a key was present.
    pub fn retire_key(&mut self, key_id: &str) -> bool {
        let removed = self.keys.remove(key_id).is_some();
        if removed {
            tracing::debug!(key_id = %key_id, "card key retired");
        }
        removed
    }

    pub fn contains_key(&self, key_id: &str) -> bool {
        self.keys.contains_key(key_id)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, CardError> {
    BASE64
        .decode(value)
        .map_err(|e| CardError::Malformed(format!("{name}: {e}")))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_key(key_id: &str) -> CardKeyStore {
        let mut store = CardKeyStore::new();
        store.create_card_key(key_id);
        store
    }

    #[test]
    fn test_encrypt_card_then_decrypt_card_roundtrips() {
        let store = store_with_key("room-1:hand-1");
        let token = store.encrypt_card("A♠", "room-1:hand-1").unwrap();
        assert_eq!(token.key_id, "room-1:hand-1");
        assert_eq!(store.decrypt_card(&token).unwrap(), "A♠");
    }

    #[test]
    fn test_encrypt_card_empty_plaintext_roundtrips() {
        let store = store_with_key("k");
        let token = store.encrypt_card("", "k").unwrap();
        assert_eq!(store.decrypt_card(&token).unwrap(), "");
    }

    #[test]
    fn test_encrypt_card_uses_fresh_nonce_per_call() {
        let store = store_with_key("k");
        let a = store.encrypt_card("A♠", "k").unwrap();
        let b = store.encrypt_card("A♠", "k").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_eq!(store.decrypt_card(&a).unwrap(), "A♠");
        assert_eq!(store.decrypt_card(&b).unwrap(), "A♠");
    }

    #[test]
    fn test_encrypt_card_unknown_key_fails() {
        let store = CardKeyStore::new();
        let result = store.encrypt_card("A♠", "ghost");
        assert!(matches!(result, Err(CardError::KeyNotFound(_))));
    }

    #[test]
    fn test_decrypt_card_tampered_ciphertext_fails() {
        let store = store_with_key("k");
        let mut token = store.encrypt_card("A♠", "k").unwrap();
        let mut bytes = BASE64.decode(&token.ciphertext).unwrap();
        bytes[0] ^= 0xff;
        token.ciphertext = BASE64.encode(&bytes);
        assert!(matches!(store.decrypt_card(&token), Err(CardError::Tamper)));
    }

    #[test]
    fn test_decrypt_card_wrong_key_fails() {
        let mut store = store_with_key("k");
        let token = store.encrypt_card("A♠", "k").unwrap();
        // Replacing the key invalidates every outstanding token.
        store.create_card_key("k");
        assert!(matches!(store.decrypt_card(&token), Err(CardError::Tamper)));
    }

    #[test]
    fn test_decrypt_card_bad_base64_is_malformed() {
        let store = store_with_key("k");
        let mut token = store.encrypt_card("A♠", "k").unwrap();
        token.iv = "not base64 at all!".into();
        assert!(matches!(
            store.decrypt_card(&token),
            Err(CardError::Malformed(_))
        ));
    }

    #[test]
    fn test_decrypt_card_short_iv_is_malformed() {
        let store = store_with_key("k");
        let mut token = store.encrypt_card("A♠", "k").unwrap();
        token.iv = BASE64.encode([0u8; 4]);
        assert!(matches!(
            store.decrypt_card(&token),
            Err(CardError::Malformed(_))
        ));
    }

    #[test]
    fn test_retire_key_makes_tokens_unopenable() {
        let mut store = store_with_key("k");
        let token = store.encrypt_card("A♠", "k").unwrap();

        assert!(store.retire_key("k"));
        assert!(!store.retire_key("k"), "second retire is a no-op");
        assert_eq!(store.key_count(), 0);
        assert!(matches!(
            store.decrypt_card(&token),
            Err(CardError::KeyNotFound(_))
        ));
    }
}
