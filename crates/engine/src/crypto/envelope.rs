use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::flow::IntegrationFlow;

/// Nonce size for AES-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits / 32 bytes).
const KEY_SIZE: usize = 32;

/// Algorithm tag written into every envelope.
const ALGORITHM: &str = "AES-256-GCM";

/// An exported, encrypted flow definition.
///
/// The flow name travels in the clear and is authenticated as
/// additional data, so an envelope cannot be re-attached to a
/// different flow without failing decryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEnvelope {
    pub algorithm: String,
    pub version: u32,
    pub flow_name: String,
    /// Base64-encoded 12-byte nonce.
    pub nonce: String,
    /// Base64-encoded ciphertext.
    pub ciphertext: String,
    pub exported_at: DateTime<Utc>,
}

/// Seals and opens [`FlowEnvelope`]s with a fixed key.
#[derive(Clone)]
pub struct EnvelopeCodec {
    cipher: Aes256Gcm,
}

impl EnvelopeCodec {
    /// Create a codec from a base64-encoded 32-byte key.
    pub fn from_base64(key_base64: &str) -> EngineResult<Self> {
        let key_bytes = BASE64
            .decode(key_base64)
            .map_err(|e| EngineError::Encryption(format!("Invalid base64 key: {}", e)))?;

        Self::from_bytes(&key_bytes)
    }

    /// Create a codec from raw key bytes.
    pub fn from_bytes(key_bytes: &[u8]) -> EngineResult<Self> {
        if key_bytes.len() != KEY_SIZE {
            return Err(EngineError::Encryption(format!(
                "Invalid key length: expected {} bytes, got {}",
                KEY_SIZE,
                key_bytes.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key_bytes)
            .map_err(|e| EngineError::Encryption(format!("Failed to create cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    /// Generate a new random key and return it as base64.
    pub fn generate_key_base64() -> String {
        let mut key = vec![0u8; KEY_SIZE];
        rand::thread_rng().fill(&mut key[..]);
        BASE64.encode(key)
    }

    /// Encrypt a flow into an export envelope.
    pub fn seal(&self, flow: &IntegrationFlow) -> EngineResult<FlowEnvelope> {
        let plaintext = serde_json::to_vec(flow)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: &plaintext,
                    aad: flow.name.as_bytes(),
                },
            )
            .map_err(|e| EngineError::Encryption(format!("Encryption failed: {}", e)))?;

        Ok(FlowEnvelope {
            algorithm: ALGORITHM.to_string(),
            version: flow.version,
            flow_name: flow.name.clone(),
            nonce: BASE64.encode(nonce_bytes),
            ciphertext: BASE64.encode(ciphertext),
            exported_at: Utc::now(),
        })
    }

    /// Decrypt an export envelope back into a flow.
    pub fn open(&self, envelope: &FlowEnvelope) -> EngineResult<IntegrationFlow> {
        if envelope.algorithm != ALGORITHM {
            return Err(EngineError::Encryption(format!(
                "Unsupported algorithm: {}",
                envelope.algorithm
            )));
        }

        let nonce_bytes = BASE64
            .decode(&envelope.nonce)
            .map_err(|e| EngineError::Encryption(format!("Invalid base64 nonce: {}", e)))?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(EngineError::Encryption(format!(
                "Invalid nonce length: expected {} bytes, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }

        let ciphertext = BASE64
            .decode(&envelope.ciphertext)
            .map_err(|e| EngineError::Encryption(format!("Invalid base64 ciphertext: {}", e)))?;

        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &ciphertext,
                    aad: envelope.flow_name.as_bytes(),
                },
            )
            .map_err(|e| EngineError::Encryption(format!("Decryption failed: {}", e)))?;

        Ok(serde_json::from_slice(&plaintext)?)
    }
}
