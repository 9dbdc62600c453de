use base64::{Engine, engine::general_purpose::STANDARD};
use core_config::{ConfigError, FromEnv, env_required};
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::fmt;

/// 256 bits.
pub const MIN_KEY_BYTES: usize = 32;

/// HMAC secret for access tokens. Loaded once; never logged.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    len: usize,
}

impl SigningKey {
    /// Decodes standard base64 and enforces [`MIN_KEY_BYTES`].
    pub fn from_base64(secret: &str) -> Result<Self, ConfigError> {
        let bytes = STANDARD
            .decode(secret.trim())
            .map_err(|e| ConfigError::parse("JWT_SECRET", format!("not valid base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() < MIN_KEY_BYTES {
            return Err(ConfigError::parse(
                "JWT_SECRET",
                format!(
                    "decoded key is {} bytes, at least {} required",
                    bytes.len(),
                    MIN_KEY_BYTES
                ),
            ));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            len: bytes.len(),
        })
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Reads `JWT_SECRET`.
impl FromEnv for SigningKey {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_base64(&env_required("JWT_SECRET")?)
    }
}
