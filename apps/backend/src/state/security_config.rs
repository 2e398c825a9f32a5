use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};

use crate::config::app::JwtSettings;
use crate::config::secret::SigningSecret;

/// Token signing material and the `auth.jwt` policy, built once at startup
/// and read by the token code.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    secret: SigningSecret,
    /// JWT algorithm (always HS256)
    pub algorithm: Algorithm,
    pub issuer: String,
    pub audience: String,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
}

impl SecurityConfig {
    pub fn new(secret: SigningSecret, jwt: &JwtSettings) -> Self {
        Self {
            secret,
            algorithm: Algorithm::HS256,
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
            token_ttl: Duration::from_secs(u64::try_from(jwt.expires).unwrap_or(0)),
        }
    }

    pub fn secret(&self) -> &SigningSecret {
        &self.secret
    }

    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.as_bytes())
    }

    /// Validation rules for incoming tokens. Empty issuer or audience
    /// settings disable the matching check.
    pub fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        if !self.issuer.is_empty() {
            validation.set_issuer(&[self.issuer.as_str()]);
        }
        if self.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&[self.audience.as_str()]);
        }
        validation
    }
}
