//! Signing secret for issued tokens.
//!
//! `JWT_SECRET` pins the secret across restarts. Without it a fresh secret
//! is drawn from the OS random source on every start, which invalidates all
//! tokens issued by the previous process.

use std::env;
use std::fmt;

use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::error::AppError;

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Random bytes drawn for a generated secret; hex encoding doubles the length.
const GENERATED_SECRET_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    /// Taken verbatim from `JWT_SECRET`
    Environment,
    /// Generated at startup, lives only as long as the process
    Generated,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret {
    bytes: Vec<u8>,
    source: SecretSource,
}

impl SigningSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn source(&self) -> SecretSource {
        self.source
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("source", &self.source)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Resolve the process signing secret. Called once by the startup routine.
pub fn resolve_signing_secret() -> Result<SigningSecret, AppError> {
    resolve_signing_secret_from(env::var(JWT_SECRET_ENV).ok())
}

pub fn resolve_signing_secret_from(configured: Option<String>) -> Result<SigningSecret, AppError> {
    match configured {
        Some(secret) if !secret.is_empty() => Ok(SigningSecret {
            bytes: secret.into_bytes(),
            source: SecretSource::Environment,
        }),
        _ => generate_secret(&mut OsRng),
    }
}

/// No fallback to a weaker source: a failing RNG is fatal.
fn generate_secret<R: TryRngCore>(rng: &mut R) -> Result<SigningSecret, AppError> {
    let mut raw = [0u8; GENERATED_SECRET_BYTES];
    rng.try_fill_bytes(&mut raw)
        .map_err(|e| AppError::Randomness {
            detail: e.to_string(),
        })?;

    Ok(SigningSecret {
        bytes: hex::encode(raw).into_bytes(),
        source: SecretSource::Generated,
    })
}
