//! Password hashing and verification using Argon2id.
//!
//! Hashes are stored in the PHC-like format
//! `$argon2id$v=19$m=...,t=...,p=...$<salt_b64>$<hash_b64>` and verified
//! with a constant-time comparison.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::prelude::*;
use rand::{rng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Errors that can occur during password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Hashing failed: {0}")]
    HashingFailed(String),

    #[error("Verification failed: password does not match")]
    VerificationFailed,

    #[error("Invalid hash format")]
    InvalidHashFormat,

    #[error("Base64 decoding failed: {0}")]
    DecodingFailed(#[from] base64::DecodeError),
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy)]
struct CostParams {
    memory_cost: u32,
    time_cost:   u32,
    parallelism: u32,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            memory_cost: 19456, // 19 MiB
            time_cost:   2,
            parallelism: 1,
        }
    }
}

impl CostParams {
    /// Parse the `m=...,t=...,p=...` segment of a stored hash.
    fn parse(segment: &str) -> Result<Self, PasswordError> {
        let mut params = Self::default();
        for part in segment.split(',') {
            let (key, value) = part.split_once('=').ok_or(PasswordError::InvalidHashFormat)?;
            let value: u32 = value.parse().map_err(|_| PasswordError::InvalidHashFormat)?;
            match key {
                "m" => params.memory_cost = value,
                "t" => params.time_cost = value,
                "p" => params.parallelism = value,
                _ => return Err(PasswordError::InvalidHashFormat),
            }
        }
        Ok(params)
    }

    fn hasher(&self, output_len: usize) -> Result<Argon2<'static>, PasswordError> {
        Ok(Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(
                self.memory_cost,
                self.time_cost,
                self.parallelism,
                Some(output_len),
            )
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?,
        ))
    }
}

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

/// Hashes a password using Argon2id with a random salt.
///
/// # Errors
///
/// Returns an error if hashing fails.
pub fn hash_password(password: &SecretString) -> Result<SecretString, PasswordError> {
    let params = CostParams::default();

    let mut salt = [0u8; SALT_LENGTH];
    rng().fill_bytes(&mut salt);

    let mut output = [0u8; HASH_LENGTH];
    params
        .hasher(HASH_LENGTH)?
        .hash_password_into(password.expose_secret().as_bytes(), &salt, &mut output)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    let encoded = format!(
        "$argon2id$v=19$m={},t={},p={}${}${}",
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        BASE64_STANDARD.encode(salt),
        BASE64_STANDARD.encode(output)
    );

    Ok(SecretString::from(encoded))
}

/// Verifies a password against a stored hash.
///
/// The comparison is constant-time so verification timing does not leak
/// how much of the hash matched.
pub fn verify_password(password: &SecretString, expected_hash: &str) -> Result<(), PasswordError> {
    // ["", "argon2id", "v=19", "m=..,t=..,p=..", "<salt>", "<hash>"]
    let parts: Vec<&str> = expected_hash.split('$').collect();
    if parts.len() != 6 || !parts[0].is_empty() {
        return Err(PasswordError::InvalidHashFormat);
    }
    if parts[1] != "argon2id" || parts[2] != "v=19" {
        return Err(PasswordError::InvalidHashFormat);
    }

    let params = CostParams::parse(parts[3])?;
    let salt = BASE64_STANDARD.decode(parts[4])?;
    let stored_hash = BASE64_STANDARD.decode(parts[5])?;

    let mut computed = vec![0u8; stored_hash.len()];
    params
        .hasher(stored_hash.len())?
        .hash_password_into(password.expose_secret().as_bytes(), &salt, &mut computed)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    if computed.as_slice().ct_eq(&stored_hash).into() {
        Ok(())
    }
    else {
        Err(PasswordError::VerificationFailed)
    }
}

/// Checks if a password is strong enough.
///
/// # Errors
///
/// Returns the full list of failed rules.
pub fn validate_password_strength(password: &str) -> Result<(), Vec<PasswordValidationError>> {
    let mut errors = Vec::new();

    if password.len() < 12 {
        errors.push(PasswordValidationError::TooShort);
    }

    if password.len() > 256 {
        errors.push(PasswordValidationError::TooLong);
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        errors.push(PasswordValidationError::MissingUppercase);
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        errors.push(PasswordValidationError::MissingLowercase);
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(PasswordValidationError::MissingDigit);
    }

    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        errors.push(PasswordValidationError::MissingSpecial);
    }

    if errors.is_empty() {
        Ok(())
    }
    else {
        Err(errors)
    }
}

/// Errors for password validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordValidationError {
    #[error("Password must be at least 12 characters long")]
    TooShort,

    #[error("Password must be at most 256 characters long")]
    TooLong,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one digit")]
    MissingDigit,

    #[error("Password must contain at least one special character")]
    MissingSpecial,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = SecretString::from("TestPassword123!".to_string());
        let hash = hash_password(&password).unwrap();
        let result = verify_password(&password, hash.expose_secret());
        assert!(result.is_ok(), "Verification failed: {:?}", result);
    }

    #[test]
    fn test_wrong_password_fails() {
        let password = SecretString::from("CorrectPassword1!".to_string());
        let wrong_password = SecretString::from("WrongPassword1!".to_string());
        let hash = hash_password(&password).unwrap();
        assert!(verify_password(&wrong_password, hash.expose_secret()).is_err());
    }

    #[test]
    fn test_hashes_are_salted() {
        let password = SecretString::from("TestPassword123!".to_string());
        let hash1 = hash_password(&password).unwrap();
        let hash2 = hash_password(&password).unwrap();
        assert_ne!(hash1.expose_secret(), hash2.expose_secret());
    }

    #[test]
    fn test_malformed_hash_rejected() {
        let password = SecretString::from("TestPassword123!".to_string());
        assert!(matches!(
            verify_password(&password, "not-a-hash"),
            Err(PasswordError::InvalidHashFormat)
        ));
        assert!(matches!(
            verify_password(&password, "$bcrypt$v=19$m=1,t=1,p=1$c2FsdA$aGFzaA"),
            Err(PasswordError::InvalidHashFormat)
        ));
    }

    #[test]
    fn test_cost_params_parse() {
        let params = CostParams::parse("m=19456,t=2,p=1").unwrap();
        assert_eq!(params.memory_cost, 19456);
        assert_eq!(params.time_cost, 2);
        assert_eq!(params.parallelism, 1);

        assert!(CostParams::parse("m=abc").is_err());
        assert!(CostParams::parse("x=1").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password_strength("abc").is_err());
        assert!(validate_password_strength("StrongP@ssw0rd!").is_ok());

        let errors = validate_password_strength("alllowercase").unwrap_err();
        assert!(errors.contains(&PasswordValidationError::MissingUppercase));
        assert!(errors.contains(&PasswordValidationError::MissingDigit));
        assert!(errors.contains(&PasswordValidationError::MissingSpecial));
    }
}
