use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            log::error!("Failed to hash password: {}", e);
            AppError::Password
        })?;
    Ok(hash.to_string())
}

pub fn verify_password(provided: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(provided.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}
