use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use rand::rngs::OsRng;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Hashes a clear text password with argon2id and a random salt.
 *
 * # Arguments
 * `password`: The clear text password.
 *
 * # Returns
 * The PHC formatted hash, which embeds algorithm, parameters and salt.
 */
pub fn hash_password(password: &str) -> Result<String, ApplicationError> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| ApplicationError::new(ErrorType::PasswordHashing, format!("Failed to hash password: {err}")))?
        .to_string();
    Ok(password_hash)
}
