use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};

/// True only when `hashed` is a valid PHC string matching `password`.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hashed) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
