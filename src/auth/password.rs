use tracing::warn;

pub fn hash_password(plain: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, cost)
}

/// `false` on mismatch and on a malformed stored hash alike
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match bcrypt::verify(plain, hash) {
        Ok(matches) => matches,
        Err(e) => {
            warn!("Stored password hash could not be checked: {}", e);
            false
        }
    }
}
