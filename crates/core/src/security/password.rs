use crate::{HospitalError, HospitalResult};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 password hasher.
///
/// Hashes are stored as `pbkdf2-sha256$<iterations>$<salt>$<key>` (base64, unpadded). The
/// iteration count travels with the hash, so raising it only affects new hashes.
#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let key = derive(password, &salt, self.iterations);
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(key)
        )
    }

    /// Checks `password` against a stored hash in constant time.
    ///
    /// # Errors
    ///
    /// Returns [`HospitalError::PasswordHash`] if the stored value is not a hash this hasher
    /// produced. A wrong password is `Ok(false)`.
    pub fn verify(&self, password: &str, stored: &str) -> HospitalResult<bool> {
        let malformed = || HospitalError::PasswordHash("stored hash is malformed".into());

        let mut parts = stored.split('$');
        if parts.next() != Some(SCHEME) {
            return Err(malformed());
        }
        let iterations: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .filter(|n| *n > 0)
            .ok_or_else(malformed)?;
        let salt = parts
            .next()
            .and_then(|p| STANDARD_NO_PAD.decode(p).ok())
            .ok_or_else(malformed)?;
        let expected = parts
            .next()
            .and_then(|p| STANDARD_NO_PAD.decode(p).ok())
            .filter(|k| k.len() == KEY_LEN)
            .ok_or_else(malformed)?;
        if parts.next().is_some() {
            return Err(malformed());
        }

        let actual = derive(password, &salt, iterations);
        Ok(actual.ct_eq(expected.as_slice()).into())
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}
