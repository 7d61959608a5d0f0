// SPDX-License-Identifier: GPL-3.0-only

//! Password hashing through the C library.
//!
//! Secrets are hashed with yescrypt; when the running C library does not
//! support it the code falls back to SHA-512. Both failing is an error.

use std::ffi::{CStr, CString};

use rand::Rng;

use crate::error::{Result, SysError};

const SALT_ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const YESCRYPT_PREFIX: &str = "$y$j9T$";
const YESCRYPT_SALT_LENGTH: usize = 24;
const SHA512_PREFIX: &str = "$6$";
const SHA512_SALT_LENGTH: usize = 16;

// crypt(3) lives in libcrypt, not libc proper.
#[link(name = "crypt")]
unsafe extern "C" {
    #[link_name = "crypt"]
    fn libc_crypt(phrase: *const libc::c_char, setting: *const libc::c_char)
    -> *mut libc::c_char;
}

fn random_salt(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| SALT_ALPHABET[rng.gen_range(0..SALT_ALPHABET.len())] as char)
        .collect()
}

/// Hash a secret against an explicit setting string. Feeding a full hash
/// back as the setting reproduces the hash.
pub fn crypt_with_setting(password: &str, setting: &str) -> Result<String> {
    let phrase = CString::new(password)
        .map_err(|_| SysError::Crypt("password contains a NUL byte".into()))?;
    let setting_c = CString::new(setting)
        .map_err(|_| SysError::Crypt("setting contains a NUL byte".into()))?;

    // crypt returns NULL or a "*"-prefixed token when the setting is not
    // supported by the running C library.
    let result = unsafe { libc_crypt(phrase.as_ptr(), setting_c.as_ptr()) };
    if result.is_null() {
        return Err(SysError::Crypt(format!(
            "crypt rejected setting {:?}",
            &setting[..setting.len().min(4)]
        )));
    }
    let hashed = unsafe { CStr::from_ptr(result) }
        .to_str()
        .map_err(|_| SysError::Crypt("crypt returned invalid UTF-8".into()))?
        .to_string();
    if hashed.starts_with('*') {
        return Err(SysError::Crypt(format!(
            "crypt rejected setting {:?}",
            &setting[..setting.len().min(4)]
        )));
    }
    Ok(hashed)
}

/// Hash a secret for /etc/shadow, preferring yescrypt.
pub fn crypt_password(password: &str) -> Result<String> {
    let setting = format!("{YESCRYPT_PREFIX}{}", random_salt(YESCRYPT_SALT_LENGTH));
    match crypt_with_setting(password, &setting) {
        Ok(hashed) => Ok(hashed),
        Err(error) => {
            tracing::debug!("yescrypt unavailable ({error}), falling back to SHA-512");
            let setting = format!("{SHA512_PREFIX}{}$", random_salt(SHA512_SALT_LENGTH));
            crypt_with_setting(password, &setting)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salt_uses_the_shadow_alphabet() {
        let salt = random_salt(24);
        assert_eq!(salt.len(), 24);
        assert!(salt.bytes().all(|b| SALT_ALPHABET.contains(&b)));
    }

    #[test]
    fn hashes_carry_a_known_prefix() {
        let hashed = crypt_password("swordfish").expect("hash");
        assert!(
            hashed.starts_with("$y$") || hashed.starts_with("$6$"),
            "unexpected hash prefix: {hashed}"
        );
    }

    #[test]
    fn hashing_is_idempotent_over_its_own_setting() {
        let hashed = crypt_password("swordfish").expect("hash");
        let again = crypt_with_setting("swordfish", &hashed).expect("rehash");
        assert_eq!(again, hashed);
    }

    #[test]
    fn different_calls_use_different_salts() {
        let first = crypt_password("swordfish").expect("hash");
        let second = crypt_password("swordfish").expect("hash");
        assert_ne!(first, second);
    }
}
