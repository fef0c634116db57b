//! Sealing the CA private key at rest.
//!
//! The deploy file stores the Ed25519 CA seed encrypted under a key derived
//! from the CA password:
//!
//! ```text
//! kek        = Argon2id(password, salt)        64 MiB, t=3, p=4
//! ciphertext = ChaCha20-Poly1305(kek, nonce, seed)
//! ```
//!
//! Every intermediate secret (the KEK and the recovered seed) is returned
//! inside [`Zeroizing`] so it is wiped when dropped.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use ed25519_dalek::VerifyingKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{IssuerError, Result};

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

/// Ed25519 seed length
pub const PRIVATE_KEY_LEN: usize = 32;

/// OpenSSH key type name for Ed25519
pub const SSH_ED25519: &str = "ssh-ed25519";

const KDF_MEMORY_KIB: u32 = 64 * 1024;
const KDF_PASSES: u32 = 3;
const KDF_LANES: u32 = 4;

/// A sealed CA seed plus the parameters needed to open it again.
#[derive(Debug, Clone)]
pub struct SealedKey {
    pub ciphertext: Vec<u8>,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
}

fn random_array<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

fn cipher_for(password: &[u8], salt: &[u8]) -> Result<ChaCha20Poly1305> {
    let params = Params::new(KDF_MEMORY_KIB, KDF_PASSES, KDF_LANES, Some(32))
        .map_err(|e| IssuerError::CredentialConstruction(format!("Invalid Argon2 params: {e}")))?;

    let mut kek = Zeroizing::new([0u8; 32]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password, salt, &mut kek[..])
        .map_err(|e| IssuerError::CredentialConstruction(format!("Key derivation failed: {e}")))?;

    Ok(ChaCha20Poly1305::new(Key::from_slice(&kek[..])))
}

/// Seal `seed` under `password` with a fresh salt and nonce.
pub fn seal_private_key(seed: &[u8; PRIVATE_KEY_LEN], password: &[u8]) -> Result<SealedKey> {
    let salt = random_array::<SALT_LEN>();
    let nonce = random_array::<NONCE_LEN>();

    let ciphertext = cipher_for(password, &salt)?
        .encrypt(Nonce::from_slice(&nonce), seed.as_slice())
        .map_err(|e| IssuerError::CredentialConstruction(format!("Encryption failed: {e}")))?;

    Ok(SealedKey {
        ciphertext,
        salt,
        nonce,
    })
}

/// Recover the CA seed.
///
/// # Errors
///
/// `CredentialConstructionError` when the tag does not verify (wrong
/// password, tampered file) or the plaintext is not a 32-byte seed.
pub fn unseal_private_key(
    sealed: &SealedKey,
    password: &[u8],
) -> Result<Zeroizing<[u8; PRIVATE_KEY_LEN]>> {
    let plaintext = Zeroizing::new(
        cipher_for(password, &sealed.salt)?
            .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
            .map_err(|_| {
                IssuerError::CredentialConstruction(
                    "Failed to decrypt CA private key (wrong password?)".into(),
                )
            })?,
    );

    let mut seed = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
    if plaintext.len() != PRIVATE_KEY_LEN {
        return Err(IssuerError::CredentialConstruction(format!(
            "CA private key is {} bytes, expected {PRIVATE_KEY_LEN}",
            plaintext.len()
        )));
    }
    seed.copy_from_slice(&plaintext);
    Ok(seed)
}

fn put_ssh_string(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
}

/// Render a public key as an `authorized_keys` / `known_hosts` line body.
pub fn openssh_public_key(key: &VerifyingKey, comment: &str) -> String {
    let mut blob = Vec::with_capacity(51);
    put_ssh_string(&mut blob, SSH_ED25519.as_bytes());
    put_ssh_string(&mut blob, key.as_bytes());

    let encoded = BASE64.encode(blob);
    if comment.is_empty() {
        format!("{SSH_ED25519} {encoded}")
    } else {
        format!("{SSH_ED25519} {encoded} {comment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    #[test]
    fn test_seal_then_unseal() {
        let seed = [42u8; PRIVATE_KEY_LEN];
        let sealed = seal_private_key(&seed, b"ca-password-123").unwrap();

        // Poly1305 tag appended to the 32-byte seed
        assert_eq!(sealed.ciphertext.len(), PRIVATE_KEY_LEN + 16);
        assert_ne!(&sealed.ciphertext[..PRIVATE_KEY_LEN], &seed[..]);

        let opened = unseal_private_key(&sealed, b"ca-password-123").unwrap();
        assert_eq!(*opened, seed);
    }

    #[test]
    fn test_each_seal_uses_fresh_salt_and_nonce() {
        let seed = [1u8; PRIVATE_KEY_LEN];
        let a = seal_private_key(&seed, b"pw").unwrap();
        let b = seal_private_key(&seed, b"pw").unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_password_fails() {
        let sealed = seal_private_key(&[9u8; PRIVATE_KEY_LEN], b"correct-password").unwrap();
        let err = unseal_private_key(&sealed, b"wrong-password").unwrap_err();
        assert_eq!(err.kind(), "CredentialConstructionError");
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut sealed = seal_private_key(&[9u8; PRIVATE_KEY_LEN], b"pw").unwrap();
        sealed.ciphertext[0] ^= 0x01;
        assert!(unseal_private_key(&sealed, b"pw").is_err());
    }

    #[test]
    fn test_openssh_public_key_format() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let line = openssh_public_key(&signing_key.verifying_key(), "bastion-ca");

        let parts: Vec<&str> = line.split(' ').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ssh-ed25519");
        assert_eq!(parts[2], "bastion-ca");

        // 4 + 11 ("ssh-ed25519") + 4 + 32
        let blob = BASE64.decode(parts[1]).unwrap();
        assert_eq!(blob.len(), 51);
        assert_eq!(&blob[4..15], b"ssh-ed25519");
        assert_eq!(&blob[19..], signing_key.verifying_key().as_bytes());
        assert!(parts[1].starts_with("AAAAC3NzaC1lZDI1NTE5"));
    }

    #[test]
    fn test_openssh_public_key_without_comment() {
        let verifying_key = SigningKey::from_bytes(&[3u8; 32]).verifying_key();
        let line = openssh_public_key(&verifying_key, "");
        assert_eq!(line.split(' ').count(), 2);
    }
}
