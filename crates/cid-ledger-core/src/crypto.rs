//! Keys, signatures and hashes.
//!
//! An account is its Ed25519 public key: [`Keypair::address`] is the only
//! way an [`Address`] comes from key material. Blake3 names transactions
//! and fingerprints deployed programs.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::types::Address;

/// Key-derivation context for pass-phrase keys.
const PHRASE_CONTEXT: &str = "cid-ledger 2024 pass-phrase signing key v0";

/// First eight bytes as hex, for `Debug` output.
fn short_hex(bytes: &[u8]) -> String {
    hex::encode(&bytes[..8])
}

/// Signing key of one account.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// A fresh random account.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Derive the account behind a pass phrase.
    ///
    /// Whitespace is normalised, so a phrase read from a file or an
    /// environment variable with stray spaces or newlines gives the same key.
    pub fn from_phrase(phrase: &str) -> Self {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        let seed = blake3::derive_key(PHRASE_CONTEXT, words.join(" ").as_bytes());
        Self::from_seed(&seed)
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn address(&self) -> Address {
        Address::from(self.public_key())
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", short_hex(&self.public_key().0))
    }
}

/// Ed25519 public key; the bytes of an [`Address`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Check `signature` over `message`.
    ///
    /// Bytes that are not a curve point fail with `InvalidPublicKey`, so an
    /// address made up by hand can never authorise a call.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CoreError> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        key.verify(message, &Signature::from_bytes(&signature.0))
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", short_hex(&self.0))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}..)", short_hex(&self.0))
    }
}

/// Blake3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }
}

impl fmt::Debug for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blake3({})", short_hex(&self.0))
    }
}
