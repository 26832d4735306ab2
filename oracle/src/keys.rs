//! Oracle key management: Ed25519 generation, digest signing, and
//! settlement-address derivation.

use clashcast_types::{Address, KeyPair, PrivateKey, PublicKey, Signature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};

/// Generate a fresh Ed25519 keypair from the system entropy source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key = signing_key.verifying_key();
    KeyPair {
        public: PublicKey(verifying_key.to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Derive a keypair deterministically from a 32-byte seed. Tests and
/// fixed oracle identities use this.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    let verifying_key = signing_key.verifying_key();
    KeyPair {
        public: PublicKey(verifying_key.to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Sign a 32-byte typed-data digest.
pub fn sign_digest(digest: &[u8; 32], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(digest).to_bytes())
}

/// Verify a signature over a 32-byte typed-data digest.
pub fn verify_digest(digest: &[u8; 32], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(digest, &sig).is_ok()
}

/// Derive the settlement address for a public key: the last 20 bytes
/// of Keccak-256 over the raw key.
pub fn derive_address(public_key: &PublicKey) -> Address {
    let hash = Keccak256::digest(public_key.as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}
