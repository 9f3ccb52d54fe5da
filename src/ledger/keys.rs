//! Keypairs derived from XRPL family seeds.
//!
//! ed25519 keys are the first half of SHA-512 over the seed entropy.
//! secp256k1 keys follow the family generator: a root key from the entropy,
//! plus an intermediate key derived from the root public key for account 0.

use super::address::{decode_seed, encode_classic_address, encode_seed, KeyType, ACCOUNT_ID_LEN, SEED_ENTROPY_LEN};
use super::{LedgerError, LedgerResult};
use ed25519_dalek::Signer;
use rand::Rng;
use ripemd::Ripemd160;
use secp256k1::{Message, PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

const ED25519_KEY_PREFIX: u8 = 0xED;
const SECP256K1_PRIVATE_KEY_PREFIX: u8 = 0x00;
const FAMILY_ACCOUNT_INDEX: u32 = 0;

/// First 32 bytes of SHA-512, the hash XRPL uses for keys and signing
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

#[derive(Clone)]
enum SecretKeyMaterial {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(SecretKey),
}

/// Signing keypair for one ledger account
#[derive(Clone)]
pub struct Keypair {
    secret: SecretKeyMaterial,
    /// 33 bytes: `ED` + key for ed25519, compressed point for secp256k1
    public_key: Vec<u8>,
}

impl Keypair {
    pub fn from_seed(seed: &str) -> Result<Self, String> {
        let (key_type, entropy) = decode_seed(seed)?;
        Self::from_entropy(key_type, &entropy)
    }

    fn from_entropy(key_type: KeyType, entropy: &[u8; SEED_ENTROPY_LEN]) -> Result<Self, String> {
        match key_type {
            KeyType::Ed25519 => {
                let key = ed25519_dalek::SigningKey::from_bytes(&sha512_half(entropy));
                let mut public_key = vec![ED25519_KEY_PREFIX];
                public_key.extend_from_slice(key.verifying_key().as_bytes());
                Ok(Self {
                    secret: SecretKeyMaterial::Ed25519(key),
                    public_key,
                })
            }
            KeyType::Secp256k1 => {
                let secp = Secp256k1::new();
                let root = derive_secret(&[entropy.as_slice()])?;
                let root_public = PublicKey::from_secret_key(&secp, &root).serialize();
                let intermediate = derive_secret(&[&root_public, &FAMILY_ACCOUNT_INDEX.to_be_bytes()])?;

                let tweak = Scalar::from_be_bytes(intermediate.secret_bytes())
                    .map_err(|_| "intermediate key out of range".to_string())?;
                let key = root
                    .add_tweak(&tweak)
                    .map_err(|e| format!("secp256k1 key derivation failed: {}", e))?;

                Ok(Self {
                    public_key: PublicKey::from_secret_key(&secp, &key).serialize().to_vec(),
                    secret: SecretKeyMaterial::Secp256k1(key),
                })
            }
        }
    }

    /// New random ed25519 seed and the keypair it derives
    pub fn generate() -> Result<(String, Self), String> {
        let entropy: [u8; SEED_ENTROPY_LEN] = rand::thread_rng().gen();
        let keypair = Self::from_entropy(KeyType::Ed25519, &entropy)?;
        Ok((encode_seed(KeyType::Ed25519, &entropy), keypair))
    }

    fn key_type(&self) -> KeyType {
        match self.secret {
            SecretKeyMaterial::Ed25519(_) => KeyType::Ed25519,
            SecretKeyMaterial::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// Upper-case hex, as stored in profiles and `SigningPubKey`
    pub fn public_key_hex(&self) -> String {
        hex::encode_upper(&self.public_key)
    }

    /// 33-byte private key: `ED` or `00` followed by the secret scalar
    pub fn private_key_hex(&self) -> String {
        let (prefix, secret) = match &self.secret {
            SecretKeyMaterial::Ed25519(key) => (ED25519_KEY_PREFIX, key.to_bytes()),
            SecretKeyMaterial::Secp256k1(key) => (SECP256K1_PRIVATE_KEY_PREFIX, key.secret_bytes()),
        };
        format!("{:02X}{}", prefix, hex::encode_upper(secret))
    }

    /// RIPEMD-160 of SHA-256 of the public key
    fn account_id(&self) -> [u8; ACCOUNT_ID_LEN] {
        let digest = Ripemd160::digest(Sha256::digest(&self.public_key));
        let mut out = [0u8; ACCOUNT_ID_LEN];
        out.copy_from_slice(&digest);
        out
    }

    pub fn classic_address(&self) -> String {
        encode_classic_address(&self.account_id())
    }

    /// ed25519 signs the message itself; secp256k1 signs its SHA-512 half
    /// and returns a DER signature
    pub fn sign(&self, message: &[u8]) -> LedgerResult<Vec<u8>> {
        match &self.secret {
            SecretKeyMaterial::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
            SecretKeyMaterial::Secp256k1(key) => {
                let digest = Message::from_digest_slice(&sha512_half(message))
                    .map_err(|e| LedgerError::Signing(e.to_string()))?;
                let signature = Secp256k1::signing_only().sign_ecdsa(&digest, key);
                Ok(signature.serialize_der().to_vec())
            }
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("key_type", &self.key_type())
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

/// SHA-512 half of `parts || counter` for the first counter giving a valid
/// secp256k1 scalar
fn derive_secret(parts: &[&[u8]]) -> Result<SecretKey, String> {
    for counter in 0..=u32::MAX {
        let mut hasher = Sha512::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.update(counter.to_be_bytes());
        let digest = hasher.finalize();

        if let Ok(key) = SecretKey::from_slice(&digest[..32]) {
            return Ok(key);
        }
    }

    Err("no valid secp256k1 scalar for seed".to_string())
}
