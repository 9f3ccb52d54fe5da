//! XRPL base58 identifiers: classic addresses and family seeds.
//!
//! Classic addresses and family seeds are base58 strings in the ripple
//! alphabet whose last four bytes are the first four bytes of a double
//! SHA-256 over the rest of the payload.

use sha2::{Digest, Sha256};

const ACCOUNT_ID_PREFIX: u8 = 0x00;
pub const ACCOUNT_ID_LEN: usize = 20;
const SECP256K1_SEED_PREFIX: &[u8] = &[0x21];
const ED25519_SEED_PREFIX: &[u8] = &[0x01, 0xE1, 0x4B];
pub const SEED_ENTROPY_LEN: usize = 16;
const CHECKSUM_LEN: usize = 4;

/// Signing algorithm implied by a seed's prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Secp256k1,
    Ed25519,
}

impl KeyType {
    fn seed_prefix(self) -> &'static [u8] {
        match self {
            KeyType::Secp256k1 => SECP256K1_SEED_PREFIX,
            KeyType::Ed25519 => ED25519_SEED_PREFIX,
        }
    }
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&second[..CHECKSUM_LEN]);
    out
}

/// Decode a ripple-alphabet string and verify its checksum, returning the
/// payload without the checksum bytes.
fn decode_checked(encoded: &str) -> Option<Vec<u8>> {
    let bytes = bs58::decode(encoded)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
        .ok()?;

    if bytes.len() <= CHECKSUM_LEN {
        return None;
    }

    let (payload, check) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if checksum(payload) != check {
        return None;
    }

    Some(payload.to_vec())
}

fn encode_checked(payload: &[u8]) -> String {
    let mut bytes = payload.to_vec();
    bytes.extend_from_slice(&checksum(payload));
    bs58::encode(bytes)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_string()
}

/// Account id behind a classic (`r...`) address
pub fn decode_classic_address(address: &str) -> Result<[u8; ACCOUNT_ID_LEN], String> {
    if !address.starts_with('r') {
        return Err(format!("address {} must start with 'r'", address));
    }

    let payload = decode_checked(address)
        .ok_or_else(|| format!("address {} is not valid base58check", address))?;

    match payload.split_first() {
        Some((&ACCOUNT_ID_PREFIX, account_id)) if account_id.len() == ACCOUNT_ID_LEN => {
            let mut out = [0u8; ACCOUNT_ID_LEN];
            out.copy_from_slice(account_id);
            Ok(out)
        }
        _ => Err(format!("address {} has an unexpected payload", address)),
    }
}

pub fn encode_classic_address(account_id: &[u8; ACCOUNT_ID_LEN]) -> String {
    let mut payload = Vec::with_capacity(ACCOUNT_ID_LEN + 1);
    payload.push(ACCOUNT_ID_PREFIX);
    payload.extend_from_slice(account_id);
    encode_checked(&payload)
}

/// Validate a classic (`r...`) account address
pub fn validate_classic_address(address: &str) -> Result<(), String> {
    decode_classic_address(address).map(|_| ())
}

/// Key type and entropy of a family seed (`s...` or `sEd...`)
pub fn decode_seed(seed: &str) -> Result<(KeyType, [u8; SEED_ENTROPY_LEN]), String> {
    // seeds are never echoed back in messages
    let payload = decode_checked(seed).ok_or_else(|| "seed is not valid base58check".to_string())?;

    for key_type in [KeyType::Ed25519, KeyType::Secp256k1] {
        let prefix = key_type.seed_prefix();
        if payload.len() == prefix.len() + SEED_ENTROPY_LEN && payload.starts_with(prefix) {
            let mut entropy = [0u8; SEED_ENTROPY_LEN];
            entropy.copy_from_slice(&payload[prefix.len()..]);
            return Ok((key_type, entropy));
        }
    }

    Err("seed has an unexpected payload".to_string())
}

pub fn encode_seed(key_type: KeyType, entropy: &[u8; SEED_ENTROPY_LEN]) -> String {
    let mut payload = key_type.seed_prefix().to_vec();
    payload.extend_from_slice(entropy);
    encode_checked(&payload)
}
