use crate::error::{AppError, AppResult};
use crate::ledger::address::validate_classic_address;
use crate::ledger::Keypair;
use crate::models::Profile;
use std::fmt;

/// Ledger wallet: a buyer's signing wallet or a product's receiving account.
///
/// Construction guarantees a well-formed classic address. When a seed is
/// present the keypair is derived from it and every stored key field must
/// agree with the derivation.
#[derive(Clone)]
pub struct Wallet {
    classic_address: String,
    keypair: Option<Keypair>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Wallet {
    pub fn new(
        classic_address: Option<String>,
        public_key: Option<String>,
        private_key: Option<String>,
        seed: Option<String>,
    ) -> AppResult<Self> {
        let classic_address = non_empty(classic_address)
            .ok_or_else(|| AppError::InvalidWallet("wallet has no classic address".to_string()))?;

        validate_classic_address(&classic_address).map_err(AppError::InvalidWallet)?;

        let keypair = match non_empty(seed) {
            Some(seed) => {
                let keypair = Keypair::from_seed(&seed).map_err(|e| {
                    AppError::InvalidWallet(format!("wallet {}: {}", classic_address, e))
                })?;
                check_derived(&classic_address, &keypair, non_empty(public_key), non_empty(private_key))?;
                Some(keypair)
            }
            None => None,
        };

        Ok(Self {
            classic_address,
            keypair,
        })
    }

    /// Build the user wallet from stored profile data
    pub fn from_profile(profile: &Profile) -> AppResult<Self> {
        Self::new(
            profile.classic_address.clone(),
            profile.public_key.clone(),
            profile.private_key.clone(),
            profile.seed.clone(),
        )
    }

    /// Address-only wallet, e.g. a product's receiving account
    pub fn watch_only(classic_address: &str) -> AppResult<Self> {
        Self::new(Some(classic_address.to_string()), None, None, None)
    }

    pub fn classic_address(&self) -> &str {
        &self.classic_address
    }

    /// Keypair for local signing
    pub fn signer(&self) -> AppResult<&Keypair> {
        self.keypair.as_ref().ok_or_else(|| {
            AppError::InvalidWallet(format!("wallet {} has no seed", self.classic_address))
        })
    }
}

/// Stored address and keys must be the ones the seed derives
fn check_derived(
    classic_address: &str,
    keypair: &Keypair,
    public_key: Option<String>,
    private_key: Option<String>,
) -> AppResult<()> {
    let derived = keypair.classic_address();
    if derived != classic_address {
        return Err(AppError::InvalidWallet(format!(
            "seed derives {}, not the stored address {}",
            derived, classic_address
        )));
    }

    if let Some(public_key) = public_key {
        if !public_key.eq_ignore_ascii_case(&keypair.public_key_hex()) {
            return Err(AppError::InvalidWallet(format!(
                "stored public key does not match the seed of {}",
                classic_address
            )));
        }
    }

    if let Some(private_key) = private_key {
        if !private_key.eq_ignore_ascii_case(&keypair.private_key_hex()) {
            return Err(AppError::InvalidWallet(format!(
                "stored private key does not match the seed of {}",
                classic_address
            )));
        }
    }

    Ok(())
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("classic_address", &self.classic_address)
            .field("keypair", &self.keypair)
            .finish()
    }
}
