use super::codec;
use super::keys::Keypair;
use super::{LedgerError, LedgerResult};
use serde::Serialize;
use serde_json::Value;

/// Escrow transactions submitted by the service.
///
/// Serializes to XRPL `tx_json` field names; [`Autofill`] supplies the
/// account-dependent fields before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "TransactionType")]
pub enum LedgerTransaction {
    #[serde(rename_all = "PascalCase")]
    EscrowCreate {
        account: String,
        destination: String,
        /// Drops, as a decimal string
        amount: String,
        finish_after: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        cancel_after: Option<u32>,
    },
    #[serde(rename_all = "PascalCase")]
    EscrowFinish {
        account: String,
        owner: String,
        offer_sequence: u32,
    },
    #[serde(rename_all = "PascalCase")]
    EscrowCancel {
        account: String,
        owner: String,
        offer_sequence: u32,
    },
}

/// Fields read from the ledger right before signing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autofill {
    pub sequence: u32,
    pub fee_drops: u64,
    /// Last ledger the transaction may be included in
    pub last_ledger_sequence: u32,
}

/// A locally signed transaction, ready for `submit`
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// Signed fields, including `SigningPubKey` and `TxnSignature`
    pub tx_json: Value,
    /// Upper-case hex of the canonical binary encoding
    pub tx_blob: String,
    pub hash: String,
    pub sequence: u32,
    pub last_ledger_sequence: u32,
}

impl LedgerTransaction {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerTransaction::EscrowCreate { .. } => "EscrowCreate",
            LedgerTransaction::EscrowFinish { .. } => "EscrowFinish",
            LedgerTransaction::EscrowCancel { .. } => "EscrowCancel",
        }
    }

    /// Sending account
    pub fn account(&self) -> &str {
        match self {
            LedgerTransaction::EscrowCreate { account, .. }
            | LedgerTransaction::EscrowFinish { account, .. }
            | LedgerTransaction::EscrowCancel { account, .. } => account,
        }
    }

    /// Unsigned `tx_json` with the autofilled fields
    pub fn to_tx_json(&self, autofill: &Autofill) -> LedgerResult<Value> {
        let mut tx_json = serde_json::to_value(self)
            .map_err(|e| LedgerError::Signing(format!("{} to tx_json: {}", self.kind(), e)))?;

        let map = tx_json
            .as_object_mut()
            .ok_or_else(|| LedgerError::Signing(format!("{} is not a JSON object", self.kind())))?;
        map.insert("Sequence".to_string(), Value::from(autofill.sequence));
        map.insert("Fee".to_string(), Value::from(autofill.fee_drops.to_string()));
        map.insert(
            "LastLedgerSequence".to_string(),
            Value::from(autofill.last_ledger_sequence),
        );

        Ok(tx_json)
    }

    /// Sign with `keypair`, which must belong to the sending account
    pub fn sign(&self, autofill: &Autofill, keypair: &Keypair) -> LedgerResult<SignedTransaction> {
        let signer = keypair.classic_address();
        if signer != self.account() {
            return Err(LedgerError::Signing(format!(
                "{} from {} cannot be signed by {}",
                self.kind(),
                self.account(),
                signer
            )));
        }

        let mut tx_json = self.to_tx_json(autofill)?;
        tx_json["SigningPubKey"] = Value::from(keypair.public_key_hex());

        let signature = keypair.sign(&codec::signing_data(&tx_json)?)?;
        tx_json["TxnSignature"] = Value::from(hex::encode_upper(signature));

        let blob = codec::encode(&tx_json, false)?;

        Ok(SignedTransaction {
            hash: codec::transaction_id(&blob),
            tx_blob: hex::encode_upper(blob),
            tx_json,
            sequence: autofill.sequence,
            last_ledger_sequence: autofill.last_ledger_sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ED25519_SEED: &str = "sEdSJHdnVumf99WfaHTnU8DaQkx5Q4n";
    const ACCOUNT: &str = "rGMTQpyhaDwWTqmw4dcYHj5NPJhtWNhtRW";
    const SELLER: &str = "rFmuWZgVh8JVH25oTf9wBVXxUGYLFUCi5";

    const AUTOFILL: Autofill = Autofill {
        sequence: 42,
        fee_drops: 12,
        last_ledger_sequence: 1025,
    };

    fn escrow_create() -> LedgerTransaction {
        LedgerTransaction::EscrowCreate {
            account: ACCOUNT.into(),
            destination: SELLER.into(),
            amount: "2500000".into(),
            finish_after: 800_000_100,
            cancel_after: Some(800_086_500),
        }
    }

    #[test]
    fn test_escrow_create_tx_json() {
        let tx = LedgerTransaction::EscrowCreate {
            account: ACCOUNT.into(),
            destination: SELLER.into(),
            amount: "2500000".into(),
            finish_after: 800_000_100,
            cancel_after: None,
        };

        assert_eq!(
            tx.to_tx_json(&AUTOFILL).unwrap(),
            json!({
                "TransactionType": "EscrowCreate",
                "Account": ACCOUNT,
                "Destination": SELLER,
                "Amount": "2500000",
                "FinishAfter": 800_000_100u32,
                "Sequence": 42,
                "Fee": "12",
                "LastLedgerSequence": 1025
            })
        );
    }

    #[test]
    fn test_escrow_cancel_tx_json() {
        let tx = LedgerTransaction::EscrowCancel {
            account: ACCOUNT.into(),
            owner: ACCOUNT.into(),
            offer_sequence: 7,
        };

        let tx_json = tx.to_tx_json(&AUTOFILL).unwrap();
        assert_eq!(tx_json["TransactionType"], "EscrowCancel");
        assert_eq!(tx_json["OfferSequence"], 7);
        assert_eq!(tx_json["Owner"], ACCOUNT);
        assert_eq!(tx.kind(), "EscrowCancel");
    }

    #[test]
    fn test_sign_escrow_create_with_ed25519_seed() {
        let keypair = Keypair::from_seed(ED25519_SEED).unwrap();

        let signed = escrow_create().sign(&AUTOFILL, &keypair).unwrap();

        assert_eq!(
            signed.tx_blob,
            "120001240000002A201B0000040120242FB059E420252FAF08646140000000002625A068400000000000000C7321ED951BF8B3B7C8AA4BC1B91790FC1B3FF7155CD729C2E6F038A93F5F3B9035DD8574403F3766A4BA8A02DDD0B01C49A7BA954AB6DD0EA47317ECC38FEB7C51A23B37840EA76D2492CF6C3915AD35042904757639A2A1F10A979EA6008A135C79C2FE0F8114A8683DC013F856ACCDD629E0730E9FBB707D0D1B83140909090909090909090909090909090909090909"
        );
        assert_eq!(
            signed.hash,
            "81A4E2CA7DF8698D25C78117C09F9803ECEE01DC83E36D6FC6EC160F2CE1A991"
        );
        assert_eq!(signed.sequence, 42);
        assert_eq!(signed.tx_json["SigningPubKey"], keypair.public_key_hex());
        assert!(!signed.tx_blob.contains(&keypair.private_key_hex()[2..]));
    }

    #[test]
    fn test_sign_escrow_finish_with_secp256k1_seed() {
        let keypair = Keypair::from_seed("snoPBrXtMeMyMHUVTgbuqAfg1SUTb").unwrap();
        let tx = LedgerTransaction::EscrowFinish {
            account: "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".into(),
            owner: "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh".into(),
            offer_sequence: 7,
        };

        let signed = tx.sign(&AUTOFILL, &keypair).unwrap();

        // TransactionType EscrowFinish
        assert!(signed.tx_blob.starts_with("120002"));
        assert_eq!(signed.hash.len(), 64);
        let der = hex::decode(signed.tx_json["TxnSignature"].as_str().unwrap()).unwrap();
        assert!(secp256k1::ecdsa::Signature::from_der(&der).is_ok());
    }

    #[test]
    fn test_sign_rejects_foreign_keypair() {
        let keypair = Keypair::from_seed("snoPBrXtMeMyMHUVTgbuqAfg1SUTb").unwrap();

        let err = escrow_create().sign(&AUTOFILL, &keypair).unwrap_err();
        assert!(matches!(err, LedgerError::Signing(_)));
    }
}
