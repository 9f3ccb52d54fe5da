//! Canonical binary encoding of the transaction fields the service submits.
//!
//! Fields are written in `(type code, field code)` order, each behind its
//! field id. Blobs and account ids carry a length prefix; XRP amounts are
//! 64-bit with the "positive, native" bits set.

use super::address::decode_classic_address;
use super::keys::sha512_half;
use super::{LedgerError, LedgerResult};
use serde_json::Value;

const TYPE_UINT16: u8 = 1;
const TYPE_UINT32: u8 = 2;
const TYPE_AMOUNT: u8 = 6;
const TYPE_BLOB: u8 = 7;
const TYPE_ACCOUNT_ID: u8 = 8;

const NATIVE_POSITIVE: u64 = 0x4000_0000_0000_0000;
const MAX_DROPS: u64 = 100_000_000_000_000_000;

/// `STX\0`, prepended to the fields covered by a single signature
const SIGNING_PREFIX: [u8; 4] = [0x53, 0x54, 0x58, 0x00];
/// `TXN\0`, prepended to a signed blob to compute its id
const TRANSACTION_ID_PREFIX: [u8; 4] = [0x54, 0x58, 0x4E, 0x00];

struct FieldDef {
    name: &'static str,
    type_code: u8,
    field_code: u8,
    signing: bool,
}

const fn field(name: &'static str, type_code: u8, field_code: u8) -> FieldDef {
    FieldDef {
        name,
        type_code,
        field_code,
        signing: true,
    }
}

const FIELDS: &[FieldDef] = &[
    field("TransactionType", TYPE_UINT16, 2),
    field("Flags", TYPE_UINT32, 2),
    field("Sequence", TYPE_UINT32, 4),
    field("OfferSequence", TYPE_UINT32, 25),
    field("LastLedgerSequence", TYPE_UINT32, 27),
    field("CancelAfter", TYPE_UINT32, 36),
    field("FinishAfter", TYPE_UINT32, 37),
    field("Amount", TYPE_AMOUNT, 1),
    field("Fee", TYPE_AMOUNT, 8),
    field("SigningPubKey", TYPE_BLOB, 3),
    FieldDef {
        name: "TxnSignature",
        type_code: TYPE_BLOB,
        field_code: 4,
        signing: false,
    },
    field("Account", TYPE_ACCOUNT_ID, 1),
    field("Owner", TYPE_ACCOUNT_ID, 2),
    field("Destination", TYPE_ACCOUNT_ID, 3),
];

const TRANSACTION_TYPES: &[(&str, u16)] = &[
    ("Payment", 0),
    ("EscrowCreate", 1),
    ("EscrowFinish", 2),
    ("EscrowCancel", 4),
];

fn encoding_error(msg: impl Into<String>) -> LedgerError {
    LedgerError::Signing(msg.into())
}

/// Serialize `tx_json`; `signing_only` leaves out `TxnSignature`
pub fn encode(tx_json: &Value, signing_only: bool) -> LedgerResult<Vec<u8>> {
    let object = tx_json
        .as_object()
        .ok_or_else(|| encoding_error("tx_json must be an object"))?;

    let mut fields = Vec::with_capacity(object.len());
    for (name, value) in object {
        let def = FIELDS
            .iter()
            .find(|def| def.name == name.as_str())
            .ok_or_else(|| encoding_error(format!("unsupported field {}", name)))?;

        if def.signing || !signing_only {
            fields.push((def, value));
        }
    }
    fields.sort_by_key(|(def, _)| (def.type_code, def.field_code));

    let mut out = Vec::new();
    for (def, value) in fields {
        write_field_id(&mut out, def.type_code, def.field_code);
        write_value(&mut out, def, value)?;
    }

    Ok(out)
}

/// Bytes a single signer signs
pub fn signing_data(tx_json: &Value) -> LedgerResult<Vec<u8>> {
    let mut data = SIGNING_PREFIX.to_vec();
    data.extend(encode(tx_json, true)?);
    Ok(data)
}

/// Transaction id (hash) of a signed blob, upper-case hex
pub fn transaction_id(blob: &[u8]) -> String {
    let mut data = TRANSACTION_ID_PREFIX.to_vec();
    data.extend_from_slice(blob);
    hex::encode_upper(sha512_half(&data))
}

fn write_field_id(out: &mut Vec<u8>, type_code: u8, field_code: u8) {
    match (type_code < 16, field_code < 16) {
        (true, true) => out.push((type_code << 4) | field_code),
        (true, false) => out.extend([type_code << 4, field_code]),
        (false, true) => out.extend([field_code, type_code]),
        (false, false) => out.extend([0, type_code, field_code]),
    }
}

fn write_length(out: &mut Vec<u8>, len: usize) -> LedgerResult<()> {
    match len {
        0..=192 => out.push(len as u8),
        193..=12_480 => {
            let len = len - 193;
            out.extend([193 + (len >> 8) as u8, (len & 0xFF) as u8]);
        }
        12_481..=918_744 => {
            let len = len - 12_481;
            out.extend([
                241 + (len >> 16) as u8,
                ((len >> 8) & 0xFF) as u8,
                (len & 0xFF) as u8,
            ]);
        }
        _ => return Err(encoding_error(format!("field of {} bytes is too long", len))),
    }
    Ok(())
}

fn write_value(out: &mut Vec<u8>, def: &FieldDef, value: &Value) -> LedgerResult<()> {
    match def.type_code {
        TYPE_UINT16 => {
            let code = match value {
                Value::String(name) => TRANSACTION_TYPES
                    .iter()
                    .find(|(known, _)| *known == name.as_str())
                    .map(|(_, code)| *code)
                    .ok_or_else(|| encoding_error(format!("unsupported transaction type {}", name)))?,
                other => other
                    .as_u64()
                    .and_then(|v| u16::try_from(v).ok())
                    .ok_or_else(|| encoding_error(format!("{} must be a UInt16", def.name)))?,
            };
            out.extend(code.to_be_bytes());
        }
        TYPE_UINT32 => {
            let v = value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| encoding_error(format!("{} must be a UInt32", def.name)))?;
            out.extend(v.to_be_bytes());
        }
        TYPE_AMOUNT => {
            // issued-currency amounts are objects and never submitted here
            let drops = value
                .as_str()
                .and_then(|raw| raw.parse::<u64>().ok())
                .filter(|drops| *drops <= MAX_DROPS)
                .ok_or_else(|| encoding_error(format!("{} must be an XRP drops string", def.name)))?;
            out.extend((NATIVE_POSITIVE | drops).to_be_bytes());
        }
        TYPE_BLOB => {
            let bytes = value
                .as_str()
                .and_then(|raw| hex::decode(raw).ok())
                .ok_or_else(|| encoding_error(format!("{} must be hex", def.name)))?;
            write_length(out, bytes.len())?;
            out.extend(bytes);
        }
        TYPE_ACCOUNT_ID => {
            let address = value
                .as_str()
                .ok_or_else(|| encoding_error(format!("{} must be an address", def.name)))?;
            let account_id = decode_classic_address(address).map_err(encoding_error)?;
            write_length(out, account_id.len())?;
            out.extend(account_id);
        }
        other => return Err(encoding_error(format!("unsupported type code {}", other))),
    }
    Ok(())
}
