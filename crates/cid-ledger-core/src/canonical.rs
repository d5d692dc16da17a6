//! Canonical CBOR encoding for application calls.
//!
//! A call is encoded as a CBOR map with small integer keys written in
//! ascending order, minimal-length integers and definite lengths only, so
//! the same call always produces the same bytes. The sender signs
//! `"TX" || canonical_call_bytes`, and the transaction id is the Blake3 hash
//! of that message.
//!
//! A signed call is stored as `canonical_call_bytes || signature`.

use bytes::Bytes;
use ciborium::value::Value;
use std::io::Cursor;

use crate::call::{AppCall, OnCompletion, SignedAppCall};
use crate::crypto::Ed25519Signature;
use crate::error::CoreError;
use crate::state::StateSchema;
use crate::types::{Address, AppId};

/// Domain prefix for signed messages.
pub const TX_DOMAIN: &[u8] = b"TX";

/// Call field keys. Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const SENDER: u64 = 0;
    pub const APP_ID: u64 = 1;
    pub const ON_COMPLETION: u64 = 2;
    pub const ARGS: u64 = 3;
    pub const FIRST_VALID: u64 = 4;
    pub const LAST_VALID: u64 = 5;
    pub const GLOBAL_SCHEMA: u64 = 6;
    pub const LOCAL_SCHEMA: u64 = 7;
    pub const APPROVAL_PROGRAM: u64 = 8;
    pub const CLEAR_PROGRAM: u64 = 9;
    pub const NOTE: u64 = 10;
}

/// Encode a call to canonical CBOR bytes.
pub fn canonical_call_bytes(call: &AppCall) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::into_writer(&call_to_cbor_value(call), &mut buf)
        .expect("writing CBOR into a Vec cannot fail");
    buf
}

/// The message a sender signs: `"TX" || canonical_call_bytes`.
pub fn signed_message(call: &AppCall) -> Vec<u8> {
    let mut buf = TX_DOMAIN.to_vec();
    buf.extend_from_slice(&canonical_call_bytes(call));
    buf
}

/// Encode a signed call: `canonical_call_bytes || signature`.
pub fn canonical_signed_bytes(signed: &SignedAppCall) -> Vec<u8> {
    let mut buf = canonical_call_bytes(&signed.call);
    buf.extend_from_slice(&signed.signature.0);
    buf
}

/// Decode a signed call produced by [`canonical_signed_bytes`].
pub fn decode_signed_call(bytes: &[u8]) -> Result<SignedAppCall, CoreError> {
    let mut cursor = Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(&mut cursor).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let call = cbor_value_to_call(&value)?;

    let rest = &bytes[cursor.position() as usize..];
    let signature: [u8; 64] = rest
        .try_into()
        .map_err(|_| CoreError::MalformedCall(format!("signature is {} bytes", rest.len())))?;

    Ok(SignedAppCall {
        call,
        signature: Ed25519Signature(signature),
    })
}

fn key(k: u64) -> Value {
    Value::Integer(k.into())
}

fn schema_value(schema: &StateSchema) -> Value {
    Value::Array(vec![
        Value::Integer(schema.num_uints.into()),
        Value::Integer(schema.num_byte_slices.into()),
    ])
}

/// Convert a call to a CBOR map, entries in key order.
fn call_to_cbor_value(call: &AppCall) -> Value {
    let args = call.args.iter().map(|a| Value::Bytes(a.to_vec())).collect();

    Value::Map(vec![
        (key(keys::SENDER), Value::Bytes(call.sender.0.to_vec())),
        (key(keys::APP_ID), Value::Integer(call.app_id.0.into())),
        (
            key(keys::ON_COMPLETION),
            Value::Integer(call.on_completion.to_u8().into()),
        ),
        (key(keys::ARGS), Value::Array(args)),
        (key(keys::FIRST_VALID), Value::Integer(call.first_valid.into())),
        (key(keys::LAST_VALID), Value::Integer(call.last_valid.into())),
        (key(keys::GLOBAL_SCHEMA), schema_value(&call.global_schema)),
        (key(keys::LOCAL_SCHEMA), schema_value(&call.local_schema)),
        (
            key(keys::APPROVAL_PROGRAM),
            Value::Bytes(call.approval_program.to_vec()),
        ),
        (
            key(keys::CLEAR_PROGRAM),
            Value::Bytes(call.clear_program.to_vec()),
        ),
        (key(keys::NOTE), Value::Bytes(call.note.to_vec())),
    ])
}

/// Convert a CBOR map back to a call.
fn cbor_value_to_call(value: &Value) -> Result<AppCall, CoreError> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedCall("expected map".into())),
    };

    let get = |k: u64, field: &str| -> Result<&Value, CoreError> {
        map.iter()
            .find(|(mk, _)| matches!(mk, Value::Integer(i) if u64::try_from(*i).ok() == Some(k)))
            .map(|(_, v)| v)
            .ok_or_else(|| CoreError::MalformedCall(format!("missing {}", field)))
    };

    let sender: [u8; 32] = as_bytes(get(keys::SENDER, "sender")?, "sender")?
        .try_into()
        .map_err(|_| CoreError::MalformedCall("invalid sender".into()))?;

    let code = as_u64(get(keys::ON_COMPLETION, "on_completion")?, "on_completion")?;
    let on_completion = u8::try_from(code)
        .ok()
        .and_then(OnCompletion::from_u8)
        .ok_or_else(|| CoreError::MalformedCall(format!("unknown on_completion {}", code)))?;

    let args = match get(keys::ARGS, "args")? {
        Value::Array(items) => items
            .iter()
            .map(|item| as_bytes(item, "arg").map(Bytes::from))
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(CoreError::MalformedCall("args must be an array".into())),
    };

    Ok(AppCall {
        sender: Address(sender),
        app_id: AppId(as_u64(get(keys::APP_ID, "app_id")?, "app_id")?),
        on_completion,
        args,
        first_valid: as_u64(get(keys::FIRST_VALID, "first_valid")?, "first_valid")?,
        last_valid: as_u64(get(keys::LAST_VALID, "last_valid")?, "last_valid")?,
        global_schema: as_schema(get(keys::GLOBAL_SCHEMA, "global_schema")?)?,
        local_schema: as_schema(get(keys::LOCAL_SCHEMA, "local_schema")?)?,
        approval_program: as_bytes(get(keys::APPROVAL_PROGRAM, "approval_program")?, "approval_program")?
            .into(),
        clear_program: as_bytes(get(keys::CLEAR_PROGRAM, "clear_program")?, "clear_program")?
            .into(),
        note: as_bytes(get(keys::NOTE, "note")?, "note")?.into(),
    })
}

fn as_u64(value: &Value, field: &str) -> Result<u64, CoreError> {
    match value {
        Value::Integer(i) => u64::try_from(*i)
            .map_err(|_| CoreError::MalformedCall(format!("{} out of range", field))),
        _ => Err(CoreError::MalformedCall(format!("{} must be an integer", field))),
    }
}

fn as_bytes(value: &Value, field: &str) -> Result<Vec<u8>, CoreError> {
    match value {
        Value::Bytes(b) => Ok(b.clone()),
        _ => Err(CoreError::MalformedCall(format!("{} must be bytes", field))),
    }
}

fn as_schema(value: &Value) -> Result<StateSchema, CoreError> {
    match value {
        Value::Array(items) if items.len() == 2 => Ok(StateSchema::new(
            as_u64(&items[0], "num_uints")?,
            as_u64(&items[1], "num_byte_slices")?,
        )),
        _ => Err(CoreError::MalformedCall("schema must be a pair".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::AppCallBuilder;
    use crate::crypto::Keypair;

    fn sample_call() -> AppCall {
        AppCallBuilder::no_op(Address::from_bytes([0x42; 32]), AppId(7))
            .arg(&b"upload_file"[..])
            .arg(&b"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"[..])
            .validity(10, 1010)
            .build()
    }

    #[test]
    fn test_encoding_is_deterministic() {
        assert_eq!(
            canonical_call_bytes(&sample_call()),
            canonical_call_bytes(&sample_call())
        );
    }

    #[test]
    fn test_encoding_starts_with_map_header() {
        let bytes = canonical_call_bytes(&sample_call());
        // Major type 5 (map) with 11 entries.
        assert_eq!(bytes[0], 0xa0 | 11);
        // First key is 0 (sender), followed by a 32-byte byte string.
        assert_eq!(bytes[1], 0x00);
        assert_eq!(bytes[2], 0x58);
        assert_eq!(bytes[3], 32);
    }

    #[test]
    fn test_signed_message_has_domain_prefix() {
        let message = signed_message(&sample_call());
        assert!(message.starts_with(TX_DOMAIN));
    }

    #[test]
    fn test_signed_call_survives_storage_encoding() {
        let keypair = Keypair::from_seed(&[0x07; 32]);
        let signed = AppCallBuilder::create(keypair.address())
            .schemas(StateSchema::new(2, 4), StateSchema::new(1, 2))
            .programs(&b"approval"[..], &b"clear"[..])
            .sign(&keypair);

        let decoded = decode_signed_call(&canonical_signed_bytes(&signed)).unwrap();
        assert_eq!(decoded, signed);
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn test_decode_rejects_truncated_signature() {
        let keypair = Keypair::from_seed(&[0x07; 32]);
        let signed = AppCallBuilder::opt_in(keypair.address(), AppId(1)).sign(&keypair);
        let mut bytes = canonical_signed_bytes(&signed);
        bytes.truncate(bytes.len() - 1);

        assert!(matches!(
            decode_signed_call(&bytes),
            Err(CoreError::MalformedCall(_))
        ));
    }
}
