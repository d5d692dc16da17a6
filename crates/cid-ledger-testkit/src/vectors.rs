//! Call vectors for deterministic verification.
//!
//! Each vector fixes every input of a signed call, so the canonical bytes,
//! signature and transaction id must come out identical on every run and
//! on every platform.

use bytes::Bytes;
use cid_ledger_core::{
    canonical_call_bytes, teal, AppCallBuilder, AppId, Keypair, OnCompletion, SignedAppCall,
    GLOBAL_SCHEMA, LOCAL_SCHEMA,
};

/// A call vector.
#[derive(Debug, Clone)]
pub struct CallVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    pub app_id: u64,
    pub on_completion: OnCompletion,
    pub args: &'static [&'static [u8]],
    pub first_valid: u64,
    pub last_valid: u64,
    pub note: &'static [u8],
    /// Expected transaction id (hex), once pinned.
    pub expected_tx_id: Option<&'static str>,
}

/// Get all call vectors.
pub fn all_vectors() -> Vec<CallVector> {
    vec![
        CallVector {
            name: "create",
            seed: [0x42; 32],
            app_id: 0,
            on_completion: OnCompletion::NoOp,
            args: &[],
            first_valid: 1,
            last_valid: 1001,
            note: b"",
            expected_tx_id: None,
        },
        CallVector {
            name: "opt in",
            seed: [0x42; 32],
            app_id: 1,
            on_completion: OnCompletion::OptIn,
            args: &[],
            first_valid: 2,
            last_valid: 1002,
            note: b"",
            expected_tx_id: None,
        },
        CallVector {
            name: "upload 46-byte CID",
            seed: [0x42; 32],
            app_id: 1,
            on_completion: OnCompletion::NoOp,
            args: &[b"upload_file", b"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"],
            first_valid: 3,
            last_valid: 1003,
            note: b"",
            expected_tx_id: None,
        },
        CallVector {
            name: "clear state with note",
            seed: [0x00; 32],
            app_id: 1,
            on_completion: OnCompletion::ClearState,
            args: &[],
            first_valid: 10,
            last_valid: 10,
            note: b"bye",
            expected_tx_id: None,
        },
    ]
}

/// Build and sign the call a vector describes.
///
/// Creation vectors carry the application's programs and schemas.
pub fn generate_call_from_vector(vector: &CallVector) -> SignedAppCall {
    let keypair = Keypair::from_seed(&vector.seed);

    let mut builder = AppCallBuilder::new(
        keypair.address(),
        AppId(vector.app_id),
        vector.on_completion,
    )
    .args(vector.args.iter().copied().map(Bytes::from_static))
    .validity(vector.first_valid, vector.last_valid)
    .note(Bytes::from_static(vector.note));

    if vector.app_id == 0 {
        builder = builder
            .schemas(GLOBAL_SCHEMA, LOCAL_SCHEMA)
            .programs(teal::approval_source(), teal::clear_state_source());
    }

    builder.sign(&keypair)
}

/// Check every vector against its pinned id.
///
/// Returns `(name, matches, tx_id_hex)`; vectors without a pinned id always
/// match.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let hex = generate_call_from_vector(v).compute_id().to_hex();
            let matches = v.expected_tx_id.map_or(true, |expected| expected == hex);
            (v.name.to_string(), matches, hex)
        })
        .collect()
}

/// Canonical bytes of a vector's call, hex.
pub fn vector_call_hex(vector: &CallVector) -> String {
    hex::encode(canonical_call_bytes(&generate_call_from_vector(vector).call))
}
