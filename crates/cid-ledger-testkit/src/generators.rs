//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use cid_ledger_core::{
    Address, AppCall, AppCallBuilder, AppId, Keypair, OnCompletion, StateValue, MAX_CID_LEN,
    UPLOAD_FILE,
};

/// Base58 alphabet used by CIDv0 strings.
const BASE58: &str = "[1-9A-HJ-NP-Za-km-z]";

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(Address::from_bytes)
}

/// A CID-shaped string the application accepts: `Qm` and up to 44 more
/// characters.
pub fn cid() -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!("Qm{}{{0,{}}}", BASE58, MAX_CID_LEN - 2))
        .expect("valid regex")
}

/// A CID-shaped string one to 64 bytes too long.
pub fn oversized_cid() -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!(
        "Qm{}{{{},{}}}",
        BASE58,
        MAX_CID_LEN - 1,
        MAX_CID_LEN + 62
    ))
    .expect("valid regex")
}

/// Raw CID bytes of any content, within the length limit.
pub fn cid_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=MAX_CID_LEN)
}

/// Generate a state value.
pub fn state_value() -> impl Strategy<Value = StateValue> {
    prop_oneof![
        any::<u64>().prop_map(StateValue::Uint),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(|v| StateValue::Bytes(Bytes::from(v))),
    ]
}

/// Completions other than no-op and opt-in.
pub fn unhandled_completion() -> impl Strategy<Value = OnCompletion> {
    prop_oneof![
        Just(OnCompletion::CloseOut),
        Just(OnCompletion::UpdateApplication),
        Just(OnCompletion::DeleteApplication),
    ]
}

/// Parameters for generating an upload call.
#[derive(Debug, Clone)]
pub struct UploadParams {
    pub keypair: Keypair,
    pub app_id: AppId,
    pub cid: String,
    pub first_valid: u64,
    pub note: Vec<u8>,
}

impl Arbitrary for UploadParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(), // seed
            1u64..=1000u64,    // app id
            cid(),
            1u64..=1_000_000u64, // first valid
            prop::collection::vec(any::<u8>(), 0..32),
        )
            .prop_map(|(seed, app_id, cid, first_valid, note)| UploadParams {
                keypair: Keypair::from_seed(&seed),
                app_id: AppId(app_id),
                cid,
                first_valid,
                note,
            })
            .boxed()
    }
}

/// Build an unsigned upload call from parameters.
pub fn upload_from_params(params: &UploadParams) -> AppCall {
    AppCallBuilder::no_op(params.keypair.address(), params.app_id)
        .arg(Bytes::from_static(UPLOAD_FILE.as_bytes()))
        .arg(Bytes::from(params.cid.clone().into_bytes()))
        .validity(params.first_valid, params.first_valid + 1000)
        .note(params.note.clone())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid_ledger_core::{canonical_call_bytes, validate_call};

    proptest! {
        #[test]
        fn test_tx_id_deterministic(params: UploadParams) {
            let c1 = upload_from_params(&params);
            let c2 = upload_from_params(&params);

            prop_assert_eq!(canonical_call_bytes(&c1), canonical_call_bytes(&c2));
            prop_assert_eq!(c1.compute_id(), c2.compute_id());
        }

        #[test]
        fn test_signed_upload_validates(params: UploadParams) {
            let signed = upload_from_params(&params).sign(&params.keypair);
            prop_assert!(validate_call(&signed).is_ok());
        }

        #[test]
        fn test_tx_id_unique_with_different_cid(
            params in any::<UploadParams>(),
            other in cid(),
        ) {
            prop_assume!(params.cid != other);

            let c1 = upload_from_params(&params);
            let c2 = upload_from_params(&UploadParams { cid: other, ..params.clone() });

            prop_assert_ne!(c1.compute_id(), c2.compute_id());
        }

        #[test]
        fn test_cid_lengths(ok in cid(), too_long in oversized_cid()) {
            prop_assert!(ok.len() >= 2 && ok.len() <= MAX_CID_LEN);
            prop_assert!(too_long.len() > MAX_CID_LEN);
        }
    }
}
