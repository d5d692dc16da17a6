//! Call validation: signature verification and structural checks.
//!
//! These checks run before a call enters the pending pool. They do not look
//! at ledger state; whether the application exists or the sender has opted
//! in is decided during evaluation.

use crate::call::{AppCall, OnCompletion, SignedAppCall, MAX_APP_ARGS, MAX_APP_ARGS_LEN};
use crate::error::ValidationError;
use crate::state::{Scope, MAX_GLOBAL_ENTRIES, MAX_LOCAL_ENTRIES};

/// Validate a signed call.
///
/// This performs:
/// - Structural checks (see [`validate_call_structure`])
/// - Signature verification against the sender's key
pub fn validate_call(signed: &SignedAppCall) -> Result<(), ValidationError> {
    validate_call_structure(&signed.call)?;
    signed.verify()?;
    Ok(())
}

/// Validate call structure without signature verification.
pub fn validate_call_structure(call: &AppCall) -> Result<(), ValidationError> {
    // 1. Argument count
    if call.args.len() > MAX_APP_ARGS {
        return Err(ValidationError::TooManyArgs {
            count: call.args.len(),
            max: MAX_APP_ARGS,
        });
    }

    // 2. Argument bytes
    let len: usize = call.args.iter().map(|a| a.len()).sum();
    if len > MAX_APP_ARGS_LEN {
        return Err(ValidationError::ArgsTooLong {
            len,
            max: MAX_APP_ARGS_LEN,
        });
    }

    // 3. Validity window must not be inverted
    if call.first_valid > call.last_valid {
        return Err(ValidationError::InvalidValidityWindow {
            first: call.first_valid,
            last: call.last_valid,
        });
    }

    if call.is_create() {
        // 4. Creation cannot clear state
        if call.on_completion == OnCompletion::ClearState {
            return Err(ValidationError::ClearStateOnCreate);
        }

        // 5. Declared schemas within platform maximums
        if call.global_schema.total() > MAX_GLOBAL_ENTRIES {
            return Err(ValidationError::SchemaTooLarge {
                scope: Scope::Global,
                total: call.global_schema.total(),
                max: MAX_GLOBAL_ENTRIES,
            });
        }
        if call.local_schema.total() > MAX_LOCAL_ENTRIES {
            return Err(ValidationError::SchemaTooLarge {
                scope: Scope::Local,
                total: call.local_schema.total(),
                max: MAX_LOCAL_ENTRIES,
            });
        }
    } else {
        // 6. Creation-only fields stay empty afterwards
        if !call.global_schema.is_empty()
            || !call.local_schema.is_empty()
            || !call.approval_program.is_empty()
            || !call.clear_program.is_empty()
        {
            return Err(ValidationError::CreationFieldsOnExistingApp);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::AppCallBuilder;
    use crate::crypto::{Ed25519Signature, Keypair};
    use crate::state::StateSchema;
    use crate::types::AppId;

    fn make_test_keypair() -> Keypair {
        Keypair::from_seed(&[0x42; 32])
    }

    #[test]
    fn test_valid_upload_call() {
        let keypair = make_test_keypair();
        let signed = AppCallBuilder::no_op(keypair.address(), AppId(1))
            .arg(&b"upload_file"[..])
            .arg(&b"QmTest"[..])
            .sign(&keypair);

        assert!(validate_call(&signed).is_ok());
    }

    #[test]
    fn test_invalid_signature() {
        let keypair = make_test_keypair();
        let mut signed = AppCallBuilder::opt_in(keypair.address(), AppId(1)).sign(&keypair);
        signed.signature = Ed25519Signature::from_bytes([0xff; 64]);

        assert_eq!(validate_call(&signed), Err(ValidationError::SignatureFailed));
    }

    #[test]
    fn test_too_many_args() {
        let keypair = make_test_keypair();
        let call = AppCallBuilder::no_op(keypair.address(), AppId(1))
            .args((0..17).map(|i| vec![i as u8]))
            .build();

        assert_eq!(
            validate_call_structure(&call),
            Err(ValidationError::TooManyArgs { count: 17, max: 16 })
        );
    }

    #[test]
    fn test_args_too_long() {
        let keypair = make_test_keypair();
        let call = AppCallBuilder::no_op(keypair.address(), AppId(1))
            .arg(vec![0u8; 1500])
            .arg(vec![0u8; 1500])
            .build();

        assert!(matches!(
            validate_call_structure(&call),
            Err(ValidationError::ArgsTooLong { len: 3000, .. })
        ));
    }

    #[test]
    fn test_inverted_window() {
        let keypair = make_test_keypair();
        let call = AppCallBuilder::opt_in(keypair.address(), AppId(1))
            .validity(20, 10)
            .build();

        assert!(matches!(
            validate_call_structure(&call),
            Err(ValidationError::InvalidValidityWindow { first: 20, last: 10 })
        ));
    }

    #[test]
    fn test_clear_state_on_create() {
        let keypair = make_test_keypair();
        let call = AppCallBuilder::clear_state(keypair.address(), AppId::CREATE).build();

        assert_eq!(
            validate_call_structure(&call),
            Err(ValidationError::ClearStateOnCreate)
        );
    }

    #[test]
    fn test_oversized_schema() {
        let keypair = make_test_keypair();
        let call = AppCallBuilder::create(keypair.address())
            .schemas(StateSchema::new(2, 4), StateSchema::new(10, 10))
            .build();

        assert!(matches!(
            validate_call_structure(&call),
            Err(ValidationError::SchemaTooLarge {
                scope: Scope::Local,
                total: 20,
                max: 16
            })
        ));
    }

    #[test]
    fn test_schema_on_existing_app() {
        let keypair = make_test_keypair();
        let call = AppCallBuilder::no_op(keypair.address(), AppId(3))
            .schemas(StateSchema::new(1, 0), StateSchema::default())
            .build();

        assert_eq!(
            validate_call_structure(&call),
            Err(ValidationError::CreationFieldsOnExistingApp)
        );
    }
}
