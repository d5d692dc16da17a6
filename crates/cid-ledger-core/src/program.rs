//! The CID-storing application: approval and clear-state programs.
//!
//! The approval program is a transition function over [`StateAccess`]:
//!
//! 1. A creation call initialises the global `file_cid` to empty.
//! 2. An opt-in initialises the sender's local `user_file_cid` to empty.
//! 3. A no-op call routes on its first argument. `upload_file <cid>` writes
//!    the CID to both the global and the sender's local state.
//! 4. Everything else rejects.
//!
//! A rejected call may have buffered writes before failing; the caller
//! discards them along with the overlay.

use bytes::Bytes;

use crate::call::{AppCall, OnCompletion};
use crate::error::ContractError;
use crate::overlay::StateAccess;
use crate::state::{StateSchema, StateValue};

/// Global key holding the most recently uploaded CID.
pub const FILE_CID_KEY: &[u8] = b"file_cid";

/// Local key holding the CID an account last uploaded.
pub const USER_FILE_CID_KEY: &[u8] = b"user_file_cid";

/// Longest CID accepted, in bytes.
pub const MAX_CID_LEN: usize = 46;

/// Operation name for uploads.
pub const UPLOAD_FILE: &str = "upload_file";

/// Global schema declared at deployment.
pub const GLOBAL_SCHEMA: StateSchema = StateSchema::new(2, 4);

/// Local schema declared at deployment.
pub const LOCAL_SCHEMA: StateSchema = StateSchema::new(1, 2);

/// A routed no-op call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Store `cid` globally and in the sender's local state.
    UploadFile { cid: Bytes },
}

impl Operation {
    /// Parse application args into an operation.
    pub fn parse(args: &[Bytes]) -> Result<Self, ContractError> {
        let name = args.first().ok_or(ContractError::MissingOperation)?;

        match &name[..] {
            n if n == UPLOAD_FILE.as_bytes() => {
                if args.len() != 2 {
                    return Err(ContractError::ArgumentCount {
                        operation: UPLOAD_FILE,
                        expected: 2,
                        got: args.len(),
                    });
                }

                let cid = args[1].clone();
                if cid.len() > MAX_CID_LEN {
                    return Err(ContractError::CidTooLong {
                        len: cid.len(),
                        max: MAX_CID_LEN,
                    });
                }

                Ok(Operation::UploadFile { cid })
            }
            other => Err(ContractError::UnknownOperation(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// The operation name as it appears in `args[0]`.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::UploadFile { .. } => UPLOAD_FILE,
        }
    }
}

/// Run the approval program for one call.
pub fn approval_program<S>(call: &AppCall, state: &mut S) -> Result<(), ContractError>
where
    S: StateAccess + ?Sized,
{
    if call.is_create() {
        state.global_put(FILE_CID_KEY, StateValue::empty_bytes())?;
        return Ok(());
    }

    match call.on_completion {
        OnCompletion::OptIn => {
            state.local_put(&call.sender, USER_FILE_CID_KEY, StateValue::empty_bytes())?;
            Ok(())
        }
        OnCompletion::NoOp => match Operation::parse(&call.args)? {
            Operation::UploadFile { cid } => {
                state.global_put(FILE_CID_KEY, StateValue::Bytes(cid.clone()))?;
                state.local_put(&call.sender, USER_FILE_CID_KEY, StateValue::Bytes(cid))?;
                Ok(())
            }
        },
        other => Err(ContractError::UnhandledCompletion(other)),
    }
}

/// Run the clear-state program. It always accepts and writes nothing.
pub fn clear_state_program<S>(_call: &AppCall, _state: &mut S) -> Result<(), ContractError>
where
    S: StateAccess + ?Sized,
{
    Ok(())
}
