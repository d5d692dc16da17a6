//! TEAL v6 source for the approval and clear-state programs.
//!
//! The Rust programs in [`crate::program`] are what the ledger executes.
//! The TEAL text is what a creation call carries as its program bytes, and
//! the ledger only creates applications whose programs match it exactly.

use crate::crypto::Blake3Hash;

const APPROVAL_TEAL: &str = r#"#pragma version 6
txn ApplicationID
int 0
==
bnz main_l8
txn OnCompletion
int OptIn
==
bnz main_l7
txn OnCompletion
int NoOp
==
bnz main_l4
err
main_l4:
txna ApplicationArgs 0
byte "upload_file"
==
bnz main_l6
err
main_l6:
txn NumAppArgs
int 2
==
assert
txna ApplicationArgs 1
len
int 46
<=
assert
byte "file_cid"
txna ApplicationArgs 1
app_global_put
txn Sender
byte "user_file_cid"
txna ApplicationArgs 1
app_local_put
int 1
return
main_l7:
txn Sender
byte "user_file_cid"
byte ""
app_local_put
int 1
return
main_l8:
byte "file_cid"
byte ""
app_global_put
int 1
return
"#;

const CLEAR_STATE_TEAL: &str = "#pragma version 6\nint 1\nreturn\n";

/// File name for the approval program.
pub const APPROVAL_FILE: &str = "approval.teal";

/// File name for the clear-state program.
pub const CLEAR_STATE_FILE: &str = "clear_state.teal";

/// Approval program source.
pub fn approval_source() -> &'static str {
    APPROVAL_TEAL
}

/// Clear-state program source.
pub fn clear_state_source() -> &'static str {
    CLEAR_STATE_TEAL
}

/// Hash of the approval program source.
pub fn approval_hash() -> Blake3Hash {
    Blake3Hash::hash(APPROVAL_TEAL.as_bytes())
}

/// Hash of the clear-state program source.
pub fn clear_hash() -> Blake3Hash {
    Blake3Hash::hash(CLEAR_STATE_TEAL.as_bytes())
}

/// Whether a creation call's program bytes are this application's programs.
pub fn is_cid_program(approval: &[u8], clear: &[u8]) -> bool {
    approval == APPROVAL_TEAL.as_bytes() && clear == CLEAR_STATE_TEAL.as_bytes()
}
