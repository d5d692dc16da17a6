//! Versioned SQLite schema.
//!
//! `MIGRATIONS[n]` takes a database from version `n` to `n + 1`. Applied
//! versions are recorded in `schema_migrations`, and all pending steps run in
//! one SQL transaction, so a failed upgrade leaves the file untouched.

use rusqlite::{params, Connection};

use crate::error::{Result, StoreError};

/// Schema steps, oldest first.
///
/// Version 1 stores a state value as a kind tag (1 = bytes, 2 = uint) plus
/// one of two value columns. A `u64` is kept bit-for-bit in SQLite's signed
/// INTEGER.
const MIGRATIONS: &[&str] = &[V1_LEDGER];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

const V1_LEDGER: &str = r#"
        -- Deployed applications
        CREATE TABLE applications (
            app_id INTEGER PRIMARY KEY,          -- assigned at creation, never 0
            creator BLOB NOT NULL,               -- 32 bytes, Ed25519 public key
            global_num_uints INTEGER NOT NULL,
            global_num_byte_slices INTEGER NOT NULL,
            local_num_uints INTEGER NOT NULL,
            local_num_byte_slices INTEGER NOT NULL,
            approval_hash BLOB NOT NULL,         -- 32 bytes, Blake3 of program source
            clear_hash BLOB NOT NULL,            -- 32 bytes
            created_round INTEGER NOT NULL
        );

        -- Global key-value state
        CREATE TABLE global_state (
            app_id INTEGER NOT NULL REFERENCES applications(app_id),
            key BLOB NOT NULL,
            kind INTEGER NOT NULL,
            uint_value INTEGER,
            bytes_value BLOB,
            PRIMARY KEY (app_id, key)
        );

        -- One row per opted-in (application, account)
        CREATE TABLE opt_ins (
            app_id INTEGER NOT NULL REFERENCES applications(app_id),
            account BLOB NOT NULL,
            opted_in_round INTEGER NOT NULL,
            PRIMARY KEY (app_id, account)
        );

        -- Local key-value state
        CREATE TABLE local_state (
            app_id INTEGER NOT NULL,
            account BLOB NOT NULL,
            key BLOB NOT NULL,
            kind INTEGER NOT NULL,
            uint_value INTEGER,
            bytes_value BLOB,
            PRIMARY KEY (app_id, account, key)
        );

        -- Every evaluated call, confirmed or rejected
        CREATE TABLE transactions (
            tx_id BLOB PRIMARY KEY,              -- 32 bytes, Blake3 of signed message
            round INTEGER NOT NULL,
            sender BLOB NOT NULL,
            signed_bytes BLOB NOT NULL,          -- canonical call || signature
            confirmed INTEGER NOT NULL,          -- 1 = confirmed, 0 = rejected
            outcome BLOB NOT NULL                -- CBOR TxOutcome
        );

        -- Produced rounds
        CREATE TABLE rounds (
            round INTEGER PRIMARY KEY,
            tx_count INTEGER NOT NULL,
            produced_at INTEGER NOT NULL
        );

        -- Indexes for common queries
        CREATE INDEX idx_applications_creator ON applications(creator);
        CREATE INDEX idx_opt_ins_account ON opt_ins(account);
        CREATE INDEX idx_transactions_round ON transactions(round);
        CREATE INDEX idx_transactions_sender ON transactions(sender);
        "#;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
///
/// A database written by a newer build is refused rather than guessed at.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let found: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if found > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{} is newer than this build (v{})",
            found, CURRENT_VERSION
        )));
    }

    let pending = &MIGRATIONS[found as usize..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (step, sql) in (found + 1..).zip(pending) {
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![step, now_millis()],
        )?;
    }
    tx.commit()?;

    Ok(())
}

/// Milliseconds since the Unix epoch; 0 if the clock reads earlier.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
