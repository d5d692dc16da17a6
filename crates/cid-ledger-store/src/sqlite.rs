//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for the CID ledger. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.
//! Each [`WriteBatch`] is applied inside one SQLite transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Params};
use tracing::debug;

use cid_ledger_core::{
    canonical_signed_bytes, decode_signed_call, Address, AppId, Application, Blake3Hash,
    StateMap, StateSchema, StateValue, TransactionRecord, TxId, TxOutcome, ValueKind,
};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{Store, WriteBatch};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file (and its parent directory) and runs migrations if
    /// it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking thread pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("connection mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Split a value into its `(kind, uint_value, bytes_value)` columns.
fn value_columns(value: &StateValue) -> (u8, Option<i64>, Option<&[u8]>) {
    match value {
        StateValue::Uint(n) => (ValueKind::Uint.to_u8(), Some(*n as i64), None),
        StateValue::Bytes(b) => (ValueKind::Bytes.to_u8(), None, Some(b.as_ref())),
    }
}

/// Rebuild a value from its columns.
fn value_from_columns(kind: u8, uint: Option<i64>, bytes: Option<Vec<u8>>) -> Result<StateValue> {
    match (ValueKind::from_u8(kind), uint, bytes) {
        (Some(ValueKind::Uint), Some(n), _) => Ok(StateValue::Uint(n as u64)),
        (Some(ValueKind::Bytes), _, Some(b)) => Ok(StateValue::bytes(b)),
        _ => Err(StoreError::InvalidData(format!(
            "state value of kind {} has no matching column",
            kind
        ))),
    }
}

/// Convert a fixed-length blob column.
fn blob32(bytes: Vec<u8>, column: &str) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| StoreError::InvalidData(format!("{} is {} bytes", column, b.len())))
}

/// Load `(key, kind, uint_value, bytes_value)` rows into a map.
fn load_state<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<StateMap> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok((
            row.get::<_, Vec<u8>>(0)?,
            row.get::<_, u8>(1)?,
            row.get::<_, Option<i64>>(2)?,
            row.get::<_, Option<Vec<u8>>>(3)?,
        ))
    })?;

    let mut map = StateMap::new();
    for row in rows {
        let (key, kind, uint, bytes) = row?;
        map.insert(key, value_from_columns(kind, uint, bytes)?);
    }
    Ok(map)
}

fn app_exists(conn: &Connection, app_id: AppId) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM applications WHERE app_id = ?1",
            params![app_id.0 as i64],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn is_opted_in(conn: &Connection, app_id: AppId, account: &Address) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM opt_ins WHERE app_id = ?1 AND account = ?2",
            params![app_id.0 as i64, account.0.as_slice()],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn put_global(conn: &Connection, app_id: AppId, key: &[u8], value: &StateValue) -> Result<()> {
    let (kind, uint, bytes) = value_columns(value);
    conn.execute(
        "INSERT INTO global_state (app_id, key, kind, uint_value, bytes_value)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(app_id, key) DO UPDATE SET
            kind = excluded.kind,
            uint_value = excluded.uint_value,
            bytes_value = excluded.bytes_value",
        params![app_id.0 as i64, key, kind, uint, bytes],
    )?;
    Ok(())
}

fn put_local(
    conn: &Connection,
    app_id: AppId,
    account: &Address,
    key: &[u8],
    value: &StateValue,
) -> Result<()> {
    let (kind, uint, bytes) = value_columns(value);
    conn.execute(
        "INSERT INTO local_state (app_id, account, key, kind, uint_value, bytes_value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(app_id, account, key) DO UPDATE SET
            kind = excluded.kind,
            uint_value = excluded.uint_value,
            bytes_value = excluded.bytes_value",
        params![app_id.0 as i64, account.0.as_slice(), key, kind, uint, bytes],
    )?;
    Ok(())
}

/// Apply a batch inside an open transaction. Any error aborts the whole
/// batch when the caller drops the transaction.
fn apply_batch(conn: &Connection, batch: &WriteBatch) -> Result<()> {
    let record = &batch.transaction;

    // 1. Transaction must be new
    let exists = conn
        .query_row(
            "SELECT 1 FROM transactions WHERE tx_id = ?1",
            params![record.tx_id.0.as_slice()],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if exists {
        return Err(StoreError::DuplicateTransaction(record.tx_id));
    }

    // 2. Application creation
    if let Some(app) = &batch.create_app {
        if app_exists(conn, app.id)? {
            return Err(StoreError::ApplicationExists(app.id));
        }

        conn.execute(
            "INSERT INTO applications (
                app_id, creator, global_num_uints, global_num_byte_slices,
                local_num_uints, local_num_byte_slices, approval_hash, clear_hash,
                created_round
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                app.id.0 as i64,
                app.creator.0.as_slice(),
                app.global_schema.num_uints as i64,
                app.global_schema.num_byte_slices as i64,
                app.local_schema.num_uints as i64,
                app.local_schema.num_byte_slices as i64,
                app.approval_hash.0.as_slice(),
                app.clear_hash.0.as_slice(),
                app.created_round as i64,
            ],
        )?;

        for (key, value) in app.global.iter() {
            put_global(conn, app.id, key, value)?;
        }
    }

    // 3. Opt-in
    if let Some((app_id, account)) = &batch.opt_in {
        if !app_exists(conn, *app_id)? {
            return Err(StoreError::UnknownApplication(*app_id));
        }
        if is_opted_in(conn, *app_id, account)? {
            return Err(StoreError::AlreadyOptedIn {
                app_id: *app_id,
                account: *account,
            });
        }

        conn.execute(
            "INSERT INTO opt_ins (app_id, account, opted_in_round) VALUES (?1, ?2, ?3)",
            params![app_id.0 as i64, account.0.as_slice(), record.round as i64],
        )?;
    }

    // 4. Clear state
    if let Some((app_id, account)) = &batch.clear {
        let removed = conn.execute(
            "DELETE FROM opt_ins WHERE app_id = ?1 AND account = ?2",
            params![app_id.0 as i64, account.0.as_slice()],
        )?;
        if removed == 0 {
            return Err(StoreError::NotOptedIn {
                app_id: *app_id,
                account: *account,
            });
        }

        conn.execute(
            "DELETE FROM local_state WHERE app_id = ?1 AND account = ?2",
            params![app_id.0 as i64, account.0.as_slice()],
        )?;
    }

    // 5. State writes
    if let Some((app_id, delta)) = &batch.delta {
        if !app_exists(conn, *app_id)? {
            return Err(StoreError::UnknownApplication(*app_id));
        }

        for (key, value) in &delta.global {
            put_global(conn, *app_id, key, value)?;
        }

        for (account, writes) in &delta.local {
            if !is_opted_in(conn, *app_id, account)? {
                return Err(StoreError::NotOptedIn {
                    app_id: *app_id,
                    account: *account,
                });
            }
            for (key, value) in writes {
                put_local(conn, *app_id, account, key, value)?;
            }
        }
    }

    // 6. Transaction record
    let outcome = record
        .outcome
        .to_bytes()
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    conn.execute(
        "INSERT INTO transactions (tx_id, round, sender, signed_bytes, confirmed, outcome)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.tx_id.0.as_slice(),
            record.round as i64,
            record.signed.sender().0.as_slice(),
            canonical_signed_bytes(&record.signed),
            record.is_confirmed(),
            outcome,
        ],
    )?;

    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_application(&self, app_id: AppId) -> Result<Option<Application>> {
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT creator, global_num_uints, global_num_byte_slices,
                            local_num_uints, local_num_byte_slices,
                            approval_hash, clear_hash, created_round
                     FROM applications WHERE app_id = ?1",
                    params![app_id.0 as i64],
                    |row| {
                        Ok((
                            row.get::<_, Vec<u8>>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, Vec<u8>>(5)?,
                            row.get::<_, Vec<u8>>(6)?,
                            row.get::<_, i64>(7)?,
                        ))
                    },
                )
                .optional()?;

            let Some((creator, gu, gb, lu, lb, approval, clear, created_round)) = row else {
                return Ok(None);
            };

            let global = load_state(
                conn,
                "SELECT key, kind, uint_value, bytes_value FROM global_state WHERE app_id = ?1",
                params![app_id.0 as i64],
            )?;

            Ok(Some(Application {
                id: app_id,
                creator: Address(blob32(creator, "creator")?),
                global_schema: StateSchema::new(gu as u64, gb as u64),
                local_schema: StateSchema::new(lu as u64, lb as u64),
                approval_hash: Blake3Hash(blob32(approval, "approval_hash")?),
                clear_hash: Blake3Hash(blob32(clear, "clear_hash")?),
                created_round: created_round as u64,
                global,
            }))
        })
        .await
    }

    async fn list_applications(&self, creator: Option<&Address>) -> Result<Vec<AppId>> {
        let creator = creator.copied();

        self.blocking(move |conn| {
            let ids = match creator {
                Some(creator) => {
                    let mut stmt = conn.prepare(
                        "SELECT app_id FROM applications WHERE creator = ?1 ORDER BY app_id",
                    )?;
                    let rows = stmt.query_map(params![creator.0.as_slice()], |row| {
                        row.get::<_, i64>(0)
                    })?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
                None => {
                    let mut stmt = conn.prepare("SELECT app_id FROM applications ORDER BY app_id")?;
                    let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
            };

            Ok(ids.into_iter().map(|id| AppId(id as u64)).collect())
        })
        .await
    }

    async fn last_app_id(&self) -> Result<AppId> {
        self.blocking(|conn| {
            let id: i64 = conn.query_row(
                "SELECT COALESCE(MAX(app_id), 0) FROM applications",
                [],
                |row| row.get(0),
            )?;
            Ok(AppId(id as u64))
        })
        .await
    }

    async fn get_local_state(&self, app_id: AppId, account: &Address) -> Result<Option<StateMap>> {
        let account = *account;

        self.blocking(move |conn| {
            if !is_opted_in(conn, app_id, &account)? {
                return Ok(None);
            }

            let local = load_state(
                conn,
                "SELECT key, kind, uint_value, bytes_value FROM local_state
                 WHERE app_id = ?1 AND account = ?2",
                params![app_id.0 as i64, account.0.as_slice()],
            )?;
            Ok(Some(local))
        })
        .await
    }

    async fn opted_in_apps(&self, account: &Address) -> Result<Vec<AppId>> {
        let account = *account;

        self.blocking(move |conn| {
            let mut stmt =
                conn.prepare("SELECT app_id FROM opt_ins WHERE account = ?1 ORDER BY app_id")?;
            let ids = stmt
                .query_map(params![account.0.as_slice()], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids.into_iter().map(|id| AppId(id as u64)).collect())
        })
        .await
    }

    async fn has_transaction(&self, tx_id: &TxId) -> Result<bool> {
        let tx_id = *tx_id;

        self.blocking(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM transactions WHERE tx_id = ?1",
                    params![tx_id.0.as_slice()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
        .await
    }

    async fn get_transaction(&self, tx_id: &TxId) -> Result<Option<TransactionRecord>> {
        let tx_id = *tx_id;

        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT round, signed_bytes, outcome FROM transactions WHERE tx_id = ?1",
                    params![tx_id.0.as_slice()],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, Vec<u8>>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                        ))
                    },
                )
                .optional()?;

            let Some((round, signed, outcome)) = row else {
                return Ok(None);
            };

            let signed = decode_signed_call(&signed)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let outcome = TxOutcome::from_bytes(&outcome)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            Ok(Some(TransactionRecord {
                tx_id,
                signed,
                round: round as u64,
                outcome,
            }))
        })
        .await
    }

    async fn round_transactions(&self, round: u64) -> Result<Vec<TxId>> {
        self.blocking(move |conn| {
            let mut stmt =
                conn.prepare("SELECT tx_id FROM transactions WHERE round = ?1 ORDER BY rowid")?;
            let ids = stmt
                .query_map(params![round as i64], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            ids.into_iter()
                .map(|id| blob32(id, "tx_id").map(TxId))
                .collect()
        })
        .await
    }

    async fn commit(&self, batch: &WriteBatch) -> Result<()> {
        let batch = batch.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            apply_batch(&tx, &batch)?;
            tx.commit()?;

            debug!(
                tx_id = %batch.transaction.tx_id,
                round = batch.transaction.round,
                confirmed = batch.transaction.is_confirmed(),
                "committed batch"
            );
            Ok(())
        })
        .await
    }

    async fn latest_round(&self) -> Result<u64> {
        self.blocking(|conn| {
            let round: i64 =
                conn.query_row("SELECT COALESCE(MAX(round), 0) FROM rounds", [], |row| {
                    row.get(0)
                })?;
            Ok(round as u64)
        })
        .await
    }

    async fn record_round(&self, round: u64, tx_count: usize) -> Result<()> {
        self.blocking(move |conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM rounds WHERE round = ?1",
                    params![round as i64],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                return Err(StoreError::RoundRecorded(round));
            }

            conn.execute(
                "INSERT INTO rounds (round, tx_count, produced_at) VALUES (?1, ?2, ?3)",
                params![round as i64, tx_count as i64, now_millis()],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use cid_ledger_core::{AppCallBuilder, Keypair, RejectKind, StateDelta};

    fn record(keypair: &Keypair, note: &str, round: u64, outcome: TxOutcome) -> TransactionRecord {
        let signed = AppCallBuilder::no_op(keypair.address(), AppId(1))
            .arg(&b"upload_file"[..])
            .arg(note.as_bytes().to_vec())
            .sign(keypair);
        TransactionRecord {
            tx_id: signed.compute_id(),
            signed,
            round,
            outcome,
        }
    }

    fn application(creator: Address) -> Application {
        let mut global = StateMap::new();
        global.insert(&b"counter"[..], StateValue::Uint(u64::MAX));
        Application {
            id: AppId(1),
            creator,
            global_schema: StateSchema::new(2, 4),
            local_schema: StateSchema::new(1, 2),
            approval_hash: Blake3Hash::hash(b"approval"),
            clear_hash: Blake3Hash::hash(b"clear"),
            created_round: 1,
            global,
        }
    }

    fn upload_delta(account: Address, cid: &'static [u8]) -> StateDelta {
        let mut delta = StateDelta::default();
        delta
            .global
            .insert(Bytes::from_static(b"file_cid"), StateValue::bytes(cid));
        delta
            .local
            .entry(account)
            .or_default()
            .insert(Bytes::from_static(b"user_file_cid"), StateValue::bytes(cid));
        delta
    }

    fn confirmed() -> TxOutcome {
        TxOutcome::Confirmed {
            app_id: AppId(1),
            delta: StateDelta::default(),
        }
    }

    async fn deploy_and_opt_in(store: &SqliteStore, keypair: &Keypair) {
        let addr = keypair.address();
        store
            .commit(
                &WriteBatch::new(record(keypair, "create", 1, confirmed()))
                    .create_app(application(addr)),
            )
            .await
            .unwrap();
        store
            .commit(
                &WriteBatch::new(record(keypair, "opt-in", 1, confirmed())).opt_in(AppId(1), addr),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_application_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let keypair = Keypair::generate();
        deploy_and_opt_in(&store, &keypair).await;

        let app = store.get_application(AppId(1)).await.unwrap().unwrap();
        assert_eq!(app, application(keypair.address()));
        assert_eq!(
            app.global.get(b"counter").and_then(StateValue::as_uint),
            Some(u64::MAX)
        );
        assert_eq!(store.last_app_id().await.unwrap(), AppId(1));
        assert_eq!(
            store
                .list_applications(Some(&keypair.address()))
                .await
                .unwrap(),
            vec![AppId(1)]
        );
        assert!(store
            .list_applications(Some(&Address::from_bytes([9; 32])))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delta_writes_global_and_local() {
        let store = SqliteStore::open_memory().unwrap();
        let keypair = Keypair::generate();
        let addr = keypair.address();
        deploy_and_opt_in(&store, &keypair).await;

        let batch = WriteBatch::new(record(&keypair, "upload", 2, confirmed()))
            .delta(AppId(1), upload_delta(addr, b"QmFirst"));
        store.commit(&batch).await.unwrap();
        let batch = WriteBatch::new(record(&keypair, "again", 2, confirmed()))
            .delta(AppId(1), upload_delta(addr, b"QmSecond"));
        store.commit(&batch).await.unwrap();

        let app = store.get_application(AppId(1)).await.unwrap().unwrap();
        assert_eq!(&app.global.get_bytes(b"file_cid").unwrap()[..], b"QmSecond");
        let local = store.get_local_state(AppId(1), &addr).await.unwrap().unwrap();
        assert_eq!(&local.get_bytes(b"user_file_cid").unwrap()[..], b"QmSecond");
        assert_eq!(store.round_transactions(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        let keypair = Keypair::generate();
        let stranger = Address::from_bytes([0x33; 32]);
        deploy_and_opt_in(&store, &keypair).await;

        // Global write would succeed; the local write for a stranger fails.
        let batch = WriteBatch::new(record(&keypair, "bad", 2, confirmed()))
            .delta(AppId(1), upload_delta(stranger, b"QmEvil"));
        assert!(matches!(
            store.commit(&batch).await,
            Err(StoreError::NotOptedIn { .. })
        ));

        let app = store.get_application(AppId(1)).await.unwrap().unwrap();
        assert!(app.global.get(b"file_cid").is_none());
        assert!(!store
            .has_transaction(&batch.transaction.tx_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_transaction_record_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let keypair = Keypair::generate();
        let rejected = record(
            &keypair,
            "orphan",
            4,
            TxOutcome::Rejected {
                kind: RejectKind::Ledger,
                reason: "application 1 does not exist".into(),
            },
        );

        store.commit(&WriteBatch::new(rejected.clone())).await.unwrap();
        let loaded = store.get_transaction(&rejected.tx_id).await.unwrap().unwrap();
        assert_eq!(loaded, rejected);
        assert!(loaded.signed.verify().is_ok());

        assert!(matches!(
            store.commit(&WriteBatch::new(rejected)).await,
            Err(StoreError::DuplicateTransaction(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_removes_local_rows() {
        let store = SqliteStore::open_memory().unwrap();
        let keypair = Keypair::generate();
        let addr = keypair.address();
        deploy_and_opt_in(&store, &keypair).await;

        store
            .commit(
                &WriteBatch::new(record(&keypair, "upload", 2, confirmed()))
                    .delta(AppId(1), upload_delta(addr, b"QmFirst")),
            )
            .await
            .unwrap();
        store
            .commit(&WriteBatch::new(record(&keypair, "clear", 3, confirmed())).clear(AppId(1), addr))
            .await
            .unwrap();

        assert!(store.get_local_state(AppId(1), &addr).await.unwrap().is_none());
        assert!(store.opted_in_apps(&addr).await.unwrap().is_empty());

        // Opting in again starts from an empty record.
        store
            .commit(&WriteBatch::new(record(&keypair, "rejoin", 4, confirmed())).opt_in(AppId(1), addr))
            .await
            .unwrap();
        let local = store.get_local_state(AppId(1), &addr).await.unwrap().unwrap();
        assert!(local.is_empty());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");
        let keypair = Keypair::generate();

        {
            let store = SqliteStore::open(&path).unwrap();
            deploy_and_opt_in(&store, &keypair).await;
            store.record_round(1, 2).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.latest_round().await.unwrap(), 1);
        assert!(store.get_application(AppId(1)).await.unwrap().is_some());
        assert_eq!(
            store.opted_in_apps(&keypair.address()).await.unwrap(),
            vec![AppId(1)]
        );
    }
}
