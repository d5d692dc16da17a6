//! Deployment configuration and on-disk artifacts.
//!
//! The command line reads its settings from the environment:
//!
//! | Variable                 | Meaning                                        |
//! |--------------------------|------------------------------------------------|
//! | `ALGOD_ADDRESS`          | SQLite ledger file, or `:memory:`              |
//! | `FAUCET_MNEMONIC`        | pass phrase the signing key is derived from    |
//! | `CID_LEDGER_WAIT_ROUNDS` | rounds to wait for confirmation (default 4)    |

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use cid_ledger_core::{teal, Address, AppId, Keypair};
use cid_ledger_store::SqliteStore;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Rounds to wait for a confirmation unless configured otherwise.
pub const DEFAULT_WAIT_ROUNDS: u64 = 4;

pub const LEDGER_ADDRESS_VAR: &str = "ALGOD_ADDRESS";
pub const SIGNER_PHRASE_VAR: &str = "FAUCET_MNEMONIC";
pub const WAIT_ROUNDS_VAR: &str = "CID_LEDGER_WAIT_ROUNDS";

/// File the deployed application id is written to.
pub const APP_ID_FILE: &str = "app_id.json";

const MEMORY_ADDRESS: &str = ":memory:";

/// Where the ledger keeps its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLocation {
    /// In-memory SQLite; gone when the process exits.
    Memory,
    Path(PathBuf),
}

impl LedgerLocation {
    pub fn parse(address: &str) -> Self {
        match address.trim() {
            MEMORY_ADDRESS => LedgerLocation::Memory,
            path => LedgerLocation::Path(PathBuf::from(path)),
        }
    }

    /// Open the SQLite store at this location.
    pub fn open(&self) -> Result<SqliteStore> {
        let store = match self {
            LedgerLocation::Memory => SqliteStore::open_memory()?,
            LedgerLocation::Path(path) => SqliteStore::open(path)?,
        };
        Ok(store)
    }
}

/// Settings for deploying and driving the application.
#[derive(Clone)]
pub struct DeployConfig {
    pub ledger: LedgerLocation,
    signer_phrase: String,
    pub wait_rounds: u64,
}

impl DeployConfig {
    pub fn new(ledger: LedgerLocation, signer_phrase: impl Into<String>) -> Self {
        Self {
            ledger,
            signer_phrase: signer_phrase.into(),
            wait_rounds: DEFAULT_WAIT_ROUNDS,
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`.
    ///
    /// # Errors
    /// `Config` if a required variable is missing or empty, or the wait
    /// rounds are not a number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| LedgerError::Config(format!("{} is not set", name)))
        };

        let ledger = LedgerLocation::parse(&required(LEDGER_ADDRESS_VAR)?);
        let mut config = Self::new(ledger, required(SIGNER_PHRASE_VAR)?);

        if let Some(value) = lookup(WAIT_ROUNDS_VAR) {
            config.wait_rounds = value.trim().parse().map_err(|_| {
                LedgerError::Config(format!("{} must be a number, got {:?}", WAIT_ROUNDS_VAR, value))
            })?;
        }

        Ok(config)
    }

    /// The signing key derived from the configured pass phrase.
    pub fn keypair(&self) -> Keypair {
        Keypair::from_phrase(&self.signer_phrase)
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("ledger", &self.ledger)
            .field("signer", &self.keypair().address())
            .field("wait_rounds", &self.wait_rounds)
            .finish()
    }
}

/// Contents of `app_id.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdFile {
    pub app_id: AppId,
    /// Creator address, hex.
    pub creator: String,
    /// Round the creation was confirmed in.
    pub round: u64,
}

impl AppIdFile {
    pub fn new(app_id: AppId, creator: &Address, round: u64) -> Self {
        Self {
            app_id,
            creator: creator.to_hex(),
            round,
        }
    }

    /// Write to `dir/app_id.json`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(APP_ID_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Read from `dir/app_id.json`.
    pub fn load(dir: &Path) -> Result<Self> {
        let bytes = fs::read(dir.join(APP_ID_FILE))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Write the approval and clear-state program sources into `dir`.
///
/// Returns the paths written, approval first.
pub fn write_programs(dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;

    let approval = dir.join(teal::APPROVAL_FILE);
    fs::write(&approval, teal::approval_source())?;

    let clear = dir.join(teal::CLEAR_STATE_FILE);
    fs::write(&clear, teal::clear_state_source())?;

    Ok((approval, clear))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let config = DeployConfig::from_lookup(lookup(&[
            (LEDGER_ADDRESS_VAR, "/var/lib/cid-ledger/ledger.db"),
            (SIGNER_PHRASE_VAR, "tree river prefer carry"),
        ]))
        .unwrap();

        assert_eq!(
            config.ledger,
            LedgerLocation::Path(PathBuf::from("/var/lib/cid-ledger/ledger.db"))
        );
        assert_eq!(config.wait_rounds, DEFAULT_WAIT_ROUNDS);
        assert_eq!(
            config.keypair().address(),
            Keypair::from_phrase("tree river prefer carry").address()
        );
        assert!(!format!("{:?}", config).contains("river"));
    }

    #[test]
    fn test_memory_and_wait_rounds() {
        let config = DeployConfig::from_lookup(lookup(&[
            (LEDGER_ADDRESS_VAR, ":memory:"),
            (SIGNER_PHRASE_VAR, "phrase"),
            (WAIT_ROUNDS_VAR, " 10 "),
        ]))
        .unwrap();
        assert_eq!(config.ledger, LedgerLocation::Memory);
        assert_eq!(config.wait_rounds, 10);
    }

    #[test]
    fn test_missing_or_bad_values() {
        let missing = DeployConfig::from_lookup(lookup(&[(LEDGER_ADDRESS_VAR, ":memory:")]));
        assert!(matches!(missing, Err(LedgerError::Config(msg)) if msg.contains(SIGNER_PHRASE_VAR)));

        let blank = DeployConfig::from_lookup(lookup(&[
            (LEDGER_ADDRESS_VAR, "  "),
            (SIGNER_PHRASE_VAR, "phrase"),
        ]));
        assert!(matches!(blank, Err(LedgerError::Config(_))));

        let bad = DeployConfig::from_lookup(lookup(&[
            (LEDGER_ADDRESS_VAR, ":memory:"),
            (SIGNER_PHRASE_VAR, "phrase"),
            (WAIT_ROUNDS_VAR, "four"),
        ]));
        assert!(matches!(bad, Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_artifacts_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("build");

        let (approval, clear) = write_programs(&out).unwrap();
        assert_eq!(fs::read_to_string(approval).unwrap(), teal::approval_source());
        assert_eq!(fs::read_to_string(clear).unwrap(), teal::clear_state_source());

        let creator = Keypair::generate().address();
        let file = AppIdFile::new(AppId(12), &creator, 3);
        file.save(&out).unwrap();
        assert_eq!(AppIdFile::load(&out).unwrap(), file);

        let json = fs::read_to_string(out.join(APP_ID_FILE)).unwrap();
        assert!(json.contains("\"app_id\": 12"));
    }
}
