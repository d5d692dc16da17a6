//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use bytes::Bytes;
use cid_ledger::{AppClient, Ledger, LedgerConfig, Result, DEFAULT_WAIT_ROUNDS};
use cid_ledger_core::{
    teal, Address, AppCallBuilder, AppId, Keypair, SignedAppCall, GLOBAL_SCHEMA, LOCAL_SCHEMA,
    UPLOAD_FILE,
};
use cid_ledger_store::MemoryStore;

/// A ledger over a memory store and a creator keypair.
pub struct TestFixture {
    pub creator: Keypair,
    pub ledger: Arc<Ledger<MemoryStore>>,
}

impl TestFixture {
    /// Create a new test fixture with a random creator.
    pub fn new() -> Self {
        Self::with_creator(Keypair::generate())
    }

    /// Create with a deterministic creator from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_creator(Keypair::from_seed(&seed))
    }

    fn with_creator(creator: Keypair) -> Self {
        Self {
            creator,
            ledger: Arc::new(Ledger::new(MemoryStore::new(), LedgerConfig::default())),
        }
    }

    pub fn creator_address(&self) -> Address {
        self.creator.address()
    }

    /// Deploy the application as the creator.
    pub async fn deploy(&self) -> Result<AppClient<Ledger<MemoryStore>>> {
        AppClient::deploy(self.ledger.clone(), &self.creator, DEFAULT_WAIT_ROUNDS).await
    }

    /// Deploy, then opt each account in.
    pub async fn deploy_with(&self, accounts: &[Keypair]) -> Result<AppClient<Ledger<MemoryStore>>> {
        let app = self.deploy().await?;
        for account in accounts {
            app.opt_in(account).await?;
        }
        Ok(app)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic keypairs for multi-account tests.
pub fn accounts(count: usize) -> Vec<Keypair> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = 0xA0;
            seed[1] = i as u8;
            Keypair::from_seed(&seed)
        })
        .collect()
}

/// A signed creation call for the CID storage application.
pub fn make_create(creator: &Keypair) -> SignedAppCall {
    AppCallBuilder::create(creator.address())
        .schemas(GLOBAL_SCHEMA, LOCAL_SCHEMA)
        .programs(teal::approval_source(), teal::clear_state_source())
        .sign(creator)
}

/// A signed opt-in.
pub fn make_opt_in(account: &Keypair, app_id: AppId) -> SignedAppCall {
    AppCallBuilder::opt_in(account.address(), app_id).sign(account)
}

/// A signed `upload_file` call. `note` keeps repeated uploads distinct.
pub fn make_upload(account: &Keypair, app_id: AppId, cid: &[u8], note: u64) -> SignedAppCall {
    AppCallBuilder::no_op(account.address(), app_id)
        .arg(Bytes::from_static(UPLOAD_FILE.as_bytes()))
        .arg(Bytes::copy_from_slice(cid))
        .note(note.to_be_bytes().to_vec())
        .sign(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid_ledger::LedgerClient;

    #[tokio::test]
    async fn test_fixture_deploy() {
        let fixture = TestFixture::new();
        let app = fixture.deploy().await.unwrap();

        assert_eq!(app.app_id(), AppId(1));
        let info = fixture.ledger.application_info(app.app_id()).await.unwrap();
        assert_eq!(info.creator, fixture.creator_address());
    }

    #[tokio::test]
    async fn test_deploy_with_accounts() {
        let fixture = TestFixture::with_seed([7; 32]);
        let accounts = accounts(3);
        let app = fixture.deploy_with(&accounts).await.unwrap();

        for account in &accounts {
            assert_eq!(
                app.user_file_cid(&account.address()).await.unwrap(),
                Some(Bytes::new())
            );
        }
    }

    #[test]
    fn test_accounts_distinct() {
        let accounts = accounts(3);
        assert_ne!(accounts[0].address(), accounts[1].address());
        assert_ne!(accounts[1].address(), accounts[2].address());
        assert_ne!(accounts[0].address(), accounts[2].address());
    }

    #[test]
    fn test_uploads_distinct_by_note() {
        let account = Keypair::from_seed(&[1; 32]);
        let u1 = make_upload(&account, AppId(1), b"QmA", 0);
        let u2 = make_upload(&account, AppId(1), b"QmA", 1);
        assert_ne!(u1.compute_id(), u2.compute_id());
    }
}
