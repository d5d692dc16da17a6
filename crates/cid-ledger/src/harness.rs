//! Host harness: deploy the CID storage application and drive it.

use std::sync::Arc;

use bytes::Bytes;
use cid_ledger_core::{
    teal, Address, AppCallBuilder, AppId, Keypair, GLOBAL_SCHEMA, LOCAL_SCHEMA, FILE_CID_KEY,
    UPLOAD_FILE, USER_FILE_CID_KEY,
};
use tracing::info;

use crate::client::{send_and_wait, Confirmation, LedgerClient};
use crate::error::Result;

/// A handle on one deployed CID storage application.
pub struct AppClient<C: LedgerClient> {
    client: Arc<C>,
    app_id: AppId,
    wait_rounds: u64,
}

impl<C: LedgerClient> AppClient<C> {
    /// Deploy a new application with `creator` as the sender.
    ///
    /// The creation call carries the program sources and declares two uints
    /// and four byte slices globally, one uint and two byte slices per
    /// account.
    pub async fn deploy(client: Arc<C>, creator: &Keypair, wait_rounds: u64) -> Result<Self> {
        let params = client.suggested_params().await?;
        let signed = AppCallBuilder::create(creator.address())
            .schemas(GLOBAL_SCHEMA, LOCAL_SCHEMA)
            .programs(
                Bytes::from_static(teal::approval_source().as_bytes()),
                Bytes::from_static(teal::clear_state_source().as_bytes()),
            )
            .validity(params.first_valid, params.last_valid)
            .sign(creator);

        let confirmation = send_and_wait(client.as_ref(), signed, wait_rounds).await?;
        info!(
            app_id = %confirmation.app_id,
            round = confirmation.round,
            "deployed CID storage application"
        );

        Ok(Self {
            client,
            app_id: confirmation.app_id,
            wait_rounds,
        })
    }

    /// Attach to an application that already exists.
    pub fn new(client: Arc<C>, app_id: AppId, wait_rounds: u64) -> Self {
        Self {
            client,
            app_id,
            wait_rounds,
        }
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Open `account`'s local state.
    pub async fn opt_in(&self, account: &Keypair) -> Result<Confirmation> {
        let builder = AppCallBuilder::opt_in(account.address(), self.app_id);
        self.execute(builder, account).await
    }

    /// Store `cid` as the application's and `account`'s latest upload.
    pub async fn upload_file(&self, account: &Keypair, cid: &str) -> Result<Confirmation> {
        self.call(
            account,
            vec![
                Bytes::from_static(UPLOAD_FILE.as_bytes()),
                Bytes::copy_from_slice(cid.as_bytes()),
            ],
        )
        .await
    }

    /// Send a no-op call with arbitrary arguments.
    pub async fn call(&self, account: &Keypair, args: Vec<Bytes>) -> Result<Confirmation> {
        let builder = AppCallBuilder::no_op(account.address(), self.app_id).args(args);
        self.execute(builder, account).await
    }

    /// Remove `account`'s local state.
    pub async fn clear_state(&self, account: &Keypair) -> Result<Confirmation> {
        let builder = AppCallBuilder::clear_state(account.address(), self.app_id);
        self.execute(builder, account).await
    }

    /// The global `file_cid`, or `None` if it was never initialised.
    pub async fn file_cid(&self) -> Result<Option<Bytes>> {
        let app = self.client.application_info(self.app_id).await?;
        Ok(app.global.get_bytes(FILE_CID_KEY).cloned())
    }

    /// `account`'s `user_file_cid`, or `None` if it is not opted in.
    pub async fn user_file_cid(&self, account: &Address) -> Result<Option<Bytes>> {
        let local = self
            .client
            .account_application_info(account, self.app_id)
            .await?;
        Ok(local.and_then(|local| local.get_bytes(USER_FILE_CID_KEY).cloned()))
    }

    async fn execute(&self, builder: AppCallBuilder, account: &Keypair) -> Result<Confirmation> {
        let params = self.client.suggested_params().await?;
        let signed = builder
            .validity(params.first_valid, params.last_valid)
            .sign(account);
        send_and_wait(self.client.as_ref(), signed, self.wait_rounds).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::ledger::{Ledger, LedgerConfig};
    use cid_ledger_core::RejectKind;
    use cid_ledger_store::MemoryStore;

    async fn deployed() -> (AppClient<Ledger<MemoryStore>>, Keypair) {
        let ledger = Arc::new(Ledger::new(MemoryStore::new(), LedgerConfig::default()));
        let creator = Keypair::generate();
        let app = AppClient::deploy(ledger, &creator, 4).await.unwrap();
        (app, creator)
    }

    #[tokio::test]
    async fn test_deploy_initialises_file_cid() {
        let (app, creator) = deployed().await;
        assert_eq!(app.app_id(), AppId(1));
        assert_eq!(app.file_cid().await.unwrap(), Some(Bytes::new()));
        assert_eq!(app.user_file_cid(&creator.address()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_opt_in_then_upload() {
        let (app, _) = deployed().await;
        let alice = Keypair::generate();

        app.opt_in(&alice).await.unwrap();
        assert_eq!(app.user_file_cid(&alice.address()).await.unwrap(), Some(Bytes::new()));

        let cid = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
        app.upload_file(&alice, cid).await.unwrap();
        assert_eq!(app.file_cid().await.unwrap().as_deref(), Some(cid.as_bytes()));
        assert_eq!(
            app.user_file_cid(&alice.address()).await.unwrap().as_deref(),
            Some(cid.as_bytes())
        );
    }

    #[tokio::test]
    async fn test_clear_state_then_upload_rejected() {
        let (app, _) = deployed().await;
        let alice = Keypair::generate();

        app.opt_in(&alice).await.unwrap();
        app.clear_state(&alice).await.unwrap();
        assert_eq!(app.user_file_cid(&alice.address()).await.unwrap(), None);

        let err = app.upload_file(&alice, "QmA").await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Rejected {
                kind: RejectKind::Authorization,
                ..
            }
        ));
    }
}
