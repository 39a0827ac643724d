//! The single context value threaded through every tick function (spec.md
//! §9 "Cyclic/shared references"), mirroring the `Arc<AppState>` pattern in
//! `mqk-daemon::state`. Ticks never reach the repository, document
//! backend, or ports any other way.

use std::sync::Arc;

use dw_config::DwConfig;
use dw_dispatcher::Dispatcher;
use dw_document::DocumentBackend;
use dw_repo::Repo;
use dw_schemas::DocSecrets;
use dw_vault::MasterKey;

pub struct TickContext {
    pub repo: Repo,
    pub document: Arc<dyn DocumentBackend>,
    pub dispatcher: Arc<Dispatcher>,
    pub vault: MasterKey,
    pub config: Arc<DwConfig>,
}

impl TickContext {
    pub fn new(
        repo: Repo,
        document: Arc<dyn DocumentBackend>,
        dispatcher: Arc<Dispatcher>,
        vault: MasterKey,
        config: Arc<DwConfig>,
    ) -> Self {
        TickContext {
            repo,
            document,
            dispatcher,
            vault,
            config,
        }
    }

    /// Decrypts a document's secret bundle. `None` when SETUP has never run
    /// (I6: secrets exist iff the doc has reached SETUP-EXECUTED once).
    pub async fn load_secrets(&self, doc_id: &str) -> anyhow::Result<Option<DocSecrets>> {
        match self.repo.get_doc_secrets_blob(doc_id).await? {
            Some(blob) => Ok(Some(self.vault.decrypt(&blob)?)),
            None => Ok(None),
        }
    }

    /// Encrypts and persists a freshly provisioned secret bundle (SETUP's
    /// auto-provisioning path). Never logged, never cached beyond this call.
    pub async fn store_secrets(&self, doc_id: &str, secrets: &DocSecrets) -> anyhow::Result<()> {
        let blob = self.vault.encrypt(secrets)?;
        self.repo.put_doc_secrets_blob(doc_id, &blob).await?;
        Ok(())
    }
}
