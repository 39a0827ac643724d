//! Deterministic in-memory document backend. Mirrors `mqk-broker-paper`'s
//! `BTreeMap`-keyed, no-randomness, no-timestamps adapter shape: useful for
//! engine tests and for operators who haven't wired a real document backend
//! yet. Every write re-resolves row identity against a snapshot taken at the
//! start of the call, matching the freshness discipline every backend owes
//! the engine (spec.md §9).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dw_schemas::{
    AuditRow, BalanceRow, ChatRow, CommandRow, DocumentTables, OpenOrderRow, PayoutRuleRow,
    RecentActivityRow,
};
use tokio::sync::RwLock;

use crate::{DiscoveredDocument, DocumentBackend, DocumentError};

#[derive(Debug, Clone)]
struct DocRecord {
    display_name: String,
    tables: DocumentTables,
}

/// An in-process document store keyed by `doc_id`. Seed documents with
/// [`Self::seed_document`] before starting the engine's discovery tick.
#[derive(Clone, Default)]
pub struct InMemoryDocumentBackend {
    docs: Arc<RwLock<BTreeMap<String, DocRecord>>>,
}

impl InMemoryDocumentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a document so discovery can see it. Idempotent: re-seeding
    /// an existing `doc_id` only updates its display name.
    pub async fn seed_document(&self, doc_id: &str, display_name: &str) {
        let mut docs = self.docs.write().await;
        docs.entry(doc_id.to_string())
            .and_modify(|d| d.display_name = display_name.to_string())
            .or_insert_with(|| DocRecord {
                display_name: display_name.to_string(),
                tables: DocumentTables::default(),
            });
    }

    /// Removes a document from the backend entirely, simulating the user
    /// unsharing or deleting it.
    pub async fn forget_document(&self, doc_id: &str) {
        self.docs.write().await.remove(doc_id);
    }

    /// Test/operator hook: directly append a raw Commands row as a user
    /// would by typing into a cell, bypassing the adapter's own append path.
    pub async fn user_types_command(&self, doc_id: &str, raw_command: &str) {
        let mut docs = self.docs.write().await;
        if let Some(doc) = docs.get_mut(doc_id) {
            doc.tables.commands.push(CommandRow {
                cmd_id: String::new(),
                raw_command: raw_command.to_string(),
                status: String::new(),
                approval_url: String::new(),
                result: String::new(),
                error: String::new(),
            });
        }
    }

    /// Test/operator hook: edit the STATUS cell of an existing row by index,
    /// simulating cell-edit approval.
    pub async fn user_edits_status_cell(&self, doc_id: &str, row_index: usize, status: &str) {
        let mut docs = self.docs.write().await;
        if let Some(doc) = docs.get_mut(doc_id) {
            if let Some(row) = doc.tables.commands.get_mut(row_index) {
                row.status = status.to_string();
            }
        }
    }

    /// Test/operator hook: post a user chat message.
    pub async fn user_says(&self, doc_id: &str, message: &str) {
        let mut docs = self.docs.write().await;
        if let Some(doc) = docs.get_mut(doc_id) {
            doc.tables.chat.push(ChatRow {
                user: message.to_string(),
                agent: String::new(),
            });
        }
    }
}

#[async_trait]
impl DocumentBackend for InMemoryDocumentBackend {
    async fn discover(&self) -> Result<Vec<DiscoveredDocument>, DocumentError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .map(|(doc_id, rec)| DiscoveredDocument {
                doc_id: doc_id.clone(),
                display_name: rec.display_name.clone(),
            })
            .collect())
    }

    async fn ensure_template(&self, doc_id: &str) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        docs.entry(doc_id.to_string()).or_insert_with(|| DocRecord {
            display_name: doc_id.to_string(),
            tables: DocumentTables::default(),
        });
        Ok(())
    }

    async fn load_tables(&self, doc_id: &str) -> Result<DocumentTables, DocumentError> {
        let docs = self.docs.read().await;
        docs.get(doc_id)
            .map(|d| d.tables.clone())
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))
    }

    async fn append_command_row(&self, doc_id: &str, row: CommandRow) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        doc.tables.commands.push(row);
        Ok(())
    }

    async fn write_command_row(&self, doc_id: &str, row: CommandRow) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        // Re-resolve the row position fresh, by cmd_id, against the current
        // snapshot rather than trusting any index captured earlier.
        match doc
            .tables
            .commands
            .iter_mut()
            .find(|r| r.cmd_id == row.cmd_id)
        {
            Some(existing) => *existing = row,
            None => {} // row shifted out from under us; next poll re-discovers it
        }
        Ok(())
    }

    async fn claim_new_row(
        &self,
        doc_id: &str,
        row_index: usize,
        row: CommandRow,
    ) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        if let Some(existing) = doc.tables.commands.get_mut(row_index) {
            if existing.cmd_id.trim().is_empty() {
                *existing = row;
            }
            // else: someone else claimed this position first; leave it.
        }
        // else: row shifted out from under us; next poll re-discovers it.
        Ok(())
    }

    async fn rewrite_command_text(
        &self,
        doc_id: &str,
        cmd_id: &str,
        canonical_text: &str,
    ) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        if let Some(row) = doc.tables.commands.iter_mut().find(|r| r.cmd_id == cmd_id) {
            row.raw_command = canonical_text.to_string();
        }
        Ok(())
    }

    async fn replace_balances(
        &self,
        doc_id: &str,
        rows: Vec<BalanceRow>,
    ) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        doc.tables.balances = rows;
        Ok(())
    }

    async fn replace_open_orders(
        &self,
        doc_id: &str,
        rows: Vec<OpenOrderRow>,
    ) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        doc.tables.open_orders = rows;
        Ok(())
    }

    async fn append_audit_row(&self, doc_id: &str, row: AuditRow) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        doc.tables.audit.push(row);
        Ok(())
    }

    async fn append_recent_activity_row(
        &self,
        doc_id: &str,
        row: RecentActivityRow,
    ) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        doc.tables.recent_activity.push(row);
        Ok(())
    }

    async fn set_config_value(
        &self,
        doc_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        match doc.tables.config.iter_mut().find(|r| r.key == key) {
            Some(existing) => existing.value = value.to_string(),
            None => doc.tables.config.push(dw_schemas::ConfigRow {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    async fn set_chat_reply(
        &self,
        doc_id: &str,
        user_row_index: usize,
        agent_reply: &str,
    ) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        if let Some(row) = doc.tables.chat.get_mut(user_row_index) {
            row.agent = agent_reply.to_string();
        }
        Ok(())
    }

    async fn append_chat_row(&self, doc_id: &str, row: ChatRow) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        doc.tables.chat.push(row);
        Ok(())
    }

    async fn write_payout_rule_row(
        &self,
        doc_id: &str,
        row: PayoutRuleRow,
    ) -> Result<(), DocumentError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound(doc_id.to_string()))?;
        match doc
            .tables
            .payout_rules
            .iter_mut()
            .find(|r| r.rule_id == row.rule_id)
        {
            Some(existing) => *existing = row,
            None => doc.tables.payout_rules.push(row),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discover_returns_only_seeded_documents() {
        let backend = InMemoryDocumentBackend::new();
        backend.seed_document("doc-1", "Treasury A").await;
        backend.seed_document("doc-2", "Treasury B").await;
        let docs = backend.discover().await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn forget_document_removes_it_from_discovery() {
        let backend = InMemoryDocumentBackend::new();
        backend.seed_document("doc-1", "Treasury A").await;
        backend.forget_document("doc-1").await;
        assert!(backend.discover().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_command_row_reresolves_by_cmd_id_not_index() {
        let backend = InMemoryDocumentBackend::new();
        backend.seed_document("doc-1", "Treasury A").await;
        backend
            .append_command_row(
                "doc-1",
                CommandRow {
                    cmd_id: "cmd-a".to_string(),
                    raw_command: "DW STATUS".to_string(),
                    status: "PENDING_APPROVAL".to_string(),
                    approval_url: String::new(),
                    result: String::new(),
                    error: String::new(),
                },
            )
            .await
            .unwrap();
        backend
            .append_command_row(
                "doc-1",
                CommandRow {
                    cmd_id: "cmd-b".to_string(),
                    raw_command: "DW BALANCE".to_string(),
                    status: "PENDING_APPROVAL".to_string(),
                    approval_url: String::new(),
                    result: String::new(),
                    error: String::new(),
                },
            )
            .await
            .unwrap();

        backend
            .write_command_row(
                "doc-1",
                CommandRow {
                    cmd_id: "cmd-a".to_string(),
                    raw_command: "DW STATUS".to_string(),
                    status: "EXECUTED".to_string(),
                    approval_url: String::new(),
                    result: "ok".to_string(),
                    error: String::new(),
                },
            )
            .await
            .unwrap();

        let tables = backend.load_tables("doc-1").await.unwrap();
        assert_eq!(tables.commands[0].status, "EXECUTED");
        assert_eq!(tables.commands[1].status, "PENDING_APPROVAL");
    }

    #[tokio::test]
    async fn claim_new_row_stamps_in_cmd_id_at_the_observed_position() {
        let backend = InMemoryDocumentBackend::new();
        backend.seed_document("doc-1", "Treasury A").await;
        backend.user_types_command("doc-1", "DW STATUS").await;
        backend.user_types_command("doc-1", "DW BALANCE").await;

        let tables = backend.load_tables("doc-1").await.unwrap();
        assert_eq!(tables.commands[0].cmd_id, "");
        assert_eq!(tables.commands[1].cmd_id, "");

        backend
            .claim_new_row(
                "doc-1",
                0,
                CommandRow {
                    cmd_id: "cmd-new".to_string(),
                    raw_command: "DW STATUS".to_string(),
                    status: "PENDING_APPROVAL".to_string(),
                    approval_url: "http://example/cmd/doc-1/cmd-new".to_string(),
                    result: String::new(),
                    error: String::new(),
                },
            )
            .await
            .unwrap();

        let tables = backend.load_tables("doc-1").await.unwrap();
        assert_eq!(tables.commands[0].cmd_id, "cmd-new");
        assert_eq!(tables.commands[0].status, "PENDING_APPROVAL");
        // The second row, still unclaimed, is untouched.
        assert_eq!(tables.commands[1].cmd_id, "");
    }

    #[tokio::test]
    async fn claim_new_row_is_a_no_op_if_the_position_was_already_claimed() {
        let backend = InMemoryDocumentBackend::new();
        backend.seed_document("doc-1", "Treasury A").await;
        backend.user_types_command("doc-1", "DW STATUS").await;

        backend
            .claim_new_row(
                "doc-1",
                0,
                CommandRow {
                    cmd_id: "cmd-first".to_string(),
                    raw_command: "DW STATUS".to_string(),
                    status: "APPROVED".to_string(),
                    approval_url: String::new(),
                    result: String::new(),
                    error: String::new(),
                },
            )
            .await
            .unwrap();

        // A stale second claim against the same index (e.g. a racing poll
        // loop) must not clobber the first.
        backend
            .claim_new_row(
                "doc-1",
                0,
                CommandRow {
                    cmd_id: "cmd-second".to_string(),
                    raw_command: "DW STATUS".to_string(),
                    status: "INVALID".to_string(),
                    approval_url: String::new(),
                    result: String::new(),
                    error: String::new(),
                },
            )
            .await
            .unwrap();

        let tables = backend.load_tables("doc-1").await.unwrap();
        assert_eq!(tables.commands[0].cmd_id, "cmd-first");
        assert_eq!(tables.commands[0].status, "APPROVED");
    }
}
