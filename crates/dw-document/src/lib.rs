//! Document adapter (spec.md §4.2): reads the well-known tables from a
//! tracked document and writes structured updates back to specific rows.
//!
//! Grounded on `mqk-reconcile::snapshot_adapter`'s "one normalize boundary,
//! pure conversion, errors are values" shape for the trait contract, and on
//! `mqk-broker-paper`'s deterministic `BTreeMap`-backed in-memory adapter for
//! [`InMemoryDocumentBackend`] (used by `dw-engine`'s tests and by operators
//! running without a document backend configured).

pub mod error;
pub mod hash;
pub mod memory;

pub use error::DocumentError;
pub use hash::commands_hash;
pub use memory::InMemoryDocumentBackend;

use async_trait::async_trait;
use dw_schemas::{
    AuditRow, BalanceRow, ChatRow, CommandRow, DocumentTables, OpenOrderRow, PayoutRuleRow,
    RecentActivityRow,
};

/// One document the backend can see, as returned by discovery (spec.md §4.7.1).
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDocument {
    pub doc_id: String,
    pub display_name: String,
}

/// The document backend's capability surface. Every method is a suspension
/// point (spec.md §5); callers retry on [`DocumentError::Transient`] at the
/// next tick rather than inside the adapter.
///
/// Row-targeted writes always take the row's *current* identity freshly —
/// implementations MUST re-resolve `(table, row_index)` against a table
/// snapshot loaded at call time, never one captured earlier in the tick
/// (spec.md §9 "observed ambiguities", 4th bullet). That discipline lives in
/// each backend's implementation, not in this trait.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Enumerates accessible documents (spec.md §4.7.1).
    async fn discover(&self) -> Result<Vec<DiscoveredDocument>, DocumentError>;

    /// Idempotently ensures the table template exists for a document. A
    /// no-op if the tables are already present.
    async fn ensure_template(&self, doc_id: &str) -> Result<(), DocumentError>;

    /// Loads every tracked table for one document in a single snapshot.
    async fn load_tables(&self, doc_id: &str) -> Result<DocumentTables, DocumentError>;

    /// Inserts a new row at the end of the Commands table.
    async fn append_command_row(&self, doc_id: &str, row: CommandRow) -> Result<(), DocumentError>;

    /// Rewrites one existing Commands row, identified by `cmd_id`, against a
    /// freshly loaded table snapshot. A no-op (not an error) if the row is
    /// no longer present — the next poll will re-discover it as new.
    async fn write_command_row(&self, doc_id: &str, row: CommandRow) -> Result<(), DocumentError>;

    /// Claims a brand-new Commands row (empty `cmd_id`) by the position it
    /// was observed at in the snapshot passed to the caller, stamping in the
    /// freshly minted `cmd_id`/status/approval_url/result/error cells.
    ///
    /// `row_index` must come from the same `load_tables` snapshot the caller
    /// used to decide the row was new. Implementations MUST re-check that
    /// the row still has an empty `cmd_id` at that position before writing —
    /// if it doesn't (a concurrent writer claimed it, or the table shifted),
    /// this is a no-op and the next poll re-evaluates the row from scratch.
    async fn claim_new_row(
        &self,
        doc_id: &str,
        row_index: usize,
        row: CommandRow,
    ) -> Result<(), DocumentError>;

    /// Rewrites the raw COMMAND cell of an existing row in place, used by
    /// poll when auto-detect canonicalizes a free-text command (spec.md
    /// §4.7.2 step 3). Leaves every other cell untouched.
    async fn rewrite_command_text(
        &self,
        doc_id: &str,
        cmd_id: &str,
        canonical_text: &str,
    ) -> Result<(), DocumentError>;

    /// Atomically replaces every row of the Balances table (spec.md §4.7.5).
    async fn replace_balances(
        &self,
        doc_id: &str,
        rows: Vec<BalanceRow>,
    ) -> Result<(), DocumentError>;

    /// Atomically replaces every row of the OpenOrders table.
    async fn replace_open_orders(
        &self,
        doc_id: &str,
        rows: Vec<OpenOrderRow>,
    ) -> Result<(), DocumentError>;

    /// Appends a line to the Audit table.
    async fn append_audit_row(&self, doc_id: &str, row: AuditRow) -> Result<(), DocumentError>;

    /// Appends a line to the RecentActivity table.
    async fn append_recent_activity_row(
        &self,
        doc_id: &str,
        row: RecentActivityRow,
    ) -> Result<(), DocumentError>;

    /// Writes or overwrites a single Config key/value pair.
    async fn set_config_value(
        &self,
        doc_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), DocumentError>;

    /// Fills in the AGENT cell of a Chat row, matched by its USER cell text
    /// (chat rows carry no id; spec.md §4.2's Chat table is `USER, AGENT`
    /// only).
    async fn set_chat_reply(
        &self,
        doc_id: &str,
        user_row_index: usize,
        agent_reply: &str,
    ) -> Result<(), DocumentError>;

    /// Appends a new Chat row with only the USER cell filled.
    async fn append_chat_row(&self, doc_id: &str, row: ChatRow) -> Result<(), DocumentError>;

    /// Writes back one PayoutRules row's `next_run`, `last_tx`, and status
    /// cells after a payout attempt (spec.md §4.7.9).
    async fn write_payout_rule_row(
        &self,
        doc_id: &str,
        row: PayoutRuleRow,
    ) -> Result<(), DocumentError>;
}

/// Convenience alias matching spec.md §4.2's naming for the hash function
/// that decides whether poll needs to reconcile a document at all.
pub fn user_editable_commands_hash(tables: &DocumentTables) -> Vec<u8> {
    commands_hash(&tables.commands)
}
