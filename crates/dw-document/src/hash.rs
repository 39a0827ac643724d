//! `userEditableCommandsHash` (spec.md §4.2): computed over only the cells a
//! user could edit — the raw command text and the status-as-approval text —
//! never the system-owned id/result/error cells, so an executor-driven
//! status/result write doesn't look like a user edit to the next poll.

use dw_schemas::CommandRow;
use sha2::{Digest, Sha256};

pub fn commands_hash(rows: &[CommandRow]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for row in rows {
        hasher.update(row.raw_command.as_bytes());
        hasher.update([0u8]);
        hasher.update(row.status.as_bytes());
        hasher.update([0u8]);
    }
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(raw: &str, status: &str) -> CommandRow {
        CommandRow {
            cmd_id: "ignored".to_string(),
            raw_command: raw.to_string(),
            status: status.to_string(),
            approval_url: "ignored".to_string(),
            result: "ignored".to_string(),
            error: "ignored".to_string(),
        }
    }

    #[test]
    fn system_owned_cells_do_not_affect_the_hash() {
        let mut a = row("DW STATUS", "PENDING_APPROVAL");
        let mut b = a.clone();
        a.cmd_id = "cmd-1".to_string();
        a.result = "result a".to_string();
        a.error = "error a".to_string();
        b.cmd_id = "cmd-2".to_string();
        b.result = "result b".to_string();
        b.error = "error b".to_string();
        assert_eq!(commands_hash(&[a]), commands_hash(&[b]));
    }

    #[test]
    fn a_raw_command_edit_changes_the_hash() {
        let a = row("DW STATUS", "PENDING_APPROVAL");
        let b = row("DW BALANCE", "PENDING_APPROVAL");
        assert_ne!(commands_hash(&[a]), commands_hash(&[b]));
    }

    #[test]
    fn a_status_cell_edit_changes_the_hash() {
        let a = row("DW STATUS", "PENDING_APPROVAL");
        let b = row("DW STATUS", "APPROVED");
        assert_ne!(commands_hash(&[a]), commands_hash(&[b]));
    }

    #[test]
    fn empty_table_hashes_deterministically() {
        assert_eq!(commands_hash(&[]), commands_hash(&[]));
    }
}
