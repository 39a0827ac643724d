//! Command model: the tagged variant the parser produces and the executor
//! dispatches on, plus the status state machine enforced by `dw-repo`.

use serde::{Deserialize, Serialize};

/// Discriminant-only view of [`ParsedCommand`], used wherever only the kind
/// matters (auto-approve set membership, repository `kind` column, metrics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKindTag {
    Setup,
    Status,
    Treasury,
    Price,
    ChainPrice,
    Balance,
    ChainBalance,
    Payout,
    ChainSend,
    StopLoss,
    TakeProfit,
    CancelOrder,
    Schedule,
    CancelSchedule,
    Rebalance,
    AutoRebalance,
    Bridge,
    ContractCall,
    ContractRead,
    AlertThreshold,
}

impl CommandKindTag {
    /// Command kinds that skip `PENDING_APPROVAL` by default (spec.md §4.3).
    /// `dw-config` may override this list; callers should prefer
    /// `DwConfig::auto_approve_kinds` over this constant in production code —
    /// this is the documented fallback.
    pub const DEFAULT_AUTO_APPROVE: &'static [CommandKindTag] = &[
        CommandKindTag::Status,
        CommandKindTag::Price,
        CommandKindTag::ChainPrice,
        CommandKindTag::Balance,
        CommandKindTag::ChainBalance,
        CommandKindTag::Treasury,
        CommandKindTag::Setup,
        CommandKindTag::Schedule,
        CommandKindTag::CancelSchedule,
        CommandKindTag::StopLoss,
        CommandKindTag::TakeProfit,
        CommandKindTag::CancelOrder,
        CommandKindTag::AlertThreshold,
    ];

    pub fn is_auto_approved_by_default(&self) -> bool {
        Self::DEFAULT_AUTO_APPROVE.contains(self)
    }
}

/// A fully parsed command. Each variant matches a verb in spec.md §6.
///
/// `Schedule`'s inner command is boxed and re-parsed at spawn time by the
/// scheduler tick rather than stored pre-parsed, matching spec.md §4.7.6
/// ("re-parse the inner command").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParsedCommand {
    Setup,
    Status,
    Treasury,
    Price {
        pair: Option<String>,
    },
    ChainPrice {
        chain: String,
    },
    Balance,
    ChainBalance {
        chain: String,
    },
    Payout {
        asset: String,
        amount: String,
        to: String,
    },
    ChainSend {
        chain: String,
        to: String,
        amount: String,
    },
    StopLoss {
        base: String,
        quote: String,
        trigger_price: String,
        qty: String,
    },
    TakeProfit {
        base: String,
        quote: String,
        trigger_price: String,
        qty: String,
    },
    CancelOrder {
        order_id: String,
    },
    Schedule {
        interval_hours: u32,
        inner_command_text: String,
    },
    CancelSchedule {
        schedule_id: String,
    },
    Rebalance,
    AutoRebalance {
        on: bool,
    },
    Bridge {
        from_chain: String,
        to_chain: String,
        amount: String,
        dest_addr: String,
    },
    ContractCall {
        chain: String,
        contract: String,
        method: String,
        args: Vec<String>,
    },
    ContractRead {
        chain: String,
        contract: String,
        method: String,
        args: Vec<String>,
    },
    AlertThreshold {
        coin: String,
        amount: String,
    },
}

impl ParsedCommand {
    pub fn kind(&self) -> CommandKindTag {
        match self {
            ParsedCommand::Setup => CommandKindTag::Setup,
            ParsedCommand::Status => CommandKindTag::Status,
            ParsedCommand::Treasury => CommandKindTag::Treasury,
            ParsedCommand::Price { .. } => CommandKindTag::Price,
            ParsedCommand::ChainPrice { .. } => CommandKindTag::ChainPrice,
            ParsedCommand::Balance => CommandKindTag::Balance,
            ParsedCommand::ChainBalance { .. } => CommandKindTag::ChainBalance,
            ParsedCommand::Payout { .. } => CommandKindTag::Payout,
            ParsedCommand::ChainSend { .. } => CommandKindTag::ChainSend,
            ParsedCommand::StopLoss { .. } => CommandKindTag::StopLoss,
            ParsedCommand::TakeProfit { .. } => CommandKindTag::TakeProfit,
            ParsedCommand::CancelOrder { .. } => CommandKindTag::CancelOrder,
            ParsedCommand::Schedule { .. } => CommandKindTag::Schedule,
            ParsedCommand::CancelSchedule { .. } => CommandKindTag::CancelSchedule,
            ParsedCommand::Rebalance => CommandKindTag::Rebalance,
            ParsedCommand::AutoRebalance { .. } => CommandKindTag::AutoRebalance,
            ParsedCommand::Bridge { .. } => CommandKindTag::Bridge,
            ParsedCommand::ContractCall { .. } => CommandKindTag::ContractCall,
            ParsedCommand::ContractRead { .. } => CommandKindTag::ContractRead,
            ParsedCommand::AlertThreshold { .. } => CommandKindTag::AlertThreshold,
        }
    }
}

/// Command lifecycle status (spec.md §3). Ordered so `ORDER BY status` in
/// `dw-repo` queries is stable, not semantically meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Invalid,
    PendingApproval,
    Approved,
    Executing,
    Executed,
    Failed,
    Rejected,
}

impl CommandStatus {
    /// Terminal statuses are write-once (I2).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandStatus::Executed | CommandStatus::Failed | CommandStatus::Rejected
        )
    }

    /// Enforces the transition table in spec.md §4.1. `from = None` models
    /// the "—" column (first-ever status assignment on insert).
    pub fn can_transition(from: Option<CommandStatus>, to: CommandStatus) -> bool {
        use CommandStatus::*;
        match (from, to) {
            (None, Invalid) | (None, PendingApproval) | (None, Approved) => true,
            (Some(PendingApproval), Approved) | (Some(PendingApproval), Rejected) => true,
            (Some(PendingApproval), PendingApproval) | (Some(Invalid), PendingApproval) => true,
            (Some(Approved), Executing) => true,
            (Some(Executing), Executed) | (Some(Executing), Failed) => true,
            (Some(from), _) if from.is_terminal() => false,
            _ => false,
        }
    }

    pub fn as_cell_text(&self) -> &'static str {
        match self {
            CommandStatus::Invalid => "INVALID",
            CommandStatus::PendingApproval => "PENDING_APPROVAL",
            CommandStatus::Approved => "APPROVED",
            CommandStatus::Executing => "EXECUTING",
            CommandStatus::Executed => "EXECUTED",
            CommandStatus::Failed => "FAILED",
            CommandStatus::Rejected => "REJECTED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_reject_every_transition() {
        for terminal in [
            CommandStatus::Executed,
            CommandStatus::Failed,
            CommandStatus::Rejected,
        ] {
            for to in [
                CommandStatus::Invalid,
                CommandStatus::PendingApproval,
                CommandStatus::Approved,
                CommandStatus::Executing,
                CommandStatus::Executed,
                CommandStatus::Failed,
                CommandStatus::Rejected,
            ] {
                assert!(!CommandStatus::can_transition(Some(terminal), to));
            }
        }
    }

    #[test]
    fn approved_to_executing_is_executor_only_gate() {
        assert!(CommandStatus::can_transition(
            Some(CommandStatus::Approved),
            CommandStatus::Executing
        ));
        assert!(!CommandStatus::can_transition(
            Some(CommandStatus::PendingApproval),
            CommandStatus::Executing
        ));
    }

    #[test]
    fn auto_approve_default_matches_spec_fallback() {
        assert!(CommandKindTag::Status.is_auto_approved_by_default());
        assert!(!CommandKindTag::Payout.is_auto_approved_by_default());
        assert!(!CommandKindTag::Bridge.is_auto_approved_by_default());
    }
}
