pub mod command;
pub mod document;
pub mod entity;
pub mod error;
pub mod ports;

pub use command::{CommandKindTag, CommandStatus, ParsedCommand};
pub use document::{
    AuditRow, BalanceRow, ChatRow, CommandRow, ConfigRow, DocumentTables, OpenOrderRow,
    PayoutRuleRow, RecentActivityRow,
};
pub use entity::{
    AuditEvent, ChainKeypair, Command, ConditionalOrder, ConditionalOrderStatus,
    ConditionalOrderType, DocConfigEntry, DocSecrets, Document, PayoutRule, PayoutRuleStatus,
    PriceSnapshot, RecentActivity, Schedule, ScheduleStatus, new_id,
};
pub use error::DwError;
pub use ports::{
    BalanceEntry, BridgeReceipt, BridgeStatus, ChannelStatus, ContractCallResult, PortKind,
    PriceQuote, TxOutcome,
};
