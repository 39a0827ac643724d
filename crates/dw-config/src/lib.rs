pub mod env;
pub mod layered;

pub use env::{
    DwConfig, PortConfig, PortTable, TickIntervals, DEFAULT_EXECUTOR_BATCH_SIZE,
    DEFAULT_POLL_FAILURE_LIMIT, DEFAULT_STALE_SWEEP,
};
pub use layered::{load_layered_yaml, merge_layered_yaml_str, LoadedConfig};
