//! Workhub Dashboard - Main Library
//!
//! Console front ends for the operations dashboard's real-time message sync.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners, console rendering)
//! - **workhub**: Sync core (re-exported from workspace)
//! - **livelink**: WebSocket connection manager (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use workhub_dashboard::bin_common::{load_config_from_env, ConfigType};
//! use workhub_dashboard::workhub::{SyncSession, WorkhubConfig};
//! ```

// Re-export workspace libraries for convenience
pub use livelink;
pub use workhub;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod console;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, parse_id_arg, ConfigType};
    pub use console::{format_message, ConsoleCommand, ConsolePrinter};
    pub use runner::{next_input_line, stdin_lines, BinaryRunner, RunConfig};
}
