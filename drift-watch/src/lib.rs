//! Daily camera drift watch.
//!
//! Every day each camera leaves one reference frame under `<frames>/<YYYYMMDD>/`. A run compares
//! the frames of yesterday against today's frames of the same cameras and alerts operators about
//! cameras whose view moved.

pub mod batch;
pub mod config;
pub mod frames;
pub mod notify;
pub mod run_log;

pub use batch::{Batch, RunSummary};
pub use config::{ConfigError, WatchConfig};
pub use frames::FrameStore;
pub use notify::{LogNotifier, SendmailNotifier};
