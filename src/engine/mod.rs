//! Encoding engine
//!
//! Command construction, progress parsing and supervision of one encoder
//! process at a time.

pub mod command;
pub mod job;
pub mod progress;

pub use command::build_request;
pub use job::{EncodeJob, JobObserver, JobOutcome};
pub use progress::ProgressParser;
