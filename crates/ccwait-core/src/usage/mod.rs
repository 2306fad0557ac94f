//! Usage status model and payload resolver.
//!
//! The remote source reports per-window utilization; this module turns the raw
//! JSON into [`UsageStatus`] and derives the "is limited" and "next reset"
//! facts the daemon acts on.

mod parser;
mod source;
mod types;

pub use parser::{parse_datetime, resolve};
pub use source::{FetchError, UsageSource};
pub use types::{UsageStatus, UsageWindow};
