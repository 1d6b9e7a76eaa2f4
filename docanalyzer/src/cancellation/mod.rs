//! Cooperative cancellation for poll tasks.
//!
//! This module provides:
//! - CancellationToken for cooperative cancellation
//! - PollHandle, the owned handle every poller keeps for its task

mod handle;
mod token;

pub use handle::PollHandle;
pub use token::CancellationToken;
