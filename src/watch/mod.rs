//! Agones SDK watch
//!
//! - `client`: one connection attempt to the watch endpoint
//! - `retry`: cancellable retry policy around connection attempts
//! - `event`: tolerant parsing of a single event line
//! - `stream`: reading events until the user label appears
//! - `watcher`: connect + read, reconnecting when the stream drops

pub mod client;
pub mod event;
pub mod retry;
pub mod stream;
mod watcher;

pub use client::{HttpWatchSource, WatchSource, WatchStream};
pub use event::{GameServerEvent, LabelLookup, UserId};
pub use retry::{AttemptError, RetryPolicy, RetryState, with_retry};
pub use stream::{StreamOutcome, wait_for_label};
pub use watcher::Watcher;
