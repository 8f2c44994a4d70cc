//! Application lifecycle
//!
//! `bootstrap` wires configuration, mount layout and the SDK watcher
//! together and runs the one-shot sequence.

pub mod bootstrap;

pub use bootstrap::{Bootstrap, run};
