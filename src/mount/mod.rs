//! Shared-storage directory bindings
//!
//! `Layout` decides which local directories map to which shared-mount
//! directories; `remount` performs the destructive replace-with-symlink.

mod layout;
mod remount;

pub use layout::{DirBinding, Layout};
pub use remount::{remount, remount_all};
