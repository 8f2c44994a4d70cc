//! comfyui-sidecar - bootstrap sidecar for ComfyUI game servers
//!
//! On startup the ComfyUI model directory is replaced by a symlink into a
//! shared NFS mount. The sidecar then watches the local Agones SDK for this
//! game server's labels; once a `user` label appears, the input and output
//! directories are linked to that user's directories on the same mount and
//! the process exits.
//!
//! # Architecture
//! - `config`: Configuration loading (TOML file + environment) and validation
//! - `mount`: Directory layout and the replace-with-symlink operation
//! - `watch`: Agones SDK watch client, retry policy and event parsing
//! - `runtime`: The one-shot bootstrap sequence
//! - `system`: Logging, cancellation and signal handling
//! - `utils`: Input validation helpers

pub mod cli;
pub mod config;
pub mod errors;
pub mod mount;
pub mod runtime;
pub mod system;
pub mod utils;
pub mod watch;
