use std::path::PathBuf;

use crate::config::MountConfig;
use crate::watch::UserId;

/// One local directory that should become a symlink into shared storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirBinding {
    /// Path under the application root that gets replaced
    pub local: PathBuf,
    /// Directory on the shared mount the symlink points at
    pub target: PathBuf,
}

impl DirBinding {
    pub fn new(local: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            local: local.into(),
            target: target.into(),
        }
    }
}

/// Where things live: the shared mount root and the local bindings under the
/// application root.
///
/// Entries in `model_dir` and `user_dirs` are single path segments; the
/// config validator enforces that before a `Layout` is built from it.
#[derive(Debug, Clone)]
pub struct Layout {
    mount_root: PathBuf,
    app_root: PathBuf,
    model_dir: String,
    user_dirs: Vec<String>,
}

impl Layout {
    pub fn new(
        mount_root: impl Into<PathBuf>,
        app_root: impl Into<PathBuf>,
        model_dir: impl Into<String>,
        user_dirs: Vec<String>,
    ) -> Self {
        Self {
            mount_root: mount_root.into(),
            app_root: app_root.into(),
            model_dir: model_dir.into(),
            user_dirs,
        }
    }

    pub fn from_config(config: &MountConfig) -> Self {
        Self::new(
            config.root.clone(),
            config.app_root.clone(),
            config.model_dir.clone(),
            config.user_dirs.clone(),
        )
    }

    /// `<app_root>/models -> <mount_root>/models`
    pub fn model_binding(&self) -> DirBinding {
        DirBinding::new(
            self.app_root.join(&self.model_dir),
            self.mount_root.join(&self.model_dir),
        )
    }

    /// `<app_root>/<sub> -> <mount_root>/<user>/<sub>` for every user dir, in
    /// configured order
    pub fn user_bindings(&self, user: &UserId) -> Vec<DirBinding> {
        let user_root = self.mount_root.join(user.as_str());
        self.user_dirs
            .iter()
            .map(|sub| DirBinding::new(self.app_root.join(sub), user_root.join(sub)))
            .collect()
    }
}
