use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{debug, info};

use crate::config::SidecarConfig;
use crate::mount::{DirBinding, Layout, remount, remount_all};
use crate::system::CancellationToken;
use crate::watch::{HttpWatchSource, RetryPolicy, UserId, WatchSource, Watcher};

/// The whole sidecar run: shared models, wait for a user, per-user dirs.
pub struct Bootstrap<S: WatchSource> {
    layout: Layout,
    watcher: Watcher<S>,
}

impl<S: WatchSource> Bootstrap<S> {
    pub fn new(layout: Layout, watcher: Watcher<S>) -> Self {
        Self { layout, watcher }
    }

    /// Step 1: point the model directory at the shared mount
    pub fn remount_models(&self) -> crate::errors::Result<DirBinding> {
        let binding = self.layout.model_binding();
        remount(&binding)?;
        Ok(binding)
    }

    /// Steps 2 and 3: block until the control plane assigns a user
    pub fn wait_for_user(&self) -> crate::errors::Result<UserId> {
        self.watcher.wait_for_user()
    }

    /// Step 4: point the user directories at `<mount_root>/<user>/...`
    pub fn remount_user(&self, user: &UserId) -> crate::errors::Result<Vec<DirBinding>> {
        let bindings = self.layout.user_bindings(user);
        remount_all(&bindings)?;
        Ok(bindings)
    }

    /// Run all steps once and return the assigned user
    pub fn run(&self) -> Result<UserId> {
        let start_time = Instant::now();

        self.remount_models()
            .context("Failed to remount shared model directory")?;
        debug!("Model directory ready in {:?}", start_time.elapsed());

        let user = self
            .wait_for_user()
            .context("Failed while waiting for a user assignment")?;

        let bindings = self
            .remount_user(&user)
            .with_context(|| format!("Failed to remount directories for user {}", user))?;

        info!(
            "Bootstrap complete for user {} ({} directories linked) in {:?}",
            user,
            bindings.len(),
            start_time.elapsed()
        );
        Ok(user)
    }
}

/// Build the production bootstrap from configuration and run it
pub fn run(config: &SidecarConfig, cancel: CancellationToken) -> Result<UserId> {
    let source =
        HttpWatchSource::from_config(&config.sdk).context("Failed to build Agones SDK client")?;
    info!(
        "Shared mount: {}, app root: {}, watch: {}",
        config.mount.root.display(),
        config.mount.app_root.display(),
        source.url()
    );

    let watcher = Watcher::new(
        source,
        RetryPolicy::from(&config.retry),
        &config.watch,
        cancel,
    );

    Bootstrap::new(Layout::from_config(&config.mount), watcher).run()
}
