//! Output planning and atomic file writes
//!
//! Generation is split in two: [`OutputPlan::build`] renders every artifact
//! in memory, then [`OutputPlan::write`] persists the plan. A render failure
//! (e.g. an unreadable key file) therefore aborts before the output
//! directory is touched, so a failed run never leaves a stale mix of old and
//! new files. Each file is written to a temp file in the output directory
//! and renamed into place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::Config;
use crate::render::{render_authorized_keys, render_ssh_config};
use crate::Result;

/// Filename of the generated SSH client config
const SSH_CONFIG_FILE: &str = "config";

/// Everything a run will write, rendered up front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    /// SSH client config text
    pub ssh_config: String,
    /// Per-server authorized_keys text, in declaration order
    pub authorized_keys: Vec<(String, String)>,
}

impl OutputPlan {
    /// Render every artifact for the enabled servers.
    ///
    /// # Errors
    ///
    /// Propagates the first rendering failure; nothing has been written at
    /// that point.
    pub fn build(config: &Config) -> Result<Self> {
        let ssh_config = render_ssh_config(config);

        let mut authorized_keys = Vec::new();
        for (name, _) in config.enabled_servers() {
            let contents = render_authorized_keys(name, config)?;
            authorized_keys.push((name.clone(), contents));
        }

        debug!(servers = authorized_keys.len(), "output plan ready");
        Ok(Self {
            ssh_config,
            authorized_keys,
        })
    }

    /// Write the plan into `dir`, creating it if needed.
    ///
    /// Returns the written paths in write order: the SSH config first, then
    /// one `authorized_keys.<server>` per enabled server.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created or a file
    /// cannot be written or renamed into place.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(1 + self.authorized_keys.len());
        written.push(write_atomic(dir, SSH_CONFIG_FILE, &self.ssh_config)?);

        for (name, contents) in &self.authorized_keys {
            written.push(write_atomic(dir, &format!("authorized_keys.{name}"), contents)?);
        }

        info!(files = written.len(), dir = %dir.display(), "outputs written");
        Ok(written)
    }
}

/// Write `contents` to `dir/name` via temp-file-and-rename.
///
/// The temp file lives in the target directory so the final rename stays on
/// one filesystem.
fn write_atomic(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(&path).map_err(|e| e.error)?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(path)
}
