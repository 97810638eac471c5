//! Published output directory and atomic swaps.
//!
//! Builds never write into the output directory directly:
//!
//! ```text
//! build ──► .public.staging/ ──publish()──► public/
//!                                 │
//!                                 └── old public/ → .public.old/ → removed
//! ```
//!
//! `publish` holds the write side of a lock for the two renames; readers
//! (the preview server) hold the read side while touching files, so they see
//! either the old tree or the new one, never a mix.

use crate::{config::SitePaths, log};
use anyhow::{Context, Result};
use parking_lot::{RwLock, RwLockReadGuard};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Owner of the output directory and its staging sibling.
#[derive(Debug)]
pub struct OutputGate {
    lock: RwLock<()>,
    output: PathBuf,
    staging: PathBuf,
    retired: PathBuf,
}

impl OutputGate {
    pub fn new(paths: &SitePaths<'_>) -> Self {
        Self {
            lock: RwLock::new(()),
            output: paths.output().to_path_buf(),
            staging: paths.staging(),
            retired: paths.retired(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Empty staging directory for a new build.
    pub fn prepare_staging(&self) -> Result<&Path> {
        remove_dir_if_exists(&self.staging)?;
        fs::create_dir_all(&self.staging)
            .with_context(|| format!("Failed to create {}", self.staging.display()))?;
        Ok(&self.staging)
    }

    /// Drop a staging tree left by a failed build.
    pub fn discard_staging(&self) {
        if let Err(err) = remove_dir_if_exists(&self.staging) {
            log!("warn"; "{err:#}");
        }
    }

    /// Replace the output with the staging tree.
    pub fn publish(&self) -> Result<()> {
        let _guard = self.lock.write();

        remove_dir_if_exists(&self.retired)?;

        let had_output = self.output.exists();
        if had_output {
            fs::rename(&self.output, &self.retired).with_context(|| {
                format!("Failed to move {} aside", self.output.display())
            })?;
        }

        if let Err(err) = fs::rename(&self.staging, &self.output) {
            if had_output {
                // Put the previous site back so the server keeps a tree.
                let _ = fs::rename(&self.retired, &self.output);
            }
            return Err(err).with_context(|| {
                format!(
                    "Failed to move {} to {}",
                    self.staging.display(),
                    self.output.display()
                )
            });
        }

        if had_output && let Err(err) = remove_dir_if_exists(&self.retired) {
            log!("warn"; "{err:#}");
        }

        Ok(())
    }

    /// Hold off publishes while reading from the output directory.
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read()
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::mpsc::{self, RecvTimeoutError},
        thread,
        time::Duration,
    };
    use tempfile::TempDir;

    fn gate(dir: &TempDir) -> OutputGate {
        let output = dir.path().join("public");
        OutputGate::new(&SitePaths::new(dir.path(), &output))
    }

    #[test]
    fn test_first_publish() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        let staging = gate.prepare_staging().unwrap().to_path_buf();
        fs::write(staging.join("index.html"), "v1").unwrap();
        gate.publish().unwrap();

        assert_eq!(fs::read_to_string(gate.output().join("index.html")).unwrap(), "v1");
        assert!(!staging.exists());
    }

    #[test]
    fn test_publish_replaces_whole_tree() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        let staging = gate.prepare_staging().unwrap().to_path_buf();
        fs::write(staging.join("stale.html"), "old").unwrap();
        gate.publish().unwrap();

        let staging = gate.prepare_staging().unwrap().to_path_buf();
        fs::write(staging.join("index.html"), "v2").unwrap();
        gate.publish().unwrap();

        assert!(!gate.output().join("stale.html").exists());
        assert_eq!(fs::read_to_string(gate.output().join("index.html")).unwrap(), "v2");
        assert!(!dir.path().join(".public.old").exists());
    }

    #[test]
    fn test_prepare_clears_leftover_staging() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        let staging = gate.prepare_staging().unwrap().to_path_buf();
        fs::write(staging.join("partial.html"), "x").unwrap();

        let staging = gate.prepare_staging().unwrap();
        assert_eq!(fs::read_dir(staging).unwrap().count(), 0);
    }

    #[test]
    fn test_discard_keeps_output() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        let staging = gate.prepare_staging().unwrap().to_path_buf();
        fs::write(staging.join("index.html"), "good").unwrap();
        gate.publish().unwrap();

        gate.prepare_staging().unwrap();
        gate.discard_staging();

        assert!(!dir.path().join(".public.staging").exists());
        assert_eq!(fs::read_to_string(gate.output().join("index.html")).unwrap(), "good");
    }

    #[test]
    fn test_publish_waits_for_readers() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        let staging = gate.prepare_staging().unwrap().to_path_buf();
        fs::write(staging.join("index.html"), "v1").unwrap();
        gate.publish().unwrap();

        let staging = gate.prepare_staging().unwrap().to_path_buf();
        fs::write(staging.join("index.html"), "v2").unwrap();

        let reading = gate.read();
        let (done_tx, done_rx) = mpsc::channel();

        thread::scope(|s| {
            s.spawn(|| {
                let result = gate.publish();
                done_tx.send(result.is_ok()).unwrap();
            });

            assert_eq!(
                done_rx.recv_timeout(Duration::from_millis(200)),
                Err(RecvTimeoutError::Timeout)
            );
            assert_eq!(fs::read_to_string(gate.output().join("index.html")).unwrap(), "v1");

            drop(reading);
            assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        });

        assert_eq!(fs::read_to_string(gate.output().join("index.html")).unwrap(), "v2");
    }
}
