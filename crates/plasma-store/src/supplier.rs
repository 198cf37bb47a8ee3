// ─────────────────────────────────────────────────────────────────────
// SCPN Plasma Tables — Batch Supply
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The batch-supply seam: strategies that make batch archives available
//! on the local filesystem before the engine opens them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use plasma_types::config::DatasetConfig;
use plasma_types::error::{PlasmaError, PlasmaResult};
use plasma_types::grid::BatchId;

use crate::batch::BatchHandle;

/// Strategy that makes batch archives available locally.
///
/// `ensure_local` is idempotent and may block while archives are
/// fetched; `path_for` is a pure mapping from batch id to local path.
/// The interpolation core is wired with one supplier at construction
/// and never derives archive paths on its own.
pub trait BatchSupplier {
    /// Guarantee that every listed batch exists at its `path_for` location.
    fn ensure_local(&self, ids: &BTreeSet<BatchId>) -> PlasmaResult<()>;

    /// Local path of one batch archive.
    fn path_for(&self, id: BatchId) -> PathBuf;

    /// Open a handle onto one batch archive.
    fn open(&self, id: BatchId) -> PlasmaResult<BatchHandle> {
        BatchHandle::open(&self.path_for(id), id)
    }
}

/// Serves batch archives from a pre-populated local directory.
///
/// The reference supplier for complete table distributions: it fetches
/// nothing and reports a missing archive as a supply failure.
#[derive(Debug, Clone)]
pub struct DirectorySupplier {
    root: PathBuf,
    config: DatasetConfig,
}

impl DirectorySupplier {
    pub fn new(root: impl Into<PathBuf>, config: &DatasetConfig) -> Self {
        Self {
            root: root.into(),
            config: config.clone(),
        }
    }

    /// Directory the archives are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BatchSupplier for DirectorySupplier {
    fn ensure_local(&self, ids: &BTreeSet<BatchId>) -> PlasmaResult<()> {
        for &id in ids {
            let path = self.path_for(id);
            if !path.is_file() {
                return Err(PlasmaError::Supply(format!(
                    "Batch {id} not available at '{}'",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    fn path_for(&self, id: BatchId) -> PathBuf {
        self.root.join(self.config.batch_file_name(id))
    }
}
