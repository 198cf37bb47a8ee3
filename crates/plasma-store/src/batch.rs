// ─────────────────────────────────────────────────────────────────────
// SCPN Plasma Tables — Batch Archives
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One open batch archive and row access into its 2D datasets.

use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Ix2, OwnedRepr};
use ndarray_npy::NpzReader;

use plasma_types::error::{PlasmaError, PlasmaResult};
use plasma_types::grid::BatchId;

/// An open batch archive.
///
/// Handles live for the duration of one interpolation call and are
/// dropped on every exit path. The requested dataset is materialized
/// once per handle and reused across row reads; switching to another
/// dataset key replaces the cached copy.
pub struct BatchHandle {
    id: BatchId,
    path: PathBuf,
    npz: NpzReader<File>,
    cache: Option<(String, Array2<f64>)>,
}

// Manual impl because `NpzReader` has no `Debug`.
impl std::fmt::Debug for BatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl BatchHandle {
    /// Open the archive backing one batch.
    pub fn open(path: &Path, id: BatchId) -> PlasmaResult<Self> {
        let file = File::open(path)?;
        let npz = NpzReader::new(file).map_err(|e| {
            PlasmaError::Table(format!(
                "Failed to open batch archive '{}': {e}",
                path.display()
            ))
        })?;
        Ok(Self {
            id,
            path: path.to_path_buf(),
            npz,
            cache: None,
        })
    }

    /// Batch id this handle serves.
    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Number of rows in the named dataset.
    pub fn rows(&mut self, name: &str) -> PlasmaResult<usize> {
        Ok(self.dataset(name)?.nrows())
    }

    /// Copy of one row of the named dataset.
    pub fn read_row(&mut self, name: &str, row: usize) -> PlasmaResult<Array1<f64>> {
        let id = self.id;
        let values = self.dataset(name)?;
        if row >= values.nrows() {
            return Err(PlasmaError::Table(format!(
                "Row {row} out of range for dataset '{name}' of batch {id} ({} rows)",
                values.nrows()
            )));
        }
        Ok(values.row(row).to_owned())
    }

    fn dataset(&mut self, name: &str) -> PlasmaResult<&Array2<f64>> {
        let cached = matches!(&self.cache, Some((key, _)) if key == name);
        if !cached {
            let values = read_dataset(&mut self.npz, &self.path, name)?;
            self.cache = Some((name.to_string(), values));
        }
        match &self.cache {
            Some((_, values)) => Ok(values),
            None => Err(PlasmaError::Table(format!(
                "Dataset '{name}' missing from the handle cache"
            ))),
        }
    }
}

/// NPZ members may be stored with or without the `.npy` suffix.
fn read_dataset(
    npz: &mut NpzReader<File>,
    path: &Path,
    name: &str,
) -> PlasmaResult<Array2<f64>> {
    npz.by_name::<OwnedRepr<f64>, Ix2>(&format!("{name}.npy"))
        .or_else(|_| npz.by_name::<OwnedRepr<f64>, Ix2>(name))
        .map_err(|e| {
            PlasmaError::Table(format!(
                "Failed to read dataset '{name}' from '{}': {e}",
                path.display()
            ))
        })
}
