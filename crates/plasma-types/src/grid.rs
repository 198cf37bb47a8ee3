// ─────────────────────────────────────────────────────────────────────
// SCPN Plasma Tables — Table Grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! The 4D tabulated parameter grid and its on-disk batch layout.
//!
//! Table rows are flattened row-major with the density axis varying
//! fastest and split into fixed-size batches. All layout arithmetic of
//! the stack lives here so that locator, store and engine agree on it.

use ndarray::Array1;

use crate::error::{PlasmaError, PlasmaResult};

/// Identifier of one fixed-size chunk of the flattened grid.
pub type BatchId = usize;

/// The four physical axes of the table, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAxis {
    /// Hydrogen number density nH [cm^-3].
    Density,
    /// Temperature [K].
    Temperature,
    /// Metallicity relative to solar.
    Metallicity,
    /// Cosmological redshift.
    Redshift,
}

impl TableAxis {
    /// Human-readable label used in boundary warnings.
    pub fn label(self) -> &'static str {
        match self {
            TableAxis::Density => "hydrogen number density",
            TableAxis::Temperature => "temperature",
            TableAxis::Metallicity => "metallicity",
            TableAxis::Redshift => "redshift",
        }
    }
}

/// One discrete point on the tabulated grid: an index per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCell {
    /// Density index.
    pub i: usize,
    /// Temperature index.
    pub j: usize,
    /// Metallicity index.
    pub k: usize,
    /// Redshift index.
    pub m: usize,
}

/// Sorted coordinate axes plus the batch layout of the backing store.
#[derive(Debug, Clone)]
pub struct TableGrid {
    pub nh: Array1<f64>,
    pub temperature: Array1<f64>,
    pub metallicity: Array1<f64>,
    pub redshift: Array1<f64>,
    /// Rows per full batch archive.
    pub batch_size: usize,
    /// Total number of grid cells.
    pub total_size: usize,
}

impl TableGrid {
    /// Build a grid, validating the axis and layout invariants.
    pub fn new(
        nh: Array1<f64>,
        temperature: Array1<f64>,
        metallicity: Array1<f64>,
        redshift: Array1<f64>,
        batch_size: usize,
        total_size: usize,
    ) -> PlasmaResult<Self> {
        for (axis, values) in [
            (TableAxis::Density, &nh),
            (TableAxis::Temperature, &temperature),
            (TableAxis::Metallicity, &metallicity),
            (TableAxis::Redshift, &redshift),
        ] {
            validate_axis(axis, values)?;
        }
        if batch_size == 0 {
            return Err(PlasmaError::Table("Batch size must be at least 1".into()));
        }
        let expected = nh.len() * temperature.len() * metallicity.len() * redshift.len();
        if total_size != expected {
            return Err(PlasmaError::Table(format!(
                "Total size {total_size} does not match the axis product {expected}"
            )));
        }
        Ok(Self {
            nh,
            temperature,
            metallicity,
            redshift,
            batch_size,
            total_size,
        })
    }

    /// Coordinate array of one axis.
    pub fn axis(&self, axis: TableAxis) -> &Array1<f64> {
        match axis {
            TableAxis::Density => &self.nh,
            TableAxis::Temperature => &self.temperature,
            TableAxis::Metallicity => &self.metallicity,
            TableAxis::Redshift => &self.redshift,
        }
    }

    /// Row-major flattening of a cell, density fastest.
    pub fn linear_index(&self, cell: TableCell) -> usize {
        let ni = self.nh.len();
        let nj = self.temperature.len();
        let nk = self.metallicity.len();
        cell.m * nk * nj * ni + cell.k * nj * ni + cell.j * ni + cell.i
    }

    /// Batch holding the given cell's row.
    pub fn batch_id(&self, cell: TableCell) -> BatchId {
        self.linear_index(cell) / self.batch_size
    }

    /// Offset of the cell's row within its batch.
    pub fn row_offset(&self, cell: TableCell) -> usize {
        self.linear_index(cell) % self.batch_size
    }

    /// Number of batches covering the full table.
    pub fn batch_count(&self) -> usize {
        (self.total_size + self.batch_size - 1) / self.batch_size
    }

    /// Rows stored in one batch; the final batch may be short.
    pub fn rows_in_batch(&self, id: BatchId) -> usize {
        let start = id * self.batch_size;
        if start >= self.total_size {
            0
        } else {
            self.batch_size.min(self.total_size - start)
        }
    }
}

fn validate_axis(axis: TableAxis, values: &Array1<f64>) -> PlasmaResult<()> {
    if values.is_empty() {
        return Err(PlasmaError::Table(format!("Empty {} axis", axis.label())));
    }
    for pair in values.windows(2) {
        if pair[1] < pair[0] {
            return Err(PlasmaError::Table(format!(
                "Unsorted {} axis: values must ascend",
                axis.label()
            )));
        }
    }
    Ok(())
}
