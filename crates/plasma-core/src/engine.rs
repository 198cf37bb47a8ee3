//! Distance-weighted combination of neighbor samples.
//!
//! Each neighbor cell contributes the row stored for it, weighted by
//! the inverse Euclidean distance between the query and the cell in
//! scaled coordinate space. Per column, samples further than
//! [`OUTLIER_SIGMA`] standard deviations from the neighborhood mean
//! are zeroed while their weight stays in the denominator, which damps
//! isolated spikes in sparsely tabulated regions.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};

use plasma_store::batch::BatchHandle;
use plasma_types::error::{PlasmaError, PlasmaResult};
use plasma_types::grid::{BatchId, TableGrid};

use crate::locate::NeighborSet;
use crate::normalize::QueryPoint;

/// Floor applied to distances before inversion, so exact grid hits get
/// a large finite weight instead of dividing by zero.
pub const DISTANCE_FLOOR: f64 = 1e-15;

/// Suppression threshold in population standard deviations.
pub const OUTLIER_SIGMA: f64 = 2.0;

/// Lower and upper clamp applied to fetched rows before weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cut {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl Cut {
    pub fn new(low: Option<f64>, high: Option<f64>) -> Self {
        Self { low, high }
    }

    fn apply(&self, values: &mut Array1<f64>) {
        if let Some(low) = self.low {
            values.mapv_inplace(|v| if v <= low { low } else { v });
        }
        if let Some(high) = self.high {
            values.mapv_inplace(|v| if v >= high { high } else { v });
        }
    }
}

/// Per-call interpolation options.
#[derive(Debug, Clone, Copy)]
pub struct InterpConfig {
    /// Monotonic transform applied to coordinates before measuring
    /// distances. Identity by default; log10 is the usual choice for
    /// axes tabulated over decades.
    pub scaling: fn(f64) -> f64,
    pub cut: Cut,
}

impl Default for InterpConfig {
    fn default() -> Self {
        Self {
            scaling: identity,
            cut: Cut::default(),
        }
    }
}

fn identity(value: f64) -> f64 {
    value
}

/// Combine the neighbor samples of one query point into one estimate.
///
/// `handles` must cover every batch the neighbor set maps to; a gap is
/// an internal invariant breach reported as
/// [`PlasmaError::BatchHandleMissing`] rather than a panic.
pub fn estimate(
    grid: &TableGrid,
    point: &QueryPoint,
    neighbors: &NeighborSet,
    handles: &mut BTreeMap<BatchId, BatchHandle>,
    dataset: &str,
    config: &InterpConfig,
) -> PlasmaResult<Array1<f64>> {
    let scaling = config.scaling;
    let mut rows: Vec<Array1<f64>> = Vec::with_capacity(neighbors.len());
    let mut weights: Vec<f64> = Vec::with_capacity(neighbors.len());

    for &cell in neighbors.cells() {
        let di = scaling(grid.nh[cell.i]) - scaling(point.nh);
        let dj = scaling(grid.temperature[cell.j]) - scaling(point.temperature);
        let dk = scaling(grid.metallicity[cell.k]) - scaling(point.metallicity);
        let dm = scaling(grid.redshift[cell.m]) - scaling(point.redshift);
        let mut distance = (di * di + dj * dj + dk * dk + dm * dm).sqrt();
        if distance <= 0.0 {
            distance = DISTANCE_FLOOR;
        }
        weights.push(1.0 / distance);

        let batch = grid.batch_id(cell);
        let handle = handles
            .get_mut(&batch)
            .ok_or(PlasmaError::BatchHandleMissing { batch })?;

        // Stored rows sit one slot below their layout offset; offset 0
        // wraps to the archive's last row.
        let stored = handle.rows(dataset)?;
        if stored == 0 {
            return Err(PlasmaError::Table(format!(
                "Dataset '{dataset}' of batch {batch} has no rows"
            )));
        }
        let offset = grid.row_offset(cell);
        let row = if offset == 0 { stored - 1 } else { offset - 1 };

        let mut values = handle.read_row(dataset, row)?;
        config.cut.apply(&mut values);
        rows.push(values);
    }

    combine(&rows, &weights)
}

/// Inverse-distance weighted average with per-column outlier zeroing.
fn combine(rows: &[Array1<f64>], weights: &[f64]) -> PlasmaResult<Array1<f64>> {
    let count = rows.len();
    let columns = match rows.first() {
        Some(first) => first.len(),
        None => {
            return Err(PlasmaError::InvalidArguments(
                "No neighbor samples to combine".to_string(),
            ))
        }
    };

    let mut samples = Array2::zeros((count, columns));
    for (index, row) in rows.iter().enumerate() {
        if row.len() != columns {
            return Err(PlasmaError::Table(format!(
                "Neighbor sample {index} has {} columns, expected {columns}",
                row.len()
            )));
        }
        samples.row_mut(index).assign(row);
    }

    let weight_total: f64 = weights.iter().sum();
    let mut combined = Array1::zeros(columns);
    for column in 0..columns {
        let column_view = samples.column(column);
        let mean = column_view.sum() / count as f64;
        let variance = column_view
            .iter()
            .map(|&v| (v - mean) * (v - mean))
            .sum::<f64>()
            / count as f64;
        let threshold = OUTLIER_SIGMA * variance.sqrt();

        let mut acc = 0.0;
        for (row, &weight) in weights.iter().enumerate() {
            let value = column_view[row];
            if (value - mean).abs() > threshold {
                continue;
            }
            acc += weight * value;
        }
        combined[column] = acc / weight_total;
    }
    Ok(combined)
}
