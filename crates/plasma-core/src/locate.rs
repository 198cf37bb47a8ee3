// ─────────────────────────────────────────────────────────────────────
// SCPN Plasma Tables — Batch Locator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Locating the grid neighborhood of a query point and the batches
//! that hold it.
//!
//! Per axis the candidates are the exact hit plus both side neighbors
//! when the query equals exactly one axis entry, otherwise the two
//! bracketing ranks. Candidates falling off the grid are clamped to
//! the edge with a warning, so out-of-range queries extrapolate from
//! the nearest tabulated plane.

use std::collections::BTreeSet;

use ndarray::Array1;

use plasma_types::error::{PlasmaError, PlasmaResult};
use plasma_types::grid::{BatchId, TableAxis, TableCell, TableGrid};

use crate::normalize::{QueryBatch, QueryPoint};

/// Grid cells surrounding one query point, in candidate product order.
///
/// Cells clamped at a grid edge may repeat; repeats keep contributing
/// their weight to the estimate.
#[derive(Debug, Clone)]
pub struct NeighborSet {
    cells: Vec<TableCell>,
}

impl NeighborSet {
    pub fn cells(&self) -> &[TableCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn axis_candidates(values: &Array1<f64>, query: f64) -> Vec<isize> {
    let mut exact = None;
    let mut equal = 0usize;
    let mut below = 0usize;
    for (index, &entry) in values.iter().enumerate() {
        if entry == query {
            equal += 1;
            exact = Some(index);
        } else if entry < query {
            below += 1;
        }
    }
    match (equal, exact) {
        (1, Some(index)) => {
            let index = index as isize;
            vec![index - 1, index, index + 1]
        }
        _ => vec![below as isize - 1, below as isize],
    }
}

fn clamp_index(index: isize, axis: TableAxis, len: usize) -> usize {
    if index < 0 {
        log::warn!("Query below the {} axis; clamping to the tabulated edge", axis.label());
        return 0;
    }
    if index as usize >= len {
        log::warn!("Query above the {} axis; clamping to the tabulated edge", axis.label());
        return len - 1;
    }
    index as usize
}

/// Cells surrounding one query point: the Cartesian product of the
/// per-axis candidates, clamped to the grid.
pub fn neighbor_cells(grid: &TableGrid, point: &QueryPoint) -> NeighborSet {
    let i_candidates = axis_candidates(&grid.nh, point.nh);
    let j_candidates = axis_candidates(&grid.temperature, point.temperature);
    let k_candidates = axis_candidates(&grid.metallicity, point.metallicity);
    let m_candidates = axis_candidates(&grid.redshift, point.redshift);

    let mut cells = Vec::with_capacity(
        i_candidates.len() * j_candidates.len() * k_candidates.len() * m_candidates.len(),
    );
    for &i in &i_candidates {
        for &j in &j_candidates {
            for &k in &k_candidates {
                for &m in &m_candidates {
                    cells.push(TableCell {
                        i: clamp_index(i, TableAxis::Density, grid.nh.len()),
                        j: clamp_index(j, TableAxis::Temperature, grid.temperature.len()),
                        k: clamp_index(k, TableAxis::Metallicity, grid.metallicity.len()),
                        m: clamp_index(m, TableAxis::Redshift, grid.redshift.len()),
                    });
                }
            }
        }
    }
    NeighborSet { cells }
}

/// Distinct batches holding any neighbor of one query point.
pub fn batches_for(grid: &TableGrid, point: &QueryPoint) -> BTreeSet<BatchId> {
    neighbor_cells(grid, point)
        .cells()
        .iter()
        .map(|&cell| grid.batch_id(cell))
        .collect()
}

/// Union of the batch sets over a whole normalized query.
pub fn batches_for_all(grid: &TableGrid, batch: &QueryBatch) -> PlasmaResult<BTreeSet<BatchId>> {
    let mut ids = BTreeSet::new();
    for point in batch.points() {
        ids.extend(batches_for(grid, point));
    }
    if ids.is_empty() {
        return Err(PlasmaError::NoBatchesResolved);
    }
    Ok(ids)
}
