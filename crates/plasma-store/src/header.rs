// ─────────────────────────────────────────────────────────────────────
// SCPN Plasma Tables — Layout Header
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Table layout loading from the `params/*` and `header/*` entries of a
//! batch archive. Every archive of a family carries the same layout;
//! conventionally the first batch is read.

use std::fs::File;
use std::path::Path;

use ndarray::{Array1, ArrayD, Ix1, IxDyn, OwnedRepr};
use ndarray_npy::NpzReader;

use plasma_types::error::{PlasmaError, PlasmaResult};
use plasma_types::grid::TableGrid;

/// Read the grid axes and batch layout from one table archive.
pub fn load_table_grid(path: &Path) -> PlasmaResult<TableGrid> {
    let file = File::open(path)?;
    let mut npz = NpzReader::new(file).map_err(|e| {
        PlasmaError::Table(format!(
            "Failed to open table archive '{}': {e}",
            path.display()
        ))
    })?;

    let nh = read_axis(&mut npz, "params/nH")?;
    let temperature = read_axis(&mut npz, "params/temperature")?;
    let metallicity = read_axis(&mut npz, "params/metallicity")?;
    let redshift = read_axis(&mut npz, "params/redshift")?;

    let batch_size = read_size(&mut npz, "header/batch_dim")?;
    let total_size = read_size(&mut npz, "header/total_size")?;

    TableGrid::new(nh, temperature, metallicity, redshift, batch_size, total_size)
}

fn read_axis(npz: &mut NpzReader<File>, key: &str) -> PlasmaResult<Array1<f64>> {
    npz.by_name::<OwnedRepr<f64>, Ix1>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<OwnedRepr<f64>, Ix1>(key))
        .map_err(|e| PlasmaError::Table(format!("Failed to read '{key}': {e}")))
}

/// Layout sizes may be written as i64, i32 or f64 and as scalars or
/// small shape arrays whose element product carries the value.
fn read_size(npz: &mut NpzReader<File>, key: &str) -> PlasmaResult<usize> {
    let as_i64: Result<ArrayD<i64>, _> = npz
        .by_name::<OwnedRepr<i64>, IxDyn>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<OwnedRepr<i64>, IxDyn>(key));
    if let Ok(values) = as_i64 {
        return Ok(values.iter().product::<i64>().max(0) as usize);
    }

    let as_i32: Result<ArrayD<i32>, _> = npz
        .by_name::<OwnedRepr<i32>, IxDyn>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<OwnedRepr<i32>, IxDyn>(key));
    if let Ok(values) = as_i32 {
        return Ok(values.iter().map(|&v| v as i64).product::<i64>().max(0) as usize);
    }

    let as_f64: Result<ArrayD<f64>, _> = npz
        .by_name::<OwnedRepr<f64>, IxDyn>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<OwnedRepr<f64>, IxDyn>(key));
    if let Ok(values) = as_f64 {
        return Ok(values.iter().product::<f64>().max(0.0) as usize);
    }

    Err(PlasmaError::Table(format!(
        "Failed to read '{key}' as an integer layout entry"
    )))
}
