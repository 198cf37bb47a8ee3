// ─────────────────────────────────────────────────────────────────────
// SCPN Plasma Tables — Table Interpolator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Call orchestration over one dataset family.
//!
//! A call normalizes its arguments, resolves the union of batches the
//! query neighborhoods touch, asks the supplier to make those batches
//! available, opens one handle per batch and drives the engine per
//! point. All call state is local, so a shared interpolator never
//! observes one call from another.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use ndarray::{Array1, ArrayD, IxDyn};

use plasma_store::batch::BatchHandle;
use plasma_store::header::load_table_grid;
use plasma_store::supplier::{BatchSupplier, DirectorySupplier};
use plasma_types::config::{DatasetConfig, IonizationMode};
use plasma_types::error::{PlasmaError, PlasmaResult};
use plasma_types::grid::{BatchId, TableGrid};

use crate::engine::{estimate, InterpConfig};
use crate::locate::{batches_for_all, neighbor_cells};
use crate::normalize::{QueryArg, QueryBatch};

/// Interpolated values plus whether the call was a batch request.
///
/// Single-point calls carry shape `[columns]`; batch calls carry
/// `input_shape + [columns]`.
#[derive(Debug, Clone)]
pub struct InterpolationResult {
    pub values: ArrayD<f64>,
    pub is_batch: bool,
}

/// Interpolates one dataset family over its 4D table grid.
///
/// The grid, the family naming and the batch supplier are wired in at
/// construction. Calls borrow the interpolator immutably, so one
/// instance serves any number of sequential calls.
#[derive(Debug, Clone)]
pub struct TableInterpolator<S: BatchSupplier> {
    grid: TableGrid,
    dataset: DatasetConfig,
    supplier: S,
}

impl<S: BatchSupplier> TableInterpolator<S> {
    pub fn new(grid: TableGrid, dataset: DatasetConfig, supplier: S) -> Self {
        Self {
            grid,
            dataset,
            supplier,
        }
    }

    /// Table grid backing this interpolator.
    pub fn grid(&self) -> &TableGrid {
        &self.grid
    }

    /// Dataset family served by this interpolator.
    pub fn dataset(&self) -> &DatasetConfig {
        &self.dataset
    }

    /// Interpolate with identity scaling and no value clamping.
    pub fn interpolate(
        &self,
        nh: impl Into<QueryArg>,
        temperature: impl Into<QueryArg>,
        metallicity: impl Into<QueryArg>,
        redshift: impl Into<QueryArg>,
        mode: IonizationMode,
    ) -> PlasmaResult<InterpolationResult> {
        self.interpolate_with(
            nh,
            temperature,
            metallicity,
            redshift,
            mode,
            &InterpConfig::default(),
        )
    }

    /// Interpolate with caller-chosen coordinate scaling and cut bounds.
    pub fn interpolate_with(
        &self,
        nh: impl Into<QueryArg>,
        temperature: impl Into<QueryArg>,
        metallicity: impl Into<QueryArg>,
        redshift: impl Into<QueryArg>,
        mode: IonizationMode,
        config: &InterpConfig,
    ) -> PlasmaResult<InterpolationResult> {
        let nh = nh.into();
        let temperature = temperature.into();
        let metallicity = metallicity.into();
        let redshift = redshift.into();
        let batch = QueryBatch::normalize(&nh, &temperature, &metallicity, &redshift)?;
        let dataset = self.dataset.key_for(mode);

        let ids = batches_for_all(&self.grid, &batch)?;
        self.supplier.ensure_local(&ids)?;

        // One handle per batch, shared by every point of the call.
        let mut handles: BTreeMap<BatchId, BatchHandle> = BTreeMap::new();
        for &id in &ids {
            handles.insert(id, self.supplier.open(id)?);
        }

        let mut estimates: Vec<Array1<f64>> = Vec::with_capacity(batch.len());
        for point in batch.points() {
            let neighbors = neighbor_cells(&self.grid, point);
            estimates.push(estimate(
                &self.grid,
                point,
                &neighbors,
                &mut handles,
                &dataset,
                config,
            )?);
        }
        drop(handles);

        fold(estimates, &batch)
    }
}

impl TableInterpolator<DirectorySupplier> {
    /// Ion-fraction family served from a local table directory.
    pub fn ionization_from_dir(dir: impl AsRef<Path>) -> PlasmaResult<Self> {
        Self::family_from_dir(dir.as_ref(), DatasetConfig::ionization())
    }

    /// Emission-spectrum family served from a local table directory.
    pub fn emission_from_dir(dir: impl AsRef<Path>) -> PlasmaResult<Self> {
        Self::family_from_dir(dir.as_ref(), DatasetConfig::emission())
    }

    fn family_from_dir(dir: &Path, dataset: DatasetConfig) -> PlasmaResult<Self> {
        let supplier = DirectorySupplier::new(dir, &dataset);
        supplier.ensure_local(&BTreeSet::from([0]))?;
        let grid = load_table_grid(&supplier.path_for(0))?;
        Ok(Self::new(grid, dataset, supplier))
    }
}

/// Fold the flat per-point estimates back into the caller's shape.
fn fold(estimates: Vec<Array1<f64>>, batch: &QueryBatch) -> PlasmaResult<InterpolationResult> {
    if !batch.is_batch() {
        let single = estimates.into_iter().next().ok_or_else(|| {
            PlasmaError::InvalidArguments("Single-point call produced no estimate".to_string())
        })?;
        return Ok(InterpolationResult {
            values: single.into_dyn(),
            is_batch: false,
        });
    }

    let columns = estimates.first().map(|e| e.len()).unwrap_or(0);
    let mut shape = batch.input_shape().to_vec();
    shape.push(columns);
    let mut flat = Vec::with_capacity(batch.len() * columns);
    for row in &estimates {
        flat.extend(row.iter().copied());
    }
    let values = ArrayD::from_shape_vec(IxDyn(&shape), flat).map_err(|e| {
        PlasmaError::Table(format!("Estimates do not fill result shape {shape:?}: {e}"))
    })?;
    Ok(InterpolationResult {
        values,
        is_batch: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use ndarray_npy::NpzWriter;
    use std::cell::Cell;
    use std::fs::File;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    const NH: [f64; 3] = [1.0, 2.0, 3.0];
    const TEMPERATURE: [f64; 3] = [10.0, 20.0, 30.0];
    const METALLICITY: [f64; 3] = [0.0, 1.0, 2.0];
    const REDSHIFT: [f64; 3] = [0.0, 1.0, 2.0];
    const BATCH_SIZE: usize = 16;
    const TOTAL: usize = 81;

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("{tag}_{}_{nanos}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// PIE rows are [nH + 10*T, 100*Z + z]; CIE rows add 1000 to both.
    fn cell_row(linear: usize, shift: f64) -> [f64; 2] {
        let i = linear % 3;
        let j = (linear / 3) % 3;
        let k = (linear / 9) % 3;
        let m = linear / 27;
        [
            NH[i] + 10.0 * TEMPERATURE[j] + shift,
            100.0 * METALLICITY[k] + REDSHIFT[m] + shift,
        ]
    }

    fn write_ionization_family(dir: &Path) {
        let config = DatasetConfig::ionization();
        let batches = (TOTAL + BATCH_SIZE - 1) / BATCH_SIZE;
        for batch in 0..batches {
            let rows = BATCH_SIZE.min(TOTAL - batch * BATCH_SIZE);
            let mut pie = Array2::<f64>::zeros((rows, 2));
            let mut cie = Array2::<f64>::zeros((rows, 2));
            for row in 0..rows {
                let linear = batch * BATCH_SIZE + (row + 1) % rows;
                let values = cell_row(linear, 0.0);
                pie[[row, 0]] = values[0];
                pie[[row, 1]] = values[1];
                let values = cell_row(linear, 1000.0);
                cie[[row, 0]] = values[0];
                cie[[row, 1]] = values[1];
            }

            let path = dir.join(config.batch_file_name(batch));
            let mut writer = NpzWriter::new(File::create(&path).unwrap());
            writer.add_array("params/nH", &Array1::from(NH.to_vec())).unwrap();
            writer
                .add_array("params/temperature", &Array1::from(TEMPERATURE.to_vec()))
                .unwrap();
            writer
                .add_array("params/metallicity", &Array1::from(METALLICITY.to_vec()))
                .unwrap();
            writer
                .add_array("params/redshift", &Array1::from(REDSHIFT.to_vec()))
                .unwrap();
            writer
                .add_array("header/batch_dim", &array![BATCH_SIZE as i64])
                .unwrap();
            writer
                .add_array("header/total_size", &array![TOTAL as i64])
                .unwrap();
            writer.add_array("fracIon/PIE", &pie).unwrap();
            writer.add_array("fracIon/CIE", &cie).unwrap();
            writer.finish().unwrap();
        }
    }

    fn ionization_fixture(tag: &str) -> (PathBuf, TableInterpolator<DirectorySupplier>) {
        let dir = temp_dir(tag);
        write_ionization_family(&dir);
        let interp = TableInterpolator::ionization_from_dir(&dir).unwrap();
        (dir, interp)
    }

    #[test]
    fn grid_is_read_from_the_first_batch() {
        let (dir, interp) = ionization_fixture("plasma_interp_grid");
        assert_eq!(interp.grid().nh, array![1.0, 2.0, 3.0]);
        assert_eq!(interp.grid().batch_size, 16);
        assert_eq!(interp.grid().total_size, 81);
        assert_eq!(interp.grid().batch_count(), 6);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn exact_grid_point_recovers_the_stored_row() {
        let (dir, interp) = ionization_fixture("plasma_interp_exact");
        let result = interp
            .interpolate(2.0, 20.0, 1.0, 1.0, IonizationMode::PIE)
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!(!result.is_batch);
        assert_eq!(result.values.shape(), &[2]);
        assert!((result.values[[0]] - 202.0).abs() < 1e-8);
        assert!((result.values[[1]] - 101.0).abs() < 1e-8);
    }

    #[test]
    fn mode_selects_the_dataset() {
        let (dir, interp) = ionization_fixture("plasma_interp_mode");
        let pie = interp
            .interpolate(2.0, 20.0, 1.0, 1.0, IonizationMode::PIE)
            .unwrap();
        let cie = interp
            .interpolate(2.0, 20.0, 1.0, 1.0, IonizationMode::CIE)
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!((pie.values[[0]] - 202.0).abs() < 1e-8);
        assert!((cie.values[[0]] - 1202.0).abs() < 1e-8);
    }

    #[test]
    fn midpoint_lands_between_the_brackets() {
        let (dir, interp) = ionization_fixture("plasma_interp_mid");
        let result = interp
            .interpolate(1.5, 20.0, 1.0, 1.0, IonizationMode::PIE)
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        // Brackets store 201 and 202; the neighborhood is symmetric, so
        // the estimate sits in between.
        assert!(result.values[[0]] > 201.0);
        assert!(result.values[[0]] < 202.0);
        assert!((result.values[[0]] - 201.5).abs() < 1e-9);
    }

    #[test]
    fn dummies_broadcast_and_stay_single_point() {
        let (dir, interp) = ionization_fixture("plasma_interp_dummy");
        let result = interp
            .interpolate(vec![2.0], 20.0, vec![1.0], vec![1.0], IonizationMode::PIE)
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!(!result.is_batch);
        assert_eq!(result.values.shape(), &[2]);
        assert!((result.values[[0]] - 202.0).abs() < 1e-8);
    }

    #[test]
    fn batch_calls_fold_into_the_input_shape() {
        let (dir, interp) = ionization_fixture("plasma_interp_shape");
        let result = interp
            .interpolate(
                vec![1.0, 2.0, 3.0],
                20.0,
                vec![1.0],
                1.0,
                IonizationMode::PIE,
            )
            .unwrap();

        assert!(result.is_batch);
        assert_eq!(result.values.shape(), &[3, 2]);

        // Each slice matches the equivalent scalar call.
        for (index, &nh) in [1.0, 2.0, 3.0].iter().enumerate() {
            let single = interp
                .interpolate(nh, 20.0, 1.0, 1.0, IonizationMode::PIE)
                .unwrap();
            assert_eq!(result.values[[index, 0]], single.values[[0]]);
            assert_eq!(result.values[[index, 1]], single.values[[1]]);
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn two_dimensional_inputs_keep_their_shape() {
        let (dir, interp) = ionization_fixture("plasma_interp_2d");
        let nh = array![[1.0, 2.0], [3.0, 1.5]].into_dyn();
        let result = interp
            .interpolate(nh, 20.0, 1.0, 1.0, IonizationMode::PIE)
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!(result.is_batch);
        assert_eq!(result.values.shape(), &[2, 2, 2]);
        assert!((result.values[[0, 1, 0]] - 202.0).abs() < 1e-8);
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let (dir, interp) = ionization_fixture("plasma_interp_determinism");
        let first = interp
            .interpolate(
                vec![1.3, 2.7, 1.9],
                vec![12.0, 28.0, 15.5],
                0.4,
                1.3,
                IonizationMode::CIE,
            )
            .unwrap();
        let second = interp
            .interpolate(
                vec![1.3, 2.7, 1.9],
                vec![12.0, 28.0, 15.5],
                0.4,
                1.3,
                IonizationMode::CIE,
            )
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(first.values, second.values);
    }

    #[test]
    fn queries_outside_the_grid_extrapolate_from_the_edge() {
        let (dir, interp) = ionization_fixture("plasma_interp_outside");
        let result = interp
            .interpolate(0.01, 20.0, 1.0, 1.0, IonizationMode::PIE)
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!(result.values[[0]].is_finite());
        // Only the nH = 1 plane contributes.
        assert!(result.values[[0]] > 200.0);
        assert!(result.values[[0]] < 202.0);
    }

    #[test]
    fn missing_archive_surfaces_as_a_supply_error() {
        let dir = temp_dir("plasma_interp_missing");
        write_ionization_family(&dir);
        let interp = TableInterpolator::ionization_from_dir(&dir).unwrap();

        // Drop the last batch, then query the far grid corner that
        // needs it.
        std::fs::remove_file(dir.join("ionization.b_000005.npz")).unwrap();
        let err = interp
            .interpolate(3.0, 30.0, 2.0, 2.0, IonizationMode::PIE)
            .unwrap_err();
        std::fs::remove_dir_all(&dir).ok();

        assert!(matches!(err, PlasmaError::Supply(_)));
    }

    #[test]
    fn empty_directory_fails_construction() {
        let dir = temp_dir("plasma_interp_empty");
        let err = TableInterpolator::ionization_from_dir(&dir).unwrap_err();
        std::fs::remove_dir_all(&dir).ok();
        assert!(matches!(err, PlasmaError::Supply(_)));
    }

    #[test]
    fn emission_family_reads_its_own_naming() {
        let dir = temp_dir("plasma_interp_emission");
        let config = DatasetConfig::emission();
        let spectrum = array![[5.0, 6.0, 7.0], [8.0, 9.0, 10.0]];
        // 2x1x1x1 grid in one batch; rows shifted one slot.
        let mut data = Array2::<f64>::zeros((2, 3));
        data.row_mut(0).assign(&spectrum.row(1));
        data.row_mut(1).assign(&spectrum.row(0));

        let path = dir.join(config.batch_file_name(0));
        let mut writer = NpzWriter::new(File::create(&path).unwrap());
        writer.add_array("params/nH", &array![1.0, 2.0]).unwrap();
        writer.add_array("params/temperature", &array![10.0]).unwrap();
        writer.add_array("params/metallicity", &array![0.5]).unwrap();
        writer.add_array("params/redshift", &array![0.0]).unwrap();
        writer.add_array("header/batch_dim", &array![2i64]).unwrap();
        writer.add_array("header/total_size", &array![2i64]).unwrap();
        writer.add_array("emission/PIE", &data).unwrap();
        writer.finish().unwrap();

        let interp = TableInterpolator::emission_from_dir(&dir).unwrap();
        let result = interp
            .interpolate(2.0, 10.0, 0.5, 0.0, IonizationMode::PIE)
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(result.values.shape(), &[3]);
        assert!((result.values[[0]] - 8.0).abs() < 1e-8);
        assert!((result.values[[2]] - 10.0).abs() < 1e-8);
    }

    struct ProbeSupplier {
        calls: Cell<usize>,
    }

    impl ProbeSupplier {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl BatchSupplier for ProbeSupplier {
        fn ensure_local(&self, _ids: &BTreeSet<BatchId>) -> PlasmaResult<()> {
            self.calls.set(self.calls.get() + 1);
            Err(PlasmaError::Supply("probe supplier has no archives".into()))
        }

        fn path_for(&self, _id: BatchId) -> PathBuf {
            PathBuf::from("/nonexistent")
        }
    }

    fn probe_interpolator() -> TableInterpolator<ProbeSupplier> {
        let grid = TableGrid::new(
            array![1.0, 2.0],
            array![10.0, 20.0],
            array![0.0, 1.0],
            array![0.0, 1.0],
            4,
            16,
        )
        .unwrap();
        TableInterpolator::new(grid, DatasetConfig::ionization(), ProbeSupplier::new())
    }

    #[test]
    fn shape_mismatch_fails_before_any_supply() {
        let interp = probe_interpolator();
        let err = interp
            .interpolate(
                vec![1.0, 2.0],
                vec![10.0, 20.0, 30.0],
                0.5,
                0.5,
                IonizationMode::PIE,
            )
            .unwrap_err();
        assert!(matches!(err, PlasmaError::IncompatibleShapes { .. }));
        assert_eq!(interp.supplier.calls.get(), 0);
    }

    #[test]
    fn empty_query_fails_before_any_supply() {
        let interp = probe_interpolator();
        let err = interp
            .interpolate(Vec::<f64>::new(), 10.0, 0.5, 0.5, IonizationMode::PIE)
            .unwrap_err();
        assert!(matches!(err, PlasmaError::NoBatchesResolved));
        assert_eq!(interp.supplier.calls.get(), 0);
    }

    #[test]
    fn supply_failure_propagates() {
        let interp = probe_interpolator();
        let err = interp
            .interpolate(1.5, 15.0, 0.5, 0.5, IonizationMode::PIE)
            .unwrap_err();
        assert!(matches!(err, PlasmaError::Supply(_)));
        assert_eq!(interp.supplier.calls.get(), 1);
    }
}
