// ─────────────────────────────────────────────────────────────────────
// SCPN Plasma Tables — Query Normalization
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Query argument normalization.
//!
//! Each of the four physical parameters may arrive as a bare scalar, a
//! length-1 array standing in for a scalar, or an array of query
//! values. Normalization flattens them into one list of fully scalar
//! points plus the shape the result must be folded back into.

use ndarray::{Array1, ArrayD};

use plasma_types::error::{PlasmaError, PlasmaResult};

const ARGUMENT_NAMES: [&str; 4] = ["nH", "temperature", "metallicity", "redshift"];

/// One query parameter: a bare scalar or an array of any shape.
#[derive(Debug, Clone)]
pub enum QueryArg {
    Scalar(f64),
    Array(ArrayD<f64>),
}

impl From<f64> for QueryArg {
    fn from(value: f64) -> Self {
        QueryArg::Scalar(value)
    }
}

impl From<Vec<f64>> for QueryArg {
    fn from(values: Vec<f64>) -> Self {
        QueryArg::Array(Array1::from_vec(values).into_dyn())
    }
}

impl From<&[f64]> for QueryArg {
    fn from(values: &[f64]) -> Self {
        QueryArg::Array(Array1::from_vec(values.to_vec()).into_dyn())
    }
}

impl From<Array1<f64>> for QueryArg {
    fn from(values: Array1<f64>) -> Self {
        QueryArg::Array(values.into_dyn())
    }
}

impl From<ArrayD<f64>> for QueryArg {
    fn from(values: ArrayD<f64>) -> Self {
        QueryArg::Array(values)
    }
}

/// A length-1 array behaves as a broadcast scalar, not as an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgClass {
    Scalar,
    Dummy,
    Array,
}

fn classify(arg: &QueryArg) -> ArgClass {
    match arg {
        QueryArg::Scalar(_) => ArgClass::Scalar,
        QueryArg::Array(values) if values.len() == 1 => ArgClass::Dummy,
        QueryArg::Array(_) => ArgClass::Array,
    }
}

/// One fully scalar query in physical parameter space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryPoint {
    pub nh: f64,
    pub temperature: f64,
    pub metallicity: f64,
    pub redshift: f64,
}

/// A normalized query: flat points plus the caller-visible shape.
#[derive(Debug, Clone)]
pub struct QueryBatch {
    input_shape: Vec<usize>,
    points: Vec<QueryPoint>,
    scalar_or_dummy: bool,
}

impl QueryBatch {
    /// Normalize the four query parameters into a flat list of points.
    ///
    /// Array-valued parameters must share one exact shape; scalars and
    /// length-1 arrays broadcast against it elementwise.
    pub fn normalize(
        nh: &QueryArg,
        temperature: &QueryArg,
        metallicity: &QueryArg,
        redshift: &QueryArg,
    ) -> PlasmaResult<Self> {
        let args = [nh, temperature, metallicity, redshift];
        let classes = args.map(classify);
        let scalar_or_dummy = classes.iter().all(|c| *c != ArgClass::Array);

        // The first array-valued parameter fixes the common shape.
        let mut common: Option<Vec<usize>> = None;
        for (pos, arg) in args.iter().enumerate() {
            if classes[pos] != ArgClass::Array {
                continue;
            }
            if let QueryArg::Array(values) = arg {
                match &common {
                    None => common = Some(values.shape().to_vec()),
                    Some(expected) => {
                        if values.shape() != expected.as_slice() {
                            return Err(PlasmaError::IncompatibleShapes {
                                argument: ARGUMENT_NAMES[pos],
                                actual: values.shape().to_vec(),
                                expected: expected.clone(),
                            });
                        }
                    }
                }
            }
        }

        let input_shape = match common {
            Some(shape) => shape,
            None => {
                if !scalar_or_dummy {
                    return Err(PlasmaError::InvalidArguments(
                        "Query parameters are neither scalar nor consistently array-valued"
                            .to_string(),
                    ));
                }
                vec![1]
            }
        };

        // Row-major flattening, matching the shape the result folds into.
        let columns: [Vec<f64>; 4] = args.map(|arg| match arg {
            QueryArg::Scalar(value) => vec![*value],
            QueryArg::Array(values) => values.iter().copied().collect(),
        });

        let count: usize = input_shape.iter().product();
        let mut points = Vec::with_capacity(count);
        for index in 0..count {
            let pick = |pos: usize| {
                let column = &columns[pos];
                if column.len() == 1 {
                    column[0]
                } else {
                    column[index]
                }
            };
            points.push(QueryPoint {
                nh: pick(0),
                temperature: pick(1),
                metallicity: pick(2),
                redshift: pick(3),
            });
        }

        Ok(Self {
            input_shape,
            points,
            scalar_or_dummy,
        })
    }

    /// Shape the caller's arrays had, `[1]` for scalar calls.
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    /// The flattened query points.
    pub fn points(&self) -> &[QueryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when the call must return an array-shaped result.
    ///
    /// Scalar and length-1 parameters keep the call in single-point
    /// form; any genuine array makes it a batch.
    pub fn is_batch(&self) -> bool {
        !self.scalar_or_dummy
    }
}
