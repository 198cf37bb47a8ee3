// ─────────────────────────────────────────────────────────────────────
// SCPN Plasma Tables — Dataset Configuration
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Dataset-family configuration: which table family an interpolator
//! serves and how its batch archives and datasets are named.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PlasmaError, PlasmaResult};
use crate::grid::BatchId;

/// Ionization equilibrium assumed by a tabulated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IonizationMode {
    /// Collisional ionization equilibrium.
    CIE,
    /// Photoionization equilibrium.
    PIE,
}

impl fmt::Display for IonizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IonizationMode::CIE => write!(f, "CIE"),
            IonizationMode::PIE => write!(f, "PIE"),
        }
    }
}

impl FromStr for IonizationMode {
    type Err = PlasmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CIE" => Ok(IonizationMode::CIE),
            "PIE" => Ok(IonizationMode::PIE),
            other => Err(PlasmaError::InvalidMode(other.to_string())),
        }
    }
}

/// Table family stored by one distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    Ionization,
    Emission,
}

/// Naming contract of one dataset family.
///
/// The interpolation core is wired with one of these at construction
/// instead of branching on the family anywhere in the call path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub kind: TableKind,
    /// Base key of the per-mode datasets inside each batch archive.
    pub dataset_key: String,
    /// File-name stem of the family's batch archives.
    pub file_stem: String,
}

impl DatasetConfig {
    /// Ion-fraction tables.
    pub fn ionization() -> Self {
        Self {
            kind: TableKind::Ionization,
            dataset_key: "fracIon".to_string(),
            file_stem: "ionization".to_string(),
        }
    }

    /// Emission-spectrum tables.
    pub fn emission() -> Self {
        Self {
            kind: TableKind::Emission,
            dataset_key: "emission".to_string(),
            file_stem: "emission".to_string(),
        }
    }

    /// Load a family description from a JSON file.
    pub fn from_file(path: &str) -> PlasmaResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Archive-internal key of the dataset for one ionization mode.
    pub fn key_for(&self, mode: IonizationMode) -> String {
        format!("{}/{}", self.dataset_key, mode)
    }

    /// File name of one batch archive.
    pub fn batch_file_name(&self, id: BatchId) -> String {
        format!("{}.b_{:06}.npz", self.file_stem, id)
    }
}
