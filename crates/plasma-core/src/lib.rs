// ─────────────────────────────────────────────────────────────────────
// SCPN Plasma Tables — Interpolation Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Batch-locating interpolation over chunked 4D plasma tables.
//!
//! Query normalization, neighborhood location, inverse-distance
//! weighted estimation.

pub mod engine;
pub mod interpolator;
pub mod locate;
pub mod normalize;
