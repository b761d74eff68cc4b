// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagemark: Core types, configuration and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod marker;
pub mod report;
pub mod types;

pub use config::{BuiltinFont, FontSource, GridSpec, IndexPage, IndexSpec, LayoutConfig};
pub use error::{PagemarkError, Result, Severity};
pub use marker::{MarkerRecord, MarkerSet, derive_label};
pub use report::{IndexCell, Placement, RunReport, SkipReason, SkippedMarker};
pub use types::*;
