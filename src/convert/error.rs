// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from converting a scan.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    cycle::CycleError, inventory::InventoryError, io::read::SubscanReadError,
    verification::VerificationError,
};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("Couldn't read subscan {path}: {source}")]
    Subscan {
        path: PathBuf,
        source: SubscanReadError,
    },

    #[error("Couldn't read summary file {path}: {source}")]
    Summary {
        path: PathBuf,
        source: SubscanReadError,
    },

    #[error("The summary of {dir} has to be loaded before converting")]
    SummaryNotLoaded { dir: PathBuf },

    #[error("The summary has no rest frequencies")]
    NoRestFrequency,

    #[error("There is no cycle {cycle}; the scan has {num_cycles} complete cycle(s)")]
    NoSuchCycle { cycle: usize, num_cycles: usize },

    #[error("Cycle {cycle}: {source}")]
    Cycle { cycle: usize, source: CycleError },

    #[error("{path} has no section {section}")]
    MissingSection { path: PathBuf, section: usize },

    #[error("{path} has no RF input for section {section}")]
    MissingRfInput { path: PathBuf, section: usize },

    #[error("Couldn't create output directory {dir}: {source}")]
    OutputDir {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
