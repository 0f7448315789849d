// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use crate::io::{read::SubscanReadError, GlobError};

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Scan directory {dir} does not contain a summary file")]
    MissingSummaryFile { dir: PathBuf },

    #[error("Scan directory {dir} contains more than one summary file: {matches:?}")]
    AmbiguousSummaryFile { dir: PathBuf, matches: Vec<PathBuf> },

    #[error("Scan directory {dir} contains no subscan files")]
    EmptyDirectory { dir: PathBuf },

    #[error("Couldn't read subscan {path}: {source}")]
    CorruptSubscan {
        path: PathBuf,
        source: SubscanReadError,
    },

    #[error("Couldn't list scan directory {dir}: {source}")]
    Io {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Glob(#[from] GlobError),
}
