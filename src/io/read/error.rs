// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from reading subscan and summary files.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubscanReadError {
    #[error("{file}: Unknown signal flag '{flag}'; expected one of REFSIG, SIGNAL, REFERENCE or REFCAL")]
    UnknownSignalFlag { file: PathBuf, flag: String },

    #[error("{file}: Unknown section type '{kind}' for section {id}")]
    UnknownSectionType {
        file: PathBuf,
        id: usize,
        kind: String,
    },

    #[error("{file}: The '{table}' table has no rows")]
    EmptyTable { file: PathBuf, table: &'static str },

    #[error("{file}: The 'weather' column has {found} values per row; expected at least 3")]
    BadWeather { file: PathBuf, found: usize },

    #[error("{file}: Neither a 'calibrationMark' nor a 'calibratonMark' column is in the RF INPUTS table")]
    MissingCalibrationMark { file: PathBuf },

    #[error("{file}: No RESTFREQ keywords were found in the summary")]
    NoRestFrequencies { file: PathBuf },

    #[error(transparent)]
    Fits(#[from] super::fits::FitsError),
}
