// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use super::Polarisation;
use crate::duty_cycle::Phase;

#[derive(Error, Debug)]
pub enum CycleError {
    #[error("{path} has no sections")]
    NoSections { path: PathBuf },

    #[error("{path} has no data column for section {section}")]
    MissingChannel { path: PathBuf, section: usize },

    #[error("{path}: the data of section {section} is {found} channels wide; expected {expected}")]
    BadShape {
        path: PathBuf,
        section: usize,
        expected: usize,
        found: usize,
    },

    #[error("{path}: the columns merged into section {section} have different numbers of rows")]
    RowMismatch { path: PathBuf, section: usize },

    #[error("{path} was given phase '{phase}', which isn't part of the duty cycle")]
    UnexpectedPhase { path: PathBuf, phase: Phase },

    #[error("The duty cycle has no '{phase}' subscans, but '{phase}' is required")]
    MissingPhase { phase: Phase },

    #[error("Section {section} ({polarisation}) collected no samples for phase '{phase}'; was duty cycle verification skipped?")]
    ZeroSamples {
        section: usize,
        polarisation: Polarisation,
        phase: Phase,
    },
}
