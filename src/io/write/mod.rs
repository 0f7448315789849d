// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to write calibrated spectra into spectral archives.
//!
//! Archives are opened, written and closed once per record, so a writer only
//! ever has one file open.

mod error;
mod fits;

pub use error::SpectrumWriteError;
pub use fits::FitsSpectrumWriter;

use std::path::Path;

use crate::{constants::MAX_RECORD_SIZE, spectrum::CalibratedSpectrum};

/// How a spectral archive should be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOpenOptions {
    /// Create the file if it doesn't exist. If this is set and the file does
    /// exist (and `overwrite` isn't set), opening fails.
    pub create_if_absent: bool,

    /// Discard anything already in the file.
    pub overwrite: bool,

    /// The maximum number of channels a record may have.
    pub max_record_size: usize,

    /// The file may only ever hold one record.
    pub single_record_mode: bool,
}

impl Default for ArchiveOpenOptions {
    fn default() -> Self {
        ArchiveOpenOptions {
            create_if_absent: true,
            overwrite: false,
            max_record_size: MAX_RECORD_SIZE,
            single_record_mode: false,
        }
    }
}

impl ArchiveOpenOptions {
    /// Create a new file; fail if it already exists.
    pub fn create() -> ArchiveOpenOptions {
        ArchiveOpenOptions::default()
    }

    /// Add records to an existing file; fail if it doesn't exist.
    pub fn append() -> ArchiveOpenOptions {
        ArchiveOpenOptions {
            create_if_absent: false,
            ..Default::default()
        }
    }

    /// Start a file from scratch, whether or not it exists.
    pub fn overwrite() -> ArchiveOpenOptions {
        ArchiveOpenOptions {
            overwrite: true,
            ..Default::default()
        }
    }
}

/// Anything that can store [`CalibratedSpectrum`] records.
pub trait SpectrumWriter {
    /// Does an archive already exist at this path?
    fn probe_exists(&self, path: &Path) -> bool;

    /// Open an archive. Any previously opened archive is closed first.
    fn open(&mut self, path: &Path, options: ArchiveOpenOptions) -> Result<(), SpectrumWriteError>;

    /// Add a record to the open archive.
    fn write(&mut self, record: &CalibratedSpectrum) -> Result<(), SpectrumWriteError>;

    /// Close the open archive.
    fn close(&mut self) -> Result<(), SpectrumWriteError>;
}
