// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Convert DISCOS single-dish subscans into duty-cycle averaged, calibrated
//! spectra.
//!
//! A scan directory holds one FITS file per subscan. Subscans are grouped into
//! cycles according to a [`DutyCycle`], the ON, OFF and CAL phases of each
//! cycle are averaged, and one [`CalibratedSpectrum`] per (section,
//! polarisation) is written to a spectral archive.

pub mod cli;
pub mod constants;
pub mod convert;
pub mod cycle;
pub mod duty_cycle;
pub mod inventory;
pub mod io;
pub mod spectrum;
pub(crate) mod time;
pub mod verification;

#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

/// Should we draw progress bars? Only the binary turns these on.
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);

// Re-exports.
pub use cli::{Discos2Class, Discos2ClassError};
pub use convert::{ConversionReport, ScanConverter};
pub use duty_cycle::{DutyCycle, ObservingMode, Phase, SignalFlag};
pub use io::{
    read::{FitsSubscanReader, SubscanReader},
    write::{ArchiveOpenOptions, FitsSpectrumWriter, SpectrumWriter},
};
pub use spectrum::{CalibratedSpectrum, SpectrumHeader};
