// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. Spectra are accumulated in double
precision and only converted to single precision when they are written out.
 */

/// Speed of light \[km/s\].
pub const VEL_C_KM_S: f64 = 299_792.458;

/// The file extension of subscan and summary files.
pub const DATA_EXTENSION: &str = "fits";

/// The file extension of the spectral archives that are written out.
pub const OUTPUT_EXTENSION: &str = "fits";

/// Files whose names start with this (case insensitive) are summary files,
/// not subscans.
pub const SUMMARY_PREFIX: &str = "sum";

/// The glob used to find the summary file inside a scan directory. It matches
/// [`SUMMARY_PREFIX`] in any case.
pub(crate) const SUMMARY_GLOB: &str = "[sS][uU][mM]*.fits";

/// SKARAB writes one file per feed; its filenames contain this marker.
pub const SKARAB_FEED_MARKER: &str = "FEED_";

/// The default directory that spectral archives are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "classconverter";

/// Observation and reduction dates in the output are days relative to this
/// MJD.
pub const CLASS_DATE_MJD_OFFSET: i64 = 60549;

/// The equinox of the written coordinates.
pub const OUTPUT_EPOCH: f64 = 2000.0;

/// Add this to a temperature in Celsius to get Kelvin.
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

/// The largest record (in channels) the spectral archive will accept.
pub const MAX_RECORD_SIZE: usize = 999_999;
