// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The records written to spectral archives.

use ndarray::Array1;

use crate::{convert::FrequencyAxis, cycle::Polarisation};

/// Everything about a spectrum apart from its intensities. Angles are in
/// radians.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumHeader {
    /// `<antenna>-<receiver>-<backend>-<polarisation>`
    pub telescope: String,
    pub source: String,
    /// `F<feed>-<bandwidth>`
    pub line: String,
    pub scan: i64,
    pub subscan: i64,
    /// The observation date (see [`crate::constants::CLASS_DATE_MJD_OFFSET`]).
    pub observation_date: i64,
    /// The date the subscan file was written.
    pub reduction_date: i64,
    pub ut: f64,
    pub epoch: f64,
    pub right_ascension: f64,
    pub declination: f64,
    pub azimuth: f64,
    pub elevation: f64,
    /// The total ON integration time \[seconds\].
    pub integration: f64,
    /// \[K\], or 1 if uncalibrated.
    pub tsys: f64,
    /// \[K\]
    pub ambient_temperature: f64,
    /// \[mbar\]
    pub ambient_pressure: f64,
    pub axis: FrequencyAxis,
}

/// One averaged spectrum of one (cycle, section, polarisation).
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedSpectrum {
    /// The (zero-indexed) cycle of the scan this came from.
    pub cycle: usize,
    pub section: usize,
    pub polarisation: Polarisation,
    pub header: SpectrumHeader,
    pub data: Array1<f32>,
}
