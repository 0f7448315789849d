// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning mean ON/OFF spectra into a differential spectrum in Kelvin.

use log::debug;
use ndarray::prelude::*;

use crate::{
    cycle::FeedRole,
    duty_cycle::{ObservingMode, Phase},
};

/// The mean of the middle third of a spectrum's channels; the edges are
/// spoiled by the bandpass roll-off. Spectra with fewer than three channels
/// are averaged whole.
pub fn trimmed_mean(spectrum: ArrayView1<f64>) -> f64 {
    let n = spectrum.len();
    let mean = if n < 3 {
        spectrum.mean()
    } else {
        let start = n / 3;
        spectrum.slice(s![start..2 * start]).mean()
    };
    mean.unwrap_or(0.0)
}

/// The phase whose noise-diode or sky signal sets the Kelvin scale of a
/// section.
pub fn reference_phase(mode: ObservingMode, role: FeedRole) -> Phase {
    match (mode, role) {
        (ObservingMode::Nodding, FeedRole::Paired) => Phase::Sig,
        _ => Phase::Cal,
    }
}

/// A calibrated spectrum and its system temperature. A system temperature of
/// exactly 1 means the spectrum is uncalibrated.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub tsys: f64,
    pub spectrum: Array1<f64>,
}

impl Calibration {
    pub fn is_calibrated(&self) -> bool {
        self.tsys != 1.0
    }
}

/// Calibrate ON against OFF. Without a reference spectrum, the result is the
/// fractional difference (ON - OFF) / OFF with a system temperature of 1.
pub fn calibrate(
    on: ArrayView1<f64>,
    off: ArrayView1<f64>,
    reference: Option<ArrayView1<f64>>,
    calibration_mark: f64,
) -> Calibration {
    let fractional = (&on - &off) / off;
    match reference {
        None => {
            debug!("skip calibration");
            Calibration {
                tsys: 1.0,
                spectrum: fractional,
            }
        }
        Some(reference) => {
            let reference_mean = trimmed_mean(reference);
            let off_mean = trimmed_mean(off);
            let counts2kelvin = calibration_mark / (reference_mean - off_mean);
            let tsys = counts2kelvin * off_mean;
            debug!(
                "reference mean: {reference_mean}, off mean: {off_mean}, calibration mark: {calibration_mark}, c2k: {counts2kelvin}, tsys: {tsys}"
            );
            Calibration {
                tsys,
                spectrum: fractional * tsys,
            }
        }
    }
}
