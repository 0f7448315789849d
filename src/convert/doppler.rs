// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The frequency and velocity axis of an output spectrum.

use log::debug;
use strum_macros::Display;

use crate::constants::VEL_C_KM_S;

/// The frame the velocity axis is referred to.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum VelocityFrame {
    Helio,
    Lsr,
    Observer,
    Unknown,
}

impl VelocityFrame {
    /// Classify a summary "VFRAME" value.
    pub fn from_vframe(vframe: &str) -> VelocityFrame {
        match vframe.trim() {
            "BARY" => VelocityFrame::Helio,
            "LSRK" | "LSRD" => VelocityFrame::Lsr,
            "TOPCEN" => VelocityFrame::Observer,
            _ => VelocityFrame::Unknown,
        }
    }
}

/// Frequencies in MHz, velocities in km/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyAxis {
    pub rest_frequency: f64,
    pub num_channels: usize,
    /// The (one-indexed) channel that `frequency_offset` refers to.
    pub reference_channel: f64,
    pub frequency_offset: f64,
    pub frequency_resolution: f64,
    pub velocity_resolution: f64,
    pub velocity_offset: f64,
    pub velocity_frame: VelocityFrame,
    /// In units of c, with the sign convention of the spectral archive.
    pub doppler: f64,
}

impl FrequencyAxis {
    /// `frequency` is the sky frequency of the first channel of a section
    /// that is `bandwidth` wide with `bins` channels.
    pub fn new(
        frequency: f64,
        bandwidth: f64,
        bins: usize,
        rest_frequency: f64,
        vrad: f64,
        vframe: &str,
    ) -> FrequencyAxis {
        let frequency_resolution = bandwidth / bins as f64;
        let central_frequency = frequency + bandwidth / 2.0;
        let (reference_channel, frequency_offset) = if bins % 2 == 0 {
            ((bins / 2) as f64, -frequency_resolution / 2.0)
        } else {
            ((bins / 2 + 1) as f64, 0.0)
        };
        let velocity_resolution = -(frequency_resolution / central_frequency) * VEL_C_KM_S;
        let velocity_frame = VelocityFrame::from_vframe(vframe);
        let v_observer = -((central_frequency - rest_frequency) / rest_frequency) * VEL_C_KM_S;
        let doppler = -(v_observer + vrad) / VEL_C_KM_S;
        debug!(
            "central channel {reference_channel}, offset at 0 {frequency_offset}, velocity frame {velocity_frame}, doppler {doppler}"
        );

        FrequencyAxis {
            rest_frequency,
            num_channels: bins,
            reference_channel,
            frequency_offset,
            frequency_resolution,
            velocity_resolution,
            velocity_offset: vrad,
            velocity_frame,
            doppler,
        }
    }
}
