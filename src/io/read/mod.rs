// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read DISCOS subscan and summary files.
//!
//! The core of the crate only talks to a [`SubscanReader`]; the cfitsio-backed
//! [`FitsSubscanReader`] is what the binary uses.

mod error;
pub(crate) mod fits;
mod subscan;

pub use error::SubscanReadError;
pub use subscan::FitsSubscanReader;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use hifitime::Epoch;
use ndarray::Array2;
use strum_macros::{Display, EnumString};

use crate::duty_cycle::SignalFlag;

/// Read-only access to the files of one observation.
pub trait SubscanReader: Sync + Send {
    /// Read only what's needed to order a subscan: its signal flag and the
    /// first timestamp of its data table.
    fn read_flag_and_timestamp(&self, path: &Path) -> Result<(SignalFlag, Epoch), SubscanReadError>;

    /// Read everything the accumulator and the output records need.
    fn read_subscan(&self, path: &Path) -> Result<Subscan, SubscanReadError>;

    fn read_summary(&self, path: &Path) -> Result<Summary, SubscanReadError>;
}

/// The kind of a backend section.
#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum SectionType {
    /// One spectrum per row.
    Simple,

    /// A single-polarisation section; sections N and N+1 together hold the two
    /// polarisations of one feed.
    Spectra,

    /// Four polarisation bands side by side in one column.
    Stokes,
}

/// A row of the "SECTION TABLE".
#[derive(Debug, Clone, PartialEq)]
pub struct SectionDescriptor {
    pub id: usize,
    pub kind: SectionType,
    pub bins: usize,
    /// \[MHz\]
    pub bandwidth: f64,
    /// \[MHz\]
    pub sample_rate: f64,
}

/// A row of the "RF INPUTS" table.
#[derive(Debug, Clone, PartialEq)]
pub struct RfInput {
    pub feed: u32,
    pub section: usize,
    /// e.g. "LCP" or "RCP".
    pub polarisation: String,
    /// The sky frequency of the first channel \[MHz\].
    pub frequency: f64,
    /// \[MHz\]
    pub local_oscillator: f64,
    /// The noise diode temperature \[K\].
    pub calibration_mark: f64,
}

/// Weather at the start of a subscan.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Weather {
    /// Relative humidity.
    pub humidity: f64,
    /// \[degrees Celsius\]
    pub temperature: f64,
    /// \[mbar\]
    pub pressure: f64,
}

/// Values from the primary header of a subscan.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscanHeader {
    pub signal: SignalFlag,
    /// \[radians\]
    pub site_longitude: f64,
    /// \[radians\]
    pub site_latitude: f64,
    /// \[radians\]
    pub right_ascension: f64,
    /// \[radians\]
    pub declination: f64,
    /// Only the first character of the "Receiver Code" keyword.
    pub receiver: String,
    /// The file creation date, as written (ISO 8601).
    pub date: String,
    pub antenna: String,
    pub scan_id: i64,
    pub subscan_id: i64,
    pub source: String,
}

/// Everything read out of one subscan file.
#[derive(Debug, Clone)]
pub struct Subscan {
    pub path: PathBuf,
    pub header: SubscanHeader,
    /// The integration time of a single row \[seconds\].
    pub unit_integration: f64,
    pub sections: Vec<SectionDescriptor>,
    pub rf_inputs: Vec<RfInput>,
    /// The first timestamp of the data table.
    pub first_time: Epoch,
    /// The first azimuth of the data table \[radians\].
    pub azimuth: f64,
    /// The first elevation of the data table \[radians\].
    pub elevation: f64,
    pub weather: Weather,
    /// The "Ch<id>" columns of the data table, keyed by section id. Each array
    /// has shape (rows, column width).
    pub channels: BTreeMap<usize, Array2<f32>>,
}

impl Subscan {
    pub fn section(&self, id: usize) -> Option<&SectionDescriptor> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// The RF input of a section with the given polarisation label, falling
    /// back to any RF input of the section.
    pub fn rf_input(&self, section: usize, polarisation: Option<&str>) -> Option<&RfInput> {
        let mut candidates = self.rf_inputs.iter().filter(|rf| rf.section == section);
        match polarisation {
            Some(pol) => self
                .rf_inputs
                .iter()
                .find(|rf| rf.section == section && rf.polarisation.trim() == pol)
                .or_else(|| candidates.next()),
            None => candidates.next(),
        }
    }

    /// The feed that feeds a section.
    pub fn feed_of_section(&self, section: usize) -> Option<u32> {
        self.rf_input(section, None).map(|rf| rf.feed)
    }
}

/// Per-scan constants from the summary file.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// "RESTFREQ1", "RESTFREQ2", ... \[MHz\]
    pub rest_frequencies: Vec<f64>,
    /// Radial velocity \[km/s\].
    pub vrad: f64,
    /// The velocity definition, e.g. "RADI".
    pub vdef: String,
    /// The velocity frame, e.g. "LSRK".
    pub vframe: String,
    /// The first three characters of the backend name.
    pub backend_name: String,
}

impl Summary {
    /// The rest frequency of a section. If the summary doesn't list one for
    /// this section, the first rest frequency is used and the second element
    /// of the tuple is `true`.
    pub fn rest_frequency(&self, section: usize) -> Option<(f64, bool)> {
        match self.rest_frequencies.get(section) {
            Some(&f) => Some((f, false)),
            None => self.rest_frequencies.first().map(|&f| (f, true)),
        }
    }
}
