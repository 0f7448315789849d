// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Synthetic observations and in-memory collaborators for tests.

use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    path::{Path, PathBuf},
};

use fitsio::{
    tables::{ColumnDataType, ColumnDescription},
    FitsFile,
};
use hifitime::Epoch;
use ndarray::prelude::*;

use crate::{
    convert::FrequencyAxis,
    cycle::Polarisation,
    duty_cycle::{DutyCycle, Phase, SignalFlag},
    io::{
        read::{
            RfInput, SectionDescriptor, SectionType, Subscan, SubscanHeader, SubscanReadError,
            SubscanReader, Summary, Weather,
        },
        write::{ArchiveOpenOptions, SpectrumWriteError, SpectrumWriter},
    },
    spectrum::{CalibratedSpectrum, SpectrumHeader},
};

/// 2024-08-21 06:00:00 UTC.
pub(crate) const TEST_MJD: f64 = 60543.25;
/// The spacing of consecutive synthetic subscans \[days\].
pub(crate) const SUBSCAN_SPACING: f64 = 1e-4;

pub(crate) fn section(id: usize, kind: SectionType, bins: usize) -> SectionDescriptor {
    SectionDescriptor {
        id,
        kind,
        bins,
        bandwidth: 300.0,
        sample_rate: 600.0,
    }
}

pub(crate) fn rf_input(feed: u32, section: usize, polarisation: &str) -> RfInput {
    RfInput {
        feed,
        section,
        polarisation: polarisation.to_string(),
        frequency: 22_000.0,
        local_oscillator: 21_900.0,
        calibration_mark: 8.0,
    }
}

pub(crate) fn header(signal: SignalFlag) -> SubscanHeader {
    SubscanHeader {
        signal,
        site_longitude: 0.16,
        site_latitude: 0.69,
        right_ascension: 1.5,
        declination: 0.38,
        receiver: "K".to_string(),
        date: "2024-08-22T10:00:00".to_string(),
        antenna: "SRT".to_string(),
        scan_id: 3,
        subscan_id: 1,
        source: "W3OH".to_string(),
    }
}

pub(crate) fn summary() -> Summary {
    Summary {
        rest_frequencies: vec![22_235.08, 22_235.08],
        vrad: -45.0,
        vdef: "RADI".to_string(),
        vframe: "LSRK".to_string(),
        backend_name: "sar".to_string(),
    }
}

/// The width of a section's "Ch<id>" column.
pub(crate) fn column_width(section: &SectionDescriptor) -> usize {
    match section.kind {
        SectionType::Stokes => 4 * section.bins,
        SectionType::Simple | SectionType::Spectra => section.bins,
    }
}

/// A subscan whose channel columns are all `value`, with `rows` time samples.
pub(crate) fn make_subscan(
    path: &Path,
    signal: SignalFlag,
    mjd: f64,
    sections: Vec<SectionDescriptor>,
    rf_inputs: Vec<RfInput>,
    rows: usize,
    value: f32,
) -> Subscan {
    let channels = sections
        .iter()
        .map(|s| (s.id, Array2::from_elem((rows, column_width(s)), value)))
        .collect();
    Subscan {
        path: path.to_path_buf(),
        header: header(signal),
        unit_integration: 0.5,
        sections,
        rf_inputs,
        first_time: Epoch::from_mjd_utc(mjd),
        azimuth: 2.0,
        elevation: 0.9,
        weather: Weather {
            humidity: 0.4,
            temperature: 20.0,
            pressure: 1000.0,
        },
        channels,
    }
}

/// A [`SubscanReader`] that hands out subscans from memory. The files still
/// have to exist for the inventory to find them; see [`touch`].
#[derive(Default)]
pub(crate) struct MockReader {
    pub(crate) subscans: HashMap<PathBuf, Subscan>,
    pub(crate) summary: Option<Summary>,
}

impl MockReader {
    pub(crate) fn insert(&mut self, subscan: Subscan) {
        self.subscans.insert(subscan.path.clone(), subscan);
    }
}

impl SubscanReader for MockReader {
    fn read_flag_and_timestamp(&self, path: &Path) -> Result<(SignalFlag, Epoch), SubscanReadError> {
        let s = self.read_subscan(path)?;
        Ok((s.header.signal, s.first_time))
    }

    fn read_subscan(&self, path: &Path) -> Result<Subscan, SubscanReadError> {
        Ok(self
            .subscans
            .get(path)
            .unwrap_or_else(|| panic!("no subscan for {}", path.display()))
            .clone())
    }

    fn read_summary(&self, _path: &Path) -> Result<Summary, SubscanReadError> {
        Ok(self.summary.clone().unwrap_or_else(summary))
    }
}

pub(crate) fn touch(path: &Path) {
    File::create(path).unwrap();
}

/// The values each phase's channels hold in a synthetic observation.
#[derive(Clone, Copy)]
pub(crate) struct PhaseValues {
    pub(crate) sig: f32,
    pub(crate) on: f32,
    pub(crate) off: f32,
    pub(crate) cal: f32,
}

impl PhaseValues {
    pub(crate) fn get(&self, phase: Phase) -> f32 {
        match phase {
            Phase::Sig => self.sig,
            Phase::On => self.on,
            Phase::Off => self.off,
            Phase::Cal => self.cal,
        }
    }
}

impl Default for PhaseValues {
    fn default() -> Self {
        PhaseValues {
            sig: 10.0,
            on: 5.0,
            off: 2.0,
            cal: 10.0,
        }
    }
}

/// Create (empty) files for `num_cycles` cycles of `duty_cycle` in `dir`, plus
/// a summary file, and a reader that knows their contents. Subscan files are
/// named so that their alphabetical order is the reverse of their time order.
pub(crate) fn observation(
    dir: &Path,
    duty_cycle: &DutyCycle,
    num_cycles: usize,
    sections: &[SectionDescriptor],
    rf_inputs: &[RfInput],
    values: PhaseValues,
) -> MockReader {
    let mut reader = MockReader::default();
    let sequence = duty_cycle.phase_sequence();
    let total = num_cycles * sequence.len();
    for (i, phase) in sequence.iter().cycle().take(total).enumerate() {
        let path = dir.join(format!("{:04}_subscan.fits", 9999 - i));
        touch(&path);
        reader.insert(make_subscan(
            &path,
            phase.flag(),
            TEST_MJD + i as f64 * SUBSCAN_SPACING,
            sections.to_vec(),
            rf_inputs.to_vec(),
            2,
            values.get(*phase),
        ));
    }
    touch(&dir.join("summary.fits"));
    reader
}

/// A record with `num_channels` channels counting up from 0.
pub(crate) fn calibrated_spectrum(cycle: usize, num_channels: usize) -> CalibratedSpectrum {
    CalibratedSpectrum {
        cycle,
        section: 0,
        polarisation: Polarisation::Lcp,
        header: SpectrumHeader {
            telescope: "SRT-K-sar-LL".to_string(),
            source: "W3OH".to_string(),
            line: "F0-300".to_string(),
            scan: 3,
            subscan: 1,
            observation_date: -6,
            reduction_date: -5,
            ut: 1.57,
            epoch: 2000.0,
            right_ascension: 1.5,
            declination: 0.38,
            azimuth: 2.0,
            elevation: 0.9,
            integration: 3.0,
            tsys: 2.0,
            ambient_temperature: 293.15,
            ambient_pressure: 1000.0,
            axis: FrequencyAxis::new(22_000.0, 300.0, num_channels, 22_235.08, -45.0, "LSRK"),
        },
        data: Array1::range(0.0, num_channels as f32, 1.0),
    }
}

/// A [`SpectrumWriter`] that keeps records in memory, keyed by file.
#[derive(Default)]
pub(crate) struct MemoryWriter {
    pub(crate) files: BTreeMap<PathBuf, Vec<CalibratedSpectrum>>,
    pub(crate) open: Option<PathBuf>,
    /// Every `open` call as (path, create_if_absent, overwrite).
    pub(crate) opens: Vec<(PathBuf, bool, bool)>,
    /// Writes to files with this name fail.
    pub(crate) fail_on: Option<PathBuf>,
}

impl SpectrumWriter for MemoryWriter {
    fn probe_exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn open(&mut self, path: &Path, options: ArchiveOpenOptions) -> Result<(), SpectrumWriteError> {
        self.opens
            .push((path.to_path_buf(), options.create_if_absent, options.overwrite));
        let files = &mut self.files;
        match (files.contains_key(path), options.create_if_absent, options.overwrite) {
            (true, _, true) => {
                files.insert(path.to_path_buf(), vec![]);
            }
            (true, true, false) => {
                return Err(SpectrumWriteError::AlreadyExists {
                    path: path.to_path_buf(),
                })
            }
            (true, false, false) => (),
            (false, true, _) => {
                files.insert(path.to_path_buf(), vec![]);
            }
            (false, false, _) => {
                return Err(SpectrumWriteError::NotFound {
                    path: path.to_path_buf(),
                })
            }
        }
        self.open = Some(path.to_path_buf());
        Ok(())
    }

    fn write(&mut self, record: &CalibratedSpectrum) -> Result<(), SpectrumWriteError> {
        let path = self.open.clone().ok_or(SpectrumWriteError::NotOpen)?;
        if self.fail_on.as_deref() == Some(path.as_path()) {
            return Err(SpectrumWriteError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "synthetic failure",
            )));
        }
        self.files
            .entry(path)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SpectrumWriteError> {
        self.open.take().map(|_| ()).ok_or(SpectrumWriteError::NotOpen)
    }
}

/// Write a subscan out the way DISCOS does. `calibration_mark_column` lets
/// tests use the misspelt column name of older files.
pub(crate) fn write_subscan_fits(path: &Path, subscan: &Subscan, calibration_mark_column: &str) {
    let mut fptr = FitsFile::create(path).open().unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    let h = &subscan.header;
    hdu.write_key(&mut fptr, "SIGNAL", h.signal.to_string()).unwrap();
    hdu.write_key(&mut fptr, "SiteLongitude", h.site_longitude).unwrap();
    hdu.write_key(&mut fptr, "SiteLatitude", h.site_latitude).unwrap();
    hdu.write_key(&mut fptr, "RightAscension", h.right_ascension).unwrap();
    hdu.write_key(&mut fptr, "Declination", h.declination).unwrap();
    hdu.write_key(&mut fptr, "Receiver Code", format!("{}BAND", h.receiver)).unwrap();
    hdu.write_key(&mut fptr, "DATE", h.date.as_str()).unwrap();
    hdu.write_key(&mut fptr, "ANTENNA", h.antenna.as_str()).unwrap();
    hdu.write_key(&mut fptr, "SCANID", h.scan_id).unwrap();
    hdu.write_key(&mut fptr, "SubScanID", h.subscan_id).unwrap();
    hdu.write_key(&mut fptr, "SOURCE", h.source.as_str()).unwrap();

    let columns = [
        ColumnDescription::new("id").with_type(ColumnDataType::Int).create().unwrap(),
        ColumnDescription::new("type")
            .with_type(ColumnDataType::String)
            .that_repeats(8)
            .create()
            .unwrap(),
        ColumnDescription::new("bins").with_type(ColumnDataType::Int).create().unwrap(),
        ColumnDescription::new("sampleRate")
            .with_type(ColumnDataType::Double)
            .create()
            .unwrap(),
        ColumnDescription::new("bandwidth")
            .with_type(ColumnDataType::Double)
            .create()
            .unwrap(),
    ];
    let hdu = fptr.create_table("SECTION TABLE", &columns).unwrap();
    hdu.write_key(&mut fptr, "Integration", subscan.unit_integration * 1000.0)
        .unwrap();
    let s = &subscan.sections;
    hdu.write_col(&mut fptr, "id", &s.iter().map(|s| s.id as i32).collect::<Vec<_>>())
        .unwrap();
    hdu.write_col(
        &mut fptr,
        "type",
        &s.iter().map(|s| s.kind.to_string()).collect::<Vec<_>>(),
    )
    .unwrap();
    hdu.write_col(&mut fptr, "bins", &s.iter().map(|s| s.bins as i32).collect::<Vec<_>>())
        .unwrap();
    hdu.write_col(&mut fptr, "sampleRate", &s.iter().map(|s| s.sample_rate).collect::<Vec<_>>())
        .unwrap();
    hdu.write_col(&mut fptr, "bandwidth", &s.iter().map(|s| s.bandwidth).collect::<Vec<_>>())
        .unwrap();

    let columns = [
        ColumnDescription::new("feed").with_type(ColumnDataType::Int).create().unwrap(),
        ColumnDescription::new("polarization")
            .with_type(ColumnDataType::String)
            .that_repeats(3)
            .create()
            .unwrap(),
        ColumnDescription::new("section").with_type(ColumnDataType::Int).create().unwrap(),
        ColumnDescription::new("frequency")
            .with_type(ColumnDataType::Double)
            .create()
            .unwrap(),
        ColumnDescription::new("localOscillator")
            .with_type(ColumnDataType::Double)
            .create()
            .unwrap(),
        ColumnDescription::new(calibration_mark_column)
            .with_type(ColumnDataType::Double)
            .create()
            .unwrap(),
    ];
    let hdu = fptr.create_table("RF INPUTS", &columns).unwrap();
    let rf = &subscan.rf_inputs;
    hdu.write_col(&mut fptr, "feed", &rf.iter().map(|r| r.feed as i32).collect::<Vec<_>>())
        .unwrap();
    hdu.write_col(
        &mut fptr,
        "polarization",
        &rf.iter().map(|r| r.polarisation.clone()).collect::<Vec<_>>(),
    )
    .unwrap();
    hdu.write_col(
        &mut fptr,
        "section",
        &rf.iter().map(|r| r.section as i32).collect::<Vec<_>>(),
    )
    .unwrap();
    hdu.write_col(&mut fptr, "frequency", &rf.iter().map(|r| r.frequency).collect::<Vec<_>>())
        .unwrap();
    hdu.write_col(
        &mut fptr,
        "localOscillator",
        &rf.iter().map(|r| r.local_oscillator).collect::<Vec<_>>(),
    )
    .unwrap();
    hdu.write_col(
        &mut fptr,
        calibration_mark_column,
        &rf.iter().map(|r| r.calibration_mark).collect::<Vec<_>>(),
    )
    .unwrap();

    let num_rows = subscan.channels.values().next().map(|c| c.nrows()).unwrap_or(1);
    let mut columns = vec![
        ColumnDescription::new("time")
            .with_type(ColumnDataType::Double)
            .create()
            .unwrap(),
        ColumnDescription::new("az").with_type(ColumnDataType::Double).create().unwrap(),
        ColumnDescription::new("el").with_type(ColumnDataType::Double).create().unwrap(),
        ColumnDescription::new("weather")
            .with_type(ColumnDataType::Double)
            .that_repeats(3)
            .create()
            .unwrap(),
    ];
    for (id, data) in &subscan.channels {
        columns.push(
            ColumnDescription::new(&format!("Ch{id}"))
                .with_type(ColumnDataType::Float)
                .that_repeats(data.ncols())
                .create()
                .unwrap(),
        );
    }
    let hdu = fptr.create_table("DATA TABLE", &columns).unwrap();
    let start = subscan.first_time.to_mjd_utc_days();
    let times: Vec<f64> = (0..num_rows)
        .map(|i| start + i as f64 * subscan.unit_integration / 86400.0)
        .collect();
    hdu.write_col(&mut fptr, "time", &times).unwrap();
    hdu.write_col(&mut fptr, "az", &vec![subscan.azimuth; num_rows]).unwrap();
    hdu.write_col(&mut fptr, "el", &vec![subscan.elevation; num_rows]).unwrap();
    let w = subscan.weather;
    let weather: Vec<f64> = (0..num_rows)
        .flat_map(|_| [w.humidity, w.temperature, w.pressure])
        .collect();
    hdu.write_col(&mut fptr, "weather", &weather).unwrap();
    for (id, data) in &subscan.channels {
        let flat: Vec<f32> = data.iter().copied().collect();
        hdu.write_col(&mut fptr, &format!("Ch{id}"), &flat).unwrap();
    }
}

/// Write a summary file with the given header values.
pub(crate) fn write_summary_fits(path: &Path, summary: &Summary) {
    let mut fptr = FitsFile::create(path).open().unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    for (i, f) in summary.rest_frequencies.iter().enumerate() {
        hdu.write_key(&mut fptr, &format!("RESTFREQ{}", i + 1), *f).unwrap();
    }
    hdu.write_key(&mut fptr, "VRAD", summary.vrad).unwrap();
    hdu.write_key(&mut fptr, "VDEF", summary.vdef.as_str()).unwrap();
    hdu.write_key(&mut fptr, "VFRAME", summary.vframe.as_str()).unwrap();
    hdu.write_key(&mut fptr, "BackendName", format!("{}dara", summary.backend_name))
        .unwrap();
}
