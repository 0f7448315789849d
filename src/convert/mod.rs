// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Converting a whole scan directory into calibrated spectra.
//!
//! A [`ScanConverter`] finds and orders the subscans of a scan, splits them
//! into duty cycles, accumulates each cycle with a [`ScanCycle`] and turns
//! the mean spectra into [`CalibratedSpectrum`] records.

pub mod calibration;
pub mod doppler;
mod error;

pub use calibration::{calibrate, reference_phase, trimmed_mean, Calibration};
pub use doppler::{FrequencyAxis, VelocityFrame};
pub use error::ConvertError;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    thread::{self, ScopedJoinHandle},
};

use crossbeam_channel::bounded;
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, error, info, trace, warn};
use scopeguard::defer_on_unwind;

use crate::{
    constants::{CELSIUS_TO_KELVIN, OUTPUT_EPOCH, OUTPUT_EXTENSION},
    cycle::{LogicalSection, OnOffCal, Polarisation, ScanCycle},
    duty_cycle::{DutyCycle, ObservingMode, Phase},
    inventory::{self, Backend, SubscanRecord},
    io::{
        read::{Subscan, SubscanReader, Summary},
        write::{ArchiveOpenOptions, SpectrumWriteError, SpectrumWriter},
    },
    spectrum::{CalibratedSpectrum, SpectrumHeader},
    time::{class_date, parse_header_date, ut_radians, year_and_day_of_year},
    verification::{self, VerificationResult},
    PROGRESS_BARS,
};

/// The records of one duty cycle, and the archive they belong in.
#[derive(Debug, Clone)]
pub struct ConvertedCycle {
    /// The (zero-indexed) cycle of the scan.
    pub index: usize,

    /// The archive filename (no directory).
    pub file_name: String,

    pub records: Vec<CalibratedSpectrum>,
}

/// What [`ScanConverter::run`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub cycles: usize,
    pub records_written: usize,
    pub records_failed: usize,
    /// Subscans of a trailing, incomplete cycle.
    pub subscans_dropped: usize,
}

pub struct ScanConverter {
    reader: Box<dyn SubscanReader>,
    scan_dir: PathBuf,
    duty_cycle: DutyCycle,
    skip_calibration: bool,
    backend: Backend,
    /// In accumulation order.
    records: Vec<SubscanRecord>,
    summary: Option<Summary>,
}

impl ScanConverter {
    /// Find and order the subscans of `scan_dir`.
    pub fn new(
        reader: Box<dyn SubscanReader>,
        scan_dir: &Path,
        duty_cycle: DutyCycle,
        skip_calibration: bool,
    ) -> Result<ScanConverter, ConvertError> {
        let inventory = inventory::scan(scan_dir, reader.as_ref())?;
        let records = inventory::order(inventory.records, inventory.backend, &duty_cycle);
        debug!(
            "{}: {} {} scan, duty cycle {duty_cycle}",
            scan_dir.display(),
            inventory.backend,
            duty_cycle.mode()
        );

        Ok(ScanConverter {
            reader,
            scan_dir: scan_dir.to_path_buf(),
            duty_cycle,
            skip_calibration,
            backend: inventory.backend,
            records,
            summary: None,
        })
    }

    /// Load the scan's summary file.
    pub fn load_summary(&mut self) -> Result<&Summary, ConvertError> {
        let path = inventory::find_summary_file(&self.scan_dir)?;
        self.load_summary_from(&path)
    }

    pub fn load_summary_from(&mut self, path: &Path) -> Result<&Summary, ConvertError> {
        debug!("Loading summary from {}", path.display());
        let summary = self
            .reader
            .read_summary(path)
            .map_err(|source| ConvertError::Summary {
                path: path.to_path_buf(),
                source,
            })?;
        if summary.rest_frequencies.is_empty() {
            return Err(ConvertError::NoRestFrequency);
        }
        debug!(
            "Rest frequencies: {:?}; VRAD {} ({}, {}); backend {}",
            summary.rest_frequencies, summary.vrad, summary.vdef, summary.vframe, summary.backend_name
        );
        Ok(&*self.summary.insert(summary))
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn duty_cycle(&self) -> &DutyCycle {
        &self.duty_cycle
    }

    /// The subscans in the order they are accumulated in.
    pub fn records(&self) -> &[SubscanRecord] {
        &self.records
    }

    /// Check the ordered subscans against the duty cycle. Each feed's
    /// subscans follow the duty cycle as given, even when it is doubled for
    /// accumulation.
    pub fn verify(&self) -> VerificationResult {
        let pattern = verification::build_expected_pattern(&self.duty_cycle);
        verification::verify(&self.records, &pattern)
    }

    /// The duty cycle subscans are accumulated with. SKARAB nodding writes
    /// each feed into its own files, so one cycle holds twice the subscans.
    pub fn accumulation_duty_cycle(&self) -> DutyCycle {
        match (self.backend, self.duty_cycle.mode()) {
            (Backend::Skarab, ObservingMode::Nodding) => self.duty_cycle.doubled(),
            _ => self.duty_cycle.clone(),
        }
    }

    pub fn num_cycles(&self) -> usize {
        self.records.len() / self.accumulation_duty_cycle().total_length()
    }

    /// The number of subscans left over after the last complete cycle.
    pub fn num_dropped(&self) -> usize {
        self.records.len() % self.accumulation_duty_cycle().total_length()
    }

    /// Convert every complete cycle, one at a time.
    pub fn convert(&self) -> impl Iterator<Item = Result<ConvertedCycle, ConvertError>> + '_ {
        self.warn_partial_cycle();
        (0..self.num_cycles()).map(move |index| self.convert_cycle(index))
    }

    fn warn_partial_cycle(&self) {
        let dropped = self.num_dropped();
        if dropped > 0 {
            warn!(
                "{}: the last cycle is incomplete; dropping {dropped} subscan(s)",
                self.scan_dir.display()
            );
        }
    }

    fn read_subscan(&self, path: &Path) -> Result<Subscan, ConvertError> {
        self.reader
            .read_subscan(path)
            .map_err(|source| ConvertError::Subscan {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Accumulate and calibrate one cycle.
    pub fn convert_cycle(&self, index: usize) -> Result<ConvertedCycle, ConvertError> {
        let summary = self
            .summary
            .as_ref()
            .ok_or_else(|| ConvertError::SummaryNotLoaded {
                dir: self.scan_dir.clone(),
            })?;
        let duty_cycle = self.accumulation_duty_cycle();
        let length = duty_cycle.total_length();
        let window = self
            .records
            .get(index * length..(index + 1) * length)
            .ok_or(ConvertError::NoSuchCycle {
                cycle: index,
                num_cycles: self.num_cycles(),
            })?;
        let cycle_err = |source| ConvertError::Cycle {
            cycle: index,
            source,
        };

        // All metadata comes from the first subscan of the cycle.
        let first = self.read_subscan(&window[0].path)?;
        let mut scan_cycle = ScanCycle::new(&first, &duty_cycle).map_err(cycle_err)?;
        let phases = self.duty_cycle.phase_sequence();
        for (i, (record, &phase)) in window.iter().zip(phases.iter().cycle()).enumerate() {
            trace!("cycle {index}: {} as {phase}", record.path.display());
            let added = if i == 0 {
                scan_cycle.add_data_file(&first, phase)
            } else {
                scan_cycle.add_data_file(&self.read_subscan(&record.path)?, phase)
            };
            added.map_err(cycle_err)?;
        }

        let means = scan_cycle.onoffcal().map_err(cycle_err)?;
        let mut records = vec![];
        for section in scan_cycle.sections() {
            for &polarisation in &section.polarisations {
                if let Some(onoffcal) = means.get(&(section.id, polarisation)) {
                    records.push(self.make_record(
                        index,
                        &first,
                        summary,
                        &scan_cycle,
                        section,
                        polarisation,
                        onoffcal,
                    )?);
                }
            }
        }

        let file_name = self.output_file_name(&first);
        debug!("cycle {index}: {} records for {file_name}", records.len());
        Ok(ConvertedCycle {
            index,
            file_name,
            records,
        })
    }

    /// `<YYYYDDD>_<source>_<psw|nod>.fits`, from the UTC date of `first`.
    fn output_file_name(&self, first: &Subscan) -> String {
        let (year, day) = year_and_day_of_year(first.first_time);
        format!(
            "{year}{day:03}_{}_{}.{OUTPUT_EXTENSION}",
            first.header.source.trim(),
            self.duty_cycle.mode().file_tag()
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn make_record(
        &self,
        index: usize,
        first: &Subscan,
        summary: &Summary,
        scan_cycle: &ScanCycle,
        section: &LogicalSection,
        polarisation: Polarisation,
        onoffcal: &OnOffCal,
    ) -> Result<CalibratedSpectrum, ConvertError> {
        let physical = section.physical_section(polarisation);
        let descriptor = first
            .section(physical)
            .ok_or_else(|| ConvertError::MissingSection {
                path: first.path.clone(),
                section: physical,
            })?;
        let rf = first
            .rf_input(physical, polarisation.rf_label())
            .ok_or_else(|| ConvertError::MissingRfInput {
                path: first.path.clone(),
                section: physical,
            })?;

        let (rest_frequency, fallback) = summary
            .rest_frequency(physical)
            .ok_or(ConvertError::NoRestFrequency)?;
        if fallback {
            warn!("No rest frequency for section {physical}; using the same rest frequency for each section");
        }
        let axis = FrequencyAxis::new(
            rf.frequency,
            descriptor.bandwidth,
            section.bins,
            rest_frequency,
            summary.vrad,
            &summary.vframe,
        );

        let role = scan_cycle.feed_roles().role(rf.feed);
        // Without CAL data nothing is scaled to Kelvin, whichever feed this is.
        let reference = if self.skip_calibration {
            None
        } else if onoffcal.cal.is_none() {
            warn!(
                "Section {} ({polarisation}) has no '{}' data; leaving it uncalibrated",
                section.id,
                Phase::Cal
            );
            None
        } else {
            let phase = reference_phase(self.duty_cycle.mode(), role);
            let reference = match phase {
                Phase::Sig => onoffcal.sig.as_ref(),
                _ => onoffcal.cal.as_ref(),
            };
            if reference.is_none() {
                warn!(
                    "Section {} ({polarisation}) has no '{phase}' data; leaving it uncalibrated",
                    section.id
                );
            }
            reference
        };
        let calibration = calibrate(
            onoffcal.on.view(),
            onoffcal.off.view(),
            reference.map(|r| r.view()),
            rf.calibration_mark,
        );
        trace!(
            "cycle {index}: section {} ({polarisation}, feed {} {role}) tsys {}",
            section.id,
            rf.feed,
            calibration.tsys
        );

        let integration = scan_cycle
            .accumulation(section.id, polarisation, Phase::On)
            .map(|acc| acc.integration)
            .unwrap_or(0.0);
        let h = &first.header;
        let observed = first.first_time;
        let written = parse_header_date(&h.date).unwrap_or_else(|| {
            debug!("Couldn't parse DATE '{}'; using the observation time", h.date);
            observed
        });
        let header = SpectrumHeader {
            telescope: format!(
                "{}-{}-{}-{}",
                h.antenna.trim(),
                h.receiver,
                summary.backend_name,
                polarisation.class_label()
            ),
            source: h.source.trim().to_string(),
            line: format!("F{}-{:?}", rf.feed, descriptor.bandwidth),
            scan: h.scan_id,
            subscan: h.subscan_id,
            observation_date: class_date(observed),
            reduction_date: class_date(written),
            ut: ut_radians(observed),
            epoch: OUTPUT_EPOCH,
            right_ascension: h.right_ascension,
            declination: h.declination,
            azimuth: first.azimuth,
            elevation: first.elevation,
            integration,
            tsys: calibration.tsys,
            ambient_temperature: first.weather.temperature + CELSIUS_TO_KELVIN,
            ambient_pressure: first.weather.pressure,
            axis,
        };

        Ok(CalibratedSpectrum {
            cycle: index,
            section: section.id,
            polarisation,
            header,
            data: calibration.spectrum.mapv(|x| x as f32),
        })
    }

    /// Convert every cycle and write the records into archives in
    /// `output_dir`.
    ///
    /// Cycles are accumulated on a worker thread and written on this one. A
    /// record that can't be written is logged and skipped. `abort` is checked
    /// between cycles. With `force`, the first record this run writes to an
    /// archive replaces whatever was in it.
    pub fn run(
        &self,
        writer: &mut dyn SpectrumWriter,
        output_dir: &Path,
        force: bool,
        abort: &AtomicCell<bool>,
    ) -> Result<ConversionReport, ConvertError> {
        std::fs::create_dir_all(output_dir).map_err(|source| ConvertError::OutputDir {
            dir: output_dir.to_path_buf(),
            source,
        })?;

        let num_cycles = self.num_cycles();
        let mut report = ConversionReport {
            subscans_dropped: self.num_dropped(),
            ..Default::default()
        };
        self.warn_partial_cycle();
        info!(
            "Converting {num_cycles} cycle(s) of {} into {}",
            self.scan_dir.display(),
            output_dir.display()
        );

        let progress = ProgressBar::with_draw_target(
            Some(num_cycles as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:18}: [{wide_bar:.blue}] {pos:2}/{len:2} cycles ({elapsed_precise}<{eta_precise})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Converting");

        // Channel for transferring cycles from the accumulator to the writer.
        let (tx_cycle, rx_cycle) = bounded(2);
        // Use a variable to track whether the worker has an issue.
        let error = AtomicCell::new(false);

        thread::scope(|scope| -> Result<(), ConvertError> {
            let error = &error;
            let worker: ScopedJoinHandle<Result<(), ConvertError>> = thread::Builder::new()
                .name("accumulate".to_string())
                .spawn_scoped(scope, move || {
                    // If a panic happens, update our atomic error.
                    defer_on_unwind! { error.store(true); }

                    for index in 0..num_cycles {
                        if abort.load() {
                            info!("Aborting after {index} cycle(s)");
                            break;
                        }
                        let cycle = match self.convert_cycle(index) {
                            Ok(c) => c,
                            Err(e) => {
                                error.store(true);
                                return Err(e);
                            }
                        };
                        // The writer only hangs up if it has exited early.
                        if tx_cycle.send(cycle).is_err() {
                            return Ok(());
                        }
                    }

                    drop(tx_cycle);
                    debug!("Finished accumulating");
                    Ok(())
                })?;

            let mut started = HashSet::new();
            for cycle in rx_cycle.iter() {
                let path = output_dir.join(&cycle.file_name);
                for record in &cycle.records {
                    let overwrite = force && started.insert(path.clone());
                    match write_record(writer, &path, record, overwrite) {
                        Ok(()) => report.records_written += 1,
                        Err(e) => {
                            error!(
                                "Couldn't write cycle {} section {} ({}) to {}: {e}",
                                cycle.index,
                                record.section,
                                record.polarisation,
                                path.display()
                            );
                            report.records_failed += 1;
                        }
                    }
                }
                report.cycles += 1;
                progress.inc(1);
            }
            // The worker hangs up once it fails; what it sent before is kept.
            if error.load() {
                warn!(
                    "Accumulation of {} stopped early; only {} cycle(s) were written",
                    self.scan_dir.display(),
                    report.cycles
                );
                progress.abandon_with_message("Accumulation failed");
            }

            match worker.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })?;

        progress.abandon_with_message("Finished converting");
        info!(
            "{}: {} cycle(s), {} record(s) written, {} failed",
            self.scan_dir.display(),
            report.cycles,
            report.records_written,
            report.records_failed
        );
        Ok(report)
    }
}

/// Append `record` to the archive at `path`, creating the archive if needed.
fn write_record(
    writer: &mut dyn SpectrumWriter,
    path: &Path,
    record: &CalibratedSpectrum,
    overwrite: bool,
) -> Result<(), SpectrumWriteError> {
    let options = if overwrite {
        debug!("Replacing {}", path.display());
        ArchiveOpenOptions::overwrite()
    } else if writer.probe_exists(path) {
        ArchiveOpenOptions::append()
    } else {
        debug!("Creating {}", path.display());
        ArchiveOpenOptions::create()
    };
    writer.open(path, options)?;
    let written = writer.write(record);
    let closed = writer.close();
    written.and(closed)
}
