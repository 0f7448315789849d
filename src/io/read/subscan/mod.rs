// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading DISCOS subscan and summary FITS files with cfitsio.

#[cfg(test)]
mod tests;

use std::{collections::BTreeMap, path::Path};

use fitsio::{hdu::FitsHdu, FitsFile};
use hifitime::Epoch;
use log::{debug, trace};

use super::{
    fits::*, RfInput, SectionDescriptor, SectionType, Subscan, SubscanHeader, SubscanReadError,
    SubscanReader, Summary, Weather,
};
use crate::duty_cycle::SignalFlag;

const SECTION_TABLE: &str = "SECTION TABLE";
const RF_INPUTS: &str = "RF INPUTS";
const DATA_TABLE: &str = "DATA TABLE";

/// A [`SubscanReader`] for the FITS files written by DISCOS. Every call opens
/// the file, reads what it needs and closes it again.
#[derive(Debug, Default, Clone, Copy)]
pub struct FitsSubscanReader;

impl FitsSubscanReader {
    pub fn new() -> FitsSubscanReader {
        FitsSubscanReader
    }
}

impl SubscanReader for FitsSubscanReader {
    fn read_flag_and_timestamp(&self, path: &Path) -> Result<(SignalFlag, Epoch), SubscanReadError> {
        trace!("Reading the signal flag and first timestamp of {}", path.display());
        let mut fptr = fits_open(path)?;
        let primary = fits_open_hdu(&mut fptr, 0)?;
        let signal = read_signal_flag(&mut fptr, &primary, path)?;

        let data_hdu = fits_open_hdu(&mut fptr, DATA_TABLE)?;
        let first_time = read_first_time(&mut fptr, &data_hdu, path)?;
        Ok((signal, first_time))
    }

    fn read_subscan(&self, path: &Path) -> Result<Subscan, SubscanReadError> {
        debug!("Reading subscan {}", path.display());
        let mut fptr = fits_open(path)?;

        let primary = fits_open_hdu(&mut fptr, 0)?;
        let header = read_primary_header(&mut fptr, &primary, path)?;

        let section_hdu = fits_open_hdu(&mut fptr, SECTION_TABLE)?;
        // The integration time is given in milliseconds.
        let integration_ms: f64 = fits_get_required_key(&mut fptr, &section_hdu, "Integration")?;
        let sections = read_sections(&mut fptr, &section_hdu, path)?;

        let rf_hdu = fits_open_hdu(&mut fptr, RF_INPUTS)?;
        let rf_inputs = read_rf_inputs(&mut fptr, &rf_hdu, path)?;

        let data_hdu = fits_open_hdu(&mut fptr, DATA_TABLE)?;
        let first_time = read_first_time(&mut fptr, &data_hdu, path)?;
        let azimuth = fits_get_vector_cell_f64(&mut fptr, &data_hdu, "az", 0)?[0];
        let elevation = fits_get_vector_cell_f64(&mut fptr, &data_hdu, "el", 0)?[0];
        let weather = match fits_get_vector_cell_f64(&mut fptr, &data_hdu, "weather", 0)?.as_slice() {
            [humidity, temperature, pressure, ..] => Weather {
                humidity: *humidity,
                temperature: *temperature,
                pressure: *pressure,
            },
            other => {
                return Err(SubscanReadError::BadWeather {
                    file: path.to_path_buf(),
                    found: other.len(),
                })
            }
        };

        let mut channels = BTreeMap::new();
        for section in &sections {
            let column = format!("Ch{}", section.id);
            match fits_get_vector_col_f32(&mut fptr, &data_hdu, &column) {
                Ok(data) => {
                    trace!("{column}: {:?}", data.dim());
                    channels.insert(section.id, data);
                }
                // The accumulator decides whether a missing column matters.
                Err(FitsError::MissingColumn { .. }) => {
                    debug!("{}: no column {column}", path.display())
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Subscan {
            path: path.to_path_buf(),
            header,
            unit_integration: integration_ms / 1000.0,
            sections,
            rf_inputs,
            first_time,
            azimuth,
            elevation,
            weather,
            channels,
        })
    }

    fn read_summary(&self, path: &Path) -> Result<Summary, SubscanReadError> {
        debug!("Loading summary from {}", path.display());
        let mut fptr = fits_open(path)?;
        let primary = fits_open_hdu(&mut fptr, 0)?;

        let mut rest_frequencies = vec![];
        while let Some(f) = fits_get_optional_key::<f64>(
            &mut fptr,
            &primary,
            &format!("RESTFREQ{}", rest_frequencies.len() + 1),
        )? {
            rest_frequencies.push(f);
        }
        if rest_frequencies.is_empty() {
            return Err(SubscanReadError::NoRestFrequencies {
                file: path.to_path_buf(),
            });
        }
        debug!("Got rest frequencies: {rest_frequencies:?}");

        let vrad = fits_get_required_key(&mut fptr, &primary, "VRAD")?;
        let vdef = fits_get_required_key(&mut fptr, &primary, "VDEF")?;
        let vframe = fits_get_required_key(&mut fptr, &primary, "VFRAME")?;
        let backend_name: String = fits_get_required_key(&mut fptr, &primary, "BackendName")?;

        Ok(Summary {
            rest_frequencies,
            vrad,
            vdef,
            vframe,
            backend_name: backend_name.chars().take(3).collect(),
        })
    }
}

fn read_signal_flag(
    fptr: &mut FitsFile,
    primary: &FitsHdu,
    path: &Path,
) -> Result<SignalFlag, SubscanReadError> {
    let flag: String = fits_get_required_key(fptr, primary, "SIGNAL")?;
    flag.parse()
        .map_err(|_| SubscanReadError::UnknownSignalFlag {
            file: path.to_path_buf(),
            flag,
        })
}

fn read_first_time(
    fptr: &mut FitsFile,
    data_hdu: &FitsHdu,
    path: &Path,
) -> Result<Epoch, SubscanReadError> {
    if fits_get_num_rows(fptr, data_hdu)? == 0 {
        return Err(SubscanReadError::EmptyTable {
            file: path.to_path_buf(),
            table: DATA_TABLE,
        });
    }
    // MJD, UTC.
    let mjd = fits_get_vector_cell_f64(fptr, data_hdu, "time", 0)?[0];
    Ok(Epoch::from_mjd_utc(mjd))
}

fn read_primary_header(
    fptr: &mut FitsFile,
    primary: &FitsHdu,
    path: &Path,
) -> Result<SubscanHeader, SubscanReadError> {
    let signal = read_signal_flag(fptr, primary, path)?;
    let receiver: String = fits_get_required_key(fptr, primary, "Receiver Code")?;
    Ok(SubscanHeader {
        signal,
        site_longitude: fits_get_required_key(fptr, primary, "SiteLongitude")?,
        site_latitude: fits_get_required_key(fptr, primary, "SiteLatitude")?,
        right_ascension: fits_get_required_key(fptr, primary, "RightAscension")?,
        declination: fits_get_required_key(fptr, primary, "Declination")?,
        receiver: receiver.chars().take(1).collect(),
        date: fits_get_required_key(fptr, primary, "DATE")?,
        antenna: fits_get_required_key(fptr, primary, "ANTENNA")?,
        scan_id: fits_get_required_key(fptr, primary, "SCANID")?,
        subscan_id: fits_get_required_key(fptr, primary, "SubScanID")?,
        source: fits_get_required_key(fptr, primary, "SOURCE")?,
    })
}

fn read_sections(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    path: &Path,
) -> Result<Vec<SectionDescriptor>, SubscanReadError> {
    let ids: Vec<i64> = fits_get_col(fptr, hdu, "id")?;
    let kinds: Vec<String> = fits_get_col(fptr, hdu, "type")?;
    let bins: Vec<i64> = fits_get_col(fptr, hdu, "bins")?;
    let bandwidths: Vec<f64> = fits_get_col(fptr, hdu, "bandwidth")?;
    // Older files don't have a sample rate.
    let sample_rates: Vec<f64> =
        fits_get_optional_col(fptr, hdu, "sampleRate")?.unwrap_or_else(|| vec![0.0; ids.len()]);

    ids.into_iter()
        .zip(kinds)
        .zip(bins)
        .zip(bandwidths)
        .zip(sample_rates)
        .map(|((((id, kind), bins), bandwidth), sample_rate)| {
            let id = id as usize;
            let kind = kind.trim().to_lowercase();
            let kind = kind
                .parse::<SectionType>()
                .map_err(|_| SubscanReadError::UnknownSectionType {
                    file: path.to_path_buf(),
                    id,
                    kind,
                })?;
            Ok(SectionDescriptor {
                id,
                kind,
                bins: bins as usize,
                bandwidth,
                sample_rate,
            })
        })
        .collect()
}

fn read_rf_inputs(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    path: &Path,
) -> Result<Vec<RfInput>, SubscanReadError> {
    let polarisations: Vec<String> = fits_get_col(fptr, hdu, "polarization")?;
    let sections: Vec<i64> = fits_get_col(fptr, hdu, "section")?;
    let frequencies: Vec<f64> = fits_get_col(fptr, hdu, "frequency")?;
    let local_oscillators: Vec<f64> = fits_get_col(fptr, hdu, "localOscillator")?;
    // Some files misspell this column.
    let calibration_marks: Vec<f64> = match fits_get_optional_col(fptr, hdu, "calibrationMark")? {
        Some(c) => c,
        None => fits_get_optional_col(fptr, hdu, "calibratonMark")?.ok_or_else(|| {
            SubscanReadError::MissingCalibrationMark {
                file: path.to_path_buf(),
            }
        })?,
    };
    let feeds: Vec<i64> = fits_get_col(fptr, hdu, "feed")?;

    Ok(polarisations
        .into_iter()
        .zip(sections)
        .zip(frequencies)
        .zip(local_oscillators)
        .zip(calibration_marks)
        .zip(feeds)
        .map(
            |(((((polarisation, section), frequency), local_oscillator), calibration_mark), feed)| {
                RfInput {
                    feed: feed as u32,
                    section: section as usize,
                    polarisation: polarisation.trim().to_string(),
                    frequency,
                    local_oscillator,
                    calibration_mark,
                }
            },
        )
        .collect())
}
