// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Spectral archives as FITS files: an empty primary HDU followed by one
//! "SPECTRUM" image HDU per record, with the record header as keywords.

use std::path::{Path, PathBuf};

use fitsio::{
    hdu::FitsHdu,
    images::{ImageDescription, ImageType},
    FitsFile,
};
use log::{debug, trace, warn};

use super::{ArchiveOpenOptions, SpectrumWriteError, SpectrumWriter};
use crate::spectrum::CalibratedSpectrum;

/// The extension name of every record HDU.
pub(crate) const RECORD_EXTNAME: &str = "SPECTRUM";

struct OpenArchive {
    fptr: FitsFile,
    path: PathBuf,
    options: ArchiveOpenOptions,
    num_records: usize,
}

/// Writes spectral archives with cfitsio.
#[derive(Default)]
pub struct FitsSpectrumWriter {
    open: Option<OpenArchive>,
}

impl FitsSpectrumWriter {
    pub fn new() -> FitsSpectrumWriter {
        FitsSpectrumWriter::default()
    }
}

/// Write the header of a record as keywords of its HDU.
fn write_header(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    record: &CalibratedSpectrum,
) -> Result<(), fitsio::errors::Error> {
    let h = &record.header;
    let axis = &h.axis;
    hdu.write_key(fptr, "TELESCOP", h.telescope.as_str())?;
    hdu.write_key(fptr, "OBJECT", h.source.as_str())?;
    hdu.write_key(fptr, "LINE", h.line.as_str())?;
    hdu.write_key(fptr, "SCAN", h.scan)?;
    hdu.write_key(fptr, "SUBSCAN", h.subscan)?;
    hdu.write_key(fptr, "CYCLE", record.cycle as i64)?;
    hdu.write_key(fptr, "SECTION", record.section as i64)?;
    hdu.write_key(fptr, "POLARIZ", record.polarisation.to_string())?;
    hdu.write_key(fptr, "DOBS", h.observation_date)?;
    hdu.write_key(fptr, "DRED", h.reduction_date)?;
    hdu.write_key(fptr, "UT", h.ut)?;
    hdu.write_key(fptr, "EQUINOX", h.epoch)?;
    hdu.write_key(fptr, "RA", h.right_ascension)?;
    hdu.write_key(fptr, "DEC", h.declination)?;
    hdu.write_key(fptr, "AZIMUTH", h.azimuth)?;
    hdu.write_key(fptr, "ELEVATIO", h.elevation)?;
    hdu.write_key(fptr, "OBSTIME", h.integration)?;
    hdu.write_key(fptr, "TSYS", h.tsys)?;
    hdu.write_key(fptr, "TAMBIENT", h.ambient_temperature)?;
    hdu.write_key(fptr, "PAMBIENT", h.ambient_pressure)?;
    hdu.write_key(fptr, "RESTFREQ", axis.rest_frequency)?;
    hdu.write_key(fptr, "NCHAN", axis.num_channels as i64)?;
    hdu.write_key(fptr, "RCHAN", axis.reference_channel)?;
    hdu.write_key(fptr, "FOFF", axis.frequency_offset)?;
    hdu.write_key(fptr, "FRES", axis.frequency_resolution)?;
    hdu.write_key(fptr, "VRES", axis.velocity_resolution)?;
    hdu.write_key(fptr, "VOFF", axis.velocity_offset)?;
    hdu.write_key(fptr, "VELTYPE", axis.velocity_frame.to_string())?;
    hdu.write_key(fptr, "DOPPLER", axis.doppler)?;
    Ok(())
}

/// The number of HDUs in a file, including the primary.
fn count_hdus(fptr: &mut FitsFile) -> Result<usize, SpectrumWriteError> {
    let mut num_hdus = 0;
    let mut status = 0;
    unsafe {
        // ffthdu = fits_get_num_hdus
        fitsio_sys::ffthdu(fptr.as_raw(), &mut num_hdus, &mut status);
    }
    fitsio::errors::check_status(status)?;
    Ok(num_hdus as usize)
}

impl SpectrumWriter for FitsSpectrumWriter {
    fn probe_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn open(&mut self, path: &Path, options: ArchiveOpenOptions) -> Result<(), SpectrumWriteError> {
        if self.open.is_some() {
            self.close()?;
        }

        let exists = path.exists();
        let (fptr, num_records) = match (exists, options.create_if_absent, options.overwrite) {
            (true, _, true) => {
                debug!("Overwriting {}", path.display());
                std::fs::remove_file(path)?;
                (FitsFile::create(path).open()?, 0)
            }
            (true, true, false) => {
                return Err(SpectrumWriteError::AlreadyExists {
                    path: path.to_path_buf(),
                })
            }
            (true, false, false) => {
                let mut fptr = FitsFile::edit(path)?;
                let num_records = count_hdus(&mut fptr)?.saturating_sub(1);
                trace!("Appending to {} ({num_records} records)", path.display());
                (fptr, num_records)
            }
            (false, true, _) => {
                debug!("Creating {}", path.display());
                (FitsFile::create(path).open()?, 0)
            }
            (false, false, _) => {
                return Err(SpectrumWriteError::NotFound {
                    path: path.to_path_buf(),
                })
            }
        };

        self.open = Some(OpenArchive {
            fptr,
            path: path.to_path_buf(),
            options,
            num_records,
        });
        Ok(())
    }

    fn write(&mut self, record: &CalibratedSpectrum) -> Result<(), SpectrumWriteError> {
        let archive = self.open.as_mut().ok_or(SpectrumWriteError::NotOpen)?;
        let size = record.data.len();
        if size > archive.options.max_record_size {
            return Err(SpectrumWriteError::RecordTooLarge {
                path: archive.path.clone(),
                size,
                max: archive.options.max_record_size,
            });
        }
        if archive.options.single_record_mode && archive.num_records > 0 {
            return Err(SpectrumWriteError::SingleRecord {
                path: archive.path.clone(),
            });
        }

        let fptr = &mut archive.fptr;
        let image_description = ImageDescription {
            data_type: ImageType::Float,
            dimensions: &[size],
        };
        let hdu = fptr.create_image(RECORD_EXTNAME, &image_description)?;
        let written = hdu
            .write_image(fptr, &record.data.to_vec())
            .and_then(|_| write_header(fptr, &hdu, record));
        if let Err(e) = written {
            // Take the incomplete record out again.
            if let Err(delete_error) = hdu.delete(fptr) {
                warn!(
                    "Couldn't remove an incomplete record from {}: {delete_error}",
                    archive.path.display()
                );
            }
            return Err(e.into());
        }

        archive.num_records += 1;
        trace!(
            "Wrote record {} (section {}, {}) to {}",
            archive.num_records,
            record.section,
            record.polarisation,
            archive.path.display()
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), SpectrumWriteError> {
        // cfitsio flushes and closes the file when the handle is dropped.
        self.open.take().map(drop).ok_or(SpectrumWriteError::NotOpen)
    }
}
