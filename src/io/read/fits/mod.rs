// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions for reading FITS files.

mod error;

pub use error::FitsError;

use std::fmt::Display;

use fitsio::{hdu::*, tables::ConcreteColumnDescription, FitsFile};
use ndarray::Array2;

/// Open a fits file.
#[track_caller]
pub(crate) fn fits_open<P: AsRef<std::path::Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::open(file.as_ref()).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Open a fits file's HDU.
#[track_caller]
pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    hdu_description: T,
) -> Result<FitsHdu, FitsError> {
    fits_fptr.hdu(hdu_description).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{hdu_description}").into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type.
#[track_caller]
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, FitsError> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(e) => match &e {
            fitsio::errors::Error::Fits(fe) => match fe.status {
                202 | 204 => return Ok(None),
                _ => {
                    let caller = std::panic::Location::caller();
                    return Err(FitsError::Fitsio {
                        fits_error: Box::new(e),
                        fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                        hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
                        source_file: caller.file(),
                        source_line: caller.line(),
                        source_column: caller.column(),
                    });
                }
            },
            _ => {
                let caller = std::panic::Location::caller();
                return Err(FitsError::Fitsio {
                    fits_error: Box::new(e),
                    fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                    hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
                    source_file: caller.file(),
                    source_line: caller.line(),
                    source_column: caller.column(),
                });
            }
        },
    };

    // String values may have trailing padding.
    match unparsed_value.trim().parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => {
            let caller = std::panic::Location::caller();
            Err(FitsError::Parse {
                key: keyword.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword, pull out
/// the value of the keyword, parsing it into the desired type.
#[track_caller]
pub(crate) fn fits_get_required_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<T, FitsError> {
    match fits_get_optional_key(fits_fptr, hdu, keyword) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            let caller = std::panic::Location::caller();
            Err(FitsError::MissingKey {
                key: keyword.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
        Err(error) => Err(error),
    }
}

/// Get a column from a fits file's HDU.
#[track_caller]
pub(crate) fn fits_get_col<T: fitsio::tables::ReadsCol>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Vec<T>, FitsError> {
    hdu.read_col(fits_fptr, keyword).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Get a column from a fits file's HDU, if the column exists.
#[track_caller]
pub(crate) fn fits_get_optional_col<T: fitsio::tables::ReadsCol>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<Vec<T>>, FitsError> {
    if fits_find_col(fits_fptr, hdu, keyword)?.is_none() {
        return Ok(None);
    }
    fits_get_col(fits_fptr, hdu, keyword).map(Some)
}

/// Get the number of rows in a table HDU.
#[track_caller]
pub(crate) fn fits_get_num_rows(fits_fptr: &FitsFile, hdu: &FitsHdu) -> Result<usize, FitsError> {
    match &hdu.info {
        HduInfo::TableInfo { num_rows, .. } => Ok(*num_rows),
        _ => {
            let caller = std::panic::Location::caller();
            Err(FitsError::NotTable {
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Find the description of a column in a table HDU. Column names are compared
/// case insensitively, like cfitsio does.
#[track_caller]
fn fits_find_col(
    fits_fptr: &FitsFile,
    hdu: &FitsHdu,
    column: &str,
) -> Result<Option<(usize, ConcreteColumnDescription)>, FitsError> {
    match &hdu.info {
        HduInfo::TableInfo {
            column_descriptions,
            ..
        } => Ok(column_descriptions
            .iter()
            .enumerate()
            .find(|(_, c)| c.name.eq_ignore_ascii_case(column))
            .map(|(i, c)| (i, c.clone()))),
        _ => {
            let caller = std::panic::Location::caller();
            Err(FitsError::NotTable {
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Read a column that holds an array in each row (e.g. a spectrum per time
/// sample) as single-precision floats. The result has shape (rows, repeat).
///
/// It's more effort than it's worth to read the array-in-a-column values via
/// fitsio, so fitsio-sys is used.
#[track_caller]
pub(crate) fn fits_get_vector_col_f32(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    column: &str,
) -> Result<Array2<f32>, FitsError> {
    let caller = std::panic::Location::caller();
    let num_rows = fits_get_num_rows(fits_fptr, hdu)?;
    let (i_col, desc) = match fits_find_col(fits_fptr, hdu, column)? {
        Some(c) => c,
        None => {
            return Err(FitsError::MissingColumn {
                column: column.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    };
    let repeat = desc.data_type.repeat;
    let mut values = vec![0.0_f32; num_rows * repeat];
    if !values.is_empty() {
        read_col_elements(fits_fptr, hdu, i_col, 1, 42, &mut values, caller)?; // TFLOAT (fitsio.h)
    }

    Array2::from_shape_vec((num_rows, repeat), values).map_err(|_| FitsError::MissingColumn {
        column: column.to_string().into_boxed_str(),
        fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
        hdu_num: hdu.number + 1,
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    })
}

/// Read the array held in a single row of a column as double-precision floats.
/// `row` is zero indexed.
#[track_caller]
pub(crate) fn fits_get_vector_cell_f64(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    column: &str,
    row: usize,
) -> Result<Vec<f64>, FitsError> {
    let caller = std::panic::Location::caller();
    let (i_col, desc) = match fits_find_col(fits_fptr, hdu, column)? {
        Some(c) => c,
        None => {
            return Err(FitsError::MissingColumn {
                column: column.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    };
    let mut values = vec![0.0_f64; desc.data_type.repeat];
    if !values.is_empty() {
        read_col_elements(fits_fptr, hdu, i_col, row + 1, 82, &mut values, caller)?; // TDOUBLE (fitsio.h)
    }
    Ok(values)
}

/// Fill `buffer` with consecutive elements of a column, starting at the first
/// element of `first_row` (one indexed). cfitsio converts to `datatype`, which
/// must match `T`.
fn read_col_elements<T>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    i_col: usize,
    first_row: usize,
    datatype: i32,
    buffer: &mut [T],
    caller: &'static std::panic::Location<'static>,
) -> Result<(), FitsError> {
    // Make sure the HDU is the current one before talking to cfitsio directly.
    let hdu_num = hdu.number;
    fits_open_hdu(fits_fptr, hdu_num)?;

    let mut status = 0;
    unsafe {
        // ffgcv = fits_read_col
        fitsio_sys::ffgcv(
            fits_fptr.as_raw(),
            datatype,
            i_col as i32 + 1,
            first_row as i64,
            1,
            buffer.len() as i64,
            std::ptr::null_mut(),
            buffer.as_mut_ptr().cast(),
            &mut 0,
            &mut status,
        );
    }
    fitsio::errors::check_status(status).map_err(|e| FitsError::Fitsio {
        fits_error: Box::new(e),
        fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
        hdu_description: format!("{}", hdu_num + 1).into_boxed_str(),
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    })
}
