// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with writing spectral archives.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectrumWriteError {
    #[error("Refusing to create {path}: it already exists")]
    AlreadyExists { path: PathBuf },

    #[error("Can't append to {path}: it doesn't exist")]
    NotFound { path: PathBuf },

    #[error("A record of {size} channels is too large for {path} (maximum {max})")]
    RecordTooLarge {
        path: PathBuf,
        size: usize,
        max: usize,
    },

    #[error("{path} may only hold one record, and already has one")]
    SingleRecord { path: PathBuf },

    #[error("No spectral archive is open")]
    NotOpen,

    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
