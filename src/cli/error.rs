// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all discos2class-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use crate::{
    convert::ConvertError,
    duty_cycle::DutyCycleError,
    inventory::InventoryError,
    io::{read::SubscanReadError, GlobError},
    verification::VerificationError,
};

/// The *only* publicly visible error from discos2class.
#[derive(Error, Debug)]
pub enum Discos2ClassError {
    /// An error related to the duty cycle descriptor.
    #[error("{0}\n\nA duty cycle looks like 'on:off:cal' (position switching) or 'sig:on:off:cal' (nodding), e.g. '2:2:1'")]
    DutyCycle(String),

    /// An error related to the contents of a scan directory.
    #[error("{0}")]
    Scan(String),

    /// The subscans don't follow the duty cycle.
    #[error("{0}\n\nCheck the duty cycle, or convert anyway with --no-verify")]
    Verification(String),

    /// An error related to argument files.
    #[error("{0}")]
    ArgFile(String),

    /// A cfitsio error. Because these are usually quite spartan, some
    /// suggestions are provided here.
    #[error("cfitsio error: {0}\n\nIf you don't know what this means, try turning up verbosity (-d or -dd) and maybe disabling progress bars.")]
    Cfitsio(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<DutyCycleError> for Discos2ClassError {
    fn from(e: DutyCycleError) -> Self {
        Self::DutyCycle(e.to_string())
    }
}

impl From<VerificationError> for Discos2ClassError {
    fn from(e: VerificationError) -> Self {
        Self::Verification(e.to_string())
    }
}

impl From<SubscanReadError> for Discos2ClassError {
    fn from(e: SubscanReadError) -> Self {
        let s = e.to_string();
        match e {
            SubscanReadError::Fits(_) => Self::Cfitsio(s),
            _ => Self::Scan(s),
        }
    }
}

impl From<InventoryError> for Discos2ClassError {
    fn from(e: InventoryError) -> Self {
        let s = e.to_string();
        match e {
            InventoryError::CorruptSubscan {
                source: SubscanReadError::Fits(_),
                ..
            } => Self::Cfitsio(s),
            InventoryError::Glob(e) => Self::from(e),
            InventoryError::Io { .. } => Self::Generic(s),
            InventoryError::MissingSummaryFile { .. }
            | InventoryError::AmbiguousSummaryFile { .. }
            | InventoryError::EmptyDirectory { .. }
            | InventoryError::CorruptSubscan { .. } => Self::Scan(s),
        }
    }
}

impl From<ConvertError> for Discos2ClassError {
    fn from(e: ConvertError) -> Self {
        let s = e.to_string();
        match e {
            ConvertError::Inventory(e) => Self::from(e),
            ConvertError::Verification(e) => Self::from(e),
            ConvertError::Subscan {
                source: SubscanReadError::Fits(_),
                ..
            }
            | ConvertError::Summary {
                source: SubscanReadError::Fits(_),
                ..
            } => Self::Cfitsio(s),
            ConvertError::Subscan { .. }
            | ConvertError::Summary { .. }
            | ConvertError::SummaryNotLoaded { .. }
            | ConvertError::NoRestFrequency
            | ConvertError::NoSuchCycle { .. }
            | ConvertError::Cycle { .. }
            | ConvertError::MissingSection { .. }
            | ConvertError::MissingRfInput { .. } => Self::Scan(s),
            ConvertError::OutputDir { .. } | ConvertError::Io(_) => Self::Generic(s),
        }
    }
}

impl From<GlobError> for Discos2ClassError {
    fn from(e: GlobError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<std::io::Error> for Discos2ClassError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
