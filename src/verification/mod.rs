// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Checking that ordered subscans follow the expected duty cycle.

mod error;
#[cfg(test)]
mod tests;

pub use error::VerificationError;

use std::path::PathBuf;

use log::{debug, warn};

use crate::{
    duty_cycle::{DutyCycle, SignalFlag},
    inventory::SubscanRecord,
};

/// The outcome of [`verify`].
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub ok: bool,

    /// The (zero-indexed) cycle of the first mismatch. If everything matched,
    /// the number of cycles that were started.
    pub cycle_index: usize,

    /// The first subscan that didn't match.
    pub file_path: Option<PathBuf>,

    /// The position within the cycle of the first mismatch.
    pub position: usize,

    pub expected: Option<SignalFlag>,
    pub found: Option<SignalFlag>,
}

impl VerificationResult {
    pub fn into_result(self) -> Result<usize, VerificationError> {
        match (self.ok, self.file_path, self.expected, self.found) {
            (false, Some(file_path), Some(expected), Some(found)) => {
                Err(VerificationError::DutyCycleMismatch {
                    cycle_index: self.cycle_index,
                    position: self.position,
                    file_path,
                    expected,
                    found,
                })
            }
            _ => Ok(self.cycle_index),
        }
    }
}

/// The signal flags one cycle of `duty_cycle` must have.
pub fn build_expected_pattern(duty_cycle: &DutyCycle) -> Vec<SignalFlag> {
    duty_cycle.expected_pattern()
}

/// Walk the ordered subscans once, comparing their flags against `pattern`
/// repeated. The first mismatch stops the walk.
pub fn verify(records: &[SubscanRecord], pattern: &[SignalFlag]) -> VerificationResult {
    let mut cycle_index = 0;
    let mut position = 0;
    if pattern.is_empty() {
        return VerificationResult {
            ok: true,
            cycle_index,
            file_path: None,
            position,
            expected: None,
            found: None,
        };
    }

    for record in records {
        let expected = pattern[position];
        if record.flag != expected {
            warn!(
                "Duty cycle mismatch in cycle {cycle_index}: {} is {}, expected {expected}",
                record.path.display(),
                record.flag
            );
            return VerificationResult {
                ok: false,
                cycle_index,
                file_path: Some(record.path.clone()),
                position,
                expected: Some(expected),
                found: Some(record.flag),
            };
        }

        position += 1;
        if position == pattern.len() {
            position = 0;
            cycle_index += 1;
        }
    }

    let started = if position == 0 {
        cycle_index
    } else {
        cycle_index + 1
    };
    debug!("{} subscans follow the duty cycle", records.len());
    VerificationResult {
        ok: true,
        cycle_index: started,
        file_path: None,
        position,
        expected: None,
        found: None,
    }
}
