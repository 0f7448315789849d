// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use crate::duty_cycle::SignalFlag;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Duty cycle mismatch in cycle {cycle_index} (position {position}): {file_path} is flagged {found}, but {expected} was expected")]
    DutyCycleMismatch {
        cycle_index: usize,
        position: usize,
        file_path: PathBuf,
        expected: SignalFlag,
        found: SignalFlag,
    },
}
