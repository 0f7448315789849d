// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DutyCycleError {
    #[error("Invalid duty cycle '{descriptor}'; expected 'on:off:cal' or 'sig:on:off:cal' made of non-negative integers")]
    Invalid { descriptor: String },

    #[error("The duty cycle '{descriptor}' has no subscans; at least one phase must be non-zero")]
    AllZero { descriptor: String },
}
