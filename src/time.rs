// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions around time.

use std::f64::consts::TAU;

use hifitime::Epoch;

use crate::constants::CLASS_DATE_MJD_OFFSET;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// The whole UTC day of an [`Epoch`] as a date of the spectral archive (MJD
/// relative to [`CLASS_DATE_MJD_OFFSET`]).
pub(crate) fn class_date(e: Epoch) -> i64 {
    e.to_mjd_utc_days().floor() as i64 - CLASS_DATE_MJD_OFFSET
}

/// The elapsed fraction of the UTC day as an angle \[radians\].
pub(crate) fn ut_radians(e: Epoch) -> f64 {
    let mjd = e.to_mjd_utc_days();
    (mjd - mjd.floor()) * TAU
}

/// The UTC year and (one-indexed) day of the year.
pub(crate) fn year_and_day_of_year(e: Epoch) -> (i32, u32) {
    let (year, month, day, _, _, _, _) = e.to_gregorian_utc();
    let midnight = Epoch::from_gregorian_utc_at_midnight(year, month, day);
    let new_year = Epoch::from_gregorian_utc_at_midnight(year, 1, 1);
    let days = ((midnight - new_year).to_seconds() / SECONDS_PER_DAY).round() as u32;
    (year, days + 1)
}

/// Parse a header date like "2024-08-22T10:00:00" (UTC).
pub(crate) fn parse_header_date(date: &str) -> Option<Epoch> {
    Epoch::from_gregorian_str(date.trim()).ok()
}
