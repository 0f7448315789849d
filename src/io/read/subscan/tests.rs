// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::tests::*;

fn stokes_subscan(path: &Path) -> Subscan {
    let mut subscan = make_subscan(
        path,
        SignalFlag::RefCal,
        TEST_MJD,
        vec![section(0, SectionType::Stokes, 4)],
        vec![rf_input(0, 0, "LCP"), rf_input(0, 0, "RCP")],
        3,
        0.0,
    );
    // Make every value distinct so the layout is checked.
    subscan.channels.insert(
        0,
        Array2::from_shape_fn((3, 16), |(r, c)| (r * 16 + c) as f32),
    );
    subscan
}

#[test]
fn test_subscan_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("subscan.fits");
    let expected = stokes_subscan(&path);
    write_subscan_fits(&path, &expected, "calibrationMark");

    let reader = FitsSubscanReader::new();
    let (flag, time) = reader.read_flag_and_timestamp(&path).unwrap();
    assert_eq!(flag, SignalFlag::RefCal);
    assert_abs_diff_eq!(time.to_mjd_utc_days(), TEST_MJD, epsilon = 1e-9);

    let subscan = reader.read_subscan(&path).unwrap();
    assert_eq!(subscan.header.signal, SignalFlag::RefCal);
    assert_eq!(subscan.header.receiver, "K");
    assert_eq!(subscan.header.antenna, "SRT");
    assert_eq!(subscan.header.source, "W3OH");
    assert_eq!(subscan.header.scan_id, 3);
    assert_eq!(subscan.header.subscan_id, 1);
    assert_eq!(subscan.header.date, expected.header.date);
    assert_abs_diff_eq!(subscan.header.right_ascension, 1.5, epsilon = 1e-6);
    assert_abs_diff_eq!(subscan.header.site_latitude, 0.69, epsilon = 1e-6);
    assert_abs_diff_eq!(subscan.unit_integration, 0.5);
    assert_eq!(subscan.sections, expected.sections);
    assert_eq!(subscan.rf_inputs, expected.rf_inputs);
    assert_abs_diff_eq!(subscan.azimuth, 2.0);
    assert_abs_diff_eq!(subscan.elevation, 0.9);
    assert_eq!(subscan.weather, expected.weather);
    assert_eq!(subscan.channels[&0], expected.channels[&0]);
}

#[test]
fn test_misspelt_calibration_mark_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.fits");
    let expected = stokes_subscan(&path);
    write_subscan_fits(&path, &expected, "calibratonMark");

    let subscan = FitsSubscanReader::new().read_subscan(&path).unwrap();
    assert_abs_diff_eq!(subscan.rf_inputs[0].calibration_mark, 8.0);
}

#[test]
fn test_missing_calibration_mark_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.fits");
    write_subscan_fits(&path, &stokes_subscan(&path), "mark");

    let result = FitsSubscanReader::new().read_subscan(&path);
    assert!(matches!(
        result,
        Err(SubscanReadError::MissingCalibrationMark { .. })
    ));
}

#[test]
fn test_unknown_signal_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("subscan.fits");
    {
        let mut fptr = FitsFile::create(&path).open().unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        hdu.write_key(&mut fptr, "SIGNAL", "SKY").unwrap();
    }

    let result = FitsSubscanReader::new().read_flag_and_timestamp(&path);
    assert!(
        matches!(&result, Err(SubscanReadError::UnknownSignalFlag { flag, .. }) if flag == "SKY"),
        "{result:?}"
    );
}

#[test]
fn test_unreadable_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.fits");
    std::fs::write(&path, b"not a fits file").unwrap();

    let result = FitsSubscanReader::new().read_subscan(&path);
    assert!(matches!(
        result,
        Err(SubscanReadError::Fits(FitsError::Open { .. }))
    ));
}

#[test]
fn test_summary_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("summary.fits");
    let expected = summary();
    write_summary_fits(&path, &expected);

    let result = FitsSubscanReader::new().read_summary(&path).unwrap();
    assert_eq!(result.rest_frequencies.len(), 2);
    assert_abs_diff_eq!(result.rest_frequencies[0], 22_235.08, epsilon = 1e-6);
    assert_abs_diff_eq!(result.vrad, -45.0);
    assert_eq!(result.vdef, "RADI");
    assert_eq!(result.vframe, "LSRK");
    // Only the first three characters of "sardara".
    assert_eq!(result.backend_name, "sar");
}

#[test]
fn test_summary_without_rest_frequencies() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("summary.fits");
    let mut s = summary();
    s.rest_frequencies.clear();
    write_summary_fits(&path, &s);

    let result = FitsSubscanReader::new().read_summary(&path);
    assert!(matches!(
        result,
        Err(SubscanReadError::NoRestFrequencies { .. })
    ));
}
