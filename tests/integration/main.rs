// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod args_file;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::str::from_utf8;

use assert_cmd::{output::OutputError, Command};
use tempfile::TempDir;

fn discos2class() -> Command {
    Command::cargo_bin("discos2class").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

fn make_file_in_dir<T: AsRef<Path>, U: AsRef<Path>>(filename: T, dir: U) -> (PathBuf, File) {
    let path = dir.as_ref().join(filename);
    let f = File::create(&path).expect("couldn't make file");
    (path, f)
}

#[test]
fn test_version() {
    let cmd = discos2class().arg("--version").ok();
    assert!(cmd.is_ok(), "--version failed: {}", cmd.err().unwrap());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stdout.starts_with("discos2class"), "{stdout}");
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}

#[test]
fn test_duty_cycle_is_required() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cmd = discos2class().arg(tmp_dir.path()).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: No duty cycle was supplied"), "{stderr}");
}

#[test]
fn test_invalid_duty_cycle() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    #[rustfmt::skip]
    let cmd = discos2class()
        .args(["-c", "2:two:1"])
        .arg(tmp_dir.path())
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("on:off:cal"), "{stderr}");
}

#[test]
fn test_bad_scans_only_fail_when_debugging() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let output_dir = tmp_dir.path().join("out");
    // A scan directory with a subscan that isn't a FITS file.
    let scan_dir = tmp_dir.path().join("scan");
    std::fs::create_dir(&scan_dir).unwrap();
    make_file_in_dir("20240821-060000-W3OH_001_001.fits", &scan_dir);
    make_file_in_dir("summary.fits", &scan_dir);

    #[rustfmt::skip]
    let cmd = discos2class()
        .args(["-c", "2:2:1", "--no-progress-bars"])
        .arg("-o").arg(&output_dir)
        .arg(&scan_dir)
        .ok();
    assert!(cmd.is_ok(), "a bad scan should be skipped: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Cannot convert scan"), "{stdout}");
    assert!(stdout.contains("0 of 1 scan(s) converted"), "{stdout}");

    #[rustfmt::skip]
    let cmd = discos2class()
        .args(["-c", "2:2:1", "--no-progress-bars", "-d"])
        .arg("-o").arg(&output_dir)
        .arg(&scan_dir)
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: cfitsio error"), "{stderr}");
}

#[test]
fn test_empty_scan_directory() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    #[rustfmt::skip]
    let cmd = discos2class()
        .args(["-c", "1:1:1", "-d", "--dry-run"])
        .arg(tmp_dir.path())
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("contains no subscan files"), "{stderr}");
}
