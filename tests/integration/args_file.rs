// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests on arguments supplied in files.

use std::io::Write;

use tempfile::TempDir;

use crate::{discos2class, get_cmd_output, make_file_in_dir};

#[test]
fn test_toml_args_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let scan_dir = tmp_dir.path().join("scan");
    std::fs::create_dir(&scan_dir).unwrap();
    let (args_file, mut f) = make_file_in_dir("args.toml", tmp_dir.path());
    writeln!(f, "duty_cycle = \"2:2:1\"").unwrap();
    writeln!(f, "debug = 1").unwrap();
    writeln!(f, "source_dirs = [{:?}]", scan_dir.display().to_string()).unwrap();
    drop(f);

    // The duty cycle and scan come from the file; the empty scan fails
    // because the file turned on debugging.
    let cmd = discos2class().arg("--args-file").arg(&args_file).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("contains no subscan files"), "{stderr}");
}

#[test]
fn test_cli_overrides_args_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let (args_file, mut f) = make_file_in_dir("args.json", tmp_dir.path());
    write!(f, r#"{{"duty_cycle": "2:2:1"}}"#).unwrap();
    drop(f);

    #[rustfmt::skip]
    let cmd = discos2class()
        .args(["-c", "x:y"])
        .arg("--args-file").arg(&args_file)
        .arg(tmp_dir.path())
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("on:off:cal"), "{stderr}");
}

#[test]
fn test_unknown_args_file_type() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let (args_file, _) = make_file_in_dir("args.yaml", tmp_dir.path());
    let cmd = discos2class().arg("--args-file").arg(&args_file).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("recognised file extension"), "{stderr}");
}
