// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use hifitime::Epoch;

use super::*;

fn records(flags: &[SignalFlag]) -> Vec<SubscanRecord> {
    flags
        .iter()
        .enumerate()
        .map(|(i, &flag)| SubscanRecord {
            path: PathBuf::from(format!("{i:04}.fits")),
            flag,
            timestamp: Epoch::from_mjd_utc(60000.0 + i as f64 * 1e-4),
        })
        .collect()
}

fn repeated(pattern: &[SignalFlag], k: usize) -> Vec<SignalFlag> {
    pattern.iter().copied().cycle().take(k * pattern.len()).collect()
}

#[test]
fn test_happy_path() {
    let pattern = build_expected_pattern(&DutyCycle::position_switching(2, 2, 1));
    assert_eq!(
        pattern,
        [
            SignalFlag::Signal,
            SignalFlag::Signal,
            SignalFlag::Reference,
            SignalFlag::Reference,
            SignalFlag::RefCal
        ]
    );
    let result = verify(&records(&repeated(&pattern, 3)), &pattern);
    assert!(result.ok);
    assert_eq!(result.cycle_index, 3);
    assert_eq!(result.file_path, None);
    assert_eq!(result.into_result().unwrap(), 3);
}

#[test]
fn test_happy_path_nodding() {
    let pattern = build_expected_pattern(&DutyCycle::nodding(1, 6, 6, 1));
    assert_eq!(pattern[0], SignalFlag::RefSig);
    assert_eq!(pattern.len(), 14);
    let result = verify(&records(&repeated(&pattern, 2)), &pattern);
    assert!(result.ok);
}

#[test]
fn test_failure_localisation() {
    let pattern = build_expected_pattern(&DutyCycle::position_switching(2, 2, 1));
    let valid = repeated(&pattern, 3);
    for p in 0..valid.len() {
        let mut flags = valid.clone();
        flags[p] = match flags[p] {
            SignalFlag::Signal => SignalFlag::Reference,
            _ => SignalFlag::Signal,
        };
        let result = verify(&records(&flags), &pattern);
        assert!(!result.ok);
        assert_eq!(result.cycle_index, p / pattern.len());
        assert_eq!(result.position, p % pattern.len());
        assert_eq!(
            result.file_path,
            Some(PathBuf::from(format!("{p:04}.fits")))
        );
        assert_eq!(result.expected, Some(valid[p]));
        assert_eq!(result.found, Some(flags[p]));
    }
}

#[test]
fn test_first_mismatch_wins() {
    let pattern = build_expected_pattern(&DutyCycle::position_switching(1, 1, 1));
    let mut flags = repeated(&pattern, 3);
    flags[4] = SignalFlag::RefSig;
    flags[7] = SignalFlag::RefSig;
    let result = verify(&records(&flags), &pattern);
    assert_eq!(result.cycle_index, 1);
    assert_eq!(result.file_path, Some(PathBuf::from("0004.fits")));

    match result.into_result() {
        Err(VerificationError::DutyCycleMismatch {
            cycle_index,
            file_path,
            expected,
            found,
            ..
        }) => {
            assert_eq!(cycle_index, 1);
            assert_eq!(file_path, PathBuf::from("0004.fits"));
            assert_eq!(expected, SignalFlag::Reference);
            assert_eq!(found, SignalFlag::RefSig);
        }
        other => panic!("expected a mismatch, got {other:?}"),
    }
}

#[test]
fn test_partial_trailing_cycle_still_verifies() {
    let pattern = build_expected_pattern(&DutyCycle::position_switching(1, 1, 1));
    let mut flags = repeated(&pattern, 2);
    flags.push(SignalFlag::Signal);
    let result = verify(&records(&flags), &pattern);
    assert!(result.ok);
    assert_eq!(result.cycle_index, 3);
    assert_eq!(result.position, 1);
}

#[test]
fn test_empty_sequence() {
    let pattern = build_expected_pattern(&DutyCycle::position_switching(1, 1, 1));
    let result = verify(&[], &pattern);
    assert!(result.ok);
    assert_eq!(result.cycle_index, 0);
}
