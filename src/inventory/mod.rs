// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Finding the subscans of a scan directory and putting them in the order
//! they must be accumulated in.

mod error;

pub use error::InventoryError;

use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use hifitime::Epoch;
use itertools::Itertools;
use log::{debug, info, trace};
use strum_macros::Display;

use crate::{
    constants::{DATA_EXTENSION, SKARAB_FEED_MARKER, SUMMARY_GLOB, SUMMARY_PREFIX},
    duty_cycle::{DutyCycle, ObservingMode, SignalFlag},
    io::{get_single_match_from_glob, glob_in_dir, read::SubscanReader, GlobError},
};

/// The backend that recorded a scan.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    /// Both feeds' sections are written into the same subscan file.
    Sardara,

    /// Every feed gets its own subscan files.
    Skarab,
}

/// The minimum needed to order a subscan.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscanRecord {
    pub path: PathBuf,
    pub flag: SignalFlag,
    /// The first timestamp of the subscan's data table.
    pub timestamp: Epoch,
}

/// All of the subscans of a scan directory.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub backend: Backend,
    /// Subscan records in directory-listing order. See [`order`].
    pub records: Vec<SubscanRecord>,
}

/// Is this file the summary of a scan rather than a subscan?
pub fn is_summary_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().starts_with(SUMMARY_PREFIX))
        .unwrap_or(false)
}

/// SKARAB filenames carry a per-feed marker; if any of the files has one, the
/// whole scan is SKARAB's.
pub fn detect_backend<P: AsRef<Path>>(paths: &[P]) -> Backend {
    let skarab = paths.iter().any(|p| {
        p.as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().contains(SKARAB_FEED_MARKER))
            .unwrap_or(false)
    });
    if skarab {
        Backend::Skarab
    } else {
        Backend::Sardara
    }
}

/// Read the signal flag and first timestamp of every subscan in `dir`.
///
/// Entries are visited in name order. Only files with the data extension are
/// considered, and the summary file is skipped. Any subscan that can't be read
/// makes the whole scan fail.
pub fn scan(dir: &Path, reader: &dyn SubscanReader) -> Result<Inventory, InventoryError> {
    let io_err = |source| InventoryError::Io {
        dir: dir.to_path_buf(),
        source,
    };
    let mut paths = vec![];
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_data = path.is_file()
            && path
                .extension()
                .map(|e| e.to_string_lossy() == DATA_EXTENSION)
                .unwrap_or(false);
        if !is_data {
            trace!("Ignoring {}", path.display());
            continue;
        }
        if is_summary_file(&path) {
            debug!("Summary file: {}", path.display());
            continue;
        }
        paths.push(path);
    }
    if paths.is_empty() {
        return Err(InventoryError::EmptyDirectory {
            dir: dir.to_path_buf(),
        });
    }
    paths.sort();

    let backend = detect_backend(&paths);
    info!("{} subscans in {} ({backend})", paths.len(), dir.display());

    let records = paths
        .into_iter()
        .map(|path| match reader.read_flag_and_timestamp(&path) {
            Ok((flag, timestamp)) => Ok(SubscanRecord {
                path,
                flag,
                timestamp,
            }),
            Err(source) => Err(InventoryError::CorruptSubscan { path, source }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Inventory { backend, records })
}

/// Find the single summary file of a scan directory.
pub fn find_summary_file(dir: &Path) -> Result<PathBuf, InventoryError> {
    match get_single_match_from_glob(&glob_in_dir(dir, SUMMARY_GLOB)) {
        Ok(p) => Ok(p),
        Err(GlobError::NoMatches { .. }) => Err(InventoryError::MissingSummaryFile {
            dir: dir.to_path_buf(),
        }),
        Err(GlobError::MoreThanOneMatch { matches, .. }) => {
            Err(InventoryError::AmbiguousSummaryFile {
                dir: dir.to_path_buf(),
                matches,
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn by_time(a: &SubscanRecord, b: &SubscanRecord) -> Ordering {
    a.timestamp
        .partial_cmp(&b.timestamp)
        .unwrap_or(Ordering::Equal)
}

/// Put subscan records in the order they are accumulated in.
///
/// Normally that's time order. SKARAB nodding scans alternate between the two
/// feeds' files; those are regrouped so that every half of a (doubled) cycle
/// holds one feed's complete duty cycle. A trailing remainder that doesn't
/// make up a whole doubled cycle keeps its time order.
pub fn order(
    mut records: Vec<SubscanRecord>,
    backend: Backend,
    duty_cycle: &DutyCycle,
) -> Vec<SubscanRecord> {
    match (backend, duty_cycle.mode()) {
        (Backend::Skarab, ObservingMode::Nodding) => {
            debug!("SKARAB nodding; grouping subscans by feed");
            records.sort_by(|a, b| by_time(a, b).then_with(|| a.path.cmp(&b.path)));
            let block = duty_cycle.doubled().total_length() / 2;
            records = deinterleave(records, block);
        }
        _ => records.sort_by(by_time),
    }

    debug!(
        "Ordered subscans: {}",
        records.iter().map(|r| r.path.display()).join(", ")
    );
    records
}

/// Turn alternating items (a0, b0, a1, b1, ...) into blocks (a0, a1, ..., b0,
/// b1, ...). Every complete group of `2 * block` items is regrouped on its
/// own; leftover items are left as they are.
pub fn deinterleave<T>(items: Vec<T>, block: usize) -> Vec<T> {
    regroup(items, block, |group| {
        let (evens, odds): (Vec<_>, Vec<_>) = group
            .into_iter()
            .enumerate()
            .partition(|(i, _)| i % 2 == 0);
        evens.into_iter().chain(odds).map(|(_, t)| t).collect()
    })
}

/// The inverse of [`deinterleave`].
pub fn reinterleave<T>(items: Vec<T>, block: usize) -> Vec<T> {
    regroup(items, block, |mut group| {
        let second = group.split_off(group.len() / 2);
        group.into_iter().interleave(second).collect()
    })
}

fn regroup<T, F>(items: Vec<T>, block: usize, f: F) -> Vec<T>
where
    F: Fn(Vec<T>) -> Vec<T>,
{
    if block == 0 {
        return items;
    }
    let group_len = 2 * block;
    let num_complete = items.len() / group_len * group_len;
    let mut items = items.into_iter();
    let mut out = Vec::with_capacity(items.len());
    for _ in 0..num_complete / group_len {
        out.extend(f(items.by_ref().take(group_len).collect()));
    }
    out.extend(items);
    out
}
