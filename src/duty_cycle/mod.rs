// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Duty cycles: the repeating pattern of signal roles that subscans follow.
//!
//! A duty cycle is given by the user as a compact descriptor, either
//! `on:off:cal` (position switching) or `sig:on:off:cal` (nodding). Each
//! number is how many consecutive subscans are recorded for that phase.

mod error;

pub use error::DutyCycleError;

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use itertools::Itertools;
use strum_macros::{Display, EnumIter, EnumString};

/// The role a subscan plays within one duty-cycle repetition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Sig,
    On,
    Off,
    Cal,
}

impl Phase {
    /// The signal flag that a subscan belonging to this phase carries in its
    /// primary header.
    pub fn flag(self) -> SignalFlag {
        match self {
            Phase::Sig => SignalFlag::RefSig,
            Phase::On => SignalFlag::Signal,
            Phase::Off => SignalFlag::Reference,
            Phase::Cal => SignalFlag::RefCal,
        }
    }
}

/// The signal-role flag written by the acquisition system into every subscan
/// (the "SIGNAL" primary-header keyword).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum SignalFlag {
    #[strum(serialize = "REFSIG")]
    RefSig,

    #[strum(serialize = "SIGNAL")]
    Signal,

    #[strum(serialize = "REFERENCE")]
    Reference,

    #[strum(serialize = "REFCAL")]
    RefCal,
}

/// The observing mode implied by the shape of a duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ObservingMode {
    /// Three phases (on, off, cal) with a single feed.
    #[strum(serialize = "position switching")]
    PositionSwitching,

    /// Four phases (sig, on, off, cal) with two feeds swapping roles.
    #[strum(serialize = "nodding")]
    Nodding,
}

impl ObservingMode {
    /// The tag used in output filenames.
    pub fn file_tag(self) -> &'static str {
        match self {
            ObservingMode::PositionSwitching => "psw",
            ObservingMode::Nodding => "nod",
        }
    }
}

/// An ordered mapping of [`Phase`] to the number of consecutive subscans
/// recorded for it. The order is always sig (nodding only), on, off, cal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyCycle {
    counts: IndexMap<Phase, usize>,
}

impl DutyCycle {
    pub fn position_switching(on: usize, off: usize, cal: usize) -> DutyCycle {
        let mut counts = IndexMap::with_capacity(3);
        counts.insert(Phase::On, on);
        counts.insert(Phase::Off, off);
        counts.insert(Phase::Cal, cal);
        DutyCycle { counts }
    }

    pub fn nodding(sig: usize, on: usize, off: usize, cal: usize) -> DutyCycle {
        let mut counts = IndexMap::with_capacity(4);
        counts.insert(Phase::Sig, sig);
        counts.insert(Phase::On, on);
        counts.insert(Phase::Off, off);
        counts.insert(Phase::Cal, cal);
        DutyCycle { counts }
    }

    /// Parse a descriptor like "2:2:1" or "1:6:6:1". Every field must be
    /// present and made only of digits; any single field may be zero, but not
    /// all of them.
    pub fn parse(descriptor: &str) -> Result<DutyCycle, DutyCycleError> {
        let invalid = || DutyCycleError::Invalid {
            descriptor: descriptor.to_string(),
        };

        let fields: Vec<&str> = descriptor.trim().split(':').collect();
        let mut counts = Vec::with_capacity(fields.len());
        for field in &fields {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            counts.push(field.parse::<usize>().map_err(|_| invalid())?);
        }

        let duty_cycle = match counts.as_slice() {
            [on, off, cal] => DutyCycle::position_switching(*on, *off, *cal),
            [sig, on, off, cal] => DutyCycle::nodding(*sig, *on, *off, *cal),
            _ => return Err(invalid()),
        };
        if duty_cycle.total_length() == 0 {
            return Err(DutyCycleError::AllZero {
                descriptor: descriptor.to_string(),
            });
        }

        Ok(duty_cycle)
    }

    /// The number of subscans in one complete cycle.
    pub fn total_length(&self) -> usize {
        self.counts.values().sum()
    }

    /// A copy with every count doubled. SKARAB records each nodding phase as
    /// two per-feed files.
    pub fn doubled(&self) -> DutyCycle {
        DutyCycle {
            counts: self.counts.iter().map(|(&p, &c)| (p, c * 2)).collect(),
        }
    }

    /// The declared count for a phase; zero if the phase isn't part of this
    /// duty cycle.
    pub fn count(&self, phase: Phase) -> usize {
        self.counts.get(&phase).copied().unwrap_or(0)
    }

    /// Does this duty cycle declare the phase at all?
    pub fn contains(&self, phase: Phase) -> bool {
        self.counts.contains_key(&phase)
    }

    /// Iterate over the phases and their counts, in cycle order.
    pub fn phases(&self) -> impl Iterator<Item = (Phase, usize)> + '_ {
        self.counts.iter().map(|(&p, &c)| (p, c))
    }

    pub fn num_phases(&self) -> usize {
        self.counts.len()
    }

    pub fn mode(&self) -> ObservingMode {
        if self.contains(Phase::Sig) {
            ObservingMode::Nodding
        } else {
            ObservingMode::PositionSwitching
        }
    }

    /// The phase of every subscan in one cycle, in recording order.
    pub fn phase_sequence(&self) -> Vec<Phase> {
        let mut sequence = Vec::with_capacity(self.total_length());
        for (phase, count) in self.phases() {
            sequence.extend(std::iter::repeat(phase).take(count));
        }
        sequence
    }

    /// The signal flag of every subscan in one cycle, in recording order.
    pub fn expected_pattern(&self) -> Vec<SignalFlag> {
        self.phase_sequence().into_iter().map(Phase::flag).collect()
    }
}

impl FromStr for DutyCycle {
    type Err = DutyCycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DutyCycle::parse(s)
    }
}

impl fmt::Display for DutyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.counts.values().join(":"))
    }
}
