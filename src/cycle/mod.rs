// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Accumulating one duty cycle's worth of subscans.
//!
//! A [`ScanCycle`] is built from the section layout of the first subscan of a
//! cycle. Every subscan of the cycle is then added with its phase, and at the
//! end [`ScanCycle::onoffcal`] gives the mean spectrum of every phase for
//! every (section, polarisation) pair.

mod error;

pub use error::CycleError;

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use ndarray::{concatenate, prelude::*};
use strum_macros::Display;

use crate::{
    duty_cycle::{DutyCycle, ObservingMode, Phase},
    io::read::{RfInput, SectionType, Subscan},
};

/// A polarisation of a logical section.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Polarisation {
    #[strum(serialize = "simple")]
    Simple,
    #[strum(serialize = "LCP")]
    Lcp,
    #[strum(serialize = "RCP")]
    Rcp,
    #[strum(serialize = "Q")]
    Q,
    #[strum(serialize = "U")]
    U,
}

impl Polarisation {
    /// The correlation label used in telescope names, e.g. "LL".
    pub fn class_label(self) -> &'static str {
        match self {
            Polarisation::Simple => "",
            Polarisation::Lcp => "LL",
            Polarisation::Rcp => "RR",
            Polarisation::Q => "LR",
            Polarisation::U => "RL",
        }
    }

    /// The label of this polarisation in the "RF INPUTS" table, if it has one.
    pub fn rf_label(self) -> Option<&'static str> {
        match self {
            Polarisation::Lcp => Some("LCP"),
            Polarisation::Rcp => Some("RCP"),
            _ => None,
        }
    }
}

/// One or more physical sections accumulated together.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSection {
    /// The id of the first physical section.
    pub id: usize,
    pub kind: SectionType,
    /// The physical sections whose data columns are concatenated, in order.
    pub columns: Vec<usize>,
    /// The number of bins of each polarisation band.
    pub bins: usize,
    pub polarisations: Vec<Polarisation>,
}

impl LogicalSection {
    /// The physical section that describes a polarisation (frequency, bins,
    /// RF input). Merged "spectra" sections have one physical section per
    /// polarisation; everything else has only one.
    pub fn physical_section(&self, polarisation: Polarisation) -> usize {
        if self.columns.len() > 1 {
            let i = self
                .polarisations
                .iter()
                .position(|&p| p == polarisation)
                .unwrap_or(0);
            self.columns[i.min(self.columns.len() - 1)]
        } else {
            self.id
        }
    }

    /// The width of the concatenated data columns.
    pub fn width(&self) -> usize {
        self.bins * self.polarisations.len()
    }
}

/// Work out the logical sections of a subscan's section table.
pub fn logical_sections(subscan: &Subscan) -> Vec<LogicalSection> {
    let mut sections: Vec<_> = subscan.sections.iter().collect();
    sections.sort_by_key(|s| s.id);

    let mut logical = Vec::with_capacity(sections.len());
    let mut iter = sections.into_iter().peekable();
    while let Some(s) = iter.next() {
        let section = match s.kind {
            SectionType::Simple => LogicalSection {
                id: s.id,
                kind: s.kind,
                columns: vec![s.id],
                bins: s.bins,
                polarisations: vec![Polarisation::Simple],
            },
            SectionType::Spectra => match iter.peek() {
                Some(next)
                    if next.kind == SectionType::Spectra
                        && next.id == s.id + 1
                        && next.bins == s.bins =>
                {
                    let next = iter.next().map(|n| n.id).unwrap_or(s.id + 1);
                    LogicalSection {
                        id: s.id,
                        kind: s.kind,
                        columns: vec![s.id, next],
                        bins: s.bins,
                        polarisations: vec![Polarisation::Lcp, Polarisation::Rcp],
                    }
                }
                _ => {
                    debug!("Spectra section {} has no partner; treating it as simple", s.id);
                    LogicalSection {
                        id: s.id,
                        kind: s.kind,
                        columns: vec![s.id],
                        bins: s.bins,
                        polarisations: vec![Polarisation::Simple],
                    }
                }
            },
            SectionType::Stokes => LogicalSection {
                id: s.id,
                kind: s.kind,
                columns: vec![s.id],
                bins: s.bins,
                polarisations: vec![
                    Polarisation::Lcp,
                    Polarisation::Rcp,
                    Polarisation::Q,
                    Polarisation::U,
                ],
            },
        };
        logical.push(section);
    }
    logical
}

/// The role of a feed in nodding.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum FeedRole {
    /// The feed whose sections are accumulated as recorded and calibrated with
    /// the CAL phase.
    #[strum(serialize = "home")]
    Home,

    /// Any other feed. Its ON and OFF are swapped, and it is calibrated with
    /// the SIG phase.
    #[strum(serialize = "paired")]
    Paired,
}

/// Which feed is the home feed. The lowest feed id of the first subscan's RF
/// inputs is home; every other feed is paired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRoles {
    home: Option<u32>,
    feeds: BTreeSet<u32>,
}

impl FeedRoles {
    pub fn from_rf_inputs(rf_inputs: &[RfInput]) -> FeedRoles {
        let feeds: BTreeSet<u32> = rf_inputs.iter().map(|rf| rf.feed).collect();
        FeedRoles {
            home: feeds.iter().next().copied(),
            feeds,
        }
    }

    pub fn role(&self, feed: u32) -> FeedRole {
        match self.home {
            Some(home) if home != feed => FeedRole::Paired,
            _ => FeedRole::Home,
        }
    }

    pub fn home(&self) -> Option<u32> {
        self.home
    }

    /// The feeds listed in the RF inputs this was built from.
    pub fn feeds(&self) -> impl Iterator<Item = u32> + '_ {
        self.feeds.iter().copied()
    }
}

/// The running totals of one (section, polarisation, phase).
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulation {
    pub spectrum: Array1<f64>,
    pub samples: usize,
    /// \[seconds\]
    pub integration: f64,
}

impl Accumulation {
    fn new(bins: usize) -> Accumulation {
        Accumulation {
            spectrum: Array1::zeros(bins),
            samples: 0,
            integration: 0.0,
        }
    }

    fn mean(&self) -> Array1<f64> {
        &self.spectrum / self.samples as f64
    }
}

/// The mean spectra of one (section, polarisation). `sig` and `cal` are only
/// present when the duty cycle has subscans for them.
#[derive(Debug, Clone, PartialEq)]
pub struct OnOffCal {
    pub sig: Option<Array1<f64>>,
    pub on: Array1<f64>,
    pub off: Array1<f64>,
    pub cal: Option<Array1<f64>>,
}

/// The accumulator of one duty cycle.
#[derive(Debug, Clone)]
pub struct ScanCycle {
    duty_cycle: DutyCycle,
    sections: Vec<LogicalSection>,
    feed_roles: FeedRoles,
    data: BTreeMap<(usize, Polarisation, Phase), Accumulation>,
}

impl ScanCycle {
    /// Set up empty accumulations for every (section, polarisation, phase) of
    /// the first subscan of a cycle.
    pub fn new(first_subscan: &Subscan, duty_cycle: &DutyCycle) -> Result<ScanCycle, CycleError> {
        let sections = logical_sections(first_subscan);
        if sections.is_empty() {
            return Err(CycleError::NoSections {
                path: first_subscan.path.clone(),
            });
        }
        let feed_roles = FeedRoles::from_rf_inputs(&first_subscan.rf_inputs);
        trace!("Logical sections: {sections:?}; home feed: {:?}", feed_roles.home());

        let mut data = BTreeMap::new();
        for section in &sections {
            for &pol in &section.polarisations {
                for (phase, _) in duty_cycle.phases() {
                    data.insert((section.id, pol, phase), Accumulation::new(section.bins));
                }
            }
        }

        Ok(ScanCycle {
            duty_cycle: duty_cycle.clone(),
            sections,
            feed_roles,
            data,
        })
    }

    pub fn sections(&self) -> &[LogicalSection] {
        &self.sections
    }

    pub fn feed_roles(&self) -> &FeedRoles {
        &self.feed_roles
    }

    pub fn duty_cycle(&self) -> &DutyCycle {
        &self.duty_cycle
    }

    pub fn accumulation(
        &self,
        section: usize,
        polarisation: Polarisation,
        phase: Phase,
    ) -> Option<&Accumulation> {
        self.data.get(&(section, polarisation, phase))
    }

    /// Add every section of a subscan to the accumulations of `phase`.
    ///
    /// In nodding, sections fed by a paired feed (according to this subscan's
    /// RF inputs) have ON and OFF swapped.
    pub fn add_data_file(&mut self, subscan: &Subscan, phase: Phase) -> Result<(), CycleError> {
        if !self.duty_cycle.contains(phase) {
            return Err(CycleError::UnexpectedPhase {
                path: subscan.path.clone(),
                phase,
            });
        }
        let nodding = self.duty_cycle.mode() == ObservingMode::Nodding;

        for section in &self.sections {
            let data = section_data(subscan, section)?;
            let rows = data.nrows();
            let summed = data.fold_axis(Axis(0), 0.0_f64, |acc, &x| acc + f64::from(x));

            let role = subscan
                .feed_of_section(section.id)
                .map(|feed| self.feed_roles.role(feed))
                .unwrap_or(FeedRole::Home);
            let phase = match (nodding, role, phase) {
                (true, FeedRole::Paired, Phase::On) => Phase::Off,
                (true, FeedRole::Paired, Phase::Off) => Phase::On,
                (_, _, p) => p,
            };
            trace!(
                "{}: section {} ({role}) -> {phase}, {rows} rows",
                subscan.path.display(),
                section.id
            );

            for (i, &pol) in section.polarisations.iter().enumerate() {
                let band = summed.slice(s![i * section.bins..(i + 1) * section.bins]);
                // Every declared phase has an accumulation.
                if let Some(acc) = self.data.get_mut(&(section.id, pol, phase)) {
                    acc.spectrum += &band;
                    acc.samples += rows;
                    acc.integration += rows as f64 * subscan.unit_integration;
                }
            }
        }

        Ok(())
    }

    /// The mean spectrum of every phase for every (section, polarisation).
    pub fn onoffcal(&self) -> Result<BTreeMap<(usize, Polarisation), OnOffCal>, CycleError> {
        for required in [Phase::On, Phase::Off] {
            if self.duty_cycle.count(required) == 0 {
                return Err(CycleError::MissingPhase { phase: required });
            }
        }

        let mut result = BTreeMap::new();
        for section in &self.sections {
            for &pol in &section.polarisations {
                let mean = |phase| -> Result<Option<Array1<f64>>, CycleError> {
                    if self.duty_cycle.count(phase) == 0 {
                        return Ok(None);
                    }
                    match self.data.get(&(section.id, pol, phase)) {
                        Some(acc) if acc.samples > 0 => Ok(Some(acc.mean())),
                        _ => Err(CycleError::ZeroSamples {
                            section: section.id,
                            polarisation: pol,
                            phase,
                        }),
                    }
                };

                let on = mean(Phase::On)?.ok_or(CycleError::MissingPhase { phase: Phase::On })?;
                let off = mean(Phase::Off)?.ok_or(CycleError::MissingPhase { phase: Phase::Off })?;
                result.insert(
                    (section.id, pol),
                    OnOffCal {
                        sig: mean(Phase::Sig)?,
                        on,
                        off,
                        cal: mean(Phase::Cal)?,
                    },
                );
            }
        }
        Ok(result)
    }
}

/// The data columns of a logical section concatenated side by side.
fn section_data(subscan: &Subscan, section: &LogicalSection) -> Result<Array2<f32>, CycleError> {
    let mut views = Vec::with_capacity(section.columns.len());
    for &id in &section.columns {
        let column = subscan
            .channels
            .get(&id)
            .ok_or_else(|| CycleError::MissingChannel {
                path: subscan.path.clone(),
                section: id,
            })?;
        views.push(column.view());
    }

    let data = if views.len() == 1 {
        views[0].to_owned()
    } else {
        concatenate(Axis(1), &views).map_err(|_| CycleError::RowMismatch {
            path: subscan.path.clone(),
            section: section.id,
        })?
    };
    if data.ncols() != section.width() {
        return Err(CycleError::BadShape {
            path: subscan.path.clone(),
            section: section.id,
            expected: section.width(),
            found: data.ncols(),
        });
    }
    Ok(data)
}
