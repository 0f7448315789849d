// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code.
//!
//! All booleans must have `#[serde(default)]` annotated, and anything that
//! isn't a boolean must be optional. This allows all arguments to be optional
//! *and* usable in an arguments file.
//!
//! Only 3 things should be public in this module: `Discos2Class`,
//! `Discos2Class::run`, and `Discos2ClassError`.

mod error;

pub use error::Discos2ClassError;

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use clap::{AppSettings, Parser};
use crossbeam_utils::atomic::AtomicCell;
use itertools::Itertools;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::DEFAULT_OUTPUT_DIR,
    convert::{ConversionReport, ScanConverter},
    duty_cycle::DutyCycle,
    io::{read::FitsSubscanReader, write::FitsSpectrumWriter},
    PROGRESS_BARS,
};

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

lazy_static::lazy_static! {
    static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    static ref OUTPUT_DIR_HELP: String =
        format!("The directory to write spectral archives into. It is created if it doesn't exist. Default: {DEFAULT_OUTPUT_DIR}");
}

#[derive(Debug, Display, EnumIter, EnumString)]
enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

#[derive(Debug, Default, Parser, Serialize, Deserialize)]
#[clap(
    version,
    author,
    about = r#"Convert DISCOS scans into duty-cycle averaged, calibrated spectra"#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(infer_long_args = true)]
pub struct Discos2Class {
    /// Paths to scan directories. Each is converted independently.
    #[clap(name = "SOURCE_DIR", parse(from_os_str))]
    #[serde(default)]
    source_dirs: Vec<PathBuf>,

    #[clap(short, long, help = OUTPUT_DIR_HELP.as_str(), parse(from_os_str))]
    output_dir: Option<PathBuf>,

    /// The duty cycle of the scans: "on:off:cal" for position switching, or
    /// "sig:on:off:cal" for nodding (e.g. "2:2:1"). Required.
    #[clap(short = 'c', long)]
    duty_cycle: Option<String>,

    /// Don't calibrate; write (ON - OFF) / OFF with a system temperature of 1.
    #[clap(short, long)]
    #[serde(default)]
    skip_calibration: bool,

    /// Print debug messages (-dd for trace messages). This also makes the
    /// first failing scan abort the whole run.
    #[clap(short, long, parse(from_occurrences))]
    #[serde(default)]
    debug: u8,

    /// Replace existing spectral archives rather than appending to them.
    #[clap(short, long)]
    #[serde(default)]
    force: bool,

    /// Only check the scans against the duty cycle and print out high-level
    /// information; don't write anything.
    #[clap(long)]
    #[serde(default)]
    dry_run: bool,

    /// Don't check that the subscans follow the duty cycle.
    #[clap(long)]
    #[serde(default)]
    no_verify: bool,

    /// Don't draw progress bars.
    #[clap(long)]
    #[serde(default)]
    no_progress_bars: bool,

    #[clap(long, help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    args_file: Option<PathBuf>,
}

impl Discos2Class {
    pub fn run(self) -> Result<(), Discos2ClassError> {
        let args = self.merge()?;
        setup_logging(args.debug)
            .map_err(|e| Discos2ClassError::Generic(format!("Failed to initialise logging: {e}")))?;
        // Enable progress bars if the user didn't say "no progress bars".
        if !args.no_progress_bars {
            PROGRESS_BARS.store(true);
        }

        // Print the version of discos2class and its build-time information.
        info!("discos2class {}", env!("CARGO_PKG_VERSION"));
        display_build_info();
        debug!("Running with options: {args:#?}");

        let abort = AtomicCell::new(false);
        let num_converted = args.convert_all(&abort)?;
        info!(
            "discos2class complete ({num_converted} of {} scan(s) converted).",
            args.source_dirs.len()
        );
        Ok(())
    }

    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    fn merge(self) -> Result<Discos2Class, Discos2ClassError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;
        let arg_file = match &cli_args.args_file {
            Some(f) => f.clone(),
            None => return Ok(cli_args),
        };

        // Ensure all of the file args are accounted for by pattern matching.
        let Discos2Class {
            source_dirs,
            output_dir,
            duty_cycle,
            skip_calibration,
            debug,
            force,
            dry_run,
            no_verify,
            no_progress_bars,
            args_file: _,
        } = read_arg_file(&arg_file)?;

        Ok(Discos2Class {
            source_dirs: if cli_args.source_dirs.is_empty() {
                source_dirs
            } else {
                cli_args.source_dirs
            },
            output_dir: cli_args.output_dir.or(output_dir),
            duty_cycle: cli_args.duty_cycle.or(duty_cycle),
            skip_calibration: cli_args.skip_calibration || skip_calibration,
            debug: cli_args.debug.max(debug),
            force: cli_args.force || force,
            dry_run: cli_args.dry_run || dry_run,
            no_verify: cli_args.no_verify || no_verify,
            no_progress_bars: cli_args.no_progress_bars || no_progress_bars,
            args_file: None,
        })
    }

    /// Convert every scan directory, returning how many were converted.
    /// Failures are logged and skipped, unless debugging, in which case the
    /// first failure is returned.
    fn convert_all(&self, abort: &AtomicCell<bool>) -> Result<usize, Discos2ClassError> {
        let duty_cycle = match self.duty_cycle.as_deref() {
            Some(d) => DutyCycle::from_str(d)?,
            None => {
                return Err(Discos2ClassError::DutyCycle(
                    "No duty cycle was supplied (-c)".to_string(),
                ))
            }
        };
        if self.source_dirs.is_empty() {
            return Err(Discos2ClassError::Generic(
                "No scan directories were supplied".to_string(),
            ));
        }
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        info!("Duty cycle {duty_cycle} ({})", duty_cycle.mode());

        let mut num_converted = 0;
        for dir in &self.source_dirs {
            if abort.load() {
                break;
            }
            match self.convert_scan(dir, &duty_cycle, &output_dir, abort) {
                Ok(_) => num_converted += 1,
                Err(e) if self.debug > 0 => return Err(e),
                Err(e) => {
                    error!("Cannot convert scan at {}", dir.display());
                    error!("{e}");
                }
            }
        }
        Ok(num_converted)
    }

    /// Convert one scan directory. A dry run stops after verification and
    /// returns no report.
    fn convert_scan(
        &self,
        dir: &Path,
        duty_cycle: &DutyCycle,
        output_dir: &Path,
        abort: &AtomicCell<bool>,
    ) -> Result<Option<ConversionReport>, Discos2ClassError> {
        info!("Converting scan {}", dir.display());
        let mut converter = ScanConverter::new(
            Box::new(FitsSubscanReader::new()),
            dir,
            duty_cycle.clone(),
            self.skip_calibration,
        )?;
        converter.load_summary()?;

        if self.no_verify {
            warn!("Not checking the subscans against the duty cycle");
        } else {
            let num_cycles = converter.verify().into_result()?;
            info!("{num_cycles} cycle(s) follow the duty cycle");
        }

        if self.dry_run {
            info!(
                "Dry run: {} {} subscans, {} complete cycle(s), {} left over",
                converter.records().len(),
                converter.backend(),
                converter.num_cycles(),
                converter.num_dropped()
            );
            return Ok(None);
        }

        let mut writer = FitsSpectrumWriter::new();
        let report = converter.run(&mut writer, output_dir, self.force, abort)?;
        if report.records_failed > 0 {
            warn!(
                "{}: {} record(s) couldn't be written",
                dir.display(),
                report.records_failed
            );
        }
        Ok(Some(report))
    }
}

fn read_arg_file(arg_file: &Path) -> Result<Discos2Class, Discos2ClassError> {
    debug!("Attempting to parse argument file {}", arg_file.display());

    let mut contents = String::new();
    let arg_file_type = arg_file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .and_then(|e| ArgFileTypes::from_str(&e).ok());

    match arg_file_type {
        Some(ArgFileTypes::Toml) => {
            debug!("Parsing toml file...");
            let mut fh = File::open(arg_file)?;
            fh.read_to_string(&mut contents)?;
            toml::from_str(&contents).map_err(|err| {
                Discos2ClassError::ArgFile(format!(
                    "Couldn't decode toml structure from {}:\n{err}",
                    arg_file.display()
                ))
            })
        }
        Some(ArgFileTypes::Json) => {
            debug!("Parsing json file...");
            let mut fh = File::open(arg_file)?;
            fh.read_to_string(&mut contents)?;
            serde_json::from_str(&contents).map_err(|err| {
                Discos2ClassError::ArgFile(format!(
                    "Couldn't decode json structure from {}:\n{err}",
                    arg_file.display()
                ))
            })
        }

        _ => Err(Discos2ClassError::ArgFile(format!(
            "Argument file '{}' doesn't have a recognised file extension! Valid extensions are: {}",
            arg_file.display(),
            *ARG_FILE_TYPES_COMMA_SEPARATED
        ))),
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when debugging at the trace level.
fn setup_logging(debug: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match debug {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()
}

/// Write many info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => {
            info!("Compiled on git commit hash: {hash}{dirty}");
        }
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {}", hr);
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
