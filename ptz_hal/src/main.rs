//! # ptzctl
//!
//! Command-line front end of the PTZ motion engine.
//!
//! # Usage
//!
//! ```bash
//! # Jog right at half speed (stays in the foreground in continuous mode)
//! ptzctl -m right -s 0.5
//!
//! # Absolute and relative moves in normalized coordinates
//! ptzctl -j 0,0.5,0
//! ptzctl -J -0.1,0,0
//!
//! # Home, recall preset 3, query the position
//! ptzctl -h
//! ptzctl -p 3
//! ptzctl --get-position --json
//!
//! # Try it without hardware
//! ptzctl --simulate -v -m up
//! ```
//!
//! Exit status: 0 on success, 2 when no motor channel could be opened,
//! 1 for any other failure.

use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use ptz_common::config::{ConfigError, parse_int};
use ptz_common::consts::{DEFAULT_CONFIG_PATH, TICK_CADENCE};
use ptz_common::hal::config::PtzConfig;
use ptz_common::hal::driver::HalError;
use ptz_common::hal::types::Direction;
use ptz_hal::logging::{self, LogOptions};
use ptz_hal::units::parse_speed;
use ptz_hal::{MotionSession, builtin_registry};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// ptzctl - pan/tilt motor control
#[derive(Parser, Debug)]
#[command(name = "ptzctl")]
#[command(version)]
#[command(about = "Pan/tilt motor control through the kernel motor driver")]
#[command(long_about = None)]
#[command(disable_help_flag = true)]
#[command(args_override_self = true)]
struct Args {
    /// Configuration file (KEY=VALUE, or TOML when named *.toml)
    #[arg(short = 'c', value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Move mode
    #[arg(short = 'm', value_enum, value_name = "MODE")]
    mode: Option<Mode>,

    /// Normalized jog speed (0..1)
    #[arg(short = 's', value_name = "SPEED", default_value = "0.5")]
    speed: String,

    /// Recall a preset by id
    #[arg(short = 'p', value_name = "ID")]
    preset: Option<String>,

    /// Absolute move to x,y,z in [-1, 1]
    #[arg(short = 'j', value_name = "X,Y,Z", allow_hyphen_values = true)]
    absolute: Option<String>,

    /// Relative move by dx,dy,dz
    #[arg(short = 'J', value_name = "DX,DY,DZ", allow_hyphen_values = true)]
    relative: Option<String>,

    /// Move to the mechanical center
    #[arg(short = 'h')]
    home: bool,

    /// Print the persisted position
    #[arg(long)]
    get_position: bool,

    /// Print whether continuous motion is armed
    #[arg(long)]
    is_moving: bool,

    /// Force the simulation driver
    #[arg(long)]
    simulate: bool,

    /// Motor driver to use
    #[arg(long, value_name = "NAME", default_value = "kernel")]
    driver: String,

    /// Enable verbose logging
    #[arg(short = 'v')]
    verbose: bool,

    /// JSON logs and position output
    #[arg(long)]
    json: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Left,
    Right,
    Up,
    Down,
    In,
    Out,
    Stop,
    Home,
}

impl Mode {
    fn direction(self) -> Option<Direction> {
        match self {
            Self::Left => Some(Direction::Left),
            Self::Right => Some(Direction::Right),
            Self::Up => Some(Direction::Up),
            Self::Down => Some(Direction::Down),
            Self::In => Some(Direction::In),
            Self::Out => Some(Direction::Out),
            Self::Stop | Self::Home => None,
        }
    }
}

/// Motion requested on the command line. When several mode flags are given,
/// the last one wins.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Jog(Direction),
    Stop,
    Home,
    Absolute(String),
    Relative(String),
}

impl Action {
    fn from_matches(args: &Args, matches: &ArgMatches) -> Option<Self> {
        let last = ["mode", "home", "absolute", "relative"]
            .into_iter()
            .filter(|id| matches.value_source(id) == Some(ValueSource::CommandLine))
            .filter_map(|id| Some((matches.indices_of(id)?.max()?, id)))
            .max_by_key(|(index, _)| *index)
            .map(|(_, id)| id)?;

        match last {
            "home" => Some(Self::Home),
            "absolute" => args.absolute.clone().map(Self::Absolute),
            "relative" => args.relative.clone().map(Self::Relative),
            _ => match args.mode? {
                Mode::Stop => Some(Self::Stop),
                Mode::Home => Some(Self::Home),
                mode => mode.direction().map(Self::Jog),
            },
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Hal(#[from] HalError),

    #[error("cannot install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("cannot encode position: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            Self::Hal(e) if e.is_channel_unavailable() => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

fn main() -> ExitCode {
    let matches = Args::command().get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };
    let action = Action::from_matches(&args, &matches);

    let (config, config_error) = match PtzConfig::from_file(&args.config) {
        Ok(config) => (config, None),
        Err(e) => (PtzConfig::default(), Some(e)),
    };

    let options = LogOptions {
        verbose: args.verbose,
        json: args.json,
    };
    if let Err(e) = logging::init(&config, options) {
        eprintln!("{e}");
    }

    match config_error {
        Some(ConfigError::FileNotFound) => {
            debug!("config {} not found, using defaults", args.config.display());
        }
        Some(e) => warn!("config {} unusable, using defaults: {}", args.config.display(), e),
        None => debug!("config loaded from {}", args.config.display()),
    }

    match run(&args, action, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    }
}

fn run(args: &Args, action: Option<Action>, config: PtzConfig) -> Result<(), CliError> {
    let driver_name = if args.simulate {
        info!("Simulation mode enabled");
        "simulation"
    } else {
        args.driver.as_str()
    };
    let driver = builtin_registry().create_driver(driver_name, &config)?;
    let mut session = MotionSession::new(config, driver);

    if args.get_position {
        let position = session.position();
        if args.json {
            println!("{}", serde_json::to_string(&position)?);
        } else {
            println!("{position}");
        }
        return Ok(());
    }

    if args.is_moving {
        println!("{}", u8::from(session.is_moving()));
        return Ok(());
    }

    match action {
        Some(Action::Absolute(triple)) => {
            let (x, y, z) = parse_triple(&triple);
            session.move_absolute(x, y, z)?;
        }
        Some(Action::Relative(triple)) => {
            let (dx, dy, dz) = parse_triple(&triple);
            session.move_relative(dx, dy, dz)?;
        }
        Some(Action::Stop) => session.stop(),
        Some(Action::Home) => {
            session.home()?;
        }
        Some(Action::Jog(direction)) => {
            session.jog(direction, parse_speed(&args.speed))?;
            if session.is_moving() {
                run_continuous(&mut session)?;
            }
        }
        None => {
            if let Some(preset) = args.preset.as_deref().filter(|p| !p.is_empty()) {
                session.recall_preset(parse_int(preset, 0))?;
            }
        }
    }
    Ok(())
}

/// Keep continuous motion alive until SIGINT/SIGTERM or a failed re-issue.
fn run_continuous(session: &mut MotionSession) -> Result<(), CliError> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })?;

    info!("continuous motion running, interrupt to stop");
    while running.load(Ordering::SeqCst) {
        if let Err(e) = session.tick() {
            warn!("continuous motion aborted: {}", e);
            break;
        }
        thread::sleep(TICK_CADENCE);
    }

    session.stop();
    Ok(())
}

/// Parse `x,y,z` leniently: parsing stops at the first malformed component
/// and everything not parsed is 0.
fn parse_triple(text: &str) -> (f64, f64, f64) {
    let mut values = [0.0; 3];
    for (slot, field) in values.iter_mut().zip(text.split(',')) {
        match field.trim().parse::<f64>() {
            Ok(value) => *slot = value,
            Err(_) => break,
        }
    }
    (values[0], values[1], values[2])
}
