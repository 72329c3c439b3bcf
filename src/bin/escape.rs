//! Escape CLI - Command-line interface for the Escape Rig engine
//!
//! Commands:
//! - play: Drive a session with line commands on stdin
//! - simulate: Let the autoplayer solve a full session
//! - config: Print the default configuration

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use escape_rig::solver::{DEFAULT_STAGE_BUDGET_MS, DEFAULT_STEP_MS};
use escape_rig::{
    AttemptOutcome, Autoplayer, EngineConfig, EngineError, Knot, RandomSource, SeededRandom,
    Session, ENGINE_VERSION, PRODUCER_NAME,
};
use tracing_subscriber::EnvFilter;

/// Escape - headless driver for the Escape Rig puzzle engine
#[derive(Parser)]
#[command(name = "escape")]
#[command(author = "Escape Rig Contributors")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Play or simulate an Escape Rig session", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a session with line commands on stdin
    Play {
        /// Random seed (omit for a random session)
        #[arg(long)]
        seed: Option<u64>,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print snapshots
        #[arg(long)]
        pretty: bool,
    },

    /// Let the autoplayer solve a full session and print the summary
    Simulate {
        /// Random seed (omit for a random session)
        #[arg(long)]
        seed: Option<u64>,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Time step between autoplayer observations (ms)
        #[arg(long, default_value_t = DEFAULT_STEP_MS)]
        step_ms: u64,

        /// Give up on a stage after this much time (ms)
        #[arg(long, default_value_t = DEFAULT_STAGE_BUDGET_MS)]
        budget_ms: u64,
    },

    /// Print the default configuration as JSON
    Config,
}

/// A single line of input in `play`
#[derive(Debug, Clone, PartialEq)]
enum PlayCommand {
    Try,
    Press(Knot),
    Slide(f64),
    Release,
    Wait(u64),
    Tick,
    Status,
    Reset,
    Quit,
}

impl FromStr for PlayCommand {
    type Err = EscapeCliError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();

        let command = match (verb.as_str(), arg) {
            ("try", None) => PlayCommand::Try,
            ("press", Some(knot)) => PlayCommand::Press(knot.parse()?),
            ("slide", Some(pos)) => PlayCommand::Slide(
                pos.parse()
                    .map_err(|_| EscapeCliError::Command(format!("invalid position '{pos}'")))?,
            ),
            ("release", None) => PlayCommand::Release,
            ("wait", Some(ms)) => PlayCommand::Wait(
                ms.parse()
                    .map_err(|_| EscapeCliError::Command(format!("invalid duration '{ms}'")))?,
            ),
            ("tick", None) => PlayCommand::Tick,
            ("status", None) | ("", None) => PlayCommand::Status,
            ("reset", None) => PlayCommand::Reset,
            ("quit", None) | ("exit", None) => PlayCommand::Quit,
            _ => return Err(EscapeCliError::Command(format!("unrecognised command '{}'", line.trim()))),
        };

        if words.next().is_some() {
            return Err(EscapeCliError::Command(format!("too many arguments in '{}'", line.trim())));
        }
        Ok(command)
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), EscapeCliError> {
    match cli.command {
        Commands::Play {
            seed,
            config,
            pretty,
        } => cmd_play(seed, config.as_deref(), pretty),

        Commands::Simulate {
            seed,
            config,
            step_ms,
            budget_ms,
        } => cmd_simulate(seed, config.as_deref(), step_ms, budget_ms),

        Commands::Config => cmd_config(),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, EscapeCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn build_session(seed: Option<u64>, config: Option<&Path>) -> Result<Session, EscapeCliError> {
    let config = load_config(config)?;
    let rng: Box<dyn RandomSource> = match seed {
        Some(seed) => Box::new(SeededRandom::from_seed(seed)),
        None => Box::new(SeededRandom::from_entropy()),
    };
    Ok(Session::new(config, rng)?)
}

fn cmd_play(seed: Option<u64>, config: Option<&Path>, pretty: bool) -> Result<(), EscapeCliError> {
    let mut session = build_session(seed, config)?;
    let interactive = atty::is(atty::Stream::Stdin);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    if interactive {
        eprintln!("{} {} - type 'status', 'try', 'press <knot>', 'slide <pos>', 'release', 'wait <ms>', 'tick', 'reset' or 'quit'", PRODUCER_NAME, ENGINE_VERSION);
    }
    write_snapshot(&mut stdout, &session, None, pretty)?;

    loop {
        if interactive {
            eprint!("> ");
            io::stderr().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let command = match line.parse::<PlayCommand>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", serde_json::to_string(&CliError::from(e))?);
                continue;
            }
        };

        let outcome = match command {
            PlayCommand::Quit => break,
            PlayCommand::Try => Some(session.try_lock()),
            PlayCommand::Press(knot) => Some(session.press(knot)),
            PlayCommand::Release => Some(session.release()),
            PlayCommand::Slide(pos) => {
                session.set_slider_position(pos);
                None
            }
            PlayCommand::Wait(ms) => {
                session.pass_time_ms(ms);
                None
            }
            PlayCommand::Tick => {
                session.tick();
                None
            }
            PlayCommand::Reset => {
                session.reset();
                None
            }
            PlayCommand::Status => None,
        };

        write_snapshot(&mut stdout, &session, outcome, pretty)?;
    }

    Ok(())
}

fn write_snapshot(
    out: &mut impl Write,
    session: &Session,
    outcome: Option<AttemptOutcome>,
    pretty: bool,
) -> Result<(), EscapeCliError> {
    let record = PlayRecord {
        outcome,
        snapshot: session.snapshot(),
        summary: session.is_complete().then(|| session.summary()),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&record)?
    } else {
        serde_json::to_string(&record)?
    };
    writeln!(out, "{json}")?;
    out.flush()?;
    Ok(())
}

fn cmd_simulate(
    seed: Option<u64>,
    config: Option<&Path>,
    step_ms: u64,
    budget_ms: u64,
) -> Result<(), EscapeCliError> {
    let mut session = build_session(seed, config)?;
    let summary = Autoplayer::new(step_ms, budget_ms).solve(&mut session)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_config() -> Result<(), EscapeCliError> {
    println!("{}", EngineConfig::default().to_json_pretty()?);
    Ok(())
}

#[derive(serde::Serialize)]
struct PlayRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<AttemptOutcome>,
    snapshot: escape_rig::SessionSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<escape_rig::SessionSummary>,
}

#[derive(Debug)]
enum EscapeCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    Command(String),
}

impl From<io::Error> for EscapeCliError {
    fn from(e: io::Error) -> Self {
        EscapeCliError::Io(e)
    }
}

impl From<EngineError> for EscapeCliError {
    fn from(e: EngineError) -> Self {
        EscapeCliError::Engine(e)
    }
}

impl From<serde_json::Error> for EscapeCliError {
    fn from(e: serde_json::Error) -> Self {
        EscapeCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EscapeCliError> for CliError {
    fn from(e: EscapeCliError) -> Self {
        match e {
            EscapeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EscapeCliError::Engine(EngineError::Stalled { stage, budget_ms }) => CliError {
                code: "STALLED".to_string(),
                message: format!("Autoplayer could not clear {stage} within {budget_ms} ms"),
                hint: Some("Raise --budget-ms or loosen the configuration".to_string()),
            },
            EscapeCliError::Engine(EngineError::UnknownKnot(knot)) => CliError {
                code: "UNKNOWN_KNOT".to_string(),
                message: format!("Unknown knot: {knot}"),
                hint: Some("Use rose, amber, emerald, sky or 0-3".to_string()),
            },
            EscapeCliError::Engine(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'escape config' to see a valid configuration".to_string()),
            },
            EscapeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            EscapeCliError::Command(msg) => CliError {
                code: "COMMAND_ERROR".to_string(),
                message: msg,
                hint: Some("Commands: try, press <knot>, slide <pos>, release, wait <ms>, tick, status, reset, quit".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play_commands() {
        assert_eq!("try".parse::<PlayCommand>().unwrap(), PlayCommand::Try);
        assert_eq!(
            "press sky".parse::<PlayCommand>().unwrap(),
            PlayCommand::Press(Knot::Sky)
        );
        assert_eq!(
            "press 0\n".parse::<PlayCommand>().unwrap(),
            PlayCommand::Press(Knot::Rose)
        );
        assert_eq!(
            "slide 42.5".parse::<PlayCommand>().unwrap(),
            PlayCommand::Slide(42.5)
        );
        assert_eq!(
            "WAIT 900".parse::<PlayCommand>().unwrap(),
            PlayCommand::Wait(900)
        );
        assert_eq!("".parse::<PlayCommand>().unwrap(), PlayCommand::Status);
        assert_eq!("exit".parse::<PlayCommand>().unwrap(), PlayCommand::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("press violet".parse::<PlayCommand>().is_err());
        assert!("slide far".parse::<PlayCommand>().is_err());
        assert!("wait -1".parse::<PlayCommand>().is_err());
        assert!("try twice".parse::<PlayCommand>().is_err());
        assert!("dance".parse::<PlayCommand>().is_err());
    }

    #[test]
    fn test_record_includes_summary_when_complete() {
        let mut session = Session::with_seed(3);
        Autoplayer::default().solve(&mut session).unwrap();
        let mut out = Vec::new();
        write_snapshot(&mut out, &session, Some(AttemptOutcome::Completed), false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["outcome"], "completed");
        assert_eq!(value["summary"]["complete"], true);
        assert_eq!(value["snapshot"]["progress"], 1.0);
    }
}
