//! Command-line entry point: validate, play and generate charts.

use clap::{Parser, Subcommand};
use env_logger::Env;
use lanebeat::chart::difficulty;
use lanebeat::chart::generator::GeneratorSpec;
use lanebeat::chart::{ChartData, ChartSource, ChartTimingModel, JsonChartSource, Schedule};
use lanebeat::logic::autoplay::AutoPlayer;
use lanebeat::logic::clock::ManualTime;
use lanebeat::logic::event_log::EngineEvent;
use lanebeat::logic::{run_realtime, run_simulated};
use lanebeat::shared::presenter::{LogPresenter, NullPresenter};
use lanebeat::{EngineConfig, EngineError, GameSession};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "lanebeat", about = "Two-lane rhythm timing and judgment engine")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, validate and schedule a chart.
    Validate {
        chart: PathBuf,

        /// Engine config TOML file.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Play a chart with generated autoplay input.
    Play {
        chart: PathBuf,

        /// Engine config TOML file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Maximum autoplay timing error in ms.
        #[arg(long, default_value_t = 0.0)]
        autoplay_accuracy: f64,

        /// Run against the wall clock instead of simulated time.
        #[arg(long)]
        realtime: bool,

        /// Promote this share (0 to 1) of eligible taps to dual notes.
        #[arg(long, conflicts_with = "easier")]
        harder: Option<f64>,

        /// Thin out high-intensity passages.
        #[arg(long)]
        easier: bool,

        /// Seed for autoplay jitter and difficulty changes.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Generate a chart procedurally and write its schedule as JSON.
    Generate {
        #[arg(long)]
        bpm: f64,

        #[arg(long)]
        duration_secs: f64,

        #[arg(long, default_value_t = 0.0)]
        offset_ms: f64,

        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Engine config TOML file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("MAIN: {}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), EngineError> {
    match command {
        Command::Validate { chart, config } => {
            let config = load_config(config.as_deref())?;
            let schedule = load_schedule(&chart, &config)?;
            println!("{}: ok", chart.display());
            println!("  notes:    {}", schedule.len());
            println!("  judged:   {}", schedule.live_note_count());
            println!("  holds:    {}", schedule.hold_count());
            println!("  dual:     {}", schedule.dual_count());
            println!("  dropped:  {}", schedule.dropped.len());
            println!("  duration: {:.1} s", schedule.duration_ms() / 1000.0);
            Ok(())
        }
        Command::Play {
            chart,
            config,
            autoplay_accuracy,
            realtime,
            harder,
            easier,
            seed,
        } => {
            let config = load_config(config.as_deref())?;
            let mut schedule = load_schedule(&chart, &config)?;
            let mut rng = StdRng::seed_from_u64(seed);
            if let Some(amount) = harder {
                schedule = difficulty::increase(&schedule, amount, &mut rng);
            } else if easier {
                schedule = difficulty::decrease(&schedule);
            }

            let script = AutoPlayer::new(autoplay_accuracy, seed).script(&schedule);
            let result = if realtime {
                run_realtime(config, schedule, script, Box::new(LogPresenter::new()))?
            } else {
                let time = ManualTime::new();
                let mut session = GameSession::new(config, Box::new(time.clone()))
                    .with_presenter(Box::new(NullPresenter::new()));
                session.start_schedule(schedule)?;
                let result = run_simulated(&mut session, &time, script)?;
                print_event_summary(&session);
                result
            };

            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::Generate {
            bpm,
            duration_secs,
            offset_ms,
            out,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let data = ChartData::Generated(GeneratorSpec {
                bpm,
                duration_ms: duration_secs * 1000.0,
                offset_ms,
            });
            let schedule = ChartTimingModel::from_config(&config).build_schedule(&data)?;
            let json = serde_json::to_string_pretty(&schedule)?;
            match out {
                Some(path) => {
                    fs::write(&path, json)?;
                    log::info!("MAIN: Wrote {} notes to {:?}", schedule.len(), path);
                }
                None => println!("{json}"),
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, EngineError> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

fn load_schedule(path: &Path, config: &EngineConfig) -> Result<Schedule, EngineError> {
    let data = JsonChartSource::new(path).load()?;
    let schedule = ChartTimingModel::from_config(config).build_schedule(&data)?;
    Ok(schedule)
}

fn print_event_summary(session: &GameSession) {
    let events = session.event_log();
    let count = |f: fn(&EngineEvent) -> bool| events.count(f);
    println!("events:");
    println!(
        "  dropped notes:     {}",
        count(|e| matches!(e, EngineEvent::NoteDropped { .. }))
    );
    println!(
        "  ignored inputs:    {}",
        count(|e| matches!(e, EngineEvent::InputIgnored { .. }))
    );
    println!(
        "  resolution races:  {}",
        count(|e| matches!(e, EngineEvent::ResolutionRace { .. }))
    );
    println!(
        "  presenter errors:  {}",
        count(|e| matches!(e, EngineEvent::PresenterFailure { .. }))
    );
}
