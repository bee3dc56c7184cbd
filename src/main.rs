use clap::{Parser, Subcommand};
use pushup_counter::{
    config::{Config, ConfigStore, FileConfigStore},
    history,
    mode::WorkoutMode,
    pose::CameraPermission,
    runtime::{FixedTicker, WorkoutDriver, WorkoutOutcome},
    session::WorkoutPhase,
    simulated::{PoseScript, SimulatedPose},
    store::{RecordId, WorkoutStore},
    summary::SessionSummary,
    WorkoutMachine,
};
use std::{error::Error, fs::File, io, path::PathBuf, process::ExitCode, thread, time::Duration};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// synthetic rep length used when no script is given
const SYNTHETIC_REP_SECS: u64 = 2;

/// camera-driven push-up counter with local workout history
#[derive(Parser, Debug)]
#[clap(
    name = "pushup",
    version,
    about,
    long_about = "Counts push-ups from a pose-detection stream, tracks rep-target and time-target workouts, and keeps a local history of completed sessions."
)]
pub struct Cli {
    /// workout database to use instead of the default location
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// configuration file to use instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run a workout against the simulated pose stream
    Run(RunArgs),
    /// list saved workouts, newest first
    History {
        /// show at most this many workouts
        #[clap(short = 'n', long)]
        limit: Option<usize>,
    },
    /// delete a saved workout
    Delete {
        id: RecordId,
    },
    /// export saved workouts as CSV
    Export {
        file: PathBuf,
    },
    /// show or change saved defaults
    Config {
        /// restore defaults
        #[clap(long)]
        reset: bool,
        #[clap(long, value_enum)]
        mode: Option<WorkoutMode>,
        #[clap(long)]
        reps_target: Option<u32>,
        #[clap(long)]
        time_target: Option<u32>,
    },
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// workout mode
    #[clap(short = 'm', long, value_enum)]
    mode: Option<WorkoutMode>,

    /// rep count (reps mode) or seconds (time mode)
    #[clap(short = 't', long)]
    target: Option<u32>,

    /// JSON pose script to replay instead of a synthetic workout
    #[clap(short = 's', long)]
    script: Option<PathBuf>,

    /// replay speed multiplier
    #[clap(long, default_value_t = 1.0)]
    speed: f64,

    /// end the workout after this many seconds
    #[clap(long)]
    timeout: Option<u64>,

    /// do not save the result
    #[clap(long)]
    discard: bool,

    /// simulate a camera permission denial
    #[clap(long, hide = true)]
    deny_camera: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PUSHUP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = config_store.load();
    let db_path = cli.db.clone().or_else(|| config.db_path.clone());
    let open_store = || match &db_path {
        Some(path) => WorkoutStore::open(path),
        None => WorkoutStore::open_default(),
    };

    match cli.command {
        None => run(&config, RunArgs::default(), open_store)?,
        Some(Command::Run(args)) => run(&config, args, open_store)?,
        Some(Command::History { limit }) => {
            let store = open_store()?;
            let mut shown = 0;
            for record in store.list().take(limit.unwrap_or(usize::MAX)) {
                let record = record?;
                println!("{}  {}", record.id, history::row_text(&record));
                shown += 1;
            }
            if shown == 0 {
                println!("No workouts yet");
            }
        }
        Some(Command::Delete { id }) => {
            open_store()?.delete(id)?;
            println!("Deleted {id}");
        }
        Some(Command::Export { file }) => {
            let store = open_store()?;
            let rows = history::export_csv(store.list(), File::create(&file)?)?;
            println!("Exported {rows} workouts to {}", file.display());
        }
        Some(Command::Config {
            reset,
            mode,
            reps_target,
            time_target,
        }) => {
            let mut cfg = if reset { Config::default() } else { config };
            if let Some(mode) = mode {
                cfg.default_mode = mode;
            }
            if let Some(target) = reps_target {
                cfg.reps_target = WorkoutMode::Reps.clamp_target(target);
            }
            if let Some(target) = time_target {
                cfg.time_target_secs = WorkoutMode::Time.clamp_target(target);
            }
            if reset || mode.is_some() || reps_target.is_some() || time_target.is_some() {
                config_store.save(&cfg)?;
            }
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
    }

    Ok(())
}

fn run<F>(config: &Config, args: RunArgs, open_store: F) -> Result<(), Box<dyn Error>>
where
    F: Fn() -> pushup_counter::Result<WorkoutStore>,
{
    let workout = config.workout(args.mode, args.target);
    let timing = config.timing();
    let speed = if args.speed.is_finite() && args.speed > 0.0 {
        args.speed
    } else {
        1.0
    };

    let script = match &args.script {
        Some(path) => PoseScript::load(path)?,
        None => {
            let lead_in = timing.stability_delay
                + timing.countdown_interval * timing.countdown_from
                + Duration::from_secs(2);
            let reps = match workout.mode {
                WorkoutMode::Reps => workout.target_value,
                WorkoutMode::Time => workout.target_value / SYNTHETIC_REP_SECS as u32 + 1,
            };
            PoseScript::push_up_wave(reps, lead_in, Duration::from_secs(SYNTHETIC_REP_SECS))
        }
    };
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| script.duration() + Duration::from_secs(3));

    let mut pose = SimulatedPose::new(script).with_speed(speed);
    if args.deny_camera {
        pose = pose.with_permission(CameraPermission::Denied);
    }

    println!("{} workout, target {} {}", workout.mode, workout.target_value, workout.mode.unit());
    let machine = WorkoutMachine::new(workout, timing);
    let ticker = FixedTicker::new(timing.tick_interval.div_f64(speed));
    let mut driver = WorkoutDriver::with_ticker(machine, pose, ticker);

    let handle = driver.handle();
    thread::spawn(move || {
        thread::sleep(timeout.div_f64(speed));
        handle.finish();
    });

    let mut last_phase = None;
    let mut last_countdown = None;
    let mut last_feedback: Option<String> = None;
    let outcome = driver.run(|m| {
        let state = m.state();
        if last_phase != Some(state.phase) {
            last_phase = Some(state.phase);
            println!("== {}", state.phase);
        }
        if state.phase == WorkoutPhase::Countdown && last_countdown != Some(state.countdown_value) {
            last_countdown = Some(state.countdown_value);
            println!("   {}", state.countdown_value);
        }
        if state.feedback_text != last_feedback {
            last_feedback = state.feedback_text.clone();
            if let Some(text) = &last_feedback {
                println!("   {}", text.replace('\n', "  "));
            }
        }
    })?;

    let result = match outcome {
        WorkoutOutcome::Completed(result) => result,
        WorkoutOutcome::Cancelled => {
            println!("Workout cancelled");
            return Ok(());
        }
    };

    let mut summary = SessionSummary::new(result);
    println!("Workout complete!");
    println!("  Reps completed:       {}", summary.completed_reps());
    println!("  Duration:             {}", summary.duration_text());
    if let Some(avg) = summary.average_time_text() {
        println!("  Average time per rep: {avg}");
    }
    println!("  Mode & target:        {}", summary.target_text());

    if args.discard {
        summary.discard();
        println!("Discarded");
    } else {
        let mut store = open_store()?;
        let outcome = summary.save(&mut store)?;
        println!("Saved workout {}", outcome.id());
    }
    Ok(())
}
