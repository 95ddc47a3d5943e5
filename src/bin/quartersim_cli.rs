use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use quartersim::{
    evaluate, first_diff, format_summary, parse_csv, run_parity, simulate, to_csv, ParityTolerance,
    RaceLength, RawFixture, SimOptions, BUILTIN_FIXTURES,
};

#[derive(Parser)]
#[command(name = "quartersim")]
#[command(version = "0.1.0")]
#[command(about = "Legacy-parity drag racing simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Distance {
    Eighth,
    Quarter,
}

impl From<Distance> for RaceLength {
    fn from(d: Distance) -> Self {
        match d {
            Distance::Eighth => RaceLength::Eighth,
            Distance::Quarter => RaceLength::Quarter,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one fixture and print the timeslip
    Simulate {
        /// Fixture JSON file
        fixture: PathBuf,

        /// Race distance
        #[arg(short = 'd', long, default_value = "quarter")]
        distance: Distance,

        /// Fixed integration time step (seconds)
        #[arg(long, default_value = "0.002")]
        dt: f64,

        /// Disable bit-exact legacy arithmetic
        #[arg(long)]
        tolerant: bool,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        output: OutputFormat,

        /// Write the full step trace as CSV to this path
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Run fixtures against their recorded targets
    Parity {
        /// Fixture JSON files
        fixtures: Vec<PathBuf>,

        /// Use the compiled-in fixture set
        #[arg(long)]
        builtin: bool,

        /// Race distance
        #[arg(short = 'd', long, default_value = "quarter")]
        distance: Distance,

        /// ET tolerance (seconds)
        #[arg(long, default_value = "0.05")]
        et_tol: f64,

        /// Trap-speed tolerance (MPH)
        #[arg(long, default_value = "1.0")]
        mph_tol: f64,
    },

    /// Compare two step-trace CSV files and report the first divergence
    Diff {
        trace_a: PathBuf,
        trace_b: PathBuf,

        /// Per-value tolerance; 0 demands bit-exact agreement
        #[arg(long, default_value = "0.0")]
        eps: f64,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate {
            fixture,
            distance,
            dt,
            tolerant,
            output,
            trace,
        } => {
            let raw = RawFixture::from_file(&fixture)?;
            let (vehicle, env) = raw.to_spec()?;
            let mut opts = SimOptions {
                dt_s: dt,
                ..SimOptions::default()
            };
            opts.strict = raw.meta.strict.unwrap_or(true) && !tolerant;
            let run = simulate(&vehicle, &env, distance.into(), &opts)?;

            if let Some(path) = trace {
                std::fs::write(&path, to_csv(&run.trace))?;
                eprintln!("trace written to {}", path.display());
            }

            match output {
                OutputFormat::Table => {
                    println!("{}", raw.name());
                    println!("{:>10} {:>10} {:>10}", "ft", "sec", "mph");
                    for cp in &run.checkpoints {
                        println!(
                            "{:>10.0} {:>10.3} {:>10.2}",
                            cp.distance_ft, cp.time_s, cp.speed_mph
                        );
                    }
                    println!("ET {:.3} s @ {:.2} mph ({} steps)", run.et_s, run.trap_mph, run.steps);
                    for w in &run.warnings {
                        eprintln!("warning: {w}");
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&run)?),
                OutputFormat::Csv => print!("{}", to_csv(&run.trace)),
            }
        }

        Commands::Parity {
            fixtures,
            builtin,
            distance,
            et_tol,
            mph_tol,
        } => {
            let tol = ParityTolerance {
                et_s: et_tol,
                mph: mph_tol,
            };
            let opts = SimOptions::default();
            let set: Vec<RawFixture> = if builtin {
                BUILTIN_FIXTURES.clone()
            } else {
                let mut out = Vec::with_capacity(fixtures.len());
                for path in &fixtures {
                    out.push(RawFixture::from_file(path)?);
                }
                out
            };
            if set.is_empty() {
                return Err("no fixtures given; pass files or --builtin".into());
            }
            let eval = evaluate(&set, distance.into(), tol, &opts)?;
            print!("{}", format_summary(&eval));
            if eval.passed < eval.total {
                // Re-run the first failure serially so its warnings print
                if let Some(bad) = eval.results.iter().find(|r| !r.pass) {
                    if let Some(f) = set.iter().find(|f| f.name() == bad.name) {
                        let _ = run_parity(f, distance.into(), tol, &opts);
                    }
                }
                std::process::exit(1);
            }
        }

        Commands::Diff { trace_a, trace_b, eps } => {
            let a = parse_csv(
                &std::fs::read_to_string(&trace_a)?,
                &trace_a.display().to_string(),
            )?;
            let b = parse_csv(
                &std::fs::read_to_string(&trace_b)?,
                &trace_b.display().to_string(),
            )?;
            let diff = first_diff(&a, &b, eps);
            println!("{}", diff.message);
            if let (Some(ra), Some(rb)) = (&diff.row_a, &diff.row_b) {
                println!("  a: t={:.4} gear={} rpm={:.1} v={:.4} x={:.4}", ra.t_s, ra.gear, ra.rpm, ra.v_fps, ra.x_ft);
                println!("  b: t={:.4} gear={} rpm={:.1} v={:.4} x={:.4}", rb.t_s, rb.gear, rb.rpm, rb.v_fps, rb.x_ft);
            }
            if !diff.identical() {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
