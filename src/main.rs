//! Microgrid simulator entry point: CLI wiring, evaluation, and data tooling.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::EnvFilter;

use microgrid_sim::config::ScenarioConfig;
use microgrid_sim::evaluation::{compare_summaries, evaluate_policy, rollout};
use microgrid_sim::io::export::export_csv;
use microgrid_sim::profile::ProfileSource;
use microgrid_sim::profile::split::{SplitRatios, split_profile_csv};
use microgrid_sim::profile::validation::validate_profiles_csv;
use microgrid_sim::sim::controller::{IdlePolicy, Policy, RandomPolicy, RuleBasedController};
use microgrid_sim::sim::engine::Environment;
use microgrid_sim::sim::kpi::EpisodeMetrics;

/// Policy names accepted by `--policy`.
const POLICIES: &[&str] = &["rule_based", "idle", "random"];

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    episodes: usize,
    policy: String,
    compare: bool,
    profile_csv: Option<String>,
    telemetry_out: Option<String>,
    report_out: Option<String>,
    validate: Option<String>,
    split: Option<String>,
    out_dir: String,
}

fn print_help() {
    eprintln!("microgrid-sim: grid-tied microgrid simulator with battery safety supervisor");
    eprintln!();
    eprintln!("Usage: microgrid-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, tight_grid, small_battery)");
    eprintln!("  --seed <u64>             Override profile seed");
    eprintln!("  --episodes <n>           Number of evaluation episodes (default: 1)");
    eprintln!("  --policy <name>          rule_based, idle, or random (default: rule_based)");
    eprintln!("  --compare                Compare --policy against the rule_based baseline");
    eprintln!("  --profile-csv <path>     Use a profile CSV instead of synthetic profiles");
    eprintln!("  --telemetry-out <path>   Export first-episode step results to CSV");
    eprintln!("  --report-out <path>      Write the metrics or comparison report as JSON");
    eprintln!("  --validate <csv>         Check a profile CSV and exit");
    eprintln!("  --split <csv>            Split a profile CSV into train/val/test and exit");
    eprintln!("  --out-dir <dir>          Output directory for --split (default: data/processed)");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

/// Returns the value following flag `args[*i]`, exiting if it is missing.
fn flag_value(args: &[String], i: &mut usize, what: &str) -> String {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        episodes: 1,
        policy: "rule_based".to_string(),
        compare: false,
        profile_csv: None,
        telemetry_out: None,
        report_out: None,
        validate: None,
        split: None,
        out_dir: "data/processed".to_string(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => cli.scenario_path = Some(flag_value(&args, &mut i, "a path argument")),
            "--preset" => cli.preset = Some(flag_value(&args, &mut i, "a name argument")),
            "--seed" => {
                let raw = flag_value(&args, &mut i, "a u64 argument");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--episodes" => {
                let raw = flag_value(&args, &mut i, "a positive integer");
                match raw.parse::<usize>() {
                    Ok(n) if n > 0 => cli.episodes = n,
                    _ => {
                        eprintln!("error: --episodes value \"{raw}\" must be a positive integer");
                        process::exit(1);
                    }
                }
            }
            "--policy" => {
                let name = flag_value(&args, &mut i, "a policy name");
                if !POLICIES.contains(&name.as_str()) {
                    eprintln!(
                        "error: unknown policy \"{name}\", available: {}",
                        POLICIES.join(", ")
                    );
                    process::exit(1);
                }
                cli.policy = name;
            }
            "--compare" => cli.compare = true,
            "--profile-csv" => cli.profile_csv = Some(flag_value(&args, &mut i, "a path argument")),
            "--telemetry-out" => {
                cli.telemetry_out = Some(flag_value(&args, &mut i, "a path argument"));
            }
            "--report-out" => cli.report_out = Some(flag_value(&args, &mut i, "a path argument")),
            "--validate" => cli.validate = Some(flag_value(&args, &mut i, "a CSV path")),
            "--split" => cli.split = Some(flag_value(&args, &mut i, "a CSV path")),
            "--out-dir" => cli.out_dir = flag_value(&args, &mut i, "a directory argument"),
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds a policy by name for the given scenario.
fn make_policy(name: &str, cfg: &ScenarioConfig) -> Box<dyn Policy> {
    match name {
        "idle" => Box::new(IdlePolicy),
        "random" => Box::new(RandomPolicy::new(&cfg.battery, cfg.environment.seed)),
        _ => Box::new(RuleBasedController::new(
            &cfg.battery,
            &cfg.grid,
            cfg.policy.clone(),
        )),
    }
}

/// Prints an error and exits with status 1.
fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

fn write_report(path: &str, report: &impl serde::Serialize) {
    let json = match serde_json::to_string_pretty(report) {
        Ok(json) => json,
        Err(e) => fail(format!("failed to serialize report: {e}")),
    };
    if let Err(e) = fs::write(path, json) {
        fail(format!("failed to write report \"{path}\": {e}"));
    }
    eprintln!("Report written to {path}");
}

fn load_scenario(cli: &CliArgs) -> ScenarioConfig {
    // --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = loaded.unwrap_or_else(|e| fail(e));

    if let Some(seed) = cli.seed_override {
        scenario.environment.seed = seed;
    }
    if let Some(ref csv) = cli.profile_csv {
        scenario.profile.csv = Some(PathBuf::from(csv));
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    scenario
}

fn run_validate(path: &str, dt_hours: f64) {
    let report = validate_profiles_csv(Path::new(path), Some(dt_hours)).unwrap_or_else(|e| fail(e));
    println!("{report}");
    if !report.ok() {
        process::exit(1);
    }
}

fn run_split(path: &str, out_dir: &str) {
    let paths = split_profile_csv(Path::new(path), Path::new(out_dir), SplitRatios::default())
        .unwrap_or_else(|e| fail(e));
    println!("train: {}", paths.train.display());
    println!("val:   {}", paths.val.display());
    println!("test:  {}", paths.test.display());
}

fn main() {
    let cli = parse_args();
    init_tracing();

    let scenario = load_scenario(&cli);

    if let Some(ref path) = cli.validate {
        run_validate(path, scenario.environment.time_step_hours);
        return;
    }
    if let Some(ref path) = cli.split {
        run_split(path, &cli.out_dir);
        return;
    }

    let source: Box<dyn ProfileSource> = scenario.profile_source();
    let mut env = Environment::new(scenario.params(), source).unwrap_or_else(|e| fail(e));
    let seed = scenario.environment.seed;
    let dt = scenario.environment.time_step_hours;
    let mut policy = make_policy(&cli.policy, &scenario);

    // Single episode: per-step log plus metrics
    if cli.episodes == 1 && !cli.compare {
        let results = rollout(&mut env, &mut policy, seed).unwrap_or_else(|e| fail(e));
        for r in &results {
            println!("{r}");
        }
        let metrics = EpisodeMetrics::from_results(0, &results, dt);
        println!("\n{metrics}");

        if let Some(ref path) = cli.telemetry_out {
            if let Err(e) = export_csv(&results, Path::new(path)) {
                fail(format!("failed to write CSV: {e}"));
            }
            eprintln!("Telemetry written to {path}");
        }
        if let Some(ref path) = cli.report_out {
            write_report(path, &metrics);
        }
        return;
    }

    if let Some(ref path) = cli.telemetry_out {
        let mut first = make_policy(&cli.policy, &scenario);
        let results = rollout(&mut env, &mut first, seed).unwrap_or_else(|e| fail(e));
        if let Err(e) = export_csv(&results, Path::new(path)) {
            fail(format!("failed to write CSV: {e}"));
        }
        eprintln!("Telemetry written to {path}");
    }

    let name = policy.name().to_string();
    let candidate = evaluate_policy(&mut env, &mut policy, &name, cli.episodes, seed)
        .unwrap_or_else(|e| fail(e));

    if cli.compare {
        let mut baseline_policy = make_policy("rule_based", &scenario);
        let baseline = evaluate_policy(
            &mut env,
            &mut baseline_policy,
            "rule_based",
            cli.episodes,
            seed,
        )
        .unwrap_or_else(|e| fail(e));
        let report = compare_summaries(&baseline, &candidate);
        println!("{baseline}\n");
        println!("{candidate}\n");
        println!("{report}");
        if let Some(ref path) = cli.report_out {
            write_report(path, &report);
        }
    } else {
        println!("{candidate}");
        if let Some(ref path) = cli.report_out {
            write_report(path, &candidate);
        }
    }
}
