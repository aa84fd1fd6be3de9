//! yarn-submit CLI
//!
//! Entry point for the `yarn-submit` command-line tool.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use tracing::{info, warn};
use yarn_submit::config::ConfigError;
use yarn_submit::materialize::SubmissionConfig;
use yarn_submit::teardown::{self, TeardownReason};
use yarn_submit::{
    install_process_hooks, jobfile, logging, Coordinator, EffectiveConfig, JobParameters,
    ProcessClient, SubmissionRecord, SubmitterSettings, TeardownRegistry,
};

#[derive(Parser)]
#[command(name = "yarn-submit")]
#[command(about = "Submit distributed training jobs to a YARN cluster", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job and print its application id
    Submit {
        /// Job parameters file (.toml or .json)
        #[arg(long, short = 'p')]
        params: PathBuf,

        /// Host config file (default: ~/.config/yarn-submit/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Seconds between application id checks
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Abort if the launcher fails to initialize
        #[arg(long)]
        strict_init: bool,

        /// Keep monitoring until the application ends; interrupting kills it
        #[arg(long)]
        wait: bool,

        /// Write the submission record to this file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Print the submission record as JSON instead of the bare id
        #[arg(long)]
        json: bool,
    },

    /// Print the launcher configuration a job would be submitted with
    Render {
        /// Job parameters file (.toml or .json)
        #[arg(long, short = 'p')]
        params: PathBuf,

        /// Host config file (default: ~/.config/yarn-submit/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Host config file (default: ~/.config/yarn-submit/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

struct SubmitArgs {
    params: PathBuf,
    config: Option<PathBuf>,
    poll_interval: Option<u64>,
    strict_init: bool,
    wait: bool,
    record: Option<PathBuf>,
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            params,
            config,
            poll_interval,
            strict_init,
            wait,
            record,
            json,
        } => run_submit(SubmitArgs {
            params,
            config,
            poll_interval,
            strict_init,
            wait,
            record,
            json,
        }),
        Commands::Render { params, config } => run_render(&params, config),
        Commands::Config { config, json } => run_config(config, json),
    }
}

fn load_effective(
    config_path: Option<PathBuf>,
    cli_overrides: Option<serde_json::Value>,
) -> Result<EffectiveConfig, ConfigError> {
    let host = config_path.or_else(EffectiveConfig::default_host_path);
    let env = EffectiveConfig::env_overrides()?;
    EffectiveConfig::build(host.as_deref(), env, cli_overrides)
}

fn load_settings(
    config_path: Option<PathBuf>,
    cli_overrides: Option<serde_json::Value>,
) -> SubmitterSettings {
    let settings = load_effective(config_path, cli_overrides)
        .and_then(|effective| SubmitterSettings::from_effective(&effective));
    match settings {
        Ok(settings) => {
            logging::init(&settings.log_level);
            settings
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    }
}

fn load_params(path: &Path) -> JobParameters {
    match jobfile::load(path) {
        Ok(params) => params,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_submit(args: SubmitArgs) {
    let mut overrides = serde_json::Map::new();
    if let Some(seconds) = args.poll_interval {
        overrides.insert("poll_interval_seconds".to_string(), seconds.into());
    }
    if args.strict_init {
        overrides.insert("strict_initialization".to_string(), true.into());
    }
    let overrides = (!overrides.is_empty()).then_some(serde_json::Value::Object(overrides));

    let settings = load_settings(args.config, overrides);
    let params = load_params(&args.params);

    let registry = TeardownRegistry::global();
    if let Err(e) = install_process_hooks(Arc::clone(&registry)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let coordinator = Coordinator::new(
        Arc::new(ProcessClient::new(settings.client.clone())),
        Arc::new(settings.materializer()),
        Arc::clone(&registry),
        settings.coordinator_options(),
    );
    info!(attempt = coordinator.attempt_id(), params = %args.params.display(), "submitting job");

    let result = coordinator.submit(&params);
    write_record(args.record.as_deref(), &coordinator.record());

    let exit_code = match result {
        Ok(id) => {
            if args.json {
                print_record(&coordinator.record());
            } else {
                println!("{}", id);
            }

            if args.wait {
                if let Some(exit) = coordinator.wait_for_worker() {
                    info!(application_id = %id, %exit, "application monitoring ended");
                }
                write_record(args.record.as_deref(), &coordinator.record());
            } else {
                // The application keeps running on the cluster
                registry.disarm_all();
            }
            0
        }
        Err(e) => {
            eprintln!("Submission failed: {}", e);
            e.exit_code()
        }
    };

    if teardown::signal_received() {
        teardown::await_signal_exit();
    }
    let report = registry.run_all(TeardownReason::Exit);
    if report.failed > 0 {
        warn!(failed = report.failed, "teardown hooks failed");
    }
    process::exit(exit_code);
}

fn write_record(path: Option<&Path>, record: &SubmissionRecord) {
    if let Some(path) = path {
        if let Err(e) = record.write_to_file(path) {
            warn!(path = %path.display(), error = %e, "failed to write submission record");
        }
    }
}

fn print_record(record: &SubmissionRecord) {
    match record.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_render(params_path: &Path, config_path: Option<PathBuf>) {
    let _settings = load_settings(config_path, None);
    let params = load_params(params_path);

    if let Err(e) = params.validate() {
        eprintln!("Error: {}", e);
        process::exit(11);
    }
    match params {
        JobParameters::TensorFlow(tf) => {
            print!("{}", SubmissionConfig::from_tensorflow(&tf).to_xml());
        }
        other => {
            eprintln!("Error: unsupported framework: {}", other.framework());
            process::exit(10);
        }
    }
}

fn run_config(config_path: Option<PathBuf>, json_output: bool) {
    let effective = match load_effective(config_path, None) {
        Ok(effective) => effective,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    if json_output {
        match effective.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    for source in &effective.sources {
        match (&source.path, &source.digest) {
            (Some(path), Some(digest)) => {
                println!("source: {:?} {} (sha256 {})", source.origin, path, digest)
            }
            _ => println!("source: {:?}", source.origin),
        }
    }
    println!();
    match serde_json::to_string_pretty(&effective.config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
