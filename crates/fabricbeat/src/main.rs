mod cli;
mod error;
mod scheduler;
mod sink;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fabricbeat_config::Config;
use fabricbeat_core::{AciCollector, Collector};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;
use crate::sink::ElasticSink;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Test(args) => {
            // Test mode always logs to stdout and never posts.
            init_tracing(cli.global.verbose, "stdout");
            let config = load_config(&cli.global, &args.name)?;
            info!("configuration OK");

            let collector = build_collector(&config);
            let docs = collector.collect().await;
            info!(documents = docs.len(), "collection finished");
            print!("{}", serde_yaml::to_string(&docs)?);
            Ok(())
        }

        Command::Run(args) => {
            let config = load_config(&cli.global, &args.name)?;
            let log_file = config
                .log_file
                .clone()
                .unwrap_or_else(|| format!("logs/{}.log", args.name));
            init_tracing(cli.global.verbose, &log_file);

            let collector = build_collector(&config);
            let sink = ElasticSink::new(&config)?;

            if args.run_once {
                let docs = collector.collect().await;
                let count = sink.post(docs).await?;
                info!(documents = count, "single cycle posted");
                Ok(())
            } else {
                scheduler::run(&collector, &sink, config.interval).await
            }
        }
    }
}

fn load_config(global: &GlobalOpts, name: &str) -> Result<Config, CliError> {
    let path: PathBuf = global.config_dir.join(format!("{name}.yaml"));
    Ok(fabricbeat_config::load_config(&path)?)
}

fn build_collector(config: &Config) -> AciCollector {
    AciCollector::new(
        config.fabrics(),
        config.environment.clone(),
        config.region_name.clone(),
    )
}

fn init_tracing(verbosity: u8, log_file: &str) {
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if log_file == "stdout" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        let path = Path::new(log_file);
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let file = path.file_name().unwrap_or_else(|| "fabricbeat.log".as_ref());
        let _ = std::fs::create_dir_all(dir);

        let appender = tracing_appender::rolling::daily(dir, file);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(appender)
            .init();
    }
}
