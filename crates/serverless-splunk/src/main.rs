// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use splunk_log_forwarder::{
    logger::Formatter, ArtifactMode, ForwarderNaming, Lifecycle, LifecycleEvent, PluginOptions,
    ServiceManifest, SplunkPlugin,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

/// Runs the Splunk log forwarding hooks against a serverless service definition
/// and prints the resulting manifest.
#[derive(Debug, Parser)]
#[command(name = "serverless-splunk", version)]
struct Args {
    /// Service definition to read
    #[arg(long, short = 'c', default_value = "serverless.yml")]
    config: PathBuf,

    /// Stage to package for; defaults to provider.stage, then "dev"
    #[arg(long, short = 's', env = "SPLUNK_STAGE")]
    stage: Option<String>,

    /// Lifecycle events to fire, in order
    #[arg(long = "event", short = 'e')]
    events: Vec<String>,

    /// Copy this forwarder artifact into the service directory instead of
    /// referencing the installed plugin package
    #[arg(long)]
    forwarder_artifact: Option<PathBuf>,

    /// Deploy the forwarder under its reserved name instead of <service>-<stage>-splunk
    #[arg(long)]
    reserved_name: bool,

    #[arg(long, value_enum, default_value = "yaml")]
    format: OutputFormat,

    /// Write the manifest here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    #[arg(long, env = "SPLUNK_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn init_logging(log_level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(log_level.to_lowercase())
        .with_context(|| format!("could not parse log level '{log_level}'"))?;

    // stdout carries the manifest, logs go to stderr
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .event_format(Formatter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    debug!("Logging subsystem enabled");
    Ok(())
}

fn parse_events(events: &[String]) -> anyhow::Result<Vec<LifecycleEvent>> {
    if events.is_empty() {
        return Ok(LifecycleEvent::PACKAGE.to_vec());
    }
    events
        .iter()
        .map(|event| event.parse::<LifecycleEvent>().map_err(anyhow::Error::from))
        .collect()
}

fn service_path(config: &Path) -> PathBuf {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let events = parse_events(&args.events)?;

    let mut manifest = ServiceManifest::from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let options = PluginOptions {
        stage: args.stage,
        service_path: service_path(&args.config),
        naming: if args.reserved_name {
            ForwarderNaming::Reserved
        } else {
            ForwarderNaming::ServiceStage
        },
        artifact: match args.forwarder_artifact {
            Some(source) => ArtifactMode::Staged { source },
            None => ArtifactMode::default(),
        },
    };

    let plugin = SplunkPlugin::new(&manifest, options)?;
    info!(
        "Running {} hooks for stage {}",
        events.len(),
        plugin.stage()
    );

    let mut lifecycle = Lifecycle::new();
    lifecycle.register(plugin);
    lifecycle.run(&events, &mut manifest)?;

    let rendered = match args.format {
        OutputFormat::Yaml => manifest.to_yaml_string()?,
        OutputFormat::Json => manifest.to_json_string()? + "\n",
    };

    match args.output {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
