//! FloodNet command-line client.
//!
//! Lists flood-sensor deployments and fetches depth readings, optionally
//! restricted to a region given as a GeoJSON file. Results are written to
//! stdout as JSON; progress and errors go to stderr.
//!
//! Usage:
//!   floodnet deployments [--region FILE] [--refresh]
//!   floodnet ids
//!   floodnet depth --start TIME --end TIME [--ids ID,ID,...] [--region FILE] [--inner]
//!
//! Global options:
//!   --config FILE   configuration file (default: ./floodnet.toml if present)
//!
//! Environment:
//!   FLOODNET_API_BASE - overrides api.base_url
//!   RUST_LOG          - log filter (default: info)

use std::env;
use std::fs;
use std::io;

use chrono::{DateTime, Utc};

use floodnet_client::config::{load_config, load_config_default};
use floodnet_client::geometry::Region;
use floodnet_client::model::parse_timestamp;
use floodnet_client::output::{deployments_to_geojson, readings_to_geojson, write_feature_collection};
use floodnet_client::{logging, FloodNetClient, JoinPolicy, SpatialQuery};

const USAGE: &str = "Usage:
  floodnet [--config FILE] deployments [--region FILE] [--refresh]
  floodnet [--config FILE] ids
  floodnet [--config FILE] depth --start TIME --end TIME [--ids ID,ID,...] [--region FILE] [--inner]";

#[derive(Debug, PartialEq)]
enum Command {
    Deployments {
        region: Option<String>,
        refresh: bool,
    },
    Ids,
    Depth {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ids: Option<Vec<String>>,
        region: Option<String>,
        inner: bool,
    },
}

#[derive(Debug, PartialEq)]
struct Args {
    config_path: Option<String>,
    command: Command,
}

fn main() {
    logging::init();

    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args[1..]) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("❌ {}", e);
        std::process::exit(if e.is_precondition() { 2 } else { 1 });
    }
}

fn run(args: Args) -> floodnet_client::Result<()> {
    let config = match &args.config_path {
        Some(path) => load_config(path)?,
        None => load_config_default()?,
    };

    let client = FloodNetClient::new(&config)?;
    let query = SpatialQuery::new(client).with_join(config.query.join);
    let stdout = io::stdout().lock();

    match args.command {
        Command::Deployments { region, refresh } => {
            if refresh {
                query.source().refresh_deployments()?;
            }
            let deployments = match region {
                Some(path) => query.deployments_in_region(&read_region(&path)?)?,
                None => query.source().get_deployments()?,
            };
            eprintln!("{} deployments", deployments.len());
            write_feature_collection(stdout, &deployments_to_geojson(&deployments))
        }

        Command::Ids => {
            for id in query.source().get_deployment_ids()? {
                println!("{}", id);
            }
            Ok(())
        }

        Command::Depth { start, end, ids, region, inner } => {
            let query = if inner { query.with_join(JoinPolicy::Inner) } else { query };

            match region {
                Some(path) => {
                    let rows = query.readings_in_region(start, end, &read_region(&path)?)?;
                    eprintln!("{} rows", rows.len());
                    write_feature_collection(stdout, &readings_to_geojson(&rows))
                }
                None => {
                    let report = query.source().get_depth_report(start, end, ids.as_deref())?;
                    for failed in report.failed_ids() {
                        eprintln!("   ✗ {} - no data (request failed)", failed);
                    }
                    let readings = report.into_readings();
                    eprintln!("{} readings", readings.len());
                    serde_json::to_writer_pretty(stdout, &readings).map_err(io::Error::from)?;
                    println!();
                    Ok(())
                }
            }
        }
    }
}

fn read_region(path: &str) -> floodnet_client::Result<Region> {
    let contents = fs::read_to_string(path)?;
    Region::from_geojson_str(&contents)
}

fn parse_time(flag: &str, value: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(value).ok_or_else(|| format!("{} expects an ISO 8601 timestamp, got '{}'", flag, value))
}

/// Parses everything after the program name.
fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut config_path = None;
    let mut command_name: Option<&str> = None;
    let mut region = None;
    let mut refresh = false;
    let mut start = None;
    let mut end = None;
    let mut ids = None;
    let mut inner = false;
    let mut command_flags: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .map(String::as_str)
                .ok_or_else(|| format!("{} requires a value", arg))
        };

        if arg.starts_with("--") && arg != "--config" {
            command_flags.push(arg);
        }

        match arg {
            "--config" => {
                config_path = Some(value()?.to_string());
                i += 2;
            }
            "--region" => {
                region = Some(value()?.to_string());
                i += 2;
            }
            "--start" => {
                start = Some(parse_time(arg, value()?)?);
                i += 2;
            }
            "--end" => {
                end = Some(parse_time(arg, value()?)?);
                i += 2;
            }
            "--ids" => {
                let list: Vec<String> = value()?
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                ids = Some(list);
                i += 2;
            }
            "--refresh" => {
                refresh = true;
                i += 1;
            }
            "--inner" => {
                inner = true;
                i += 1;
            }
            "deployments" | "ids" | "depth" if command_name.is_none() => {
                command_name = Some(arg);
                i += 1;
            }
            _ => return Err(format!("unknown argument: {}", arg)),
        }
    }

    let command_name = command_name.ok_or("missing command")?;
    let applicable: &[&str] = match command_name {
        "deployments" => &["--region", "--refresh"],
        "depth" => &["--start", "--end", "--ids", "--region", "--inner"],
        _ => &[],
    };
    if let Some(flag) = command_flags.iter().find(|flag| !applicable.contains(*flag)) {
        return Err(format!("{} does not apply to the {} command", flag, command_name));
    }

    let command = match command_name {
        "deployments" => Command::Deployments { region, refresh },
        "ids" => Command::Ids,
        "depth" => {
            if region.is_some() && ids.is_some() {
                return Err("--ids and --region cannot be combined".to_string());
            }
            Command::Depth {
                start: start.ok_or("depth requires --start")?,
                end: end.ok_or("depth requires --end")?,
                ids,
                region,
                inner,
            }
        }
        other => return Err(format!("unknown command: {}", other)),
    };

    Ok(Args { config_path, command })
}
