//! Raw FloodNet API dump.
//!
//! Fetches the deployment collection and the last hour of depth data for
//! the first deployment, printing both bodies as pretty JSON without any
//! validation. Useful for checking what the API is actually returning.
//!
//! Usage:
//!   cargo run --bin raw_requests [-- DEPLOYMENT_ID]

use chrono::{Duration, Utc};
use floodnet_client::config::load_config_default;
use floodnet_client::ingest::floodnet::{FloodNetApi, HttpApi};
use floodnet_client::logging;

fn pretty(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| body.to_string())
}

fn main() {
    logging::init();

    let config = match load_config_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let api = match HttpApi::new(&config.api.base_url, config.request_timeout()) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    println!("🌊 FloodNet raw requests ({})", api.base_url());
    println!("============================\n");

    let deployments = match api.deployments_json() {
        Ok(body) => body,
        Err(e) => {
            eprintln!("❌ deployments request failed: {}", e);
            std::process::exit(1);
        }
    };
    println!("--- deployments/flood ---");
    println!("{}\n", pretty(&deployments));

    let deployment_id = std::env::args().nth(1).or_else(|| {
        serde_json::from_str::<serde_json::Value>(&deployments)
            .ok()?
            .get("deployments")?
            .get(0)?
            .get("deployment_id")?
            .as_str()
            .map(str::to_string)
    });

    let Some(deployment_id) = deployment_id else {
        println!("No deployments returned; skipping depth request.");
        return;
    };

    let end = Utc::now();
    let start = end - Duration::hours(1);
    println!("--- deployments/flood/{}/depth (last hour) ---", deployment_id);
    match api.depth_json(&deployment_id, start, end) {
        Ok(body) => println!("{}", pretty(&body)),
        Err(e) => eprintln!("❌ depth request failed: {}", e),
    }
}
