//! Local stand-in for the FloodNet REST API.
//!
//! Serves a small Brooklyn/Queens deployment set over HTTP on an ephemeral
//! port and records every request path so tests can count network access.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use floodnet_client::config::FloodNetConfig;
use tiny_http::{Header, Response, Server};

/// Gowanus, a failing sensor near Gowanus, Red Hook, Howard Beach.
pub const DEPLOYMENTS_JSON: &str = r#"{
  "deployments": [
    {
      "deployment_id": "daily_gentle_mayfly",
      "name": "Gowanus Canal - 3rd St",
      "date_deployed": "2021-06-15T00:00:00",
      "date_down": null,
      "deploy_type": "flood",
      "location": {
        "type": "Point",
        "crs": {"type": "name", "properties": {"name": "EPSG:4326"}},
        "coordinates": [-73.9903, 40.6752]
      },
      "image": null,
      "sensor_mount": "pole",
      "mounted_over": "street",
      "sensor_status": "good"
    },
    {
      "deployment_id": "noisy_broken_wren",
      "name": "Gowanus - Union St",
      "date_deployed": "2022-02-01T00:00:00",
      "date_down": null,
      "deploy_type": "flood",
      "location": {
        "type": "Point",
        "crs": {"type": "name", "properties": {"name": "EPSG:4326"}},
        "coordinates": [-73.9950, 40.6790]
      },
      "sensor_mount": "pole",
      "mounted_over": "street",
      "sensor_status": "maintenance"
    },
    {
      "deployment_id": "weekly_proud_egret",
      "name": "Red Hook - Van Brunt St",
      "date_deployed": "2022-03-10T00:00:00",
      "date_down": null,
      "deploy_type": "flood",
      "location": {
        "type": "Point",
        "crs": {"type": "name", "properties": {"name": "EPSG:4326"}},
        "coordinates": [-74.0120, 40.6780]
      },
      "sensor_mount": "pole",
      "mounted_over": "street",
      "sensor_status": "good"
    },
    {
      "deployment_id": "busy_quiet_heron",
      "name": "Howard Beach - 99th St",
      "date_deployed": "2022-08-01T00:00:00",
      "date_down": null,
      "deploy_type": "flood",
      "location": {
        "type": "Point",
        "crs": {"type": "name", "properties": {"name": "EPSG:4326"}},
        "coordinates": [-73.8370, 40.6570]
      },
      "sensor_mount": "pole",
      "mounted_over": "street",
      "sensor_status": "good"
    }
  ]
}"#;

/// Two readings inside 2021-09-01, one from the day before, one invalid.
pub const GOWANUS_DEPTH_JSON: &str = r#"{
  "depth_data": [
    {"deployment_id": "daily_gentle_mayfly", "time": "2021-08-31T12:00:00", "depth_proc_mm": 5.0},
    {"deployment_id": "daily_gentle_mayfly", "time": "2021-09-01T23:00:00", "depth_proc_mm": 0.0},
    {"deployment_id": "daily_gentle_mayfly", "time": "2021-09-01T23:05:00", "depth_proc_mm": 152.4},
    {"deployment_id": "daily_gentle_mayfly", "time": "2021-09-01T23:10:00"}
  ]
}"#;

pub type Handler = fn(&str) -> (u16, String);

/// Default routing: the deployment list, Gowanus depth data, HTTP 500 for
/// the broken sensor and an empty series for anything else.
pub fn floodnet_routes(url: &str) -> (u16, String) {
    let path = url.split('?').next().unwrap_or(url);
    match path {
        "/api/rest/deployments/flood" => (200, DEPLOYMENTS_JSON.to_string()),
        "/api/rest/deployments/flood/daily_gentle_mayfly/depth" => (200, GOWANUS_DEPTH_JSON.to_string()),
        "/api/rest/deployments/flood/noisy_broken_wren/depth" => {
            (500, r#"{"error": "internal"}"#.to_string())
        }
        p if p.starts_with("/api/rest/deployments/flood/") && p.ends_with("/depth") => {
            (200, r#"{"depth_data": []}"#.to_string())
        }
        _ => (404, r#"{"error": "not found"}"#.to_string()),
    }
}

pub struct MockFloodNet {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl MockFloodNet {
    pub fn start() -> Self {
        Self::with_handler(floodnet_routes)
    }

    pub fn with_handler(handler: Handler) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("mock server should bind"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("mock server listens on TCP")
            .port();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    let url = request.url().to_string();
                    requests.lock().unwrap().push(url.clone());

                    let (status, body) = handler(&url);
                    let header = Header::from_bytes("Content-Type", "application/json")
                        .expect("static header is valid");
                    let response = Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header);
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            base_url: format!("http://127.0.0.1:{}/api/rest/", port),
            requests,
            server,
            handle: Some(handle),
        }
    }

    /// Every request path (with query string) received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.requests().iter().filter(|u| u.contains(needle)).count()
    }

    pub fn deployment_list_hits(&self) -> usize {
        self.requests()
            .iter()
            .filter(|u| u.as_str() == "/api/rest/deployments/flood")
            .count()
    }

    pub fn depth_hits(&self) -> usize {
        self.count_matching("/depth")
    }

    pub fn config(&self) -> FloodNetConfig {
        let mut config = FloodNetConfig::default();
        config.api.base_url = self.base_url.clone();
        config.api.timeout_secs = 5;
        config
    }
}

impl Drop for MockFloodNet {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
