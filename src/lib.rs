//! floodnet_client: FloodNet flood-sensor deployments and depth readings,
//! optionally scoped to a geographic region.
//!
//! # Module structure
//!
//! ```text
//! floodnet_client
//! ├── model       - deployment / depth reading types and record validation
//! ├── config      - client configuration loader (floodnet.toml)
//! ├── error       - FloodNetError and the crate Result alias
//! ├── logging     - tracing subscriber setup for the binaries
//! ├── ingest
//! │   ├── floodnet - FloodNet REST API: URL construction + blocking transport
//! │   └── fixtures (test only) - representative API response payloads
//! ├── cache       - single-slot deployment cache with TTL and invalidation
//! ├── depth       - per-deployment depth fetch over a bounded window
//! ├── client      - FloodNetClient and the DeploymentSource contract
//! ├── projection  - supported CRSs and their conversion to WGS84
//! ├── geometry    - region parsing, repair and reprojection into a Boundary
//! ├── spatial     - point-in-boundary filtering of deployments
//! ├── query       - region queries joining readings onto deployments
//! └── output      - GeoJSON rendering of results
//! ```

// Public modules
pub mod cache;
pub mod client;
pub mod config;
pub mod depth;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod output;
pub mod projection;
pub mod query;
pub mod spatial;

pub use client::{DeploymentSource, FloodNetClient};
pub use error::{FloodNetError, Result};
pub use query::{JoinPolicy, RegionReading, SpatialQuery};
