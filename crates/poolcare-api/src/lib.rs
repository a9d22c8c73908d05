// poolcare-api: Async Rust client for the VirtualPoolCare cloud API
//
// Two-stage auth: `POST /user/login` trades account credentials for
// short-lived AWS credentials, which then sign every other request
// (SigV4, service `execute-api`).

pub mod auth;
pub mod client;
pub mod error;
pub mod measurements;
pub mod models;
pub mod pools;
pub mod signing;
pub mod transport;

pub use auth::Credentials;
pub use client::{DEFAULT_BASE_URL, PoolCareClient};
pub use error::Error;
pub use models::{LastMeasurements, RawMeasurement, RawPool};
pub use pools::{Device, select_primary};
pub use transport::{TlsMode, TransportConfig};
