mod card_routes;
pub mod config;
mod error;
mod http_layers;
mod patient_routes;
mod payment_routes;
pub mod server;
pub mod state;
mod vital_routes;

pub use config::ServerConfig;
pub use error::{ClinicError, ErrorBody};
pub use http_layers::*;
pub use server::{make_app, run_server};
