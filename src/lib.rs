pub mod cli;
pub mod collate;
pub mod config;
pub mod database_ops;
pub mod error;
pub mod input;
pub mod logging;
pub mod model;
pub mod normalization;
pub mod orchestrator;
pub mod recorder;
pub mod resolve;
pub mod summary;

pub mod util {
    pub mod db;
    pub mod env;
}

pub use config::CollateConfig;
pub use error::CollateError;
pub use orchestrator::{Orchestrator, RunReport, RunState};
