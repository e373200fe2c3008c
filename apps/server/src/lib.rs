pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;

mod main_lib;

pub use main_lib::{build_state, build_state_with_providers, init_tracing, AppState};
