// Library surface for the binary front-end and headless/integration tests.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod results;
pub mod runtime;
pub mod session;
pub mod shell;
pub mod text_provider;
pub mod time_series;
pub mod typing_policy;
