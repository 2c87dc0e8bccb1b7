pub mod client;
pub mod config;
pub mod context;
pub mod editor;
pub mod host;
pub mod orchestrator;
pub mod session;
