pub mod annotator;
pub mod assistant;
pub mod config;
pub mod console;
pub mod controller;
pub mod runner;
pub mod session;
pub mod telemetry;
pub mod terminal;
pub mod transport;
