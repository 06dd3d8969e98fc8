pub mod benchmark;
pub mod config;
pub mod engine;
pub mod events;
pub mod processor;
pub mod results;
pub mod service;
pub mod session;
pub mod views;
