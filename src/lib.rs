pub mod config;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod proxy;
pub mod quiz;
