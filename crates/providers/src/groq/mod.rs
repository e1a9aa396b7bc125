pub mod client;
pub mod config;

pub use client::GroqClient;
pub use config::GroqConfig;
