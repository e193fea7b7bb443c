pub mod agents;
pub mod config;
pub mod jobs;
pub mod llm;
pub mod pipeline;
pub mod service;
pub mod terminal;
