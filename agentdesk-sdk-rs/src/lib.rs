pub mod agent;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod logger;
pub mod prompts;
pub mod runner;
pub mod session;

pub use error::{Result, SdkError};
