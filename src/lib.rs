//! persona-forge: generate LLM personas, mint them as INFTs backed by 0G
//! storage, and chat with them in character.

pub mod abi;
pub mod app;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod http;
pub mod llm;
pub mod mint;
pub mod settings;
pub mod storage;
pub mod wallet;
pub mod workflow;

pub use config::Config;
pub use error::{Error, Result};
