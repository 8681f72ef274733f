//! Translation Proxy - HTTP proxy for cloud translation and text-to-speech
//!
//! This library forwards translation and speech requests to Microsoft
//! Translator and Google Cloud Text-to-Speech, keeping credentials on the
//! server side, and fans batch translations out concurrently.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;
pub mod server;

// Re-export key types for convenience
pub use crate::core::{
    batch::{BatchDispatcher, BatchEntry},
    client::{MicrosoftTranslator, Translator},
    config::{Environment, ProxyConfig},
    credentials::{CredentialSource, Credentials},
    errors::{ProxyError, Result},
    models::{BatchResult, BatchSummary, Outcome, SpeechRequest, WorkItem},
    speech::{GoogleSpeechClient, SpeechSynthesizer},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
