#![forbid(unsafe_code)]

pub mod align;
pub mod audio;
pub mod background;
pub mod batch;
pub mod commands;
pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod process;
pub mod reddit;
pub mod redact;
pub mod subtitle;
pub mod text;
pub mod tts;

pub use commands::CommandBuilder;
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, Request, Stage};
pub use tts::Voice;
