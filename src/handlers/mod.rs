pub mod config;
pub mod tts;

pub use config::*;
pub use tts::*;
