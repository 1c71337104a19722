pub mod args;
pub mod commands;
mod comment;
mod config;
mod db;
mod engine;
mod error;
pub mod model;
mod render;
mod utils;


pub use comment::{CommentSource, Mode};
pub use config::{AccountConfig, ChartConfig, CommentConfig, Config};
pub use engine::{Engine, Ledger};
pub use error::Error;
pub use error::ErrorType;
pub use error::Result;
