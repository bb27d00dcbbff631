pub mod api;
pub mod autoplay;
pub mod commands;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod engine;
pub mod input;
pub mod lyrics;
pub mod queue;
pub mod settings;
pub mod store;

pub use config::PlayerConfig;
pub use engine::{PlayerEngine, PlayerHandle};
