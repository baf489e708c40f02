pub mod app;
pub mod audio;
pub mod config;
pub mod cover;
pub mod library;
pub mod logging;
pub mod model;
pub mod player;
pub mod sequencer;
pub mod ui;
