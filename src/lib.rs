pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod models;
pub mod parser;
pub mod remote;
pub mod settings;
pub mod state;
pub mod sync;
pub mod ui;
