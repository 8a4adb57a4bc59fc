//! Telegram bot surface: commands, message flows, callback queries and
//! inline keyboards.

pub mod callback_data;
pub mod callback_handler;
pub mod commands;
pub mod message_handler;
pub mod state;
pub mod ui_builder;

pub use callback_handler::callback_handler;
pub use commands::{command_handler, Command};
pub use message_handler::message_handler;
