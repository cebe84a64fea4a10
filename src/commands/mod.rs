//! IPC command handlers, one module per screen.

pub mod auth;
pub mod customers;
pub mod expenses;
pub mod hardware;
pub mod import_export;
pub mod products;
pub mod reports;
pub mod sales;
pub mod settings;
pub mod users;
