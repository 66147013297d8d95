//! # AbsurdPG TUI
//!
//! A terminal wizard for PostgreSQL: type in connection parameters, press Enter, and get a
//! summary of the tables in the `public` schema together with their row counts.
//!
//! ## Features
//!
//! - **Connection Form**: five fields (username, password, host, port, database name) with
//!   Tab/Shift+Tab or arrow navigation and a masked password field
//! - **Non-blocking Probe**: connecting and counting rows runs on a background task while the
//!   interface keeps redrawing and handling resizes
//! - **Dashboard**: table list with row counts and a tab bar navigated with ←/→
//! - **Saved Profiles**: named connections stored as JSON, optionally used to pre-fill the form
//!
//! ## Modules
//!
//! - `config`: Named connection profile storage
//! - `db`: PostgreSQL connection and introspection queries
//! - `settings`: Layered runtime settings (file and environment)
//! - `tui`: Interaction state machine, event loop and rendering

pub mod config;
pub mod db;
pub mod settings;
pub mod tui;

pub use config::{ConnectionProfile, ProfileStore};
pub use db::{ConnectionParameters, PostgresProbe};
pub use settings::Settings;
