//! Terminal client for a knowledge-tree learning service.
//!
//! The tree is loaded lazily from a REST API and edited in place; see
//! [`tree::TreeModel`] for the client-side model and [`tree::TreeSession`]
//! for driving it without the terminal UI.

pub mod api;
pub mod app;
pub mod config;
pub mod keybindings;
pub mod progress;
pub mod theme;
pub mod tree;
pub mod ui;
pub mod util;
