//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Applies background task completions to the tree model
//! - `helpers` - Spawns the network side of each tree operation
//! - `render` - View rendering dispatch and dialog overlays
//! - `tree` - Tree panel widget
//! - `detail` - Selected node panel and markdown rendering
//! - `progress` - Quiz progress view
//! - `help` - Keybinding overlay
//! - `status` - Status bar widget

mod detail;
mod events;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod progress;
mod render;
mod status;
mod tree;

pub use helpers::{spawn_restore, spawn_roots_load, spawn_search};
pub use loop_runner::{run, Action};
