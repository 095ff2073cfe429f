//! Terminal UI module using ratatui.
//!
//! This module provides the TUI rendering and input handling:
//!
//! - `render`: frame layout, title/status bars and overlays
//! - `dashboard`: the protected dashboard panels
//! - `input`: keyboard event handling
//! - `styles`: color scheme and text styling

pub mod dashboard;
pub mod input;
pub mod render;
pub mod styles;
