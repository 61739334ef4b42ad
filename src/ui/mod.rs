//! Terminal viewer over a live session (read side only)

pub mod layout;
pub mod renderer;
pub mod terminal;

pub use terminal::{run_ui, UiExit};
