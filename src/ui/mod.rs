mod defines;
mod file_picker;
mod uiapp;

pub use defines::*;
pub use file_picker::*;
pub use uiapp::*;
