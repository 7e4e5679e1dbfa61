pub mod helm;

// Re-export all handler functions
pub use helm::{handle_annotate, handle_clean, handle_detect, handle_evaluate};
