// Modules
mod gateway;

// Uses
pub use self::gateway::{event_handler, on_error};
