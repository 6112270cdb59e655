//! Client-side equipment form

pub mod state;

pub use state::{EditBuffer, FormError, FormState};
