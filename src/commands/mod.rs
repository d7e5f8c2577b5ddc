//! Command handler layer.
//!
//! ## Files
//! - `checks.rs` — sequential driver over the selected integrity checks.
//!
//! Parse/match CLI inputs here and delegate the checks to `services/*`.

pub mod checks;

pub use checks::handle_checks;
