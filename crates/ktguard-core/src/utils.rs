//! Helpers shared by the engine and rule implementations.

pub mod allowance;
pub mod names;
pub mod paths;

// Re-export commonly used utilities for rule implementations
#[doc(inline)]
pub use allowance::{check_allow, AllowCheck};
#[doc(inline)]
pub use names::{closest_match, levenshtein};
#[doc(inline)]
pub use paths::relative_slash_path;
