pub mod core;

mod tests;

// Re-export the primary types so `crate::logger::*` paths stay short.
pub use self::core::{ClockedLogger, INIT_MESSAGE};
