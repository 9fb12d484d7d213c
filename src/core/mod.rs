// Query planning and execution
// Turns a validated configuration into a parameterized query and runs it

pub mod backend;
pub mod engine;

// Re-export commonly used items
pub use backend::{QueryBackend, QueryDescription};
pub use engine::{BuiltQuery, EngineOptions, QueryEngine, Strictness};
