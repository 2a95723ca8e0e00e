//! Command implementations

pub mod generate;
pub mod multiply;
pub mod verify;

pub use generate::{run_generate, GenerateParams};
pub use multiply::{run_multiply, MultiplyParams};
pub use verify::{run_verify, VerifyParams};
