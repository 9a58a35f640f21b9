pub mod asm;
pub mod errors;
pub mod generator;

pub use asm::*;
pub use errors::*;
pub use generator::*;
