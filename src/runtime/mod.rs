mod aggregate;
mod decoder;

pub use aggregate::*;
pub use decoder::*;
