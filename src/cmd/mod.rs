mod schema;
mod trace_cmd;

pub use schema::*;
pub use trace_cmd::*;
