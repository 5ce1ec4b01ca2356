//! Compositor domain types and the decoding of scriptlet output

pub mod model;
pub mod parser;
pub mod process;

pub use model::{Desktop, Environment, Point, Rect, Screen, Window};
pub use parser::{OutputParser, Record, parse_identifier};
pub use process::{ProcFs, ProcessTable, resolve_command};
