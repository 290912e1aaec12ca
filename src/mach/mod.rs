/*!
## Rust Machine Module

This Rust module runs tokenized lines straight from the flash store.
Expressions are evaluated with two small bounded stacks. Control flow
frames and DIM arrays share one fixed arena.

*/

/// Operator stack capacity of the expression evaluator.
pub const EXPRESSION_STACK_SIZE: usize = 8;
/// Value stack capacity of the expression evaluator.
pub const EXPRESSION_QUEUE_SIZE: usize = 8;
pub const MAX_TIMERS: usize = 4;
/// Timer used by DELAY and AUTORUN.
pub const DELAY_TIMER: u8 = (MAX_TIMERS - 1) as u8;
pub const FILE_HANDLES: usize = 4;
/// Milliseconds from boot until an autorun program starts.
pub const AUTORUN_DELAY: i32 = 5000;
/// Arena bytes reserved per stored line for the line index.
pub const INDEX_ENTRY_LEN: usize = 2;

mod arena;
mod config;
mod expr;
mod host;
mod runtime;
mod stack;
mod statement;
mod var;

pub use arena::{Arena, Block, Frame, VariableFrame};
pub use config::Config;
pub use expr::{evaluate, parse_int, Context, Lookup, Mode};
pub use host::{Host, Recorder, Timer};
pub use runtime::{Pc, Runtime, Status};
pub use stack::Stack;
pub use statement::Statement;
pub use var::Var;

#[cfg(test)]
mod tests;
