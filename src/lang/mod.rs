/*!
# Rust Language Module

This Rust module turns typed lines into the compact token form stored in
flash, and back into text for listings.

*/

/// Line terminator of tokenized text.
pub const NL: u8 = b'\n';

/// Longest line accepted from the terminal.
pub const MAX_LINE_LEN: usize = 255;

pub type LineNumber = u16;

#[macro_use]
mod error;
mod cursor;
mod lex;
mod line;
mod token;

pub use cursor::Cursor;
pub use cursor::MAX_LINE_NUMBER;
pub use error::Error;
pub use error::ErrorCode;
pub use lex::{prepare, tokenize};
pub use line::{listing, Line};
pub use token::{constant, Token};

#[cfg(test)]
mod tests;
