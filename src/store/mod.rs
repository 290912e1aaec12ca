/*!
## Rust Flash Store Module

Program lines and small records kept in raw flash pages as an
append-only log, with wear leveling by page age and whole-page
compaction.

*/

mod flash;
mod item;
mod store;

pub mod special;

pub use flash::{Flash, RamFlash};
pub use item::{item_len, HEADER_LEN, MAX_ITEM_LEN};
pub use store::{FlashStore, PageMeta, AGE_LEN, ERASED_AGE};

#[cfg(test)]
mod tests;
