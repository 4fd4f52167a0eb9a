// index/mod.rs
mod key_index;

pub use key_index::{BlockSpan, KeyIndex, FORMAT_VERSION};
