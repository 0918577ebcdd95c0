//! Static code indexing: filesystem scanning, parsing, and symbol/edge
//! extraction.

pub mod filesystem;
pub mod parser;
pub mod pipeline;
pub mod symbols;
