//! The object query language: parsing, caching and compilation to SQL.

pub mod ast;

mod cache;
pub use cache::ParseCache;

mod compiler;
pub use compiler::{CompiledQuery, Compiler};

mod lexer;

mod parser;
pub use parser::parse;
