pub mod oql;
pub use oql::{CompiledQuery, Compiler, ParseCache};

pub mod serializer;
pub use serializer::{Params, Placeholder, Serializer};

pub mod stmt;
pub use stmt::Statement;
