pub mod driver;
pub use driver::Connection;

mod error;
pub use error::{Error, IntoError};

pub mod schema;
pub use schema::{EntityMetadata, Registry};

pub mod stmt;

pub type Result<T, E = Error> = core::result::Result<T, E>;
