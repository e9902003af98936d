mod identifier;
pub use identifier::Identifier;

mod value;
pub use value::Value;
