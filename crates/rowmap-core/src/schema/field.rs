use super::Accessor;
use crate::{stmt::Value, Error, Result};

use std::str::FromStr;

/// Semantic type of a mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    DateTime,
    Date,
    Time,
    Blob,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::Blob => "blob",
        }
    }

    /// Only character and decimal columns take a length.
    pub fn accepts_length(self) -> bool {
        matches!(self, Self::String | Self::Text | Self::Decimal)
    }

    /// Converts a value read from the database into the representation
    /// used for this type. Null passes through untouched.
    pub fn coerce(self, value: Value) -> Result<Value> {
        use Value::*;

        Ok(match (self, value) {
            (_, Null) => Null,

            (Self::Integer, I64(v)) => I64(v),
            (Self::Integer, F64(v)) => I64(v as i64),
            (Self::Integer, Bool(v)) => I64(v as i64),
            (Self::Integer, String(v)) => I64(v.trim().parse()?),

            (Self::Float | Self::Decimal, F64(v)) => F64(v),
            (Self::Float | Self::Decimal, I64(v)) => F64(v as f64),
            (Self::Float | Self::Decimal, String(v)) => F64(v.trim().parse()?),

            (Self::Boolean, Bool(v)) => Bool(v),
            (Self::Boolean, I64(v)) => Bool(v != 0),
            (Self::Boolean, String(v)) => match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "t" | "yes" => Bool(true),
                "0" | "false" | "f" | "no" | "" => Bool(false),
                _ => return Err(Error::type_conversion(String(v), "boolean")),
            },

            (Self::Blob, Bytes(v)) => Bytes(v),
            (Self::Blob, String(v)) => Bytes(v.into_bytes()),

            (
                Self::String | Self::Text | Self::DateTime | Self::Date | Self::Time,
                String(v),
            ) => String(v),
            (
                Self::String | Self::Text | Self::DateTime | Self::Date | Self::Time,
                Bytes(v),
            ) => match std::string::String::from_utf8(v) {
                Ok(v) => String(v),
                Err(err) => return Err(Error::type_conversion(Bytes(err.into_bytes()), "string")),
            },
            (
                Self::String | Self::Text | Self::DateTime | Self::Date | Self::Time,
                value @ (I64(_) | F64(_) | Bool(_)),
            ) => String(value.to_string()),

            (ty, value) => return Err(Error::type_conversion(value, ty.name())),
        })
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "text" => Self::Text,
            "integer" | "int" => Self::Integer,
            "float" => Self::Float,
            "decimal" => Self::Decimal,
            "boolean" | "bool" => Self::Boolean,
            "datetime" => Self::DateTime,
            "date" => Self::Date,
            "time" => Self::Time,
            "blob" => Self::Blob,
            _ => return Err(Error::mapping(format!("invalid column type `{s}`"))),
        })
    }
}

impl core::fmt::Display for FieldType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A mapped field, as stored on [`EntityMetadata`](super::EntityMetadata).
#[derive(Debug, Clone)]
pub struct FieldMapping {
    /// Name of the field on the entity
    pub name: String,

    /// Name of the column storing the field
    pub column: String,

    pub ty: FieldType,

    pub length: Option<u32>,

    pub nullable: bool,

    pub default: Option<Value>,

    pub accessor: Accessor,
}

/// Declares a field on a [`Mapping`](super::Mapping).
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) column: Option<String>,
    pub(crate) ty: FieldType,
    pub(crate) length: Option<u32>,
    pub(crate) nullable: bool,
    pub(crate) default: Option<Value>,
    pub(crate) id: bool,
    pub(crate) accessor: Accessor,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: FieldType, accessor: Accessor) -> Self {
        Self {
            name: name.into(),
            column: None,
            ty,
            length: None,
            nullable: false,
            default: None,
            id: false,
            accessor,
        }
    }

    /// Column name. Defaults to the field name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the field as (part of) the identifier.
    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }

    pub(crate) fn build(self, class: &str) -> Result<(FieldMapping, bool)> {
        let column = self.column.unwrap_or_else(|| self.name.clone());

        if self.name.is_empty() {
            return Err(Error::mapping(format!("field of `{class}` has an empty name")));
        }

        if column.trim().is_empty() {
            return Err(Error::mapping(format!(
                "field `{class}.{}` has an empty column name",
                self.name
            )));
        }

        if let Some(length) = self.length {
            if !self.ty.accepts_length() {
                return Err(Error::mapping(format!(
                    "field `{class}.{}`: length is only valid for string, text and decimal columns, not {}",
                    self.name, self.ty
                )));
            }

            if length == 0 || length > super::MAX_COLUMN_LENGTH {
                return Err(Error::mapping(format!(
                    "field `{class}.{}`: length must be between 1 and {}, got {length}",
                    self.name,
                    super::MAX_COLUMN_LENGTH
                )));
            }
        }

        let field = FieldMapping {
            name: self.name,
            column,
            ty: self.ty,
            length: self.length,
            nullable: self.nullable,
            default: self.default,
            accessor: self.accessor,
        };

        Ok((field, self.id))
    }
}
