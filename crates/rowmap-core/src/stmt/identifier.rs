use super::Value;

use indexmap::IndexMap;

/// Identifier passed to `find`, `get_reference` and friends.
///
/// Single-key entities take a scalar; composite keys take a map of field
/// name to value. Field order in the map is irrelevant.
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    Scalar(Value),
    Composite(IndexMap<String, Value>),
}

impl Identifier {
    /// Builds a composite identifier from `(field, value)` pairs.
    pub fn composite<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Composite(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Composite(_) => None,
        }
    }
}

impl core::fmt::Display for Identifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Scalar(value) => core::fmt::Display::fmt(value, f),
            Self::Composite(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<Value> for Identifier {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i32> for Identifier {
    fn from(value: i32) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<IndexMap<String, Value>> for Identifier {
    fn from(fields: IndexMap<String, Value>) -> Self {
        Self::Composite(fields)
    }
}

impl<V, const N: usize> From<[(&str, V); N]> for Identifier
where
    V: Into<Value>,
{
    fn from(fields: [(&str, V); N]) -> Self {
        Self::composite(fields)
    }
}
