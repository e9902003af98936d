use super::Filter;

use rowmap_core::Error;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Columns(Vec<String>),

    /// `COUNT(*)`
    Count,

    /// `FUNC(column)`
    Aggregate(Aggregate, String),
}

/// Aggregate functions a repository may project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub const ALL: [Aggregate; 5] = [Self::Count, Self::Sum, Self::Avg, Self::Min, Self::Max];

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

impl FromStr for Aggregate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();

        Self::ALL
            .into_iter()
            .find(|aggregate| aggregate.as_sql().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::validation(format!(
                    "invalid aggregate function `{name}`; expected one of COUNT, SUM, AVG, MIN, MAX"
                ))
            })
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    pub projection: Projection,
    pub filter: Filter,
    pub order_by: Vec<(String, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    pub fn new(table: impl Into<String>, projection: Projection) -> Self {
        Self {
            table: table.into(),
            projection,
            filter: Filter::default(),
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn columns<S: Into<String>>(
        table: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            table,
            Projection::Columns(columns.into_iter().map(Into::into).collect()),
        )
    }

    pub fn count(table: impl Into<String>) -> Self {
        Self::new(table, Projection::Count)
    }

    pub fn aggregate(
        table: impl Into<String>,
        aggregate: Aggregate,
        column: impl Into<String>,
    ) -> Self {
        Self::new(table, Projection::Aggregate(aggregate, column.into()))
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<u64>) -> Self {
        self.offset = offset;
        self
    }
}
