#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl AssociationKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToOne => "many-to-one",
            Self::ManyToMany => "many-to-many",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    #[default]
    Lazy,
    Eager,
}

/// Foreign key column of an association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinColumn {
    pub name: String,

    /// Column on the referenced table, `id` unless specified.
    pub referenced_column_name: String,

    pub nullable: bool,
}

impl JoinColumn {
    pub fn new(name: impl Into<String>, referenced_column_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            referenced_column_name: referenced_column_name.into(),
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Link table of a many-to-many association.
///
/// `join_columns` reference the owning side, `inverse_join_columns`
/// reference the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    pub name: String,
    pub schema: Option<String>,
    pub join_columns: Vec<JoinColumn>,
    pub inverse_join_columns: Vec<JoinColumn>,
}

impl JoinTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            join_columns: vec![],
            inverse_join_columns: vec![],
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn join_column(
        mut self,
        name: impl Into<String>,
        referenced_column_name: impl Into<String>,
    ) -> Self {
        self.join_columns
            .push(JoinColumn::new(name, referenced_column_name));
        self
    }

    pub fn inverse_join_column(
        mut self,
        name: impl Into<String>,
        referenced_column_name: impl Into<String>,
    ) -> Self {
        self.inverse_join_columns
            .push(JoinColumn::new(name, referenced_column_name));
        self
    }

    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A relationship from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    /// Name of the association on the source entity
    pub name: String,

    pub kind: AssociationKind,

    /// Class name of the target entity
    pub target: String,

    /// Name of the owning association on the target (inverse side only)
    pub mapped_by: Option<String>,

    /// Name of the inverse association on the target (owning side only)
    pub inversed_by: Option<String>,

    /// Recorded, not acted upon: entities do not hold association pointers.
    pub cascade: bool,

    pub fetch: FetchMode,

    pub join_column: Option<JoinColumn>,

    pub join_table: Option<JoinTable>,
}

impl Association {
    fn new(name: impl Into<String>, kind: AssociationKind, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            mapped_by: None,
            inversed_by: None,
            cascade: false,
            fetch: FetchMode::Lazy,
            join_column: None,
            join_table: None,
        }
    }

    pub fn one_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AssociationKind::OneToOne, target)
    }

    pub fn one_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AssociationKind::OneToMany, target)
    }

    pub fn many_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AssociationKind::ManyToOne, target)
    }

    pub fn many_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AssociationKind::ManyToMany, target)
    }

    pub fn join_column(
        mut self,
        name: impl Into<String>,
        referenced_column_name: impl Into<String>,
    ) -> Self {
        self.join_column = Some(JoinColumn::new(name, referenced_column_name));
        self
    }

    pub fn join_table(mut self, join_table: JoinTable) -> Self {
        self.join_table = Some(join_table);
        self
    }

    pub fn mapped_by(mut self, association: impl Into<String>) -> Self {
        self.mapped_by = Some(association.into());
        self
    }

    pub fn inversed_by(mut self, association: impl Into<String>) -> Self {
        self.inversed_by = Some(association.into());
        self
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    pub fn fetch(mut self, fetch: FetchMode) -> Self {
        self.fetch = fetch;
        self
    }

    /// Returns `true` if this side stores the relationship (join column or
    /// join table) rather than deferring to the target through `mapped_by`.
    pub fn is_owning_side(&self) -> bool {
        self.mapped_by.is_none()
    }
}
