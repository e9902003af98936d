/// SQL joins implementing an association, produced by
/// [`Registry::association_join`](super::Registry::association_join).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationJoin {
    /// Class of the entity reached through the association
    pub target: String,

    /// Tables to join, in order. The last step is always the target table.
    /// Many-to-many associations add a link table step before it.
    pub steps: Vec<JoinStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub table: String,
    pub alias: String,

    /// Join condition in column terms, e.g. `p.author_id = u.id`
    pub condition: String,
}

impl AssociationJoin {
    pub fn target_step(&self) -> &JoinStep {
        // Always constructed with at least one step
        &self.steps[self.steps.len() - 1]
    }
}
