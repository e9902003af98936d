//! Lifecycle tracking and change sets.

mod identity;
pub use identity::IdentityKey;

use crate::{
    entity::{EntityRef, Oid},
    session::Session,
};

use indexmap::{IndexMap, IndexSet};
use rowmap_core::{schema::Snapshot, stmt::Value, EntityMetadata, Error, Result};
use rowmap_sql::stmt::{Delete, Insert, Update};
use std::{collections::HashMap, sync::Arc};

/// Lifecycle state of an entity instance within a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Scheduled for insert on the next commit.
    New,

    /// Loaded or written, with a snapshot to diff against.
    Managed,

    /// Scheduled for delete on the next commit.
    Removed,

    /// Not tracked.
    Detached,
}

/// The identity map and per-instance lifecycle state of one entity manager.
///
/// Cloning a unit of work copies its bookkeeping. The entity instances
/// themselves are shared with the clone.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    entities: IndexMap<Oid, Tracked>,
    identity_map: HashMap<IdentityKey, Oid>,
    insertions: IndexSet<Oid>,
    deletions: IndexSet<Oid>,
}

#[derive(Debug, Clone)]
struct Tracked {
    entity: EntityRef,
    metadata: Arc<EntityMetadata>,
    state: EntityState,

    /// Field values as last read from or written to the database
    snapshot: Snapshot,

    /// Slot in the identity map, once the instance has an identity
    key: Option<IdentityKey>,
}

/// Work computed for one commit.
struct ChangeSet {
    inserts: Vec<Oid>,
    updates: Vec<PendingUpdate>,
    deletes: Vec<Oid>,
}

struct PendingUpdate {
    oid: Oid,
    changes: Vec<(String, Value)>,
    current: Snapshot,
}

/// Outcome of a successful commit, applied once the transaction is done.
struct Written {
    inserted: Vec<(Oid, IdentityKey, Snapshot)>,
    updated: Vec<(Oid, IdentityKey, Snapshot)>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, oid: Oid) -> EntityState {
        self.entities
            .get(&oid)
            .map(|tracked| tracked.state)
            .unwrap_or(EntityState::Detached)
    }

    /// Returns `true` if the instance is tracked and not scheduled for
    /// removal.
    pub fn contains(&self, oid: Oid) -> bool {
        matches!(self.state(oid), EntityState::New | EntityState::Managed)
    }

    pub fn is_scheduled_for_insert(&self, oid: Oid) -> bool {
        self.insertions.contains(&oid)
    }

    pub fn is_scheduled_for_delete(&self, oid: Oid) -> bool {
        self.deletions.contains(&oid)
    }

    /// Number of tracked instances.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of identities in the identity map.
    pub fn identity_count(&self) -> usize {
        self.identity_map.len()
    }

    /// Iterates the identity map slots, in no particular order.
    pub fn identities(&self) -> impl Iterator<Item = (&IdentityKey, Oid)> + '_ {
        self.identity_map.iter().map(|(key, oid)| (key, *oid))
    }

    pub(crate) fn persist(&mut self, entity: EntityRef, metadata: Arc<EntityMetadata>) {
        if let Some(tracked) = self.entities.get_mut(&entity.oid) {
            if tracked.state == EntityState::Removed {
                tracked.state = EntityState::Managed;
                self.deletions.shift_remove(&entity.oid);
            }
            return;
        }

        self.insertions.insert(entity.oid);
        self.entities.insert(
            entity.oid,
            Tracked {
                entity,
                metadata,
                state: EntityState::New,
                snapshot: Snapshot::new(),
                key: None,
            },
        );
    }

    pub(crate) fn remove(&mut self, oid: Oid) -> Result<()> {
        let Some(tracked) = self.entities.get_mut(&oid) else {
            return Err(Error::state(format!("entity {oid} is not managed")));
        };

        match tracked.state {
            EntityState::New => {
                self.insertions.shift_remove(&oid);
                self.entities.shift_remove(&oid);
            }
            EntityState::Managed => {
                tracked.state = EntityState::Removed;
                self.deletions.insert(oid);
            }
            EntityState::Removed | EntityState::Detached => {}
        }

        Ok(())
    }

    /// Marks an instance Managed under `key`, with `snapshot` as the values
    /// to diff against on the next commit.
    pub(crate) fn register_managed(
        &mut self,
        entity: EntityRef,
        metadata: Arc<EntityMetadata>,
        key: IdentityKey,
        snapshot: Snapshot,
    ) {
        let oid = entity.oid;

        if let Some(previous) = self.entities.get(&oid).and_then(|t| t.key.clone()) {
            if previous != key && self.identity_map.get(&previous) == Some(&oid) {
                self.identity_map.remove(&previous);
            }
        }

        self.insertions.shift_remove(&oid);
        self.deletions.shift_remove(&oid);
        self.identity_map.insert(key.clone(), oid);
        self.entities.insert(
            oid,
            Tracked {
                entity,
                metadata,
                state: EntityState::Managed,
                snapshot,
                key: Some(key),
            },
        );
    }

    /// Identity map lookup. Never performs I/O.
    pub(crate) fn try_get(&self, key: &IdentityKey) -> Option<&EntityRef> {
        let oid = self.identity_map.get(key)?;
        self.entities.get(oid).map(|tracked| &tracked.entity)
    }

    pub(crate) fn detach(&mut self, oid: Oid) {
        let Some(tracked) = self.entities.shift_remove(&oid) else {
            return;
        };

        if let Some(key) = tracked.key {
            if self.identity_map.get(&key) == Some(&oid) {
                self.identity_map.remove(&key);
            }
        }

        self.insertions.shift_remove(&oid);
        self.deletions.shift_remove(&oid);
    }

    pub(crate) fn clear(&mut self) {
        self.entities.clear();
        self.identity_map.clear();
        self.insertions.clear();
        self.deletions.clear();
    }

    /// Writes every scheduled change in one transaction.
    ///
    /// Inserts run first, then updates, then deletes. Nothing reaches the
    /// connection when there is nothing to write. On failure the transaction
    /// is rolled back and the bookkeeping is left as it was.
    pub(crate) fn commit(&mut self, session: &mut Session) -> Result<()> {
        let changes = self.compute_change_set()?;

        if changes.inserts.is_empty() && changes.updates.is_empty() && changes.deletes.is_empty()
        {
            tracing::trace!("nothing to commit");
            return Ok(());
        }

        session.begin()?;

        let written = match self.write(session, &changes) {
            Ok(written) => written,
            Err(err) => {
                if let Err(rollback) = session.rollback() {
                    tracing::warn!(error = %rollback, "rollback after failed commit failed");
                }
                return Err(err.context(Error::transaction("commit failed, changes rolled back")));
            }
        };

        session.commit()?;

        tracing::debug!(
            inserts = changes.inserts.len(),
            updates = changes.updates.len(),
            deletes = changes.deletes.len(),
            "committed unit of work"
        );

        self.apply(written, &changes.deletes);
        Ok(())
    }

    fn compute_change_set(&self) -> Result<ChangeSet> {
        let mut updates = vec![];

        for (oid, tracked) in &self.entities {
            if tracked.state != EntityState::Managed {
                continue;
            }

            let current = tracked.metadata.extract(&*tracked.entity.borrow()?)?;

            let changes: Vec<_> = current
                .iter()
                .filter(|(name, value)| tracked.snapshot.get(*name) != Some(*value))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();

            if !changes.is_empty() {
                updates.push(PendingUpdate {
                    oid: *oid,
                    changes,
                    current,
                });
            }
        }

        Ok(ChangeSet {
            inserts: self.insertions.iter().copied().collect(),
            updates,
            deletes: self.deletions.iter().copied().collect(),
        })
    }

    fn write(&self, session: &mut Session, changes: &ChangeSet) -> Result<Written> {
        let mut written = Written {
            inserted: vec![],
            updated: vec![],
        };

        for oid in &changes.inserts {
            let tracked = self.tracked(*oid)?;
            let (key, snapshot) = self.insert(session, tracked)?;
            written.inserted.push((*oid, key, snapshot));
        }

        for update in &changes.updates {
            let tracked = self.tracked(update.oid)?;
            let key = self.update(session, tracked, update)?;
            written.updated.push((update.oid, key, update.current.clone()));
        }

        for oid in &changes.deletes {
            self.delete(session, self.tracked(*oid)?)?;
        }

        Ok(written)
    }

    fn insert(&self, session: &mut Session, tracked: &Tracked) -> Result<(IdentityKey, Snapshot)> {
        let metadata = &tracked.metadata;
        let values = metadata.extract(&*tracked.entity.borrow()?)?;
        let generated = metadata.generates_identity();

        let mut stmt = Insert::new(metadata.full_table_name());
        for field in metadata.fields.values() {
            if generated && metadata.is_identifier(&field.name) {
                continue;
            }

            let value = match &values[&field.name] {
                Value::Null => field.default.clone().unwrap_or_default(),
                value => value.clone(),
            };
            stmt = stmt.value(&field.column, value);
        }

        session.exec_update(&stmt.into())?;

        if generated {
            let id = session.last_insert_id()?;
            metadata.set_field(
                &mut *tracked.entity.borrow_mut()?,
                &metadata.identifiers[0],
                Value::String(id),
            )?;
        }

        let snapshot = metadata.extract(&*tracked.entity.borrow()?)?;
        let key = IdentityKey::from_snapshot(metadata, &snapshot)?;

        if let Some(existing) = self.identity_map.get(&key) {
            if *existing != tracked.entity.oid {
                return Err(Error::state(format!(
                    "another instance of {key} is already managed"
                )));
            }
        }

        Ok((key, snapshot))
    }

    fn update(
        &self,
        session: &mut Session,
        tracked: &Tracked,
        update: &PendingUpdate,
    ) -> Result<IdentityKey> {
        let metadata = &tracked.metadata;
        let key = self.key_of(tracked)?;

        let mut stmt = Update::new(metadata.full_table_name());
        for (name, value) in &update.changes {
            if let Some(column) = metadata.column(name) {
                stmt = stmt.set(column, value.clone());
            }
        }
        stmt = stmt.filter(key.filter(metadata));

        session.exec_update(&stmt.into())?;

        IdentityKey::from_snapshot(metadata, &update.current)
    }

    fn delete(&self, session: &mut Session, tracked: &Tracked) -> Result<()> {
        let metadata = &tracked.metadata;
        let key = self.key_of(tracked)?;

        let stmt = Delete::new(metadata.full_table_name(), key.filter(metadata));
        session.exec_update(&stmt.into())?;
        Ok(())
    }

    fn apply(&mut self, written: Written, deletes: &[Oid]) {
        for (oid, key, snapshot) in written.inserted.into_iter().chain(written.updated) {
            let Some(tracked) = self.entities.get_mut(&oid) else {
                continue;
            };

            if let Some(previous) = tracked.key.replace(key.clone()) {
                if previous != key && self.identity_map.get(&previous) == Some(&oid) {
                    self.identity_map.remove(&previous);
                }
            }

            tracked.state = EntityState::Managed;
            tracked.snapshot = snapshot;
            self.identity_map.insert(key, oid);
        }

        self.insertions.clear();

        for oid in deletes {
            self.detach(*oid);
        }
    }

    fn tracked(&self, oid: Oid) -> Result<&Tracked> {
        self.entities
            .get(&oid)
            .ok_or_else(|| Error::state(format!("entity {oid} is not managed")))
    }

    /// The identity the row was last written under, used to address it.
    fn key_of(&self, tracked: &Tracked) -> Result<IdentityKey> {
        match &tracked.key {
            Some(key) => Ok(key.clone()),
            None => IdentityKey::from_snapshot(&tracked.metadata, &tracked.snapshot),
        }
    }
}
