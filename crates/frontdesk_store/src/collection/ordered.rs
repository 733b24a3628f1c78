//! Most-recent-first collection implementation.

use frontdesk_protocol::{Record, RecordId};

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The record was new and went to the front.
    Inserted,
    /// An existing record was replaced at `position`.
    Replaced {
        /// Index of the replaced record.
        position: usize,
    },
}

/// An ordered collection of records.
///
/// `Collection<T>` keeps records in display order, newest first. It is a
/// plain data structure; sharing and locking are the caller's concern
/// (see [`crate::Store`]).
///
/// # Example
///
/// ```rust,ignore
/// let mut requests: Collection<Request> = Collection::new();
/// requests.insert_front(first);
/// requests.insert_front(second);
/// assert_eq!(requests.position(second.id), Some(0));
///
/// // Replacing keeps the position
/// requests.replace(first_completed);
/// assert_eq!(requests.position(first.id), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct Collection<T: Record> {
    records: Vec<T>,
}

impl<T: Record> Collection<T> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Creates a collection from records already in display order.
    pub fn from_ordered(records: Vec<T>) -> Self {
        Self { records }
    }

    /// Returns the collection name.
    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    /// Inserts a record as the newest item.
    ///
    /// No identifier check is made; a repeated id produces a second entry.
    pub fn insert_front(&mut self, record: T) {
        self.records.insert(0, record);
    }

    /// Replaces the record with the same id, keeping its position.
    ///
    /// Returns the position, or `None` if no record matched (nothing changes).
    pub fn replace(&mut self, record: T) -> Option<usize> {
        let position = self.position(record.id())?;
        self.records[position] = record;
        Some(position)
    }

    /// Replaces the record with the same id, or inserts it at the front.
    pub fn upsert(&mut self, record: T) -> UpsertOutcome {
        match self.position(record.id()) {
            Some(position) => {
                self.records[position] = record;
                UpsertOutcome::Replaced { position }
            }
            None => {
                self.insert_front(record);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Replaces the whole content with a snapshot in display order.
    pub fn reset(&mut self, records: Vec<T>) {
        self.records = records;
    }

    /// Gets a record by id.
    pub fn get(&self, id: RecordId) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Returns the display position of the first record with `id`.
    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    /// Returns true if a record with `id` exists.
    pub fn contains(&self, id: RecordId) -> bool {
        self.position(id).is_some()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates in display order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    /// Returns the records in display order.
    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    /// Returns ids that appear more than once.
    ///
    /// Only the insert path can produce these.
    pub fn duplicate_ids(&self) -> Vec<RecordId> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for record in &self.records {
            let id = record.id();
            if !seen.insert(id) && !duplicates.contains(&id) {
                duplicates.push(id);
            }
        }
        duplicates
    }
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}
