// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{AuxiliaryLookup, RecordCollection};

/// Last fetched snapshot of one screen's collection plus the lookups that
/// arrived with it. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordStore {
    collection: RecordCollection,
    lookup: AuxiliaryLookup,
    generation: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, collection: RecordCollection, lookup: AuxiliaryLookup) {
        self.generation = self.generation.saturating_add(1);
        debug!(
            generation = self.generation,
            records = collection.len(),
            lookups = lookup.len(),
            "record store replaced"
        );
        self.collection = collection;
        self.lookup = lookup;
    }

    /// Lookups are scoped to the fetch that delivered them, so they go too.
    pub fn clear(&mut self) {
        self.replace(RecordCollection::empty(), AuxiliaryLookup::default());
    }

    pub fn collection(&self) -> &RecordCollection {
        &self.collection
    }

    pub fn lookup(&self) -> &AuxiliaryLookup {
        &self.lookup
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }
}
