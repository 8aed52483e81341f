// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{KeySet, RecordCollection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Text,
    Highlighted,
    Email,
    Phone,
    Currency,
    Date,
    LongDate,
    DashIfEmpty,
    StatusTag,
    PaymentTag,
    Avatar,
    Actions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnBinding {
    /// Shown only when the collection's schema exposes the key.
    Data,
    /// Always shown.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub renderer: RendererKind,
    pub binding: ColumnBinding,
}

impl ColumnSpec {
    pub const fn data(key: &'static str, label: &'static str, renderer: RendererKind) -> Self {
        Self {
            key,
            label,
            renderer,
            binding: ColumnBinding::Data,
        }
    }

    pub const fn fixed(key: &'static str, label: &'static str, renderer: RendererKind) -> Self {
        Self {
            key,
            label,
            renderer,
            binding: ColumnBinding::Fixed,
        }
    }

    pub fn is_active(&self, schema: &KeySet) -> bool {
        match self.binding {
            ColumnBinding::Fixed => true,
            ColumnBinding::Data => schema.contains(self.key),
        }
    }
}

pub fn derive_columns(candidates: &[ColumnSpec], schema: &KeySet) -> Vec<ColumnSpec> {
    candidates
        .iter()
        .filter(|column| column.is_active(schema))
        .copied()
        .collect()
}

pub fn derive_columns_for(
    candidates: &[ColumnSpec],
    collection: &RecordCollection,
) -> Vec<ColumnSpec> {
    derive_columns(candidates, &collection.schema())
}
