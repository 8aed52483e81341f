// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupPurpose {
    UserImageBase,
    PlaceholderImage,
}

impl LookupPurpose {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserImageBase => "User",
            Self::PlaceholderImage => "No Image",
        }
    }
}

/// Wire pair as delivered next to a record collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    #[serde(rename = "image_for")]
    pub purpose_key: String,
    #[serde(rename = "image_url")]
    pub resolved_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuxiliaryLookup {
    values: BTreeMap<String, String>,
}

impl AuxiliaryLookup {
    /// The first entry for a purpose key wins; later duplicates are ignored.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = LookupEntry>,
    {
        let mut values = BTreeMap::new();
        for entry in entries {
            values
                .entry(entry.purpose_key)
                .or_insert(entry.resolved_value);
        }
        Self { values }
    }

    pub fn get(&self, purpose_key: &str) -> Option<&str> {
        self.values.get(purpose_key).map(String::as_str)
    }

    pub fn purpose(&self, purpose: LookupPurpose) -> Option<&str> {
        self.get(purpose.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn avatar_src(&self, record: &Record) -> String {
        let placeholder = self
            .purpose(LookupPurpose::PlaceholderImage)
            .unwrap_or_default();
        match record.scalar_text("user_image") {
            Some(image) if !image.trim().is_empty() => format!(
                "{}{}",
                self.purpose(LookupPurpose::UserImageBase)
                    .unwrap_or_default(),
                image.trim()
            ),
            _ => placeholder.to_owned(),
        }
    }
}
