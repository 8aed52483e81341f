// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CategoryId, Record, ViewRow, annotate, fold_case};

pub const DEFAULT_FLAG_SENTINEL: &str = "yes";
const ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategorySelector {
    #[default]
    All,
    Only(String),
}

impl CategorySelector {
    /// Ids from routes and tabs arrive as text; an empty or `all` value means no narrowing.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == ALL {
            Self::All
        } else {
            Self::Only(trimmed.to_owned())
        }
    }

    pub fn from_id(id: CategoryId) -> Self {
        Self::Only(id.get().to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL,
            Self::Only(id) => id,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub const ALL: [Self; 3] = [Self::All, Self::Active, Self::Inactive];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => ALL,
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "Active" | "active" => Some(Self::Active),
            "Inactive" | "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentFilter {
    #[default]
    All,
    Paid,
    NonPaid,
}

impl PaymentFilter {
    pub const ALL: [Self; 3] = [Self::All, Self::Paid, Self::NonPaid];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => ALL,
            Self::Paid => "paid",
            Self::NonPaid => "non-paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "paid" => Some(Self::Paid),
            "non-paid" => Some(Self::NonPaid),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All Payment",
            Self::Paid => "Paid",
            Self::NonPaid => "Non-Paid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IssuedFilter {
    #[default]
    All,
    Issued,
    NonIssued,
}

impl IssuedFilter {
    pub const ALL: [Self; 3] = [Self::All, Self::Issued, Self::NonIssued];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => ALL,
            Self::Issued => "issued",
            Self::NonIssued => "non-issued",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "issued" => Some(Self::Issued),
            "non-issued" => Some(Self::NonIssued),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All Issued",
            Self::Issued => "Issued",
            Self::NonIssued => "Non-Issued",
        }
    }
}

/// Independent selectors, combined with AND.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub category: CategorySelector,
    pub status: StatusFilter,
    pub payment: PaymentFilter,
    pub issued: IssuedFilter,
    pub search: String,
}

/// Which record field each selector reads. An unbound selector behaves as if
/// the field were missing on every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterFields {
    pub category: Option<String>,
    pub status: Option<String>,
    pub payment: Option<String>,
    pub issued: Option<String>,
    pub flag_sentinel: String,
}

impl FilterFields {
    pub fn members() -> Self {
        Self {
            category: Some("user_member_catg_id".to_owned()),
            status: Some("user_status".to_owned()),
            payment: Some("payment_made".to_owned()),
            issued: Some("id_card_taken".to_owned()),
            flag_sentinel: DEFAULT_FLAG_SENTINEL.to_owned(),
        }
    }

    pub fn search_only() -> Self {
        Self {
            category: None,
            status: None,
            payment: None,
            issued: None,
            flag_sentinel: DEFAULT_FLAG_SENTINEL.to_owned(),
        }
    }

    fn flag_set(&self, record: &Record, field: Option<&String>) -> bool {
        field
            .and_then(|field| record.scalar_text(field))
            .is_some_and(|value| value.to_lowercase() == self.flag_sentinel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStage {
    Category,
    Status,
    Payment,
    Issued,
    Search,
}

impl FilterStage {
    pub const ORDER: [Self; 5] = [
        Self::Category,
        Self::Status,
        Self::Payment,
        Self::Issued,
        Self::Search,
    ];

    pub fn is_active(self, state: &FilterState) -> bool {
        match self {
            Self::Category => !state.category.is_all(),
            Self::Status => state.status != StatusFilter::All,
            Self::Payment => state.payment != PaymentFilter::All,
            Self::Issued => state.issued != IssuedFilter::All,
            Self::Search => !state.search.is_empty(),
        }
    }

    pub fn admits(self, record: &Record, state: &FilterState, fields: &FilterFields) -> bool {
        match self {
            Self::Category => match &state.category {
                CategorySelector::All => true,
                CategorySelector::Only(id) => fields
                    .category
                    .as_ref()
                    .and_then(|field| record.scalar_text(field))
                    .is_some_and(|value| value == *id),
            },
            Self::Status => match state.status {
                StatusFilter::All => true,
                status => fields
                    .status
                    .as_ref()
                    .and_then(|field| record.scalar_text(field))
                    .is_some_and(|value| value == status.as_str()),
            },
            Self::Payment => match state.payment {
                PaymentFilter::All => true,
                PaymentFilter::Paid => fields.flag_set(record, fields.payment.as_ref()),
                PaymentFilter::NonPaid => !fields.flag_set(record, fields.payment.as_ref()),
            },
            Self::Issued => match state.issued {
                IssuedFilter::All => true,
                IssuedFilter::Issued => fields.flag_set(record, fields.issued.as_ref()),
                IssuedFilter::NonIssued => !fields.flag_set(record, fields.issued.as_ref()),
            },
            Self::Search => {
                state.search.is_empty()
                    || record
                        .search_haystack()
                        .contains(&fold_case(&state.search))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaymentCounts {
    pub paid: usize,
    pub non_paid: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DerivedView {
    rows: Vec<ViewRow>,
}

impl DerivedView {
    pub fn rows(&self) -> &[ViewRow] {
        &self.rows
    }

    pub fn records(&self) -> Vec<Record> {
        self.rows.iter().map(|row| row.record.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPipeline {
    fields: FilterFields,
    order: [FilterStage; 5],
}

impl FilterPipeline {
    pub fn new(fields: FilterFields) -> Self {
        Self {
            fields,
            order: FilterStage::ORDER,
        }
    }

    /// Reorders the stages. The result never changes; only evaluation order does.
    pub fn with_order(mut self, order: [FilterStage; 5]) -> Self {
        self.order = order;
        self
    }

    pub fn fields(&self) -> &FilterFields {
        &self.fields
    }

    pub fn admits(&self, record: &Record, state: &FilterState) -> bool {
        self.order
            .iter()
            .filter(|stage| stage.is_active(state))
            .all(|stage| stage.admits(record, state, &self.fields))
    }

    pub fn derive_view(&self, records: &[Record], state: &FilterState) -> DerivedView {
        let rows: Vec<ViewRow> = records
            .iter()
            .filter(|record| self.admits(record, state))
            .map(|record| annotate(record, &state.search))
            .collect();
        debug!(input = records.len(), output = rows.len(), "derived view");
        DerivedView { rows }
    }

    /// Paid and non-paid totals inside the active category, ignoring every
    /// other selector.
    pub fn payment_counts(&self, records: &[Record], state: &FilterState) -> PaymentCounts {
        let mut counts = PaymentCounts::default();
        for record in records
            .iter()
            .filter(|record| FilterStage::Category.admits(record, state, &self.fields))
        {
            if self.fields.flag_set(record, self.fields.payment.as_ref()) {
                counts.paid += 1;
            } else {
                counts.non_paid += 1;
            }
        }
        counts
    }
}
