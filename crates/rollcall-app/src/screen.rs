// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    ActionContext, AuxiliaryLookup, CategoryId, CategorySelector, ColumnSpec, DerivedView,
    FilterFields, FilterPipeline, FilterStage, FilterState, IssuedFilter, PaymentCounts,
    PaymentFilter, PresentationSnapshot, Record, RecordCollection, RecordStore, RenderContext,
    RendererKind, RowAction, StatusFilter, derive_columns_for,
};

pub const ACTIVE_STATUS: &str = "Active";
pub const INACTIVE_STATUS: &str = "Inactive";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenKind {
    Members,
    Registrations,
    MemberReport,
}

const MEMBER_COLUMNS: [ColumnSpec; 11] = [
    ColumnSpec::fixed("user_image", "Image", RendererKind::Avatar),
    ColumnSpec::data("user_mid", "MID", RendererKind::Highlighted),
    ColumnSpec::data("name", "Full Name", RendererKind::Highlighted),
    ColumnSpec::data("mobile", "Mobile", RendererKind::Phone),
    ColumnSpec::data("email", "Email", RendererKind::Email),
    ColumnSpec::data("id_card_type", "ID Card Type", RendererKind::Highlighted),
    ColumnSpec::data("member_category", "Member Category", RendererKind::Highlighted),
    ColumnSpec::data("id_card_taken", "ID Card Taken", RendererKind::DashIfEmpty),
    ColumnSpec::data("user_status", "Status", RendererKind::StatusTag),
    ColumnSpec::data("payment_made", "Payment", RendererKind::PaymentTag),
    ColumnSpec::fixed("actions", "Actions", RendererKind::Actions),
];

const REGISTRATION_COLUMNS: [ColumnSpec; 10] = [
    ColumnSpec::data("event_name", "Event", RendererKind::Highlighted),
    ColumnSpec::data("event_register_name", "Name", RendererKind::Highlighted),
    ColumnSpec::data("event_register_mobile", "Mobile", RendererKind::Phone),
    ColumnSpec::data("event_register_email", "Email", RendererKind::Email),
    ColumnSpec::data("event_register_amount", "Amount", RendererKind::Currency),
    ColumnSpec::data("event_register_mid", "MID", RendererKind::DashIfEmpty),
    ColumnSpec::data("event_register_payment_type", "Payment Type", RendererKind::DashIfEmpty),
    ColumnSpec::data("event_register_transaction", "Transaction", RendererKind::DashIfEmpty),
    ColumnSpec::data("event_register_date", "Date", RendererKind::Date),
    ColumnSpec::fixed("actions", "Actions", RendererKind::Actions),
];

const REPORT_COLUMNS: [ColumnSpec; 10] = [
    ColumnSpec::fixed("user_image", "Image", RendererKind::Avatar),
    ColumnSpec::data("user_mid", "MID", RendererKind::Text),
    ColumnSpec::data("name", "Name", RendererKind::Text),
    ColumnSpec::data("user_dob", "DOB", RendererKind::LongDate),
    ColumnSpec::data("email", "Email", RendererKind::Email),
    ColumnSpec::data("mobile", "Mobile", RendererKind::Text),
    ColumnSpec::data("user_whatsapp", "Whatsapp", RendererKind::Text),
    ColumnSpec::data("user_status", "Status", RendererKind::StatusTag),
    ColumnSpec::data("payment_made", "Payment", RendererKind::PaymentTag),
    ColumnSpec::data("id_card_taken", "Id Card Issued", RendererKind::DashIfEmpty),
];

impl ScreenKind {
    pub const ALL: [Self; 3] = [Self::Members, Self::Registrations, Self::MemberReport];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Registrations => "registrations",
            Self::MemberReport => "member-report",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Members => "Members",
            Self::Registrations => "Event Registrations",
            Self::MemberReport => "Member Report",
        }
    }

    pub fn filter_fields(self) -> FilterFields {
        match self {
            Self::Members | Self::MemberReport => FilterFields::members(),
            Self::Registrations => FilterFields::search_only(),
        }
    }

    pub fn candidate_columns(self) -> &'static [ColumnSpec] {
        match self {
            Self::Members => &MEMBER_COLUMNS,
            Self::Registrations => &REGISTRATION_COLUMNS,
            Self::MemberReport => &REPORT_COLUMNS,
        }
    }

    /// Whether this screen exposes the selector for `stage` at all.
    pub const fn binds(self, stage: FilterStage) -> bool {
        match self {
            Self::Members => !matches!(stage, FilterStage::Status | FilterStage::Issued),
            Self::Registrations => matches!(stage, FilterStage::Search),
            Self::MemberReport => !matches!(stage, FilterStage::Search),
        }
    }

    /// Stages `filters` narrows that this screen would ignore.
    pub fn unbound_selections(self, filters: &FilterState) -> Vec<FilterStage> {
        let defaults = FilterState::default();
        let narrowed = [
            (FilterStage::Category, filters.category != defaults.category),
            (FilterStage::Status, filters.status != defaults.status),
            (FilterStage::Payment, filters.payment != defaults.payment),
            (FilterStage::Issued, filters.issued != defaults.issued),
            (FilterStage::Search, !filters.search.is_empty()),
        ];
        narrowed
            .into_iter()
            .filter(|(stage, set)| *set && !self.binds(*stage))
            .map(|(stage, _)| stage)
            .collect()
    }

    pub fn row_actions(self, ctx: &ActionContext) -> Vec<RowAction> {
        match self {
            Self::Members => vec![RowAction::Edit, RowAction::ToggleStatus],
            Self::Registrations if ctx.can_delete() => vec![RowAction::Edit, RowAction::Delete],
            Self::Registrations => vec![RowAction::Edit],
            Self::MemberReport => Vec::new(),
        }
    }
}

/// One category tab, as listed by the category endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub label: String,
}

impl Category {
    pub fn from_record(record: &Record) -> Option<Self> {
        let id = record.id()?;
        Some(Self {
            id: CategoryId::new(id.get()),
            label: record.scalar_text("member_category").unwrap_or_default(),
        })
    }

    pub fn selector(&self) -> CategorySelector {
        CategorySelector::from_id(self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Application,
    Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenCommand {
    SelectCategory(CategorySelector),
    SetStatus(StatusFilter),
    SetPayment(PaymentFilter),
    SetIssued(IssuedFilter),
    SetSearch(String),
    ClearFilters,
    CategoriesLoaded(Vec<Category>),
    FetchStarted,
    FetchCompleted {
        records: RecordCollection,
        lookup: AuxiliaryLookup,
    },
    FetchFailed {
        kind: FailureKind,
        message: String,
    },
    MutationSucceeded {
        message: Option<String>,
    },
    MutationFailed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    ViewChanged,
    LoadingChanged(bool),
    RefetchRequested,
    Notice(Notice),
}

#[derive(Debug, Clone)]
pub struct ScreenState {
    kind: ScreenKind,
    filters: FilterState,
    store: RecordStore,
    categories: Vec<Category>,
    load: LoadState,
    notice: Option<Notice>,
    pipeline: FilterPipeline,
}

impl ScreenState {
    pub fn new(kind: ScreenKind) -> Self {
        Self {
            kind,
            filters: FilterState::default(),
            store: RecordStore::new(),
            categories: Vec::new(),
            load: LoadState::Idle,
            notice: None,
            pipeline: FilterPipeline::new(kind.filter_fields()),
        }
    }

    /// Starts with `filters` applied, dropping any selector the screen does not bind.
    pub fn with_filters(kind: ScreenKind, filters: FilterState) -> Self {
        let mut state = Self::new(kind);
        let defaults = FilterState::default();
        state.filters = FilterState {
            category: if kind.binds(FilterStage::Category) {
                filters.category
            } else {
                defaults.category
            },
            status: if kind.binds(FilterStage::Status) {
                filters.status
            } else {
                defaults.status
            },
            payment: if kind.binds(FilterStage::Payment) {
                filters.payment
            } else {
                defaults.payment
            },
            issued: if kind.binds(FilterStage::Issued) {
                filters.issued
            } else {
                defaults.issued
            },
            search: if kind.binds(FilterStage::Search) {
                filters.search
            } else {
                defaults.search
            },
        };
        state
    }

    pub fn dispatch(&mut self, command: ScreenCommand) -> Vec<ScreenEvent> {
        let mut events = Vec::new();
        match command {
            ScreenCommand::SelectCategory(category) => {
                if self.kind.binds(FilterStage::Category) && self.filters.category != category {
                    self.filters.category = category;
                    self.filters.search.clear();
                    events.push(ScreenEvent::ViewChanged);
                }
            }
            ScreenCommand::SetStatus(status) => {
                if self.kind.binds(FilterStage::Status) && self.filters.status != status {
                    self.filters.status = status;
                    events.push(ScreenEvent::ViewChanged);
                }
            }
            ScreenCommand::SetPayment(payment) => {
                if self.kind.binds(FilterStage::Payment) && self.filters.payment != payment {
                    self.filters.payment = payment;
                    events.push(ScreenEvent::ViewChanged);
                }
            }
            ScreenCommand::SetIssued(issued) => {
                if self.kind.binds(FilterStage::Issued) && self.filters.issued != issued {
                    self.filters.issued = issued;
                    events.push(ScreenEvent::ViewChanged);
                }
            }
            ScreenCommand::SetSearch(search) => {
                if self.kind.binds(FilterStage::Search) && self.filters.search != search {
                    self.filters.search = search;
                    events.push(ScreenEvent::ViewChanged);
                }
            }
            ScreenCommand::ClearFilters => {
                if self.filters != FilterState::default() {
                    self.filters = FilterState::default();
                    events.push(ScreenEvent::ViewChanged);
                }
            }
            ScreenCommand::CategoriesLoaded(categories) => {
                debug!(screen = self.kind.as_str(), count = categories.len(), "categories loaded");
                self.categories = categories;
                events.push(ScreenEvent::ViewChanged);
            }
            ScreenCommand::FetchStarted => {
                self.load = LoadState::Loading;
                events.push(ScreenEvent::LoadingChanged(true));
            }
            ScreenCommand::FetchCompleted { records, lookup } => {
                info!(screen = self.kind.as_str(), records = records.len(), "fetch completed");
                self.store.replace(records, lookup);
                self.load = LoadState::Loaded;
                events.push(ScreenEvent::LoadingChanged(false));
                events.push(ScreenEvent::ViewChanged);
            }
            ScreenCommand::FetchFailed { kind, message } => {
                self.load = LoadState::Failed;
                events.push(ScreenEvent::LoadingChanged(false));
                match kind {
                    FailureKind::Shape => {
                        warn!(screen = self.kind.as_str(), %message, "unexpected response shape");
                        self.store.clear();
                        events.push(ScreenEvent::ViewChanged);
                    }
                    FailureKind::Transport | FailureKind::Application => {
                        warn!(screen = self.kind.as_str(), %message, "fetch failed");
                        let notice = Notice::error(message);
                        self.notice = Some(notice.clone());
                        events.push(ScreenEvent::Notice(notice));
                    }
                }
            }
            ScreenCommand::MutationSucceeded { message } => {
                let notice = Notice::info(message.unwrap_or_else(|| "saved".to_owned()));
                self.notice = Some(notice.clone());
                events.push(ScreenEvent::Notice(notice));
                events.push(ScreenEvent::RefetchRequested);
            }
            ScreenCommand::MutationFailed { message } => {
                let notice = Notice::error(message);
                self.notice = Some(notice.clone());
                events.push(ScreenEvent::Notice(notice));
            }
        }
        events
    }

    pub fn kind(&self) -> ScreenKind {
        self.kind
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn load(&self) -> LoadState {
        self.load
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn derive_view(&self) -> DerivedView {
        self.pipeline
            .derive_view(self.store.collection().as_slice(), &self.filters)
    }

    pub fn active_columns(&self) -> Vec<ColumnSpec> {
        derive_columns_for(self.kind.candidate_columns(), self.store.collection())
    }

    pub fn payment_counts(&self) -> PaymentCounts {
        self.pipeline
            .payment_counts(self.store.collection().as_slice(), &self.filters)
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.store.collection().as_slice().get(index)
    }

    pub fn title(&self) -> String {
        match (&self.kind, &self.filters.category) {
            (ScreenKind::MemberReport, CategorySelector::Only(id)) => self
                .categories
                .iter()
                .find(|category| category.id.get().to_string() == *id)
                .map(|category| category.label.clone())
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| self.kind.title().to_owned()),
            _ => self.kind.title().to_owned(),
        }
    }

    pub fn empty_message(&self) -> String {
        match self.kind {
            ScreenKind::Members if self.store.is_empty() => "No members found.".to_owned(),
            ScreenKind::Members if self.filters.category.is_all() => {
                "No matching members found.".to_owned()
            }
            ScreenKind::Members => "No members found in this category.".to_owned(),
            ScreenKind::Registrations => "No data found.".to_owned(),
            ScreenKind::MemberReport => format!("No data found for {}.", self.title()),
        }
    }

    pub fn snapshot(&self, actions: &ActionContext) -> PresentationSnapshot {
        let row_actions = self.kind.row_actions(actions);
        let ctx = RenderContext {
            lookup: self.store.lookup(),
            actions: &row_actions,
        };
        PresentationSnapshot::build(
            self.title(),
            &self.active_columns(),
            &self.derive_view(),
            &ctx,
            self.empty_message(),
        )
    }
}

/// Status a member moves to when toggled.
pub fn next_member_status(current: Option<&str>) -> &'static str {
    if current == Some(ACTIVE_STATUS) {
        INACTIVE_STATUS
    } else {
        ACTIVE_STATUS
    }
}
