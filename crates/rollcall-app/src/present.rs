// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use time::Date;
use time::macros::format_description;

use crate::{
    AuxiliaryLookup, ColumnSpec, DEFAULT_FLAG_SENTINEL, DerivedView, RecordId, RendererKind,
    Segment, ViewRow, highlight,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Edit,
    ToggleStatus,
    Delete,
}

impl RowAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::ToggleStatus => "toggle status",
            Self::Delete => "delete",
        }
    }
}

/// Who is looking at the screen. Passed in explicitly wherever actions render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionContext {
    pub user_type: Option<String>,
}

impl ActionContext {
    pub fn new(user_type: Option<&str>) -> Self {
        Self {
            user_type: user_type.map(|value| value.trim().to_owned()),
        }
    }

    pub fn can_delete(&self) -> bool {
        matches!(self.user_type.as_deref(), Some("3" | "4"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Text(String),
    Highlighted(Vec<Segment>),
    Link { href: String, segments: Vec<Segment> },
    Tag { label: String, tone: Tone },
    Image { src: String, alt: String },
    Actions(Vec<RowAction>),
}

impl CellValue {
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Highlighted(segments) | Self::Link { segments, .. } => {
                segments.iter().map(|segment| segment.text.as_str()).collect()
            }
            Self::Tag { label, .. } => label.clone(),
            Self::Image { src, .. } => src.clone(),
            Self::Actions(actions) => actions
                .iter()
                .map(|action| action.label())
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub lookup: &'a AuxiliaryLookup,
    pub actions: &'a [RowAction],
}

pub fn render_cell(column: &ColumnSpec, row: &ViewRow, ctx: &RenderContext<'_>) -> CellValue {
    let record = &row.record;
    let raw = record.scalar_text(column.key);
    let term = row.matched_term.as_deref().unwrap_or_default();

    match column.renderer {
        RendererKind::Text => CellValue::Text(raw.unwrap_or_default()),
        RendererKind::Highlighted => {
            CellValue::Highlighted(highlight(&raw.unwrap_or_default(), term))
        }
        RendererKind::Email => {
            let text = raw
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "N/A".to_owned());
            CellValue::Highlighted(highlight(&text, term))
        }
        RendererKind::Phone => {
            let text = raw.unwrap_or_default();
            CellValue::Link {
                href: format!("tel:{text}"),
                segments: highlight(&text, term),
            }
        }
        RendererKind::Currency => {
            CellValue::Text(raw.map(|amount| format!("₹{amount}")).unwrap_or_default())
        }
        RendererKind::Date => CellValue::Text(format_date(raw.as_deref(), DateStyle::Short)),
        RendererKind::LongDate => CellValue::Text(format_date(raw.as_deref(), DateStyle::Long)),
        RendererKind::DashIfEmpty => CellValue::Text(
            raw.filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "-".to_owned()),
        ),
        RendererKind::StatusTag => {
            let label = raw.unwrap_or_default();
            let tone = if label == "Active" {
                Tone::Positive
            } else {
                Tone::Negative
            };
            CellValue::Tag { label, tone }
        }
        RendererKind::PaymentTag => {
            let paid = raw.is_some_and(|value| value.to_lowercase() == DEFAULT_FLAG_SENTINEL);
            if paid {
                CellValue::Tag {
                    label: "Paid".to_owned(),
                    tone: Tone::Positive,
                }
            } else {
                CellValue::Tag {
                    label: "Non-Paid".to_owned(),
                    tone: Tone::Negative,
                }
            }
        }
        RendererKind::Avatar => CellValue::Image {
            src: ctx.lookup.avatar_src(record),
            alt: format!("{} avatar", record.scalar_text("name").unwrap_or_default())
                .trim()
                .to_owned(),
        },
        RendererKind::Actions => CellValue::Actions(ctx.actions.to_vec()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateStyle {
    Short,
    Long,
}

fn format_date(raw: Option<&str>, style: DateStyle) -> String {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return String::new();
    };
    let Some(date) = parse_date(raw) else {
        return raw.to_owned();
    };
    let formatted = match style {
        DateStyle::Short => date.format(format_description!("[day]-[month]-[year]")),
        DateStyle::Long => date.format(format_description!("[day]-[month repr:short]-[year]")),
    };
    formatted.unwrap_or_else(|_| raw.to_owned())
}

fn parse_date(raw: &str) -> Option<Date> {
    let head = raw.get(..10)?;
    Date::parse(head, format_description!("[year]-[month]-[day]")).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeader {
    pub key: &'static str,
    pub label: &'static str,
    pub renderer: RendererKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub id: Option<RecordId>,
    pub cells: Vec<CellValue>,
    pub inactive: bool,
}

/// Everything an exporter may read about one rendered table. Owned outright,
/// so later renders cannot change it.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationSnapshot {
    pub title: String,
    pub columns: Vec<ColumnHeader>,
    pub rows: Vec<SnapshotRow>,
    pub view: DerivedView,
    pub empty_message: Option<String>,
}

impl PresentationSnapshot {
    pub fn build(
        title: impl Into<String>,
        columns: &[ColumnSpec],
        view: &DerivedView,
        ctx: &RenderContext<'_>,
        empty_message: impl Into<String>,
    ) -> Self {
        let rows = view
            .rows()
            .iter()
            .map(|row| SnapshotRow {
                id: row.record.id(),
                cells: columns
                    .iter()
                    .map(|column| render_cell(column, row, ctx))
                    .collect(),
                inactive: row.record.scalar_text("user_status").as_deref() == Some("Inactive"),
            })
            .collect();

        Self {
            title: title.into(),
            columns: columns
                .iter()
                .map(|column| ColumnHeader {
                    key: column.key,
                    label: column.label,
                    renderer: column.renderer,
                })
                .collect(),
            rows,
            view: view.clone(),
            empty_message: view.is_empty().then(|| empty_message.into()),
        }
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }
}

/// Holds the last rendered snapshot for export adapters.
#[derive(Debug, Clone, Default)]
pub struct PresentationSink {
    last: Option<Arc<PresentationSnapshot>>,
}

impl PresentationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: PresentationSnapshot) -> Arc<PresentationSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.last = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub fn snapshot(&self) -> Option<Arc<PresentationSnapshot>> {
        self.last.clone()
    }
}
