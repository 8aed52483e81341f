// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    CellValue, ColumnHeader, PresentationSink, PresentationSnapshot, RendererKind, Tone,
    escape_html, render_markup,
};

/// Anything that turns a rendered snapshot into a file. Adapters only ever see
/// an owned snapshot, never the live screen.
pub trait ExportAdapter {
    fn name(&self) -> &'static str;
    fn extension(&self) -> &'static str;
    fn write(&self, snapshot: Arc<PresentationSnapshot>, out: &mut dyn Write) -> Result<()>;
}

const MEMBER_REPORT_FIELDS: [(&str, &str); 9] = [
    ("MID", "user_mid"),
    ("Name", "name"),
    ("DOB", "user_dob"),
    ("Email", "email"),
    ("Mobile", "mobile"),
    ("Whatsapp", "user_whatsapp"),
    ("Status", "user_status"),
    ("Payment", "payment_made"),
    ("Id Card Issued", "id_card_taken"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetExport {
    mapping: Vec<(String, String)>,
}

impl SpreadsheetExport {
    pub fn new(mapping: Vec<(String, String)>) -> Self {
        Self { mapping }
    }

    pub fn member_report() -> Self {
        Self::new(
            MEMBER_REPORT_FIELDS
                .iter()
                .map(|(header, field)| ((*header).to_owned(), (*field).to_owned()))
                .collect(),
        )
    }

    /// One column per data column on screen; images and actions don't export.
    pub fn from_columns(columns: &[ColumnHeader]) -> Self {
        Self::new(
            columns
                .iter()
                .filter(|column| exports_to_sheet(column.renderer))
                .map(|column| (column.label.to_owned(), column.key.to_owned()))
                .collect(),
        )
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.mapping.iter().map(|(header, _)| header.as_str())
    }
}

fn exports_to_sheet(renderer: RendererKind) -> bool {
    !matches!(renderer, RendererKind::Avatar | RendererKind::Actions)
}

impl ExportAdapter for SpreadsheetExport {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, snapshot: Arc<PresentationSnapshot>, out: &mut dyn Write) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer
            .write_record(self.headers())
            .context("write spreadsheet header")?;
        for row in snapshot.view.rows() {
            let record: Vec<String> = self
                .mapping
                .iter()
                .map(|(_, field)| row.record.scalar_text(field).unwrap_or_default())
                .collect();
            writer
                .write_record(&record)
                .context("write spreadsheet row")?;
        }
        writer.flush().context("flush spreadsheet")?;
        Ok(())
    }
}

pub const PRINTABLE_SECTION_ID: &str = "printable-section";

/// Self-contained HTML page. A PDF renderer consumes the element with id
/// `printable-section`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrintExport;

const PRINT_STYLE: &str = "\
@page { size: auto; margin: 1mm; }
body { font-family: sans-serif; margin: 0; padding: 2mm; }
.report-header { display: flex; justify-content: space-between; }
table { width: 100%; border-collapse: collapse; font-size: 14px; }
th, td { border: 1px solid #ddd; padding: 4px 8px; text-align: left; }
thead { background: #f3f4f6; }
tr.inactive { background: #fee2e2; }
mark { background: #fde68a; }
.tag.positive { color: #15803d; }
.tag.negative { color: #b91c1c; }
img.avatar { width: 40px; height: 40px; object-fit: cover; }";

impl PrintExport {
    pub fn render(&self, snapshot: &PresentationSnapshot) -> String {
        let title = escape_html(&snapshot.title);
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{title} Report</title>\n"));
        html.push_str(&format!("<style>\n{PRINT_STYLE}\n</style>\n"));
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!("<div id=\"{PRINTABLE_SECTION_ID}\">\n"));

        match &snapshot.empty_message {
            Some(message) => {
                html.push_str(&format!("<p class=\"empty\">{}</p>\n", escape_html(message)));
            }
            None => {
                html.push_str(&format!(
                    "<div class=\"report-header\"><h2>{title} Report</h2><h2>Total: {}</h2></div>\n",
                    snapshot.total()
                ));
                self.render_table(snapshot, &mut html);
            }
        }

        html.push_str("</div>\n</body>\n</html>\n");
        html
    }

    fn render_table(&self, snapshot: &PresentationSnapshot, html: &mut String) {
        let printed: Vec<usize> = snapshot
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.renderer != RendererKind::Actions)
            .map(|(index, _)| index)
            .collect();

        html.push_str("<table>\n<thead><tr>");
        for &index in &printed {
            html.push_str(&format!(
                "<th>{}</th>",
                escape_html(snapshot.columns[index].label)
            ));
        }
        html.push_str("</tr></thead>\n<tbody>\n");
        for row in &snapshot.rows {
            if row.inactive {
                html.push_str("<tr class=\"inactive\">");
            } else {
                html.push_str("<tr>");
            }
            for &index in &printed {
                let cell = row.cells.get(index).map(cell_markup).unwrap_or_default();
                html.push_str(&format!("<td>{cell}</td>"));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
    }
}

fn cell_markup(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(text) => escape_html(text),
        CellValue::Highlighted(segments) => render_markup(segments),
        CellValue::Link { href, segments } => {
            format!(
                "<a href=\"{}\">{}</a>",
                escape_html(href),
                render_markup(segments)
            )
        }
        CellValue::Tag { label, tone } => {
            let tone = match tone {
                Tone::Positive => "positive",
                Tone::Negative => "negative",
            };
            format!("<span class=\"tag {tone}\">{}</span>", escape_html(label))
        }
        CellValue::Image { src, alt } => format!(
            "<img class=\"avatar\" src=\"{}\" alt=\"{}\">",
            escape_html(src),
            escape_html(alt)
        ),
        CellValue::Actions(_) => String::new(),
    }
}

impl ExportAdapter for PrintExport {
    fn name(&self) -> &'static str {
        "print"
    }

    fn extension(&self) -> &'static str {
        "html"
    }

    fn write(&self, snapshot: Arc<PresentationSnapshot>, out: &mut dyn Write) -> Result<()> {
        out.write_all(self.render(&snapshot).as_bytes())
            .context("write print document")?;
        out.flush().context("flush print document")
    }
}

pub fn default_file_name(title: &str, extension: &str) -> String {
    let stem: String = title
        .chars()
        .map(|ch| if matches!(ch, '/' | '\\' | ':') { '-' } else { ch })
        .collect();
    format!("{} Report.{extension}", stem.trim())
}

/// Writes the sink's last snapshot to `path`. A failure is reported to the
/// caller and leaves no partial file behind.
pub fn run_export(
    adapter: &dyn ExportAdapter,
    sink: &PresentationSink,
    path: &Path,
) -> Result<PathBuf> {
    let Some(snapshot) = sink.snapshot() else {
        bail!("nothing has been rendered yet -- load a screen before exporting");
    };
    let result = write_file(adapter, snapshot, path);
    match &result {
        Ok(()) => info!(adapter = adapter.name(), path = %path.display(), "export written"),
        Err(error) => {
            warn!(adapter = adapter.name(), path = %path.display(), error = %error, "export failed");
            let _ = std::fs::remove_file(path);
        }
    }
    result.map(|()| path.to_path_buf())
}

fn write_file(
    adapter: &dyn ExportAdapter,
    snapshot: Arc<PresentationSnapshot>,
    path: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("create export file {}", path.display()))?;
    let mut out = BufWriter::new(file);
    adapter
        .write(snapshot, &mut out)
        .with_context(|| format!("{} export to {}", adapter.name(), path.display()))?;
    out.flush()
        .with_context(|| format!("flush export file {}", path.display()))
}
