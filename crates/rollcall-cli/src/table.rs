// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use rollcall_app::{PresentationSnapshot, RendererKind};

const GAP: &str = "  ";

/// Plain-text rendering of a snapshot for `--print`. Image and action
/// columns have no text form and are left out.
pub fn text_table(snapshot: &PresentationSnapshot) -> String {
    let mut out = format!("{} Report\nTotal: {}\n\n", snapshot.title, snapshot.total());
    if let Some(message) = &snapshot.empty_message {
        out.push_str(message);
        out.push('\n');
        return out;
    }

    let columns = snapshot
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| !matches!(column.renderer, RendererKind::Avatar | RendererKind::Actions))
        .map(|(index, column)| (index, column.label))
        .collect::<Vec<_>>();
    let rows = snapshot
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|(index, _)| {
                    row.cells
                        .get(*index)
                        .map(|cell| cell.plain_text())
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let widths = columns
        .iter()
        .enumerate()
        .map(|(position, (_, label))| {
            rows.iter()
                .filter_map(|row| row.get(position))
                .map(|text| text.chars().count())
                .chain(std::iter::once(label.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    let header = columns.iter().map(|(_, label)| (*label).to_owned()).collect::<Vec<_>>();
    push_line(&mut out, &header, &widths);
    let rule = widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>();
    push_line(&mut out, &rule, &widths);
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(GAP);
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::text_table;
    use rollcall_app::{
        ActionContext, AuxiliaryLookup, Record, RecordCollection, ScreenCommand, ScreenKind,
        ScreenState,
    };
    use serde_json::json;

    fn registrations(rows: Vec<serde_json::Value>) -> ScreenState {
        let mut screen = ScreenState::new(ScreenKind::Registrations);
        screen.dispatch(ScreenCommand::FetchCompleted {
            records: RecordCollection::new(rows.into_iter().filter_map(Record::from_value).collect()),
            lookup: AuxiliaryLookup::default(),
        });
        screen
    }

    #[test]
    fn columns_are_padded_to_widest_cell() {
        let screen = registrations(vec![
            json!({"id": 1, "event_name": "Gala", "event_register_name": "Asha Rao"}),
            json!({"id": 2, "event_name": "Annual Meet", "event_register_name": "Om"}),
        ]);
        let table = text_table(&screen.snapshot(&ActionContext::default()));
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Event Registrations Report");
        assert_eq!(lines[1], "Total: 2");
        assert_eq!(lines[3], "Event        Name");
        assert_eq!(lines[4], "-----------  --------");
        assert_eq!(lines[5], "Gala         Asha Rao");
        assert_eq!(lines[6], "Annual Meet  Om");
        assert!(!table.contains("edit"));
    }

    #[test]
    fn empty_view_prints_its_message() {
        let screen = registrations(Vec::new());
        let table = text_table(&screen.snapshot(&ActionContext::default()));
        assert!(table.ends_with("Total: 0\n\nNo data found.\n"));
    }
}
