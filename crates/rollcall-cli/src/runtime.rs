// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use rollcall_api::{
    ApiError, Client, Completion, Envelope, Executor, RequestDescriptor, Transport, endpoints,
};
use rollcall_app::{
    Category, ExportAdapter, FailureKind, FilterStage, PresentationSink, PrintExport, Record,
    ScreenCommand, ScreenEvent, ScreenKind, ScreenState, SpreadsheetExport, default_file_name,
    next_member_status, run_export,
};
use rollcall_tui::{ExportFormat, ScreenRuntime};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Categories,
    Listing,
    Mutation,
}

#[derive(Debug, Clone)]
struct Call {
    screen: ScreenKind,
    kind: CallKind,
    request: RequestDescriptor,
}

/// Drives the single-flight executor for one screen at a time. A fetch on a
/// screen with category tabs loads the categories first and the listing
/// right after; both run one after the other, never side by side.
pub struct ApiRuntime<T: Transport = Client> {
    executor: Executor<T>,
    in_flight: Option<Call>,
    follow_ups: VecDeque<Call>,
    export_dir: PathBuf,
}

impl<T: Transport> ApiRuntime<T> {
    pub fn new(executor: Executor<T>, export_dir: PathBuf) -> Self {
        Self {
            executor,
            in_flight: None,
            follow_ups: VecDeque::new(),
            export_dir,
        }
    }

    /// Blocks until every started and follow-up call for `screen` has been
    /// applied. Used by the non-interactive modes.
    pub fn run_to_completion(&mut self, screen: &mut ScreenState) -> Vec<ScreenEvent> {
        let mut events = Vec::new();
        while let Some(completion) = self.executor.wait() {
            events.extend(self.apply(completion, screen));
        }
        events
    }

    /// Writes the sink's snapshot to `path`, picking the adapter from the
    /// file extension.
    pub fn export_to(
        &self,
        kind: ScreenKind,
        sink: &PresentationSink,
        path: &Path,
    ) -> Result<PathBuf> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        let format = match extension.as_deref() {
            Some("csv") => ExportFormat::Spreadsheet,
            Some("html" | "htm") => ExportFormat::Print,
            _ => bail!(
                "cannot export to {}; use a .csv or .html file name",
                path.display()
            ),
        };
        let adapter = adapter_for(kind, format, sink)?;
        run_export(adapter.as_ref(), sink, path)
    }

    fn start(&mut self, call: Call) -> Result<(), ApiError> {
        self.executor.submit(call.request.clone())?;
        debug!(
            screen = call.screen.as_str(),
            kind = ?call.kind,
            path = %call.request.target,
            "call started"
        );
        self.in_flight = Some(call);
        Ok(())
    }

    fn start_mutation(&mut self, screen: &ScreenState, request: RequestDescriptor) -> Result<()> {
        if self.executor.is_busy() {
            return Err(ApiError::Busy.into());
        }
        self.start(Call {
            screen: screen.kind(),
            kind: CallKind::Mutation,
            request,
        })
        .map_err(Into::into)
    }

    fn apply(&mut self, completion: Completion, screen: &mut ScreenState) -> Vec<ScreenEvent> {
        let Some(call) = self.in_flight.take() else {
            return Vec::new();
        };
        if call.screen != screen.kind() {
            debug!(
                from = call.screen.as_str(),
                to = screen.kind().as_str(),
                "dropping completion for a screen no longer shown"
            );
            self.follow_ups.clear();
            return Vec::new();
        }

        let events = match call.kind {
            CallKind::Categories => apply_categories(completion.result, screen),
            CallKind::Listing => apply_listing(completion.result, screen),
            CallKind::Mutation => apply_mutation(completion.result, screen),
        };

        if let Some(next) = self.follow_ups.pop_front()
            && let Err(error) = self.start(next)
        {
            warn!(%error, "follow-up call not started");
        }
        events
    }
}

fn apply_categories(
    result: Result<Envelope, ApiError>,
    screen: &mut ScreenState,
) -> Vec<ScreenEvent> {
    match result.and_then(|envelope| envelope.records()) {
        Ok(records) => {
            let categories = records
                .iter()
                .filter_map(Category::from_record)
                .collect::<Vec<_>>();
            screen.dispatch(ScreenCommand::CategoriesLoaded(categories))
        }
        Err(error) => {
            // The listing still loads; tabs fall back to `All` only.
            warn!(screen = screen.kind().as_str(), %error, "categories not loaded");
            Vec::new()
        }
    }
}

fn apply_listing(
    result: Result<Envelope, ApiError>,
    screen: &mut ScreenState,
) -> Vec<ScreenEvent> {
    let command = match result.and_then(|envelope| envelope.collection()) {
        Ok((records, lookup)) => ScreenCommand::FetchCompleted { records, lookup },
        Err(error) => ScreenCommand::FetchFailed {
            kind: error.failure_kind().unwrap_or(FailureKind::Transport),
            message: error.to_string(),
        },
    };
    screen.dispatch(command)
}

fn apply_mutation(
    result: Result<Envelope, ApiError>,
    screen: &mut ScreenState,
) -> Vec<ScreenEvent> {
    match result {
        Ok(envelope) => {
            info!(screen = screen.kind().as_str(), "mutation acknowledged");
            screen.dispatch(ScreenCommand::MutationSucceeded {
                message: envelope.message,
            })
        }
        Err(error) => {
            info!(screen = screen.kind().as_str(), %error, "mutation rejected");
            screen.dispatch(ScreenCommand::MutationFailed {
                message: error.to_string(),
            })
        }
    }
}

fn adapter_for(
    kind: ScreenKind,
    format: ExportFormat,
    sink: &PresentationSink,
) -> Result<Box<dyn ExportAdapter>> {
    let Some(snapshot) = sink.snapshot() else {
        bail!("nothing has been rendered yet -- load a screen before exporting");
    };
    let adapter: Box<dyn ExportAdapter> = match (format, kind) {
        (ExportFormat::Print, _) => Box::new(PrintExport),
        (ExportFormat::Spreadsheet, ScreenKind::MemberReport) => {
            Box::new(SpreadsheetExport::member_report())
        }
        (ExportFormat::Spreadsheet, _) => {
            Box::new(SpreadsheetExport::from_columns(&snapshot.columns))
        }
    };
    Ok(adapter)
}

fn record_id(record: &Record) -> Result<rollcall_app::RecordId> {
    record
        .id()
        .ok_or_else(|| anyhow!("selected row has no id; refresh with `r` and try again"))
}

impl<T: Transport> ScreenRuntime for ApiRuntime<T> {
    fn is_busy(&self) -> bool {
        self.executor.is_busy()
    }

    fn fetch(&mut self, screen: &mut ScreenState) -> Result<Vec<ScreenEvent>> {
        if self.executor.is_busy() {
            return Err(ApiError::Busy.into());
        }
        let kind = screen.kind();
        let listing = Call {
            screen: kind,
            kind: CallKind::Listing,
            request: endpoints::listing_for(kind),
        };
        let first = if kind.binds(FilterStage::Category) {
            self.follow_ups.push_back(listing);
            Call {
                screen: kind,
                kind: CallKind::Categories,
                request: endpoints::member_categories(),
            }
        } else {
            listing
        };
        if let Err(error) = self.start(first) {
            self.follow_ups.clear();
            return Err(error.into());
        }
        Ok(screen.dispatch(ScreenCommand::FetchStarted))
    }

    fn toggle_status(
        &mut self,
        screen: &mut ScreenState,
        record: &Record,
    ) -> Result<Vec<ScreenEvent>> {
        let id = record_id(record)?;
        let next = next_member_status(record.scalar_text("user_status").as_deref());
        info!(id = id.get(), next, "toggle member status");
        self.start_mutation(screen, endpoints::set_member_status(id, next))?;
        Ok(Vec::new())
    }

    fn update_field(
        &mut self,
        screen: &mut ScreenState,
        record: &Record,
        field: &str,
        value: &str,
    ) -> Result<Vec<ScreenEvent>> {
        let id = record_id(record)?;
        let request = match screen.kind() {
            ScreenKind::Members | ScreenKind::MemberReport => {
                endpoints::update_member(id, vec![(field.to_owned(), value.to_owned())])
            }
            ScreenKind::Registrations => {
                let mut body = Map::new();
                body.insert(field.to_owned(), Value::String(value.to_owned()));
                endpoints::update_registration(id, Value::Object(body))
            }
        };
        info!(id = id.get(), field, screen = screen.kind().as_str(), "update record");
        self.start_mutation(screen, request)?;
        Ok(Vec::new())
    }

    fn delete(&mut self, screen: &mut ScreenState, record: &Record) -> Result<Vec<ScreenEvent>> {
        if screen.kind() != ScreenKind::Registrations {
            bail!("only registrations can be deleted");
        }
        let id = record_id(record)?;
        info!(id = id.get(), "delete registration");
        self.start_mutation(screen, endpoints::delete_registration(id))?;
        Ok(Vec::new())
    }

    fn create(
        &mut self,
        screen: &mut ScreenState,
        fields: Vec<(String, String)>,
    ) -> Result<Vec<ScreenEvent>> {
        if screen.kind() != ScreenKind::Members {
            bail!("new records can only be added on the members screen");
        }
        info!(fields = fields.len(), "create member");
        self.start_mutation(screen, endpoints::create_member(fields))?;
        Ok(Vec::new())
    }

    fn poll(&mut self, screen: &mut ScreenState) -> Vec<ScreenEvent> {
        match self.executor.poll() {
            Some(completion) => self.apply(completion, screen),
            None => Vec::new(),
        }
    }

    fn export(
        &mut self,
        kind: ScreenKind,
        format: ExportFormat,
        sink: &PresentationSink,
    ) -> Result<PathBuf> {
        let adapter = adapter_for(kind, format, sink)?;
        let title = sink
            .snapshot()
            .map(|snapshot| snapshot.title.clone())
            .unwrap_or_else(|| kind.title().to_owned());
        let path = self
            .export_dir
            .join(default_file_name(&title, adapter.extension()));
        run_export(adapter.as_ref(), sink, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::ApiRuntime;
    use anyhow::Result;
    use rollcall_api::{Client, Executor};
    use rollcall_app::{
        ActionContext, CategorySelector, FilterState, LoadState, PresentationSink, ScreenEvent,
        ScreenKind, ScreenState,
    };
    use rollcall_testkit::{MockApi, RosterFaker};
    use rollcall_tui::{ExportFormat, ScreenRuntime};
    use std::path::Path;
    use std::time::Duration;

    fn runtime_for(api: &MockApi, export_dir: &Path) -> Result<ApiRuntime> {
        let client = Client::new(api.base_url(), Duration::from_secs(2))?;
        Ok(ApiRuntime::new(
            Executor::new(client),
            export_dir.to_path_buf(),
        ))
    }

    #[test]
    fn member_fetch_loads_categories_then_listing() -> Result<()> {
        let api = MockApi::start(RosterFaker::new(3).members(5), Vec::new())?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&api, temp.path())?;
        let mut screen = ScreenState::new(ScreenKind::Members);

        let started = runtime.fetch(&mut screen)?;
        assert!(started.contains(&ScreenEvent::LoadingChanged(true)));
        runtime.run_to_completion(&mut screen);

        assert_eq!(screen.categories().len(), 4);
        assert_eq!(screen.store().collection().len(), 5);
        assert_eq!(screen.load(), LoadState::Loaded);
        let paths = api
            .requests()
            .into_iter()
            .map(|request| request.url)
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["/api/panel-fetch-member-category", "/api/member"]);
        Ok(())
    }

    #[test]
    fn toggle_asks_for_refetch_only_once_acknowledged() -> Result<()> {
        let api = MockApi::start(RosterFaker::new(4).members(3), Vec::new())?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&api, temp.path())?;
        let mut members = ScreenState::new(ScreenKind::Members);
        runtime.fetch(&mut members)?;
        runtime.run_to_completion(&mut members);
        let record = members.record(0).cloned().expect("first member");
        let before = record.scalar_text("user_status");

        assert!(runtime.toggle_status(&mut members, &record)?.is_empty());
        assert!(runtime.is_busy());
        let events = runtime.run_to_completion(&mut members);
        assert!(events.contains(&ScreenEvent::RefetchRequested));

        runtime.fetch(&mut members)?;
        runtime.run_to_completion(&mut members);
        let after = members
            .store()
            .collection()
            .find(record.id().expect("id"))
            .and_then(|member| member.scalar_text("user_status"));
        assert_ne!(after, before);
        Ok(())
    }

    #[test]
    fn second_fetch_while_in_flight_is_refused() -> Result<()> {
        let api = MockApi::start(RosterFaker::new(5).members(2), Vec::new())?;
        api.set_delay(Some(Duration::from_millis(150)));
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&api, temp.path())?;
        let mut screen = ScreenState::new(ScreenKind::Registrations);

        runtime.fetch(&mut screen)?;
        let error = runtime.fetch(&mut screen).expect_err("busy");
        assert!(error.to_string().contains("already in flight"));
        runtime.run_to_completion(&mut screen);
        assert_eq!(api.requests().len(), 1);
        Ok(())
    }

    #[test]
    fn completion_for_abandoned_screen_is_dropped() -> Result<()> {
        let api = MockApi::start(RosterFaker::new(6).members(4), Vec::new())?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&api, temp.path())?;
        let mut members = ScreenState::new(ScreenKind::Members);
        runtime.fetch(&mut members)?;

        let mut registrations = ScreenState::new(ScreenKind::Registrations);
        assert!(runtime.run_to_completion(&mut registrations).is_empty());
        assert!(registrations.store().is_empty());
        assert!(!runtime.is_busy());
        assert_eq!(api.requests().len(), 1);
        Ok(())
    }

    #[test]
    fn delete_is_refused_outside_registrations() -> Result<()> {
        let api = MockApi::start(RosterFaker::new(7).members(2), Vec::new())?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&api, temp.path())?;
        let mut screen = ScreenState::new(ScreenKind::Members);
        runtime.fetch(&mut screen)?;
        runtime.run_to_completion(&mut screen);
        let record = screen.record(0).cloned().expect("member");
        assert!(runtime.delete(&mut screen, &record).is_err());
        assert_eq!(api.requests().len(), 2);
        Ok(())
    }

    #[test]
    fn created_member_appears_after_refetch() -> Result<()> {
        let api = MockApi::start(RosterFaker::new(9).members(2), Vec::new())?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&api, temp.path())?;
        let mut members = ScreenState::new(ScreenKind::Members);
        runtime.fetch(&mut members)?;
        runtime.run_to_completion(&mut members);

        let fields = vec![
            ("name".to_owned(), "Noor Shah".to_owned()),
            ("user_status".to_owned(), "Active".to_owned()),
        ];
        assert!(runtime.create(&mut members, fields)?.is_empty());
        let events = runtime.run_to_completion(&mut members);
        assert!(events.contains(&ScreenEvent::RefetchRequested));

        runtime.fetch(&mut members)?;
        runtime.run_to_completion(&mut members);
        assert_eq!(members.store().collection().len(), 3);
        assert!(
            members
                .store()
                .collection()
                .iter()
                .any(|member| member.scalar_text("name").as_deref() == Some("Noor Shah"))
        );

        let mut registrations = ScreenState::new(ScreenKind::Registrations);
        assert!(runtime.create(&mut registrations, Vec::new()).is_err());
        Ok(())
    }

    #[test]
    fn report_exports_use_category_title() -> Result<()> {
        let api = MockApi::start(RosterFaker::new(8).members(12), Vec::new())?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&api, temp.path())?;
        let mut screen = ScreenState::with_filters(
            ScreenKind::MemberReport,
            FilterState {
                category: CategorySelector::Only("2".to_owned()),
                ..FilterState::default()
            },
        );
        runtime.fetch(&mut screen)?;
        runtime.run_to_completion(&mut screen);

        let mut sink = PresentationSink::new();
        let snapshot = sink.render(screen.snapshot(&ActionContext::default()));
        assert_eq!(snapshot.title, "Patron");

        let csv = runtime.export(ScreenKind::MemberReport, ExportFormat::Spreadsheet, &sink)?;
        assert_eq!(csv, temp.path().join("Patron Report.csv"));
        let written = std::fs::read_to_string(&csv)?;
        assert!(written.starts_with("MID,Name,DOB,Email,Mobile,Whatsapp,Status,Payment,Id Card Issued"));
        assert_eq!(written.lines().count(), snapshot.total() + 1);

        let html = runtime.export_to(
            ScreenKind::MemberReport,
            &sink,
            &temp.path().join("out").join("report.html"),
        )?;
        assert!(std::fs::read_to_string(html)?.contains("printable-section"));

        let error = runtime
            .export_to(ScreenKind::MemberReport, &sink, &temp.path().join("report.pdf"))
            .expect_err("pdf is not an export target");
        assert!(error.to_string().contains(".csv or .html"));
        Ok(())
    }
}
