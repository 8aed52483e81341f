// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;
mod table;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use logging::LogTarget;
use rollcall_api::{Client, Executor};
use rollcall_app::{
    ActionContext, CategorySelector, FilterStage, FilterState, IssuedFilter, NoticeLevel,
    PaymentFilter, PresentationSink, ScreenKind, ScreenState, StatusFilter,
};
use rollcall_tui::{ScreenRuntime, UiState};
use runtime::ApiRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `rollcall --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let interactive = options.is_interactive();
    let target = if interactive {
        LogTarget::File(config.log_file()?)
    } else {
        LogTarget::Stderr
    };
    if let Err(error) = logging::init(&target, config.log_level()) {
        if interactive {
            return Err(error).context("initialize logging; set [logging].file to a writable path");
        }
        eprintln!("warning: logging disabled: {error}");
    }

    let client = Client::new(config.base_url(), config.timeout()?)
        .with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?
        .with_token(config.token());
    if options.check_only {
        println!("config ok: {}", options.config_path.display());
        return Ok(());
    }

    let actions = ActionContext::new(options.user_type.as_deref().or(config.user_type()));
    let screen = ScreenState::with_filters(options.screen, options.filters.clone());
    let mut runtime = ApiRuntime::new(Executor::new(client), config.export_directory());
    info!(
        screen = options.screen.as_str(),
        base_url = config.base_url(),
        interactive,
        "rollcall starting"
    );

    if interactive {
        let mut ui = UiState::new(screen, actions).with_page_size(config.page_size());
        return rollcall_tui::run_app(&mut ui, &mut runtime);
    }
    run_batch(&mut runtime, screen, &actions, &options)
}

/// `--print` and `--export`: one fetch, one render, then exit.
fn run_batch(
    runtime: &mut ApiRuntime,
    mut screen: ScreenState,
    actions: &ActionContext,
    options: &CliOptions,
) -> Result<()> {
    runtime.fetch(&mut screen)?;
    runtime.run_to_completion(&mut screen);
    if let Some(notice) = screen.notice()
        && notice.level == NoticeLevel::Error
    {
        bail!(
            "load {} failed: {} -- check [api].base_url and that the backend is running",
            screen.kind().as_str(),
            notice.message
        );
    }

    let mut sink = PresentationSink::new();
    let snapshot = sink.render(screen.snapshot(actions));
    if options.print {
        print!("{}", table::text_table(&snapshot));
    }
    if let Some(path) = &options.export {
        let written = runtime.export_to(screen.kind(), &sink, path)?;
        eprintln!("exported {} rows to {}", snapshot.total(), written.display());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    screen: ScreenKind,
    filters: FilterState,
    user_type: Option<String>,
    print: bool,
    export: Option<PathBuf>,
}

impl CliOptions {
    fn is_interactive(&self) -> bool {
        !self.print && self.export.is_none()
    }
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        screen: ScreenKind::Members,
        filters: FilterState::default(),
        user_type: None,
        print: false,
        export: None,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                options.config_path = PathBuf::from(next_value(&mut iter, "--config", "a file path")?);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            "--screen" => {
                let value = next_value(&mut iter, "--screen", "a screen name")?;
                options.screen = ScreenKind::parse(&value).ok_or_else(|| {
                    anyhow!(
                        "unknown screen {value:?}; expected one of members, registrations, member-report"
                    )
                })?;
            }
            "--category" => {
                let value = next_value(&mut iter, "--category", "a category id or `all`")?;
                options.filters.category = CategorySelector::parse(&value);
            }
            "--status" => {
                let value = next_value(&mut iter, "--status", "all, active, or inactive")?;
                options.filters.status = StatusFilter::parse(&value).ok_or_else(|| {
                    anyhow!("unknown status {value:?}; expected all, active, or inactive")
                })?;
            }
            "--payment" => {
                let value = next_value(&mut iter, "--payment", "all, paid, or non-paid")?;
                options.filters.payment = PaymentFilter::parse(&value).ok_or_else(|| {
                    anyhow!("unknown payment filter {value:?}; expected all, paid, or non-paid")
                })?;
            }
            "--issued" => {
                let value = next_value(&mut iter, "--issued", "all, issued, or non-issued")?;
                options.filters.issued = IssuedFilter::parse(&value).ok_or_else(|| {
                    anyhow!("unknown issued filter {value:?}; expected all, issued, or non-issued")
                })?;
            }
            "--search" => {
                options.filters.search = next_value(&mut iter, "--search", "a search term")?;
            }
            "--user-type" => {
                options.user_type = Some(next_value(&mut iter, "--user-type", "a user type id")?);
            }
            "--print" => {
                options.print = true;
            }
            "--export" => {
                options.export = Some(PathBuf::from(next_value(
                    &mut iter,
                    "--export",
                    "a .csv or .html file path",
                )?));
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    if let Some(stage) = options.screen.unbound_selections(&options.filters).first() {
        bail!(
            "{} is not available on the {} screen; drop it or pick a screen that filters by it",
            selector_flag(*stage),
            options.screen.as_str()
        );
    }

    Ok(options)
}

fn selector_flag(stage: FilterStage) -> &'static str {
    match stage {
        FilterStage::Category => "--category",
        FilterStage::Status => "--status",
        FilterStage::Payment => "--payment",
        FilterStage::Issued => "--issued",
        FilterStage::Search => "--search",
    }
}

fn next_value<I, S>(iter: &mut I, flag: &str, what: &str) -> Result<String>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    iter.next()
        .map(|value| value.as_ref().to_owned())
        .ok_or_else(|| anyhow!("{flag} requires {what}"))
}

fn print_help() {
    println!("rollcall");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and startup, then exit");
    println!("  --screen <name>          members | registrations | member-report");
    println!("  --category <id|all>      Category tab to open");
    println!("  --status <value>         all | active | inactive (member report)");
    println!("  --payment <value>        all | paid | non-paid");
    println!("  --issued <value>         all | issued | non-issued (member report)");
    println!("  --search <term>          Case-insensitive search");
    println!("  --user-type <id>         Role id used for role-gated actions");
    println!("  --print                  Print the table as text and exit");
    println!("  --export <file>          Write a .csv or .html export and exit");
    println!("  --help                   Show this help");
}
