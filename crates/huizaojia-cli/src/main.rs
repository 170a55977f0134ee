// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::{Config, parse_view};
use huizaojia_app::AppState;
use runtime::CliRuntime;
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
            "load config {}; run `huizaojia --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    logging::init(&config)?;
    info!(config = %options.config_path.display(), "config loaded");

    let llm_client = if config.llm_enabled() {
        Some(
            huizaojia_llm::Client::new(
                config.llm_base_url(),
                config.llm_model(),
                config.llm_timeout()?,
            )
            .with_context(|| {
                format!(
                    "invalid [llm] config in {}; fix base_url/model/timeout values",
                    options.config_path.display()
                )
            })?
            .with_api_key(config.llm_api_key())
            .with_temperature(config.llm_temperature()),
        )
    } else {
        None
    };

    let (active_id, active_sub_id) = match &options.start_view {
        Some(raw) => parse_view(raw).context("--view")?,
        None => config.default_view()?,
    };

    if options.check_only {
        if let Some(client) = &llm_client {
            client.ping().with_context(|| {
                format!(
                    "check [llm] in {}; start the model server or set [llm].enabled = false",
                    options.config_path.display()
                )
            })?;
            println!("llm: {} ({}) ok", client.base_url(), client.model());
        } else {
            println!("llm: disabled");
        }
        println!("config: {} ok", options.config_path.display());
        return Ok(());
    }

    let mut state = AppState {
        active_id,
        active_sub_id,
        ..AppState::default()
    };
    if !state.active_sub_id.is_empty() {
        state.expanded_menus.insert(state.active_id.clone());
    }

    let mut runtime = CliRuntime::new(llm_client, config.analysis_delay()?);
    info!(view = %state.view().title(), "starting tui");
    huizaojia_tui::run_app(&mut state, &mut runtime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    start_view: Option<String>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        start_view: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--view" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--view requires a view id such as general/ok-tax-calc")
                })?;
                options.start_view = Some(value.as_ref().to_owned());
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
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("huizaojia (汇造价)");
    println!("  --config <path>          Use a specific config path");
    println!("  --view <id>[/<sub>]      Open on a view, for example quantity/ai-vision");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and reach the model endpoint");
    println!("  --help                   Show this help");
}
