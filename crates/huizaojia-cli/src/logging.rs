// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;

use crate::config::Config;

/// Installs the global subscriber. The terminal belongs to the TUI, so
/// events only ever go to the log file.
pub fn init(config: &Config) -> Result<()> {
    if !config.log_enabled() {
        return Ok(());
    }
    let level = config.log_level()?;
    if level == LevelFilter::OFF {
        return Ok(());
    }
    let path = config.log_path()?;
    init_file(&path, level)
}

fn init_file(path: &Path, level: LevelFilter) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].path to a writable file or [log].enabled = false",
                path.display()
            )
        })?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}
