pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod filter;
pub mod notify;
pub mod render;
pub mod shell;
pub mod view_model;

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::api::{
  ApiSettings,
  HttpTaskApi
};
use crate::notify::TerminalNotifier;
use crate::view_model::TaskViewModel;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tasklist"
  );

  let mut cfg = config::Config::load(
    cli.tasklistrc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
      .chain(cli.api_url.map(|url| {
        ("api.url".to_string(), url)
      }))
  );

  let settings =
    ApiSettings::from_config(&cfg)?;
  debug!(
    base_url = %settings.base_url,
    timeout_secs = settings.timeout.as_secs(),
    "resolved store settings"
  );

  let api = HttpTaskApi::new(&settings)
    .with_context(|| {
      format!(
        "failed to set up client for \
         {}",
        settings.base_url
      )
    })?;
  let notifier =
    TerminalNotifier::new(cfg.color()?);
  let mut vm = TaskViewModel::new(
    Arc::new(api),
    Box::new(notifier)
  )
  .with_toast_duration(
    cfg.toast_duration()?
  );
  let renderer =
    render::Renderer::new(&cfg)?;

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async \
         runtime"
      )?;

  let command =
    cli.command.unwrap_or_default();
  let mut out = io::stdout().lock();
  runtime.block_on(
    commands::dispatch(
      &mut vm,
      &renderer,
      command,
      &mut out
    )
  )?;

  info!("done");
  Ok(())
}
