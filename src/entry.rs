//! Process entry: CLI parsing, config merge, and run orchestration.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::args::LoadArgs;
use crate::error::{AppError, AppResult, ValidationError};
use crate::run::RunPlan;
use crate::shutdown::{setup_signal_shutdown_handler, shutdown_channel};
use crate::system::summary::{print_json_summary, print_summary};
use crate::transport::{HttpTransport, Job, TimedTransport};

pub(crate) fn run() -> AppResult<()> {
    let (args, matches) = match parse_args()? {
        Some(parsed) => parsed,
        None => return Ok(()),
    };

    crate::system::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args, &matches))
}

fn parse_args() -> AppResult<Option<(LoadArgs, ArgMatches)>> {
    let mut cmd = LoadArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = LoadArgs::from_arg_matches(&matches)?;

    Ok(Some((args, matches)))
}

fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }

    !crate::config::default_config_present()
}

async fn run_async(mut args: LoadArgs, matches: &ArgMatches) -> AppResult<()> {
    merge_config(&mut args, matches)?;

    let Some(url) = args.url.as_deref() else {
        tracing::error!("Missing URL (set --url or provide in config).");
        return Err(AppError::validation(ValidationError::MissingUrl));
    };
    let job = Arc::new(Job::new(args.method, url, args.data.clone())?);
    let transport: Arc<dyn TimedTransport> = Arc::new(
        HttpTransport::new(&job, args.connect_timeout, args.request_timeout, args.insecure)
            .map_err(AppError::transport)?,
    );

    let (shutdown_tx, _shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let plan = RunPlan {
        workers: args.workers.get(),
        jobs_per_worker: args.jobs_per_worker.get(),
        pacing: Duration::from_secs(args.pacing),
    };
    let outcome = crate::run::execute(plan, &job, &transport, &shutdown_tx).await;

    // Release the signal task whether the run succeeded or not.
    drop(shutdown_tx.send(()));
    if let Err(err) = signal_handle.await {
        tracing::debug!("Signal handler task join failed: {}", err);
    }

    let summary = outcome?;
    if args.json {
        print_json_summary(&summary)?;
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn merge_config(args: &mut LoadArgs, matches: &ArgMatches) -> AppResult<()> {
    let loaded = crate::config::load_config(args.config.as_deref())?;
    if let Some(config) = loaded.as_ref() {
        crate::config::apply_config(args, matches, config)?;
    }
    Ok(())
}
