//! Command dispatch for the sample-tree CLI

use std::collections::BTreeMap;
use std::io;

use clap::CommandFactory;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::{SampleTree, SAMPLE_LABELS};
use crate::cli::args::{Cli, Commands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::domain::{CleanupMode, TraversalOrder};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    debug!(?settings, "effective settings");

    match &cli.command {
        Some(Commands::Demo {
            mode,
            node_modes,
            expire,
            hide_expired,
        }) => demo(
            &settings,
            mode.unwrap_or(settings.default_mode),
            node_modes,
            expire,
            *hide_expired,
        ),
        Some(Commands::Walk {
            order,
            from,
            mode,
            expire,
        }) => walk(
            order.unwrap_or(settings.order),
            from.as_deref(),
            mode.unwrap_or(settings.default_mode),
            expire,
        ),
        Some(Commands::Resolve { mode, node_modes }) => {
            resolve(mode.unwrap_or(settings.default_mode), node_modes)
        }
        Some(Commands::Config) => {
            output::info(&settings.to_toml()?);
            Ok(())
        }
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

fn overrides(node_modes: &[(String, CleanupMode)]) -> CliResult<BTreeMap<String, CleanupMode>> {
    if let Some((label, _)) = node_modes
        .iter()
        .find(|(label, _)| !SAMPLE_LABELS.contains(&label.as_str()))
    {
        return Err(CliError::InvalidArgs(format!(
            "no sample node labelled '{}' (known: {})",
            label,
            SAMPLE_LABELS.join(", ")
        )));
    }
    Ok(node_modes.iter().cloned().collect())
}

#[instrument(skip(settings))]
fn demo(
    settings: &Settings,
    mode: CleanupMode,
    node_modes: &[(String, CleanupMode)],
    expire: &[String],
    hide_expired: bool,
) -> CliResult<()> {
    let show_expired = settings.show_expired && !hide_expired;
    let mut sample = SampleTree::build_with(mode, &overrides(node_modes)?);

    output::header(&format!("Sample tree ({})", mode));
    output::info(&sample.render(show_expired));

    if expire.is_empty() {
        return Ok(());
    }

    let before = sample.live_labels();
    for label in expire {
        sample.expire(label)?;
        output::action("expired", label);
    }
    let after = sample.live_labels();

    output::header("After expiry");
    output::info(&sample.render(show_expired));

    let dropped = before.iter().filter(|l| !after.contains(l)).collect_vec();
    if !dropped.is_empty() {
        output::header("Dropped nodes");
        for label in dropped {
            output::removed(label);
        }
    }
    Ok(())
}

#[instrument]
fn walk(
    order: TraversalOrder,
    from: Option<&str>,
    mode: CleanupMode,
    expire: &[String],
) -> CliResult<()> {
    let mut sample = SampleTree::build(mode);
    for label in expire {
        sample.expire(label)?;
    }
    let labels = sample.walk(order, from)?;
    output::info(&labels.iter().join(" -> "));
    Ok(())
}

#[instrument]
fn resolve(mode: CleanupMode, node_modes: &[(String, CleanupMode)]) -> CliResult<()> {
    let sample = SampleTree::build_with(mode, &overrides(node_modes)?);
    output::header("label: mode -> strategy");
    for label in SAMPLE_LABELS {
        let node = sample.node(label)?;
        output::detail(&format!(
            "{}: {} -> {:?}",
            label,
            node.cleanup_mode(),
            node.effective_strategy()
        ));
    }
    Ok(())
}
