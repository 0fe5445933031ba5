//! govlink CLI: the `govlink` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing(cli.verbose);
    let config = support::load_config_or_exit(cli.config.as_deref());

    match cli.command {
        Commands::Requirements { plan, tags, json } => {
            commands::requirements::run(config, plan, tags, json)
        }

        Commands::Check {
            plan,
            evidence,
            tags,
            json,
        } => commands::check::run(config, plan, evidence, tags, json),

        Commands::Export {
            plan,
            evidence,
            out,
            model,
            tags,
            json,
        } => commands::export::run(
            config,
            commands::export::Args {
                plan,
                evidence,
                out,
                model,
                tags,
                json,
            },
        ),

        Commands::Metrics {
            plan,
            metrics,
            model,
            source,
            out,
            tags,
            labels,
            json,
        } => commands::metrics::run(
            config,
            commands::metrics::Args {
                plan,
                metrics,
                model,
                source,
                out,
                tags,
                labels,
                json,
            },
        ),
    }
}
