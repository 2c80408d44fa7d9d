//! Gifify CLI
//!
//! Converts videos to optimized animated GIFs by chaining ffmpeg, ImageMagick
//! `convert` and gifsicle.
//!
//! # Usage
//!
//! ```bash
//! gifify convert movie.mp4 -o movie.gif --from 30 --to 35 --resize 200:-1
//! cat movie.mp4 | gifify convert - --fps 15 > movie.gif
//! gifify plan movie.mp4 --text "hello" --json
//! ```

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use gifify::adapters::TomlConfigAdapter;
use gifify::app::{AppContainer, ConvertRequest, DefaultAppContainer};
use gifify::cli::{Cli, Commands, ConvertArgs, PlanArgs};
use gifify::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration hierarchy: CLI > Env > File > Defaults
    let mut config = TomlConfigAdapter::discover(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    logging::init(&config.logging);

    let container = DefaultAppContainer::new(&config);

    match cli.command {
        Commands::Convert(args) => execute_convert_command(&container, args).await,
        Commands::Plan(args) => execute_plan_command(&container, &config, args),
    }
}

/// Execute convert command
async fn execute_convert_command(container: &DefaultAppContainer, args: ConvertArgs) -> Result<()> {
    let request = ConvertRequest {
        input: args.gif.input.clone(),
        output: args.output,
        options: args.gif.to_options(),
        timeout: args.timeout.map(Duration::from_secs),
    };

    let report = container.convert_interactor().execute(request).await?;
    if let Some(path) = &report.output {
        info!("Wrote {} bytes to {}", report.bytes, path.display());
    }
    Ok(())
}

/// Execute plan command
fn execute_plan_command(
    container: &DefaultAppContainer,
    config: &gifify::GififyConfig,
    args: PlanArgs,
) -> Result<()> {
    let plan = container
        .convert_interactor()
        .plan(&args.gif.input, args.gif.to_options());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    for stage in gifify::Stage::ALL {
        let program = config.programs.program(stage);
        let line: Vec<String> = plan.args(stage).iter().map(|arg| shell_quote(arg)).collect();
        println!("{} {}", program, line.join(" "));
    }
    Ok(())
}

/// Quote an argument for display when it contains shell-special characters
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,:/=+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
