//! Render command implementation

use std::fs;

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::RenderArgs;
use crate::render::{render_to_file, RenderConfig, Stylesheet};

pub fn run_render(args: RenderArgs, level: LogLevel) -> Result<(), String> {
    let source = fs::read_to_string(&args.source)
        .map_err(|e| format!("Cannot read {}: {e}", args.source.display()))?;

    let stylesheet = match &args.css {
        Some(path) => Stylesheet::from_file(path).map_err(|e| format!("Stylesheet error: {e}"))?,
        None => Stylesheet::default(),
    };

    let config = RenderConfig {
        width: args.width,
        height: args.height,
        stylesheet,
    };
    render_to_file(&source, &args.output, &config)
        .map_err(|e| format!("Render error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!(
            "Rendered {} -> {} ({}x{})",
            args.source.display(),
            args.output.display(),
            args.width,
            args.height
        ),
    );
    Ok(())
}
