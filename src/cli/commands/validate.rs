//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, ValidateArgs};
use crate::data::DataError;

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    log(
        level,
        LogLevel::Normal,
        &format!("Config OK: {}", args.config.display()),
    );

    let (dataset, gaps) =
        super::assemble_dataset(&spec).map_err(|e| format!("Data error: {e}"))?;

    let positives = dataset.targets().iter().filter(|&&t| t >= 0.5).count();
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Joined {} samples ({} unreadable, {} readable), {} gaps",
            dataset.len(),
            positives,
            dataset.len() - positives,
            gaps.len()
        ),
    );
    for gap in &gaps {
        log(
            level,
            LogLevel::Verbose,
            &format!("  {} has no {} representation", gap.key, gap.missing),
        );
    }

    if args.strict {
        if let Some(gap) = gaps.first() {
            let err = DataError::MissingModality {
                key: gap.key.clone(),
                modality: gap.missing,
            };
            return Err(format!("Validation error: {err}"));
        }
    }

    Ok(())
}
