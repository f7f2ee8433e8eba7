//! Train command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{apply_overrides, load_config, ExperimentSpec, TrainArgs};
use crate::train::run_experiment;

fn variant_list(spec: &ExperimentSpec) -> String {
    spec.training
        .variants
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn run_train(args: TrainArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Legible: training from {}", args.config.display()),
    );

    // Load and validate config
    let mut spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    // Apply command-line overrides, then re-check since they may break
    // constraints the file satisfied
    apply_overrides(&mut spec, &args);
    spec.validate().map_err(|e| format!("Config error: {e}"))?;

    if args.dry_run {
        log(
            level,
            LogLevel::Normal,
            "Dry run - config validated successfully",
        );
        log(
            level,
            LogLevel::Verbose,
            &format!("  Variants: {}", variant_list(&spec)),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!(
                "  Folds: {}, epochs: {}, batch size: {}",
                spec.training.folds, spec.training.epochs, spec.training.batch_size
            ),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!("  Learning rate: {}", spec.training.learning_rate),
        );
        return Ok(());
    }

    let (dataset, gaps) =
        super::assemble_dataset(&spec).map_err(|e| format!("Data error: {e}"))?;
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Assembled {} samples, {} keys left gaps",
            dataset.len(),
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

    let report = run_experiment(&dataset, &spec.model, &spec.training)
        .map_err(|e| format!("Training error: {e}"))?;

    for line in report.summary_lines() {
        log(level, LogLevel::Normal, &line);
    }
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Report written to {}",
            spec.training.output_dir.join("report.json").display()
        ),
    );
    Ok(())
}
