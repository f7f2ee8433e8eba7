//! Info command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, InfoArgs, OutputFormat};
use crate::model::{semantic_output_len, structural_output_len, visual_output_len};

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    match args.format {
        OutputFormat::Text => {
            let structural =
                structural_output_len(spec.model.structure_rows, spec.model.structure_cols);
            let semantic = semantic_output_len(spec.model.embedding.max_sequence_length);
            let visual = visual_output_len(spec.model.image_size);

            log(level, LogLevel::Normal, "Configuration Info:");
            println!();
            println!(
                "Structure: {} x {} -> {} features",
                spec.model.structure_rows, spec.model.structure_cols, structural
            );
            println!(
                "Sequence: {} tokens -> {} features",
                spec.model.embedding.max_sequence_length, semantic
            );
            println!(
                "Image: {0} x {0} -> {1} features",
                spec.model.image_size, visual
            );
            println!("Fused: {} features", structural + semantic + visual);
            println!(
                "Variants: {}",
                spec.training
                    .variants
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!(
                "Folds: {}, epochs: {}, batch size: {}",
                spec.training.folds, spec.training.epochs, spec.training.batch_size
            );
            println!("Optimizer: rmsprop (lr={})", spec.training.learning_rate);
            if spec.model.pretrained_table.is_some() {
                println!("Pretrained embedding: enabled");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&spec)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&spec)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
