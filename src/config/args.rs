//! Command-line interface types

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::Variant;

use super::schema::ExperimentSpec;

/// Legible: code readability classification
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "legible")]
#[command(version)]
#[command(
    about = "Multi-modal code readability classifier with k-fold training and code rendering"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a k-fold experiment from a YAML configuration
    Train(TrainArgs),

    /// Validate a configuration and the dataset join without training
    Validate(ValidateArgs),

    /// Display information about a configuration
    Info(InfoArgs),

    /// Render a source file to a classifier input image
    Render(RenderArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Override number of epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override batch size
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Override learning rate
    #[arg(short, long)]
    pub lr: Option<f32>,

    /// Override fold count
    #[arg(short, long)]
    pub folds: Option<usize>,

    /// Override random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Train only these variants (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub variants: Vec<Variant>,

    /// Dry run (validate config but don't train)
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Fail when any sample is missing a modality
    #[arg(short, long)]
    pub strict: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the render command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RenderArgs {
    /// Source file to render
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Output image path
    #[arg(short, long, default_value = "render.png")]
    pub output: PathBuf,

    /// Stylesheet overriding the built-in colors
    #[arg(long)]
    pub css: Option<PathBuf>,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 128)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 128)]
    pub height: u32,
}

/// Output format for the info command
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => Err(format!("Unknown output format: {s}. Valid formats: text, json, yaml")),
        }
    }
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to an ExperimentSpec
pub fn apply_overrides(spec: &mut ExperimentSpec, args: &TrainArgs) {
    if let Some(output_dir) = &args.output_dir {
        spec.training.output_dir = output_dir.clone();
    }
    if let Some(epochs) = args.epochs {
        spec.training.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        spec.training.batch_size = batch_size;
    }
    if let Some(lr) = args.lr {
        spec.training.learning_rate = lr;
    }
    if let Some(folds) = args.folds {
        spec.training.folds = folds;
    }
    if let Some(seed) = args.seed {
        spec.training.seed = seed;
    }
    if !args.variants.is_empty() {
        spec.training.variants = args.variants.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_spec() -> ExperimentSpec {
        serde_yaml::from_str(
            r"
data:
  structure_dir: d/structure
  texture_dir: d/texture
  picture_dir: d/picture
",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_train_with_overrides() {
        let cli = parse_args([
            "legible",
            "train",
            "exp.yaml",
            "--epochs",
            "5",
            "--lr",
            "0.01",
            "--folds",
            "3",
        ])
        .unwrap();

        let Command::Train(args) = cli.command else {
            panic!("expected train command");
        };
        assert_eq!(args.config, PathBuf::from("exp.yaml"));
        assert_eq!(args.epochs, Some(5));
        assert_eq!(args.lr, Some(0.01));
        assert_eq!(args.folds, Some(3));
        assert!(!args.dry_run);
    }

    #[test]
    fn test_parse_variant_list() {
        let cli = parse_args(["legible", "train", "exp.yaml", "--variants", "semantic,fused"])
            .unwrap();
        let Command::Train(args) = cli.command else {
            panic!("expected train command");
        };
        assert_eq!(args.variants, vec![Variant::Semantic, Variant::Fused]);
    }

    #[test]
    fn test_parse_rejects_unknown_variant() {
        assert!(parse_args(["legible", "train", "exp.yaml", "--variants", "spectral"]).is_err());
    }

    #[test]
    fn test_parse_info_format() {
        let cli = parse_args(["legible", "info", "exp.yaml", "--format", "json"]).unwrap();
        let Command::Info(args) = cli.command else {
            panic!("expected info command");
        };
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!(parse_args(["legible", "info", "exp.yaml", "--format", "csv"]).is_err());
    }

    #[test]
    fn test_render_defaults() {
        let cli = parse_args(["legible", "render", "Main.java"]).unwrap();
        let Command::Render(args) = cli.command else {
            panic!("expected render command");
        };
        assert_eq!(args.output, PathBuf::from("render.png"));
        assert_eq!(args.width, 128);
        assert_eq!(args.height, 128);
        assert!(args.css.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = parse_args(["legible", "--verbose", "info", "exp.yaml"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_apply_overrides_updates_training() {
        let mut spec = minimal_spec();
        let args = TrainArgs {
            config: PathBuf::from("exp.yaml"),
            output_dir: Some(PathBuf::from("out")),
            epochs: Some(2),
            batch_size: Some(8),
            lr: Some(0.5),
            folds: Some(4),
            seed: Some(99),
            variants: vec![Variant::Visual],
            dry_run: false,
        };

        apply_overrides(&mut spec, &args);

        assert_eq!(spec.training.output_dir, PathBuf::from("out"));
        assert_eq!(spec.training.epochs, 2);
        assert_eq!(spec.training.batch_size, 8);
        assert_eq!(spec.training.learning_rate, 0.5);
        assert_eq!(spec.training.folds, 4);
        assert_eq!(spec.training.seed, 99);
        assert_eq!(spec.training.variants, vec![Variant::Visual]);
    }

    #[test]
    fn test_apply_overrides_keeps_config_values() {
        let mut spec = minimal_spec();
        let args = TrainArgs {
            config: PathBuf::from("exp.yaml"),
            output_dir: None,
            epochs: None,
            batch_size: None,
            lr: None,
            folds: None,
            seed: None,
            variants: vec![],
            dry_run: true,
        };

        apply_overrides(&mut spec, &args);

        assert_eq!(spec.training.epochs, 20);
        assert_eq!(spec.training.folds, 10);
        assert_eq!(spec.training.variants.len(), 4);
    }
}
