//! Experiment configuration: YAML schema and CLI argument types.

mod args;
mod schema;

pub use args::{
    apply_overrides, parse_args, Cli, Command, InfoArgs, OutputFormat, RenderArgs, TrainArgs,
    ValidateArgs,
};
pub use schema::{load_config, DataPaths, ExperimentSpec, TokenizerSpec};
