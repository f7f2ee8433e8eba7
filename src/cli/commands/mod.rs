//! CLI command implementations

mod info;
mod render;
mod train;
mod validate;

use std::collections::BTreeMap;

use crate::cli::LogLevel;
use crate::config::{Cli, Command, ExperimentSpec};
use crate::data::{encode_snippet, load_pictures, load_structures, read_corpus, Dataset, JoinGap};
use crate::tokenizer::{Tokenizer, TokenizerConfig, WordPiece};

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    let level = LogLevel::from_flags(cli.verbose, cli.quiet);

    match cli.command {
        Command::Train(args) => train::run_train(args, level),
        Command::Validate(args) => validate::run_validate(args, level),
        Command::Info(args) => info::run_info(args, level),
        Command::Render(args) => render::run_render(args, level),
    }
}

/// Loads the three modality trees and joins them into a dataset.
///
/// The tokenizer comes from `tokenizer.vocab_file` when set, otherwise it
/// is trained on the texture corpus itself.
pub(crate) fn assemble_dataset(spec: &ExperimentSpec) -> crate::Result<(Dataset, Vec<JoinGap>)> {
    let structures = load_structures(
        &spec.data.structure_dir,
        spec.model.structure_rows,
        spec.model.structure_cols,
    )?;
    let corpus = read_corpus(&spec.data.texture_dir)?;

    let tokenizer = match &spec.tokenizer.vocab_file {
        Some(path) => WordPiece::load(path)?,
        None => {
            let mut tokenizer = WordPiece::new(
                TokenizerConfig::default().with_vocab_size(spec.tokenizer.vocab_size),
            );
            let snippets: Vec<&str> = corpus.values().map(String::as_str).collect();
            tokenizer.train(&snippets)?;
            tokenizer
        }
    };

    let mut textures = BTreeMap::new();
    for (key, text) in &corpus {
        textures.insert(
            key.clone(),
            encode_snippet(&tokenizer, text, spec.tokenizer.max_length)?,
        );
    }

    let pictures = load_pictures(&spec.data.picture_dir, spec.model.image_size as u32)?;
    Ok(Dataset::assemble(&structures, &textures, &pictures)?)
}
