//! Checkpoint persistence.
//!
//! Checkpoints are plain serde documents so a run can be inspected with
//! nothing but a text editor. The format follows the file extension:
//! `.yaml`/`.yml` for YAML, anything else for compact JSON.

use super::model::ModelState;
use crate::model::{build_model, ModelConfig, ReadabilityModel, Variant};
use std::fs;
use std::path::Path;

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// Compact JSON
    Json,
    /// YAML
    Yaml,
}

impl ModelFormat {
    /// Picks the format from a path's extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ModelFormat::Yaml,
            _ => ModelFormat::Json,
        }
    }
}

/// Saves a model's current weights to `path`.
pub fn save_model(model: &dyn ReadabilityModel, path: &Path) -> crate::Result<()> {
    save_state(&ModelState::from_model(model), path)
}

/// Saves an already captured state to `path`, creating parent directories.
pub fn save_state(state: &ModelState, path: &Path) -> crate::Result<()> {
    let serialized = match ModelFormat::from_path(path) {
        ModelFormat::Json => serde_json::to_string(state)?,
        ModelFormat::Yaml => serde_yaml::to_string(state)?,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serialized)?;
    Ok(())
}

/// Loads a checkpoint state from `path`.
pub fn load_state(path: &Path) -> crate::Result<ModelState> {
    let contents = fs::read_to_string(path)?;
    let state = match ModelFormat::from_path(path) {
        ModelFormat::Json => serde_json::from_str(&contents)?,
        ModelFormat::Yaml => serde_yaml::from_str(&contents)?,
    };
    Ok(state)
}

/// Rebuilds a model from a checkpoint.
///
/// The architecture comes from the checkpoint's recorded variant; `config`
/// must describe the same shapes the checkpoint was trained with.
pub fn load_model(
    path: &Path,
    config: &ModelConfig,
    seed: u64,
) -> crate::Result<Box<dyn ReadabilityModel>> {
    let state = load_state(path)?;
    let model = build_model(state.metadata.variant, config, seed)?;
    state.apply_to(model.as_ref())?;
    Ok(model)
}

/// Loads a checkpoint and checks it matches the expected variant.
pub fn load_model_as(
    path: &Path,
    variant: Variant,
    config: &ModelConfig,
    seed: u64,
) -> crate::Result<Box<dyn ReadabilityModel>> {
    let model = load_model(path, config, seed)?;
    if model.variant() != variant {
        return Err(crate::Error::Model(
            crate::model::ModelError::VariantMismatch {
                expected: variant,
                found: model.variant(),
            },
        ));
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(ModelFormat::from_path(Path::new("m.json")), ModelFormat::Json);
        assert_eq!(ModelFormat::from_path(Path::new("m.yaml")), ModelFormat::Yaml);
        assert_eq!(ModelFormat::from_path(Path::new("m.yml")), ModelFormat::Yaml);
        assert_eq!(ModelFormat::from_path(Path::new("m")), ModelFormat::Json);
        assert_eq!(ModelFormat::from_path(Path::new("m.ckpt")), ModelFormat::Json);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");

        let config = ModelConfig::tiny();
        let model = build_model(Variant::Structural, &config, 7).unwrap();
        save_model(model.as_ref(), &path).unwrap();

        let restored = load_model(&path, &config, 0).unwrap();
        assert_eq!(restored.variant(), Variant::Structural);
        for ((_, a), (_, b)) in model
            .named_parameters()
            .iter()
            .zip(restored.named_parameters().iter())
        {
            assert_eq!(a.data(), b.data());
        }
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.yaml");

        let config = ModelConfig::tiny();
        let model = build_model(Variant::Visual, &config, 11).unwrap();
        save_model(model.as_ref(), &path).unwrap();

        let restored = load_model(&path, &config, 0).unwrap();
        assert_eq!(restored.variant(), Variant::Visual);
        let original = ModelState::from_model(model.as_ref());
        let reloaded = ModelState::from_model(restored.as_ref());
        assert_eq!(original.data, reloaded.data);
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fold_3").join("best.json");

        let config = ModelConfig::tiny();
        let model = build_model(Variant::Structural, &config, 1).unwrap();
        save_model(model.as_ref(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_model_as_checks_variant() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");

        let config = ModelConfig::tiny();
        let model = build_model(Variant::Structural, &config, 1).unwrap();
        save_model(model.as_ref(), &path).unwrap();

        assert!(load_model_as(&path, Variant::Structural, &config, 0).is_ok());
        assert!(load_model_as(&path, Variant::Fused, &config, 0).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = load_state(Path::new("/nonexistent/model.json"));
        assert!(result.is_err());
    }
}
