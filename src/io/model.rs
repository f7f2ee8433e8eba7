//! Serializable model state.

use crate::model::{ModelError, ReadabilityModel, Variant};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata written alongside checkpoint weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Which architecture produced this state
    pub variant: Variant,

    /// RFC 3339 creation timestamp
    pub created_at: String,

    /// Total number of stored values
    pub parameter_count: usize,
}

impl ModelMetadata {
    pub fn new(variant: Variant, parameter_count: usize) -> Self {
        Self {
            variant,
            created_at: chrono::Utc::now().to_rfc3339(),
            parameter_count,
        }
    }
}

/// Information about one stored parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Persistence name (e.g. "head.dense1.weight")
    pub name: String,

    /// Number of values
    pub len: usize,

    /// Whether this parameter requires gradients
    pub requires_grad: bool,
}

/// Serializable model state: a parameter table plus the flattened data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    /// Model metadata
    pub metadata: ModelMetadata,

    /// Parameter information, in storage order
    pub parameters: Vec<ParameterInfo>,

    /// Flattened parameter data
    pub data: Vec<f32>,
}

impl ModelState {
    /// Captures the current weights of a model.
    pub fn from_model(model: &dyn ReadabilityModel) -> Self {
        let named = model.named_parameters();
        let mut data = Vec::new();
        let parameters: Vec<ParameterInfo> = named
            .iter()
            .map(|(name, tensor)| {
                data.extend(tensor.data().iter().copied());
                ParameterInfo {
                    name: name.clone(),
                    len: tensor.len(),
                    requires_grad: tensor.requires_grad(),
                }
            })
            .collect();
        let parameter_count = data.len();
        Self {
            metadata: ModelMetadata::new(model.variant(), parameter_count),
            parameters,
            data,
        }
    }

    /// Writes the stored weights back into a freshly built model.
    ///
    /// Parameters are matched by name against `named_parameters`; the write
    /// goes through the shared tensor cells, so the live model updates.
    pub fn apply_to(&self, model: &dyn ReadabilityModel) -> Result<(), ModelError> {
        if self.metadata.variant != model.variant() {
            return Err(ModelError::VariantMismatch {
                expected: model.variant(),
                found: self.metadata.variant,
            });
        }

        let named = model.named_parameters();
        if named.len() != self.parameters.len() {
            return Err(ModelError::CorruptState(format!(
                "{} parameters stored, model has {}",
                self.parameters.len(),
                named.len()
            )));
        }
        let lookup: HashMap<&str, &crate::Tensor> =
            named.iter().map(|(n, t)| (n.as_str(), t)).collect();

        let mut offset = 0;
        for info in &self.parameters {
            let end = offset + info.len;
            if end > self.data.len() {
                return Err(ModelError::CorruptState(format!(
                    "data ends at {} but parameter {} needs {}",
                    self.data.len(),
                    info.name,
                    end
                )));
            }
            let Some(tensor) = lookup.get(info.name.as_str()) else {
                return Err(ModelError::UnknownParameter(info.name.clone()));
            };
            if tensor.len() != info.len {
                return Err(ModelError::ParameterLength {
                    name: info.name.clone(),
                    expected: tensor.len(),
                    actual: info.len,
                });
            }
            for (dst, &src) in tensor.data_mut().iter_mut().zip(&self.data[offset..end]) {
                *dst = src;
            }
            offset = end;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{build_model, ModelConfig};

    #[test]
    fn test_state_captures_every_parameter() {
        let config = ModelConfig::tiny();
        let model = build_model(Variant::Structural, &config, 3).unwrap();
        let state = ModelState::from_model(model.as_ref());

        assert_eq!(state.metadata.variant, Variant::Structural);
        assert_eq!(state.parameters.len(), model.named_parameters().len());
        assert_eq!(state.data.len(), state.metadata.parameter_count);
        let total: usize = state.parameters.iter().map(|p| p.len).sum();
        assert_eq!(total, state.data.len());
    }

    #[test]
    fn test_apply_restores_weights() {
        let config = ModelConfig::tiny();
        let source = build_model(Variant::Structural, &config, 3).unwrap();
        let state = ModelState::from_model(source.as_ref());

        // different seed, different weights
        let target = build_model(Variant::Structural, &config, 99).unwrap();
        state.apply_to(target.as_ref()).unwrap();

        for ((_, a), (_, b)) in source
            .named_parameters()
            .iter()
            .zip(target.named_parameters().iter())
        {
            assert_eq!(a.data(), b.data());
        }
    }

    #[test]
    fn test_apply_rejects_wrong_variant() {
        let config = ModelConfig::tiny();
        let source = build_model(Variant::Structural, &config, 3).unwrap();
        let state = ModelState::from_model(source.as_ref());

        let target = build_model(Variant::Visual, &config, 3).unwrap();
        let err = state.apply_to(target.as_ref()).unwrap_err();
        assert!(matches!(err, ModelError::VariantMismatch { .. }));
    }

    #[test]
    fn test_apply_rejects_renamed_parameter() {
        let config = ModelConfig::tiny();
        let model = build_model(Variant::Structural, &config, 3).unwrap();
        let mut state = ModelState::from_model(model.as_ref());
        state.parameters[0].name = "no.such.weight".to_string();

        let err = state.apply_to(model.as_ref()).unwrap_err();
        assert!(matches!(err, ModelError::UnknownParameter(_)));
    }

    #[test]
    fn test_apply_rejects_truncated_data() {
        let config = ModelConfig::tiny();
        let model = build_model(Variant::Structural, &config, 3).unwrap();
        let mut state = ModelState::from_model(model.as_ref());
        state.data.truncate(state.data.len() / 2);

        let err = state.apply_to(model.as_ref()).unwrap_err();
        assert!(matches!(err, ModelError::CorruptState(_)));
    }
}
