//! Model variants and their assembly

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::autograd::ops::concat;
use crate::autograd::Tensor;
use crate::data::Sample;

use super::config::ModelConfig;
use super::embedding::{BertEmbedding, PretrainedEmbedding, SequenceEmbedding};
use super::extractor::{SemanticExtractor, StructuralExtractor, VisualExtractor};
use super::head::ClassificationHead;
use super::ModelError;

/// Which input modalities a model consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Character-matrix CNN
    Structural,
    /// Token CNN + BiLSTM
    Semantic,
    /// Rendered-image CNN
    Visual,
    /// All three, concatenated before the head
    Fused,
}

impl Variant {
    pub fn all() -> [Variant; 4] {
        [Variant::Structural, Variant::Semantic, Variant::Visual, Variant::Fused]
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Structural => "structural",
            Variant::Semantic => "semantic",
            Variant::Visual => "visual",
            Variant::Fused => "fused",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Variant {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "structural" => Ok(Variant::Structural),
            "semantic" => Ok(Variant::Semantic),
            "visual" => Ok(Variant::Visual),
            "fused" => Ok(Variant::Fused),
            other => Err(ModelError::InvalidConfig(format!("unknown variant '{other}'"))),
        }
    }
}

/// A trainable readability classifier
///
/// `forward` maps one sample to a scalar probability tensor. Parameter
/// vectors share storage with the model, so optimizer steps through the
/// returned tensors update the live weights.
pub trait ReadabilityModel {
    fn variant(&self) -> Variant;

    /// Score one sample; `training` enables dropout
    fn forward(&mut self, sample: &Sample, training: bool) -> Result<Tensor, ModelError>;

    /// Trainable tensors in a stable order
    fn parameters(&self) -> Vec<Tensor>;

    /// Trainable tensors with persistence names
    fn named_parameters(&self) -> Vec<(String, Tensor)>;

    /// L2 penalty currently contributed by regularized layers
    fn l2_penalty(&self) -> f32;

    /// Adds L2 gradients after the loss backward pass
    fn apply_l2(&self);
}

/// Builds the requested variant, loading the pretrained embedding table if
/// the config names one
pub fn build_model(
    variant: Variant,
    config: &ModelConfig,
    seed: u64,
) -> crate::Result<Box<dyn ReadabilityModel>> {
    config.validate().map_err(crate::Error::from)?;
    let rng = StdRng::seed_from_u64(seed);
    let model: Box<dyn ReadabilityModel> = match variant {
        Variant::Structural => Box::new(StructuralModel::new(config, rng)),
        Variant::Semantic => Box::new(SemanticModel::new(config, rng)?),
        Variant::Visual => Box::new(VisualModel::new(config, rng)),
        Variant::Fused => Box::new(FusedModel::new(config, rng)?),
    };
    Ok(model)
}

fn make_embedding(config: &ModelConfig) -> crate::Result<Box<dyn SequenceEmbedding>> {
    match &config.pretrained_table {
        Some(path) => {
            let table = crate::io::load_embedding_table(path)?;
            Ok(Box::new(PretrainedEmbedding::from_table(
                table.values,
                table.vocab_size,
                table.hidden_size,
                config.embedding.max_position_embeddings,
                config.embedding.hidden_dropout,
            )))
        }
        None => Ok(Box::new(BertEmbedding::new(&config.embedding))),
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), ModelError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ModelError::ShapeMismatch { what, expected, actual })
    }
}

/// Classifier over the structural character matrix alone
pub struct StructuralModel {
    extractor: StructuralExtractor,
    head: ClassificationHead,
    rng: StdRng,
    rows: usize,
    cols: usize,
}

impl StructuralModel {
    fn new(config: &ModelConfig, rng: StdRng) -> Self {
        let extractor = StructuralExtractor::new(config.structure_rows, config.structure_cols);
        let head = ClassificationHead::new(extractor.output_len());
        Self {
            extractor,
            head,
            rng,
            rows: config.structure_rows,
            cols: config.structure_cols,
        }
    }
}

impl ReadabilityModel for StructuralModel {
    fn variant(&self) -> Variant {
        Variant::Structural
    }

    fn forward(&mut self, sample: &Sample, training: bool) -> Result<Tensor, ModelError> {
        check_len("structure", self.rows * self.cols, sample.structure.len())?;
        let x = Tensor::from_vec(sample.structure.clone(), false);
        let features = self.extractor.forward(&x);
        Ok(self.head.forward(&features, training, &mut self.rng))
    }

    fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.extractor.parameters();
        params.extend(self.head.parameters());
        params
    }

    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        let mut params = self.extractor.named_parameters("structural");
        params.extend(self.head.named_parameters("head"));
        params
    }

    fn l2_penalty(&self) -> f32 {
        self.head.penalty()
    }

    fn apply_l2(&self) {
        self.head.apply_l2_grad();
    }
}

/// Classifier over the token sequence alone
pub struct SemanticModel {
    extractor: SemanticExtractor,
    head: ClassificationHead,
    rng: StdRng,
    sequence_length: usize,
}

impl SemanticModel {
    fn new(config: &ModelConfig, rng: StdRng) -> crate::Result<Self> {
        let embedding = make_embedding(config)?;
        let extractor = SemanticExtractor::new(embedding, config.embedding.max_sequence_length);
        let head = ClassificationHead::new(extractor.output_len());
        Ok(Self {
            extractor,
            head,
            rng,
            sequence_length: config.embedding.max_sequence_length,
        })
    }
}

impl ReadabilityModel for SemanticModel {
    fn variant(&self) -> Variant {
        Variant::Semantic
    }

    fn forward(&mut self, sample: &Sample, training: bool) -> Result<Tensor, ModelError> {
        check_len("tokens", self.sequence_length, sample.tokens.len())?;
        check_len("segments", sample.tokens.len(), sample.segments.len())?;
        let features =
            self.extractor
                .forward(&sample.tokens, &sample.segments, training, &mut self.rng);
        Ok(self.head.forward(&features, training, &mut self.rng))
    }

    fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.extractor.parameters();
        params.extend(self.head.parameters());
        params
    }

    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        let mut params = self.extractor.named_parameters("semantic");
        params.extend(self.head.named_parameters("head"));
        params
    }

    fn l2_penalty(&self) -> f32 {
        self.head.penalty()
    }

    fn apply_l2(&self) {
        self.head.apply_l2_grad();
    }
}

/// Classifier over the rendered code image alone
pub struct VisualModel {
    extractor: VisualExtractor,
    head: ClassificationHead,
    rng: StdRng,
    image_size: usize,
}

impl VisualModel {
    fn new(config: &ModelConfig, rng: StdRng) -> Self {
        let extractor = VisualExtractor::new(config.image_size);
        let head = ClassificationHead::new(extractor.output_len());
        Self {
            extractor,
            head,
            rng,
            image_size: config.image_size,
        }
    }
}

impl ReadabilityModel for VisualModel {
    fn variant(&self) -> Variant {
        Variant::Visual
    }

    fn forward(&mut self, sample: &Sample, training: bool) -> Result<Tensor, ModelError> {
        check_len(
            "picture",
            self.image_size * self.image_size * 3,
            sample.picture.len(),
        )?;
        let x = Tensor::from_vec(sample.picture.clone(), false);
        let features = self.extractor.forward(&x);
        Ok(self.head.forward(&features, training, &mut self.rng))
    }

    fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.extractor.parameters();
        params.extend(self.head.parameters());
        params
    }

    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        let mut params = self.extractor.named_parameters("visual");
        params.extend(self.head.named_parameters("head"));
        params
    }

    fn l2_penalty(&self) -> f32 {
        self.head.penalty()
    }

    fn apply_l2(&self) {
        self.head.apply_l2_grad();
    }
}

/// Classifier over all three modalities, features concatenated before the
/// shared head
pub struct FusedModel {
    structural: StructuralExtractor,
    semantic: SemanticExtractor,
    visual: VisualExtractor,
    head: ClassificationHead,
    rng: StdRng,
    rows: usize,
    cols: usize,
    sequence_length: usize,
    image_size: usize,
}

impl FusedModel {
    fn new(config: &ModelConfig, rng: StdRng) -> crate::Result<Self> {
        let structural = StructuralExtractor::new(config.structure_rows, config.structure_cols);
        let embedding = make_embedding(config)?;
        let semantic = SemanticExtractor::new(embedding, config.embedding.max_sequence_length);
        let visual = VisualExtractor::new(config.image_size);
        let fused_len = structural.output_len() + semantic.output_len() + visual.output_len();
        let head = ClassificationHead::new(fused_len);
        Ok(Self {
            structural,
            semantic,
            visual,
            head,
            rng,
            rows: config.structure_rows,
            cols: config.structure_cols,
            sequence_length: config.embedding.max_sequence_length,
            image_size: config.image_size,
        })
    }
}

impl ReadabilityModel for FusedModel {
    fn variant(&self) -> Variant {
        Variant::Fused
    }

    fn forward(&mut self, sample: &Sample, training: bool) -> Result<Tensor, ModelError> {
        check_len("structure", self.rows * self.cols, sample.structure.len())?;
        check_len("tokens", self.sequence_length, sample.tokens.len())?;
        check_len("segments", sample.tokens.len(), sample.segments.len())?;
        check_len(
            "picture",
            self.image_size * self.image_size * 3,
            sample.picture.len(),
        )?;

        let structure = Tensor::from_vec(sample.structure.clone(), false);
        let picture = Tensor::from_vec(sample.picture.clone(), false);

        let s = self.structural.forward(&structure);
        let t = self
            .semantic
            .forward(&sample.tokens, &sample.segments, training, &mut self.rng);
        let v = self.visual.forward(&picture);

        let features = concat(&[&s, &t, &v]);
        Ok(self.head.forward(&features, training, &mut self.rng))
    }

    fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.structural.parameters();
        params.extend(self.semantic.parameters());
        params.extend(self.visual.parameters());
        params.extend(self.head.parameters());
        params
    }

    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        let mut params = self.structural.named_parameters("structural");
        params.extend(self.semantic.named_parameters("semantic"));
        params.extend(self.visual.named_parameters("visual"));
        params.extend(self.head.named_parameters("head"));
        params
    }

    fn l2_penalty(&self) -> f32 {
        self.head.penalty()
    }

    fn apply_l2(&self) {
        self.head.apply_l2_grad();
    }
}
