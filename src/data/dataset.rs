//! Keyed join of the three modality mappings into training samples.

use super::{DataError, Sample, StructureData};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the three sample representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Structure,
    Texture,
    Picture,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modality::Structure => "structure",
            Modality::Texture => "texture",
            Modality::Picture => "picture",
        };
        f.write_str(name)
    }
}

/// A sample that could not be joined because one modality is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGap {
    pub key: String,
    pub missing: Modality,
}

/// All fully joined samples, ordered by key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    /// Joins the three modality mappings on the structural key list.
    ///
    /// Keys missing a representation come back as gaps instead of samples.
    /// Fails only when nothing joins at all.
    pub fn assemble(
        structure: &StructureData,
        textures: &BTreeMap<String, (Vec<u32>, Vec<u32>)>,
        pictures: &BTreeMap<String, Vec<f32>>,
    ) -> Result<(Self, Vec<JoinGap>), DataError> {
        let mut samples = Vec::new();
        let mut gaps = Vec::new();
        for key in &structure.keys {
            let (Some(&label), Some(matrix)) =
                (structure.labels.get(key), structure.matrices.get(key))
            else {
                gaps.push(JoinGap {
                    key: key.clone(),
                    missing: Modality::Structure,
                });
                continue;
            };
            let Some((tokens, segments)) = textures.get(key) else {
                gaps.push(JoinGap {
                    key: key.clone(),
                    missing: Modality::Texture,
                });
                continue;
            };
            let Some(picture) = pictures.get(key) else {
                gaps.push(JoinGap {
                    key: key.clone(),
                    missing: Modality::Picture,
                });
                continue;
            };
            samples.push(Sample {
                key: key.clone(),
                label,
                structure: matrix.clone(),
                tokens: tokens.clone(),
                segments: segments.clone(),
                picture: picture.clone(),
            });
        }
        if samples.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        Ok((Self { samples }, gaps))
    }

    /// Wraps already-joined samples, keeping the given order.
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Labels in sample order.
    pub fn targets(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// Seeded random subset of up to `n` samples, re-sorted by key.
    pub fn subsample(&self, n: usize, seed: u64) -> Self {
        if n >= self.samples.len() {
            return self.clone();
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut samples = self.samples.clone();
        samples.shuffle(&mut rng);
        samples.truncate(n);
        samples.sort_by(|a, b| a.key.cmp(&b.key));
        Self { samples }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure_with(keys: &[(&str, f32)]) -> StructureData {
        let mut data = StructureData::default();
        for (key, label) in keys {
            data.keys.push((*key).to_string());
            data.labels.insert((*key).to_string(), *label);
            data.matrices.insert((*key).to_string(), vec![1.0, 2.0]);
        }
        data.keys.sort_unstable();
        data
    }

    fn texture_for(keys: &[&str]) -> BTreeMap<String, (Vec<u32>, Vec<u32>)> {
        keys.iter()
            .map(|k| ((*k).to_string(), (vec![2, 5, 3], vec![0, 1, 2])))
            .collect()
    }

    fn pictures_for(keys: &[&str]) -> BTreeMap<String, Vec<f32>> {
        keys.iter().map(|k| ((*k).to_string(), vec![0.5; 12])).collect()
    }

    #[test]
    fn test_assemble_joins_complete_samples() {
        let structure = structure_with(&[("a", 0.0), ("b", 1.0)]);
        let (dataset, gaps) = Dataset::assemble(
            &structure,
            &texture_for(&["a", "b"]),
            &pictures_for(&["a", "b"]),
        )
        .unwrap();

        assert!(gaps.is_empty());
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.samples()[0].key, "a");
        assert_eq!(dataset.targets(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_assemble_reports_gaps() {
        let structure = structure_with(&[("a", 0.0), ("b", 1.0), ("c", 1.0)]);
        let (dataset, gaps) = Dataset::assemble(
            &structure,
            &texture_for(&["a", "c"]),
            &pictures_for(&["a", "b"]),
        )
        .unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(
            gaps,
            vec![
                JoinGap { key: "b".into(), missing: Modality::Texture },
                JoinGap { key: "c".into(), missing: Modality::Picture },
            ]
        );
    }

    #[test]
    fn test_assemble_empty_join_is_an_error() {
        let structure = structure_with(&[("a", 0.0)]);
        let err = Dataset::assemble(&structure, &BTreeMap::new(), &pictures_for(&["a"]))
            .unwrap_err();
        assert!(matches!(err, DataError::EmptyDataset));
    }

    #[test]
    fn test_subsample_is_deterministic_and_sorted() {
        let structure = structure_with(&[
            ("a", 0.0),
            ("b", 1.0),
            ("c", 0.0),
            ("d", 1.0),
            ("e", 0.0),
        ]);
        let keys = ["a", "b", "c", "d", "e"];
        let (dataset, _) =
            Dataset::assemble(&structure, &texture_for(&keys), &pictures_for(&keys)).unwrap();

        let first = dataset.subsample(3, 9);
        let second = dataset.subsample(3, 9);
        assert_eq!(first.len(), 3);
        let keys_of = |d: &Dataset| d.samples().iter().map(|s| s.key.clone()).collect::<Vec<_>>();
        assert_eq!(keys_of(&first), keys_of(&second));
        let mut sorted = keys_of(&first);
        sorted.sort();
        assert_eq!(keys_of(&first), sorted);
    }

    #[test]
    fn test_subsample_larger_than_set_keeps_everything() {
        let structure = structure_with(&[("a", 0.0)]);
        let (dataset, _) =
            Dataset::assemble(&structure, &texture_for(&["a"]), &pictures_for(&["a"])).unwrap();
        assert_eq!(dataset.subsample(10, 0).len(), 1);
    }

    #[test]
    fn test_modality_display() {
        assert_eq!(Modality::Structure.to_string(), "structure");
        assert_eq!(Modality::Texture.to_string(), "texture");
        assert_eq!(Modality::Picture.to_string(), "picture");
    }
}
