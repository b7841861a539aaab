use std::collections::HashMap;
use std::path::{Path, PathBuf};

use burn::config::Config;
use burn::data::dataset::Dataset;
use derive_new::new;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::DatasetError;

use super::index::{ClassRoster, LabelIndex};
use super::sampler::EpisodePlan;
use super::transform::{DecodedImage, ImageTransform};

/// Dataset split, named after the CSV index file it loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub fn csv_file(&self) -> &'static str {
        match self {
            Split::Train => "train.csv",
            Split::Val => "val.csv",
            Split::Test => "test.csv",
        }
    }
}

#[derive(Config, Debug)]
pub struct EpisodeConfig {
    /// Number of episodes to pre-generate. This is a batch of sets, not a
    /// batch of images.
    pub batch_size: usize,
    /// Classes per episode.
    pub n_way: usize,
    /// Support images per class.
    pub k_shot: usize,
    /// Query images per class.
    pub k_query: usize,
    /// Square side length images are resized to.
    pub resize: u32,
    /// Offset for global label ids, so several splits can be merged into
    /// one label space without collision.
    #[config(default = 0)]
    pub start_index: usize,
    /// Length of the filename prefix that identifies the class
    /// (9 for Mini-ImageNet names like `n0153282900000005.jpg`).
    #[config(default = 9)]
    pub label_prefix_len: usize,
}

/// One materialized episode: normalized CHW images plus relative labels in
/// `0..n_way`, support flatten first, query flatten second.
#[derive(Debug, Clone, PartialEq, new)]
pub struct EpisodeItem {
    pub support_images: Vec<DecodedImage>,
    pub support_labels: Vec<i64>,
    pub query_images: Vec<DecodedImage>,
    pub query_labels: Vec<i64>,
}

/// Episodic Mini-ImageNet dataset.
///
/// Construction loads the split's CSV index, builds the class roster and
/// eagerly samples the full episode plan, so undersized classes fail here
/// rather than mid-training. Each access re-reads and re-transforms its
/// images; nothing is cached.
#[derive(Debug)]
pub struct MiniImagenet {
    images_dir: PathBuf,
    roster: ClassRoster,
    plan: EpisodePlan,
    transform: ImageTransform,
    config: EpisodeConfig,
    seed: u64,
}

impl MiniImagenet {
    /// Build a dataset with a seed drawn from the thread rng.
    pub fn new(
        root: impl AsRef<Path>,
        split: Split,
        config: EpisodeConfig,
    ) -> Result<Self, DatasetError> {
        Self::with_seed(root, split, config, rand::random())
    }

    /// Build a dataset whose episode plan and label permutations are fully
    /// determined by `seed`.
    pub fn with_seed(
        root: impl AsRef<Path>,
        split: Split,
        config: EpisodeConfig,
        seed: u64,
    ) -> Result<Self, DatasetError> {
        let root = root.as_ref();
        let csv_path = root.join(split.csv_file());

        log::info!("loading label index from {}", csv_path.display());
        let index = LabelIndex::from_csv(&csv_path)?;
        let roster = ClassRoster::new(index, config.start_index);
        log::info!(
            "{} classes, sampling {} episodes ({}-way {}-shot {}-query)",
            roster.class_count(),
            config.batch_size,
            config.n_way,
            config.k_shot,
            config.k_query
        );

        let mut rng = StdRng::seed_from_u64(seed);
        let plan = EpisodePlan::generate(
            &roster,
            config.batch_size,
            config.n_way,
            config.k_shot,
            config.k_query,
            &mut rng,
        )?;

        Ok(Self {
            images_dir: root.join("images"),
            roster,
            plan,
            transform: ImageTransform::new(config.resize),
            config,
            seed,
        })
    }

    pub fn config(&self) -> &EpisodeConfig {
        &self.config
    }

    pub fn roster(&self) -> &ClassRoster {
        &self.roster
    }

    pub fn class_count(&self) -> usize {
        self.roster.class_count()
    }

    /// `n_way * k_shot`, the support flatten length.
    pub fn set_size(&self) -> usize {
        self.config.n_way * self.config.k_shot
    }

    /// `n_way * k_query`, the query flatten length.
    pub fn query_size(&self) -> usize {
        self.config.n_way * self.config.k_query
    }

    /// Materialize one episode, loading and transforming every image.
    ///
    /// Deterministic for a fixed dataset: the plan is immutable and the
    /// relative-label permutation is derived from the dataset seed and the
    /// episode index, so calling this twice yields identical items.
    ///
    /// Panics if `index >= batch_size`.
    pub fn episode(&self, index: usize) -> Result<EpisodeItem, DatasetError> {
        let groups = self
            .plan
            .episode(index)
            .unwrap_or_else(|| panic!("episode index {index} out of range 0..{}", self.plan.len()));

        let flat_support = groups.support.iter().flatten().collect_vec();
        let flat_query = groups.query.iter().flatten().collect_vec();

        let support_abs = self.absolute_labels(&flat_support)?;
        let query_abs = self.absolute_labels(&flat_query)?;

        // distinct support labels come out sorted; shuffle them so the
        // relative ids are an arbitrary permutation, then apply the same
        // mapping to both flattens
        let mut distinct = support_abs.iter().copied().unique().sorted().collect_vec();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index as u64).wrapping_add(1));
        distinct.shuffle(&mut rng);
        let relative: HashMap<i64, i64> = distinct
            .iter()
            .enumerate()
            .map(|(i, &abs)| (abs, i as i64))
            .collect();

        let support_labels = support_abs.iter().map(|abs| relative[abs]).collect_vec();
        let query_labels = flat_query
            .iter()
            .zip(&query_abs)
            .map(|(name, abs)| {
                relative
                    .get(abs)
                    .copied()
                    .ok_or_else(|| DatasetError::UnknownLabel {
                        filename: (*name).clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let support_images = self.load_images(&flat_support)?;
        let query_images = self.load_images(&flat_query)?;

        Ok(EpisodeItem::new(
            support_images,
            support_labels,
            query_images,
            query_labels,
        ))
    }

    /// Global integer labels for a flattened filename list, via the
    /// fixed-length filename prefix convention.
    fn absolute_labels(&self, flat: &[&String]) -> Result<Vec<i64>, DatasetError> {
        flat.iter()
            .map(|name| {
                let key = name.get(..self.config.label_prefix_len).ok_or_else(|| {
                    DatasetError::UnknownLabel {
                        filename: (*name).clone(),
                    }
                })?;
                self.roster
                    .global_label_for(key)
                    .ok_or_else(|| DatasetError::UnknownLabel {
                        filename: (*name).clone(),
                    })
            })
            .collect()
    }

    fn load_images(&self, flat: &[&String]) -> Result<Vec<DecodedImage>, DatasetError> {
        flat.iter()
            .map(|name| self.transform.load(&self.images_dir.join(name.as_str())))
            .collect()
    }
}

impl Dataset<EpisodeItem> for MiniImagenet {
    fn get(&self, index: usize) -> Option<EpisodeItem> {
        if index >= self.plan.len() {
            return None;
        }
        match self.episode(index) {
            Ok(item) => Some(item),
            Err(err) => {
                log::error!("materializing episode {index}: {err}");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.plan.len()
    }
}
