//! Episodic (N-way K-shot) batch construction for Mini-ImageNet.
//!
//! Expected dataset layout:
//!
//! ```text
//! root/
//!   images/*.jpg
//!   train.csv
//!   val.csv
//!   test.csv
//! ```
//!
//! Each CSV has a `filename,label` header. The dataset pre-generates a fixed
//! number of episodes at construction time and materializes one per access:
//! a support set (`n_way * k_shot` images) for adaptation and a query set
//! (`n_way * k_query` images) for evaluation, with labels remapped to a
//! per-episode `0..n_way` range.

pub mod data;
pub mod error;
pub mod utils;

pub use data::{EpisodeBatch, EpisodeBatcher, EpisodeConfig, EpisodeItem, MiniImagenet, Split};
pub use error::DatasetError;
