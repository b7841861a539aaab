use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{backend::Backend, Data, Int, Tensor},
};
use derive_new::new;
use itertools::Itertools;

pub mod index;
pub mod mini_imagenet;
pub mod sampler;
pub mod transform;

pub use mini_imagenet::{EpisodeConfig, EpisodeItem, MiniImagenet, Split};
pub use transform::DecodedImage;

#[derive(new)]
pub struct EpisodeBatcher<B: Backend> {
    device: B::Device,
}

/// A meta-batch of episodes.
#[derive(Debug, Clone)]
pub struct EpisodeBatch<B: Backend> {
    /// `[episodes, n_way * k_shot, C, H, W]`
    pub support: Tensor<B, 5>,
    /// `[episodes, n_way * k_shot]`
    pub support_label: Tensor<B, 2, Int>,
    /// `[episodes, n_way * k_query, C, H, W]`
    pub query: Tensor<B, 5>,
    /// `[episodes, n_way * k_query]`
    pub query_label: Tensor<B, 2, Int>,
}

fn stack_images<B: Backend>(images: &[DecodedImage]) -> Tensor<B, 4> {
    let images = images
        .iter()
        .map(|img| Data::<f32, 3>::new(img.pixels.clone(), img.shape.into()))
        .map(|data| Tensor::<B, 3>::from_data(data.convert(), &B::Device::default()))
        .collect_vec();
    Tensor::stack(images, 0)
}

fn label_tensor<B: Backend>(labels: &[i64]) -> Tensor<B, 1, Int> {
    let data = Data::<i64, 1>::new(labels.to_vec(), [labels.len()].into());
    Tensor::<B, 1, Int>::from_data(data.convert(), &B::Device::default())
}

impl<B: Backend> EpisodeBatcher<B> {
    /// Tensorize a single episode:
    /// `(support [setsz, C, H, W], support labels [setsz], query [querysz, C, H, W], query labels [querysz])`.
    pub fn episode_tensors(
        &self,
        item: &EpisodeItem,
    ) -> (Tensor<B, 4>, Tensor<B, 1, Int>, Tensor<B, 4>, Tensor<B, 1, Int>) {
        (
            stack_images::<B>(&item.support_images).to_device(&self.device),
            label_tensor::<B>(&item.support_labels).to_device(&self.device),
            stack_images::<B>(&item.query_images).to_device(&self.device),
            label_tensor::<B>(&item.query_labels).to_device(&self.device),
        )
    }
}

impl<B: Backend> Batcher<EpisodeItem, EpisodeBatch<B>> for EpisodeBatcher<B> {
    fn batch(&self, items: Vec<EpisodeItem>) -> EpisodeBatch<B> {
        let support = items
            .iter()
            .map(|item| stack_images::<B>(&item.support_images))
            .collect_vec();
        let support_label = items
            .iter()
            .map(|item| label_tensor::<B>(&item.support_labels))
            .collect_vec();
        let query = items
            .iter()
            .map(|item| stack_images::<B>(&item.query_images))
            .collect_vec();
        let query_label = items
            .iter()
            .map(|item| label_tensor::<B>(&item.query_labels))
            .collect_vec();

        EpisodeBatch {
            support: Tensor::stack(support, 0).to_device(&self.device),
            support_label: Tensor::stack(support_label, 0).to_device(&self.device),
            query: Tensor::stack(query, 0).to_device(&self.device),
            query_label: Tensor::stack(query_label, 0).to_device(&self.device),
        }
    }
}
