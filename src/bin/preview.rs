use burn::backend::{ndarray::NdArrayDevice, NdArray};
use burn::data::dataset::Dataset;
use dotenv::dotenv;

use mini_imagenet_episodic::data::transform::{IMAGENET_MEAN, IMAGENET_STD};
use mini_imagenet_episodic::utils::{get_env, show_image_terminal_color, Stats};
use mini_imagenet_episodic::{EpisodeBatcher, EpisodeConfig, MiniImagenet, Split};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let root = get_env("DATASET_DIR")?;

    let config = EpisodeConfig::new(100, 5, 1, 15, 84);
    println!("building dataset from {root}");
    let dataset = MiniImagenet::new(&root, Split::Train, config)?;
    println!(
        "{} classes, {} episodes, support {} / query {} images each",
        dataset.class_count(),
        dataset.len(),
        dataset.set_size(),
        dataset.query_size()
    );

    println!("materializing episode 0");
    let item = dataset.episode(0)?;
    println!("support labels: {:?}", item.support_labels);
    println!("query labels:   {:?}", item.query_labels);
    println!("support stats:  {:?}", Stats::from_images(item.support_images.iter()));

    let batcher = EpisodeBatcher::<NdArray>::new(NdArrayDevice::Cpu);
    let (support, support_label, query, query_label) = batcher.episode_tensors(&item);
    println!("support {:?} labels {:?}", support.dims(), support_label.dims());
    println!("query   {:?} labels {:?}", query.dims(), query_label.dims());

    for (img, label) in item
        .support_images
        .iter()
        .zip(&item.support_labels)
        .take(dataset.config().n_way)
    {
        println!("class {label}:");
        show_image_terminal_color(img, IMAGENET_MEAN, IMAGENET_STD);
    }

    Ok(())
}
