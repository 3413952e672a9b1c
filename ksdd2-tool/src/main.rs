use anyhow::{Context, Result};
use ksdd2::{
    cache::{CacheStore, FileCacheStore},
    config::DatasetConfig,
    dataset::{load_split, GenericDataset, KolektorSdd2, RandomAccessDataset},
    transform::Transform,
};
use log::info;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Inspect and cache KolektorSDD2 dataset splits
enum Args {
    /// Load a dataset split and report its statistics
    Info {
        #[structopt(long, default_value = "dataset.json5")]
        /// configuration file
        config_file: PathBuf,
    },
    /// Materialize a split from disk and populate its cache entry
    MakeCache {
        #[structopt(long, default_value = "dataset.json5")]
        /// configuration file
        config_file: PathBuf,
    },
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Args::from_args() {
        Args::Info { config_file } => run_info(&config_file),
        Args::MakeCache { config_file } => run_make_cache(&config_file),
    }
}

fn run_info(config_file: &PathBuf) -> Result<()> {
    let config = open_config(config_file)?;
    let dataset = KolektorSdd2::new(config)?;

    info!("split: {}", dataset.config().split);
    info!("records: {}", dataset.num_records());
    info!("classes: {:?}", dataset.classes());

    let (positive, negative) = dataset.table().partition_by_label();
    info!("positive samples: {}", positive.len());
    info!("negative samples: {}", negative.len());

    if dataset.num_records() > 0 {
        let (image, label, mask, _) = dataset.nth(0)?;
        info!(
            "first record: product {}, label {}, image {:?}, mask {:?}",
            dataset.table().product_id(0),
            label,
            image.size(),
            mask.size()
        );
    }

    Ok(())
}

fn run_make_cache(config_file: &PathBuf) -> Result<()> {
    let config = open_config(config_file)?;
    let split = config.split.resolve();
    let transform = Transform::new(config.scale);

    let table = load_split(
        &config.dataroot,
        split,
        &transform,
        config.expected_counts.get(split),
    )?;

    let cache = FileCacheStore::new(&config.cache_dir);
    cache.store(split, &table)?;
    info!(
        "cached {} records of split '{}' under '{}'",
        table.len(),
        split,
        config.cache_dir.display()
    );

    Ok(())
}

fn open_config(config_file: &PathBuf) -> Result<DatasetConfig> {
    DatasetConfig::open(config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))
}
