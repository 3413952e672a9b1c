use super::*;
use crate::{
    cache::{CacheStore, FileCacheStore},
    common::*,
    config::{DatasetConfig, Split},
    transform::{normalize, Transform},
};
use once_cell::sync::Lazy;
use regex::Regex;

/// Base image names are purely numeric; ground-truth masks carry a `_GT`
/// suffix and are excluded here.
static IMAGE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+\.png$").unwrap());

const MASK_SUFFIX: &str = "_GT";
const IMAGE_EXTENSION: &str = ".png";

/// The Kolektor Surface-Defect 2 dataset.
///
/// A split is materialized once at construction, either from the directory
/// tree under `dataroot` or from a cache entry, and is immutable afterwards.
#[derive(Debug)]
pub struct KolektorSdd2 {
    config: DatasetConfig,
    classes: IndexSet<String>,
    transform: Transform,
    table: SampleTable,
}

impl KolektorSdd2 {
    pub const LABELS: [&'static str; 2] = ["ok", "defect"];

    /// Construct with a file cache under `config.cache_dir` and the
    /// process-wide random source.
    pub fn new(config: DatasetConfig) -> Result<Self> {
        let cache = FileCacheStore::new(&config.cache_dir);
        Self::with_cache(config, &cache, &mut rand::thread_rng())
    }

    /// Construct with an explicit cache store and randomness source. Tests
    /// and reproducible pipelines supply a seeded generator here.
    pub fn with_cache<C, R>(config: DatasetConfig, cache: &C, rng: &mut R) -> Result<Self>
    where
        C: CacheStore,
        R: Rng,
    {
        ensure!(
            config.positive_percentage > 0.0 && config.positive_percentage <= 1.0,
            "positive_percentage must be in (0, 1], got {}",
            config.positive_percentage
        );

        let split = config.split.resolve();
        let transform = Transform::new(config.scale);

        let table = match cache.load(split)? {
            Some(table) => table,
            None => {
                let table = load_split(
                    &config.dataroot,
                    split,
                    &transform,
                    config.expected_counts.get(split),
                )?;
                if config.write_cache {
                    cache.store(split, &table)?;
                }
                table
            }
        };

        let table = if config.positive_percentage < 1.0 && split == Split::Train {
            subsample_positives(table, config.positive_percentage, rng)?
        } else {
            table
        };

        let classes: IndexSet<String> = Self::LABELS.iter().map(ToString::to_string).collect();

        Ok(Self {
            config,
            classes,
            transform,
            table,
        })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn table(&self) -> &SampleTable {
        &self.table
    }
}

impl GenericDataset for KolektorSdd2 {
    fn input_channels(&self) -> usize {
        3
    }

    fn classes(&self) -> &IndexSet<String> {
        &self.classes
    }
}

impl RandomAccessDataset for KolektorSdd2 {
    fn num_records(&self) -> usize {
        self.table.len()
    }

    fn nth(&self, index: usize) -> Result<DataItem> {
        ensure!(index < self.table.len(), "invalid index {}", index);

        let image = normalize(&self.table.image(index as i64));
        let mask = self.table.mask(index as i64).gt(0);
        let label = if mask.sum(Kind::Int64).int64_value(&[]) == 0 {
            0
        } else {
            1
        };

        // the trailing field is reserved and always zero
        Ok((image, label, mask, 0))
    }
}

/// Materialize a split from the directory tree.
///
/// The official dataset ships a duplicated pair (`10301 (copy).png` and its
/// mask) that must be removed beforehand; the fixed expected count catches
/// this and any other missing or extra files.
pub fn load_split(
    dataroot: &Path,
    split: Split,
    transform: &Transform,
    expected_count: usize,
) -> Result<SampleTable> {
    let split = split.resolve();
    let dir = dataroot.join(split.name());
    ensure!(
        dir.is_dir(),
        "dataset directory '{}' does not exist",
        dir.display()
    );

    let mut names: Vec<String> = fs::read_dir(&dir)
        .with_context(|| format!("failed to list '{}'", dir.display()))?
        .map(|entry| -> Result<_> { Ok(entry?.file_name().to_string_lossy().into_owned()) })
        .filter_ok(|name| IMAGE_NAME.is_match(name))
        .try_collect()?;
    names.sort();

    ensure!(
        !names.is_empty(),
        "no dataset images found in '{}'",
        dir.display()
    );
    ensure!(
        names.len() == expected_count,
        "split '{}' has {} images but {} are expected",
        split,
        names.len(),
        expected_count
    );

    let (height, width) = transform.output_size();
    let samples = Tensor::zeros(&[expected_count as i64, 3, height, width], FLOAT_CPU);
    let masks = Tensor::zeros(&[expected_count as i64, height, width], INT64_CPU);
    let mut product_ids = Vec::with_capacity(expected_count);

    for (slot, name) in names.iter().enumerate() {
        let product_id = &name[..name.len() - IMAGE_EXTENSION.len()];
        let image = transform.load_image(dir.join(name))?;
        let mask =
            transform.load_mask(dir.join(format!("{}{}{}", product_id, MASK_SUFFIX, IMAGE_EXTENSION)))?;

        let mut sample_slot = samples.i(slot as i64);
        sample_slot.copy_(&image);
        let mut mask_slot = masks.i(slot as i64);
        mask_slot.copy_(&mask);
        product_ids.push(product_id.to_string());
    }

    SampleTable::new(samples, masks, product_ids)
}

/// Subsample the defect-positive samples to `positive_percentage` of their
/// original count, keeping every negative sample. The kept positives come
/// first in shuffled order, followed by the negatives in original order.
pub fn subsample_positives<R>(
    table: SampleTable,
    positive_percentage: f64,
    rng: &mut R,
) -> Result<SampleTable>
where
    R: Rng,
{
    ensure!(
        positive_percentage > 0.0 && positive_percentage <= 1.0,
        "positive_percentage must be in (0, 1], got {}",
        positive_percentage
    );

    let (mut positive, negative) = table.partition_by_label();
    let positive_count = positive.len();
    let keep_count = (positive_count as f64 * positive_percentage) as usize;

    positive.shuffle(rng);
    positive.truncate(keep_count);

    let selected: Vec<i64> = chain(positive, negative).collect();
    let table = table.select(&selected)?;

    info!("original number of positive samples: {}", positive_count);
    info!(
        "number of positive samples kept: {} ({}%)",
        keep_count,
        positive_percentage * 100.0
    );
    info!("total number of samples after selection: {}", table.len());

    Ok(table)
}
