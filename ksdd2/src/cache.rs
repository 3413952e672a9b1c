//! Decoded-split caching.
//!
//! A cache entry is an opaque blob holding the serialized sample table of
//! one split. The format is internal only; it is not an interchange format
//! across versions or machines. Concurrent instances sharing one cache path
//! must be serialized externally.

use crate::{common::*, config::Split, dataset::SampleTable};

/// The pluggable cache behind dataset construction, keyed by resolved split.
pub trait CacheStore {
    /// Restore the table for `split`, or `None` when no entry exists.
    fn load(&self, split: Split) -> Result<Option<SampleTable>>;

    /// Persist the table for `split`, replacing any previous entry.
    fn store(&self, split: Split, table: &SampleTable) -> Result<()>;
}

/// A cache store that never hits and never writes. Useful to force
/// materialization from disk.
#[derive(Debug, Clone, Default)]
pub struct NoCache;

impl CacheStore for NoCache {
    fn load(&self, _split: Split) -> Result<Option<SampleTable>> {
        Ok(None)
    }

    fn store(&self, _split: Split, _table: &SampleTable) -> Result<()> {
        Ok(())
    }
}

/// A directory-backed cache store: tensors in one multi-tensor file, product
/// identifiers in a JSON sidecar.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    cache_dir: PathBuf,
}

impl FileCacheStore {
    pub fn new<P>(cache_dir: P) -> Self
    where
        P: AsRef<Path>,
    {
        Self {
            cache_dir: cache_dir.as_ref().to_owned(),
        }
    }

    fn tensor_path(&self, split: Split) -> PathBuf {
        self.cache_dir
            .join(format!("kolektor2_{}.ot", split.resolve()))
    }

    fn ids_path(&self, split: Split) -> PathBuf {
        self.cache_dir
            .join(format!("kolektor2_{}.ids.json", split.resolve()))
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self, split: Split) -> Result<Option<SampleTable>> {
        let tensor_path = self.tensor_path(split);
        let ids_path = self.ids_path(split);
        if !tensor_path.is_file() || !ids_path.is_file() {
            return Ok(None);
        }

        let named: Vec<(String, Tensor)> = Tensor::load_multi(&tensor_path)
            .with_context(|| format!("failed to read cache entry '{}'", tensor_path.display()))?;
        let mut samples = None;
        let mut masks = None;
        for (name, tensor) in named {
            match name.as_str() {
                "samples" => samples = Some(tensor),
                "masks" => masks = Some(tensor),
                _ => bail!(
                    "unexpected tensor '{}' in cache entry '{}'",
                    name,
                    tensor_path.display()
                ),
            }
        }
        let samples = samples.ok_or_else(|| {
            format_err!("cache entry '{}' has no samples", tensor_path.display())
        })?;
        let masks = masks
            .ok_or_else(|| format_err!("cache entry '{}' has no masks", tensor_path.display()))?;

        let text = fs::read_to_string(&ids_path)
            .with_context(|| format!("failed to read cache entry '{}'", ids_path.display()))?;
        let product_ids: Vec<String> = serde_json::from_str(&text)
            .with_context(|| format!("malformed cache entry '{}'", ids_path.display()))?;

        let table = SampleTable::new(samples, masks, product_ids)
            .with_context(|| format!("inconsistent cache entry '{}'", tensor_path.display()))?;
        Ok(Some(table))
    }

    fn store(&self, split: Split, table: &SampleTable) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!(
                "failed to create cache directory '{}'",
                self.cache_dir.display()
            )
        })?;

        let tensor_path = self.tensor_path(split);
        Tensor::save_multi(
            &[("samples", table.samples()), ("masks", table.masks())],
            &tensor_path,
        )
        .with_context(|| format!("failed to write cache entry '{}'", tensor_path.display()))?;

        let ids_path = self.ids_path(split);
        let text = serde_json::to_string(table.product_ids())?;
        fs::write(&ids_path, text)
            .with_context(|| format!("failed to write cache entry '{}'", ids_path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_table() -> SampleTable {
        let samples = Tensor::rand(&[3, 3, 6, 4], FLOAT_CPU);
        let masks = Tensor::zeros(&[3, 6, 4], INT64_CPU);
        let mut pixel = masks.i((2, 1, 1));
        let _ = pixel.fill_(1);
        SampleTable::new(samples, masks, vec!["1".into(), "2".into(), "3".into()]).unwrap()
    }

    #[test]
    fn file_cache_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = FileCacheStore::new(dir.path());
        let table = toy_table();

        assert!(cache.load(Split::Train).unwrap().is_none());
        cache.store(Split::Train, &table).unwrap();

        let restored = cache.load(Split::Train).unwrap().unwrap();
        assert_eq!(restored.len(), table.len());
        assert_eq!(restored.product_ids(), table.product_ids());
        assert!(restored.samples().allclose(table.samples(), 1e-6, 1e-6, false));
        assert_eq!(
            i64::from(restored.masks().sum(Kind::Int64)),
            i64::from(table.masks().sum(Kind::Int64))
        );

        // other splits are unaffected
        assert!(cache.load(Split::Test).unwrap().is_none());
    }

    #[test]
    fn val_and_train_share_a_cache_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = FileCacheStore::new(dir.path());
        cache.store(Split::Train, &toy_table()).unwrap();

        let restored = cache.load(Split::Val).unwrap();
        assert!(restored.is_some());
    }
}
