//! Dataset construction parameters.

use crate::common::*;

/// A partition of the dataset.
///
/// The dataset ships only `train` and `test` directories. A `val` request
/// resolves to `train` everywhere (directory, expected count, cache key);
/// callers are expected to carve their own validation subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    /// Map `val` to `train`; other splits are returned unchanged.
    pub fn resolve(self) -> Self {
        match self {
            Self::Val => Self::Train,
            split => split,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        }
    }
}

impl FromStr for Split {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let split = match text {
            "train" => Self::Train,
            "val" => Self::Val,
            "test" => Self::Test,
            _ => bail!("unknown split '{}'", text),
        };
        Ok(split)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named input scale presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scale {
    #[serde(rename = "1408x512")]
    Full,
    #[serde(rename = "704x256", alias = "half")]
    Half,
}

impl Scale {
    /// Output size in (height, width) order.
    pub fn output_size(self) -> (i64, i64) {
        match self {
            Self::Full => (1408, 512),
            Self::Half => (704, 256),
        }
    }

    /// Resize factor relative to the full resolution.
    pub fn factor(self) -> f64 {
        match self {
            Self::Full => 1.0,
            Self::Half => 0.5,
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::Half
    }
}

impl FromStr for Scale {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let scale = match text {
            "1408x512" => Self::Full,
            "704x256" | "half" => Self::Half,
            _ => bail!("unknown scale preset '{}'", text),
        };
        Ok(scale)
    }
}

/// Expected sample counts per split, used as an integrity fence during
/// materialization. The defaults are the official KolektorSDD2 counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedCounts {
    #[serde(default = "default_train_count")]
    pub train: usize,
    #[serde(default = "default_test_count")]
    pub test: usize,
}

impl ExpectedCounts {
    pub fn get(&self, split: Split) -> usize {
        match split.resolve() {
            Split::Train | Split::Val => self.train,
            Split::Test => self.test,
        }
    }
}

impl Default for ExpectedCounts {
    fn default() -> Self {
        Self {
            train: default_train_count(),
            test: default_test_count(),
        }
    }
}

/// Dataset options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// The root directory of the dataset.
    pub dataroot: PathBuf,
    /// The data split to load.
    pub split: Split,
    /// The input scale preset.
    #[serde(default)]
    pub scale: Scale,
    /// The fraction of defect-positive training samples to keep, in (0, 1].
    /// A value of 1 disables subsampling. Ignored on the test split.
    #[serde(default = "default_positive_percentage")]
    pub positive_percentage: f64,
    /// The directory holding cached decoded splits.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// If set, persist the decoded split to the cache after materialization.
    #[serde(default = "default_write_cache")]
    pub write_cache: bool,
    #[serde(default)]
    pub expected_counts: ExpectedCounts,
    /// Reserved flag, currently inert.
    #[serde(default)]
    pub debug: bool,
}

impl DatasetConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

fn default_train_count() -> usize {
    2331
}

fn default_test_count() -> usize {
    1004
}

fn default_positive_percentage() -> f64 {
    1.0
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_write_cache() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_presets() {
        assert_eq!("1408x512".parse::<Scale>().unwrap(), Scale::Full);
        assert_eq!("704x256".parse::<Scale>().unwrap(), Scale::Half);
        assert_eq!("half".parse::<Scale>().unwrap(), Scale::Half);
        assert!("1024x768".parse::<Scale>().is_err());

        assert_eq!(Scale::Full.output_size(), (1408, 512));
        assert_eq!(Scale::Half.output_size(), (704, 256));
        assert_eq!(Scale::Full.factor(), 1.0);
        assert_eq!(Scale::Half.factor(), 0.5);
    }

    #[test]
    fn val_split_resolves_to_train() {
        assert_eq!(Split::Val.resolve(), Split::Train);
        assert_eq!(Split::Train.resolve(), Split::Train);
        assert_eq!(Split::Test.resolve(), Split::Test);

        let counts = ExpectedCounts::default();
        assert_eq!(counts.get(Split::Val), counts.get(Split::Train));
        assert_eq!(counts.get(Split::Train), 2331);
        assert_eq!(counts.get(Split::Test), 1004);
    }

    #[test]
    fn config_from_json5() {
        let config: DatasetConfig = json5::from_str(
            r#"{
                dataroot: "/data/KolektorSDD2",
                split: "val",
                scale: "half",
            }"#,
        )
        .unwrap();

        assert_eq!(config.split, Split::Val);
        assert_eq!(config.split.resolve(), Split::Train);
        assert_eq!(config.scale, Scale::Half);
        assert_eq!(config.positive_percentage, 1.0);
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert!(config.write_cache);
        assert_eq!(config.expected_counts, ExpectedCounts::default());
        assert!(!config.debug);
    }

    #[test]
    fn config_overrides_expected_counts() {
        let config: DatasetConfig = json5::from_str(
            r#"{
                dataroot: "/data/KolektorSDD2",
                split: "test",
                scale: "1408x512",
                positive_percentage: 0.25,
                write_cache: false,
                expected_counts: { train: 6, test: 2 },
            }"#,
        )
        .unwrap();

        assert_eq!(config.expected_counts.get(Split::Train), 6);
        assert_eq!(config.expected_counts.get(Split::Test), 2);
        assert_eq!(config.positive_percentage, 0.25);
        assert!(!config.write_cache);
    }
}
