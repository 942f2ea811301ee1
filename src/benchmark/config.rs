//! Benchmark configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::benchmark::operation::Operation;
use crate::error::{PilumError, Result};
use crate::storage::AccessStrategy;

/// Default index location.
pub const DEFAULT_LOCATION: &str = "tmp-codec";
/// Default pause before timed random fetches.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(10);

/// Configuration for one benchmark run.
///
/// Missing keys in a JSON file fall back to [`Default`]. Durations are
/// written as whole milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Index directory or segment file.
    pub location: PathBuf,

    /// Operation each worker performs.
    pub operation: Operation,

    /// Number of concurrent workers.
    pub concurrency: usize,

    /// I/O method for every reader the run opens.
    pub access: AccessStrategy,

    /// Open one reader up front and hand it to every worker.
    pub shared_reader: bool,

    /// Pause before timed random fetches.
    #[serde(rename = "warmup_delay_ms", with = "duration_ms")]
    pub warmup_delay: Duration,

    /// Per-worker time limit.
    #[serde(rename = "deadline_ms", with = "option_duration_ms")]
    pub deadline: Option<Duration>,

    /// Base RNG seed; worker `i` uses `seed + i`.
    pub seed: Option<u64>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            location: PathBuf::from(DEFAULT_LOCATION),
            operation: Operation::default(),
            concurrency: 1,
            access: AccessStrategy::default(),
            shared_reader: false,
            warmup_delay: DEFAULT_WARMUP,
            deadline: None,
            seed: None,
        }
    }
}

impl BenchmarkConfig {
    pub fn new<P: Into<PathBuf>>(location: P, operation: Operation) -> Self {
        BenchmarkConfig {
            location: location.into(),
            operation,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PilumError::not_found(format!("config file {} not found", path.display()))
            } else {
                PilumError::Io(e)
            }
        })?;
        let config: BenchmarkConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration can be run.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(PilumError::invalid_argument(
                "concurrency must be at least 1",
            ));
        }
        if matches!(&self.operation, Operation::RangeSearch { field, .. } if field.is_empty()) {
            return Err(PilumError::invalid_argument(
                "range search field must not be empty",
            ));
        }
        if self.location.as_os_str().is_empty() {
            return Err(PilumError::invalid_argument("index location must not be empty"));
        }
        Ok(())
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_access(mut self, access: AccessStrategy) -> Self {
        self.access = access;
        self
    }

    pub fn with_shared_reader(mut self, shared_reader: bool) -> Self {
        self.shared_reader = shared_reader;
        self
    }

    pub fn with_warmup_delay(mut self, warmup_delay: Duration) -> Self {
        self.warmup_delay = warmup_delay;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_location<P: Into<PathBuf>>(mut self, location: P) -> Self {
        self.location = location.into();
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => {
                serializer.serialize_some(&u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.location, PathBuf::from("tmp-codec"));
        assert_eq!(config.operation, Operation::RandomFetch { count: 10_000 });
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.access, AccessStrategy::Mmap);
        assert_eq!(config.warmup_delay, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = BenchmarkConfig::default().with_concurrency(0);
        assert!(matches!(
            config.validate(),
            Err(PilumError::InvalidArgument(_))
        ));

        let config = BenchmarkConfig::default().with_operation(Operation::RangeSearch {
            field: String::new(),
            threshold: 0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_durations_in_milliseconds() {
        let config = BenchmarkConfig::default()
            .with_warmup_delay(Duration::from_millis(250))
            .with_deadline(Some(Duration::from_secs(2)));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["warmup_delay_ms"], 250);
        assert_eq!(value["deadline_ms"], 2000);

        let decoded: BenchmarkConfig = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_from_json_file_partial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.json");
        fs::write(
            &path,
            r#"{"operation": {"type": "sequential_scan"}, "concurrency": 4, "access": "paged"}"#,
        )
        .unwrap();

        let config = BenchmarkConfig::from_json_file(&path).unwrap();
        assert_eq!(config.operation, Operation::SequentialScan);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.access, AccessStrategy::Paged);
        assert_eq!(config.warmup_delay, DEFAULT_WARMUP);
        assert_eq!(config.deadline, None);

        assert!(matches!(
            BenchmarkConfig::from_json_file(dir.path().join("missing.json")),
            Err(PilumError::NotFound(_))
        ));
    }
}
