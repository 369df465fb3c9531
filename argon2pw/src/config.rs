//! Hashing parameters, their compiled-in defaults, and the validation that
//! turns a user-supplied [`Config`] into [`HashParameters`].
//!
//! Hardware concurrency is read once into a [`Runtime`] and passed around by
//! value; nothing here queries the machine per call.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;

/// Memory cost in KiB used when none is configured (64 MiB).
pub const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
/// Iterations used when none are configured.
pub const DEFAULT_ITERATIONS: u32 = 3;
/// Salt length in bytes used when none is configured.
pub const DEFAULT_SALT_LENGTH: u32 = 16;
/// Derived key length in bytes used when none is configured.
pub const DEFAULT_KEY_LENGTH: u32 = 32;
/// Memory ceiling in KiB (512 MiB). Also bounds decoded hashes.
pub const DEFAULT_MAX_MEMORY_KIB: u32 = 512 * 1024;
/// Iteration ceiling. Also bounds decoded hashes.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
/// Upper bound on the parallelism picked when none is configured.
pub const MAX_DEFAULT_PARALLELISM: u8 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is missing")]
    ConfigNil,
    #[error("config value '{field}' is negative")]
    NegativeValue { field: &'static str },
    #[error("config value '{field}' is out of range")]
    OutOfRange { field: &'static str },
    #[error("memory {memory_kib} KiB exceeds max memory {max_memory_kib} KiB")]
    MemoryExceedsMax { memory_kib: u32, max_memory_kib: u32 },
    #[error("iterations {iterations} exceed max iterations {max_iterations}")]
    IterationsExceedsMax { iterations: u32, max_iterations: u32 },
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// Process facts that hashing depends on, captured once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Runtime {
    available_parallelism: u8,
    default_parallelism: u8,
}

impl Runtime {
    /// Queries the hardware concurrency of this machine.
    pub fn detect() -> Self {
        let detected = match std::thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(err) => {
                tracing::warn!(%err, "could not detect available parallelism, assuming 1");
                1
            }
        };
        Self::with_available_parallelism(detected)
    }

    /// Builds a runtime for a known concurrency count. Counts above 255 are
    /// clamped since Argon2 parallelism is stored in eight bits.
    pub fn with_available_parallelism(detected: usize) -> Self {
        let available = u8::try_from(detected.max(1)).unwrap_or(u8::MAX);
        Self {
            available_parallelism: available,
            default_parallelism: available.min(MAX_DEFAULT_PARALLELISM),
        }
    }

    /// Process-wide runtime, detected on first use.
    pub fn global() -> &'static Runtime {
        static RUNTIME: OnceLock<Runtime> = OnceLock::new();
        RUNTIME.get_or_init(Runtime::detect)
    }

    pub fn available_parallelism(&self) -> u8 {
        self.available_parallelism
    }

    pub fn default_parallelism(&self) -> u8 {
        self.default_parallelism
    }

    /// Resolves a requested parallelism: unset picks the default, anything
    /// else is lowered to the available concurrency but never raised.
    pub fn cap_parallelism(&self, requested: Option<u8>) -> u8 {
        match requested.filter(|&p| p != 0) {
            None => self.default_parallelism,
            Some(p) => p.min(self.available_parallelism),
        }
    }
}

/// Fully resolved parameters for one hash operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParameters {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u8,
    pub key_length: u32,
    pub salt_length: u32,
}

impl HashParameters {
    pub fn defaults(runtime: &Runtime) -> Self {
        Self {
            memory_kib: DEFAULT_MEMORY_KIB,
            iterations: DEFAULT_ITERATIONS,
            parallelism: runtime.default_parallelism(),
            key_length: DEFAULT_KEY_LENGTH,
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }
}

/// User overrides. `None` (or an explicit zero) falls back to the compiled-in
/// default for that field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub salt_length: Option<u32>,
    pub key_length: Option<u32>,
    pub parallelism: Option<u8>,
    /// Only bounds an explicit `memory_kib`; the 64 MiB default is used even
    /// when this is set lower.
    pub max_memory_kib: Option<u32>,
    pub max_iterations: Option<u32>,
}

impl Config {
    /// Resolves defaults and enforces the ceilings. Ceilings are resolved
    /// before the values they bound are checked.
    pub fn validate(&self, runtime: &Runtime) -> Result<HashParameters, ConfigError> {
        let parallelism = runtime.cap_parallelism(self.parallelism);

        let max_memory_kib = set(self.max_memory_kib).unwrap_or(DEFAULT_MAX_MEMORY_KIB);
        let memory_kib = match set(self.memory_kib) {
            None => DEFAULT_MEMORY_KIB,
            Some(memory_kib) if memory_kib > max_memory_kib => {
                return Err(ConfigError::MemoryExceedsMax {
                    memory_kib,
                    max_memory_kib,
                })
            }
            Some(memory_kib) => memory_kib,
        };

        let max_iterations = set(self.max_iterations).unwrap_or(DEFAULT_MAX_ITERATIONS);
        let iterations = match set(self.iterations) {
            None => DEFAULT_ITERATIONS,
            Some(iterations) if iterations > max_iterations => {
                return Err(ConfigError::IterationsExceedsMax {
                    iterations,
                    max_iterations,
                })
            }
            Some(iterations) => iterations,
        };

        let params = HashParameters {
            memory_kib,
            iterations,
            parallelism,
            key_length: set(self.key_length).unwrap_or(DEFAULT_KEY_LENGTH),
            salt_length: set(self.salt_length).unwrap_or(DEFAULT_SALT_LENGTH),
        };
        tracing::debug!(?params, "resolved hash parameters");
        Ok(params)
    }

    /// Parses a JSON config document. Numbers are read as signed integers so
    /// that negative values are reported as such rather than as parse errors.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(format!("{e}")))?;
        Config::try_from(raw)
    }
}

/// Validates an optional config; an absent config is an error here, unlike
/// in [`crate::PasswordHasher::hash_with`] where it selects the defaults.
pub fn validate(config: Option<&Config>, runtime: &Runtime) -> Result<HashParameters, ConfigError> {
    config.ok_or(ConfigError::ConfigNil)?.validate(runtime)
}

/// Loads a JSON config file such as
/// `{"memory": 19456, "iterations": 2, "parallelism": 1}`.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    Config::from_json(&raw_json)
}

fn set<T: Copy + Default + PartialEq>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConfig {
    memory: Option<i64>,
    iterations: Option<i64>,
    salt_length: Option<i64>,
    key_length: Option<i64>,
    parallelism: Option<i64>,
    max_memory: Option<i64>,
    max_iterations: Option<i64>,
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        Ok(Config {
            memory_kib: narrow("memory", raw.memory)?,
            iterations: narrow("iterations", raw.iterations)?,
            salt_length: narrow("saltLength", raw.salt_length)?,
            key_length: narrow("keyLength", raw.key_length)?,
            parallelism: narrow("parallelism", raw.parallelism)?,
            max_memory_kib: narrow("maxMemory", raw.max_memory)?,
            max_iterations: narrow("maxIterations", raw.max_iterations)?,
        })
    }
}

fn narrow<T: TryFrom<i64>>(field: &'static str, value: Option<i64>) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(v) if v < 0 => Err(ConfigError::NegativeValue { field }),
        Some(v) => T::try_from(v)
            .map(Some)
            .map_err(|_| ConfigError::OutOfRange { field }),
    }
}
