//! Error types for configuration and simulation

/// Configuration errors, reported at load or construction time.
#[derive(Debug)]
pub enum ConfigError {
    /// A tuning value is out of its valid range
    Invalid { field: &'static str, reason: String },
    /// Settings file could not be parsed
    Parse(serde_json::Error),
    /// Settings file could not be read
    Io(std::io::Error),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid setting `{}`: {}", field, reason)
            }
            ConfigError::Parse(e) => write!(f, "settings parse error: {}", e),
            ConfigError::Io(e) => write!(f, "settings IO error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Invalid { .. } => None,
            ConfigError::Parse(e) => Some(e),
            ConfigError::Io(e) => Some(e),
        }
    }
}

/// Fatal simulation errors. These signal a sizing misconfiguration, not bad luck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// No free road section was left to recycle into the ring
    SectionPoolExhausted { pool_size: usize, ring_size: usize },
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::SectionPoolExhausted {
                pool_size,
                ring_size,
            } => write!(
                f,
                "road section pool exhausted (pool {} for ring {})",
                pool_size, ring_size
            ),
        }
    }
}

impl std::error::Error for SimError {}

/// Fail with `ConfigError::Invalid` unless `cond` holds
pub(crate) fn ensure(cond: bool, field: &'static str, reason: &str) -> Result<(), ConfigError> {
    if cond {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, reason))
    }
}
