use anyhow::{anyhow, Context, Result};

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default location of the persisted transposition cache
pub const CACHE_PATH: &str = "transposition_table.bin";
/// Hard limit on the time taken by a turn
pub const TIMEOUT: Duration = Duration::from_secs(25);
/// Time kept back from the timeout for the fallback move
pub const SAFE_TIME: Duration = Duration::from_secs(2);
/// Depth of the lazy search used when the main search runs out of time
pub const FALLBACK_DEPTH: u32 = 5;
/// How often the watchdog checks the clock
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Settings for a playing session
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub timeout: Duration,
    pub safe_time: Duration,
    pub fallback_depth: u32,
    pub poll_interval: Duration,
    pub cache_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: TIMEOUT,
            safe_time: SAFE_TIME,
            fallback_depth: FALLBACK_DEPTH,
            poll_interval: POLL_INTERVAL,
            cache_path: PathBuf::from(CACHE_PATH),
        }
    }
}

impl EngineConfig {
    /// Reads overrides of the defaults from `C4_TIMEOUT_SECS`, `C4_SAFE_TIME_SECS`,
    /// `C4_FALLBACK_DEPTH` and `C4_CACHE_PATH`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(secs) = env_var::<f64>("C4_TIMEOUT_SECS")? {
            config.timeout = seconds(secs, "C4_TIMEOUT_SECS")?;
        }
        if let Some(secs) = env_var::<f64>("C4_SAFE_TIME_SECS")? {
            config.safe_time = seconds(secs, "C4_SAFE_TIME_SECS")?;
        }
        if let Some(depth) = env_var::<u32>("C4_FALLBACK_DEPTH")? {
            config.fallback_depth = depth;
        }
        if let Some(path) = std::env::var_os("C4_CACHE_PATH") {
            config.cache_path = PathBuf::from(path);
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_safe_time(mut self, safe_time: Duration) -> Self {
        self.safe_time = safe_time;
        self
    }

    pub fn with_fallback_depth(mut self, fallback_depth: u32) -> Self {
        self.fallback_depth = fallback_depth;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_cache_path<P: Into<PathBuf>>(mut self, cache_path: P) -> Self {
        self.cache_path = cache_path.into();
        self
    }

    /// The time the main search may run before the watchdog stops it
    pub fn soft_budget(&self) -> Duration {
        self.timeout.checked_sub(self.safe_time).unwrap_or_default()
    }
}

fn seconds(secs: f64, name: &str) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(anyhow!("{} must be a non-negative number of seconds, got {}", name, secs));
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("{} is out of range: {}", name, secs))
}

fn env_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value '{}' for {}", value, name)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("could not read {}", name)),
    }
}
