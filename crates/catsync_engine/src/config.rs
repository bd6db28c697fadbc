//! Configuration for the reconciliation engine and the Economy client.

use catsync_model::DiffMode;
use std::time::Duration;

/// Configuration for a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Diff policy for currencies and items.
    pub mode: DiffMode,
    /// Maximum entities per create/delete call.
    pub batch_size: usize,
    /// Retry configuration for snapshot fetches.
    pub retry: RetryConfig,
}

impl ReconcileConfig {
    /// Creates a new configuration with incremental diffing.
    pub fn new() -> Self {
        Self {
            mode: DiffMode::Incremental,
            batch_size: 50,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the diff mode.
    pub fn with_mode(mut self, mode: DiffMode) -> Self {
        self.mode = mode;
        self
    }

    /// Deletes and recreates every currency and item.
    pub fn full_recreate(self) -> Self {
        self.with_mode(DiffMode::FullRecreate)
    }

    /// Sets the batch size. Zero is treated as one.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter.
    pub fn without_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // up to 25%
            let jitter = delay_secs * 0.25 * rand_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Connection settings for one Economy catalog instance (a title).
#[derive(Debug, Clone)]
pub struct EconomyConfig {
    /// Title id owning the catalog.
    pub title_id: String,
    /// API base URL.
    pub base_url: String,
    /// Items requested per search page. The service caps this at 50.
    pub page_size: u32,
    /// Publish created items immediately instead of leaving drafts.
    pub publish: bool,
    /// Request timeout.
    pub timeout: Duration,
}

impl EconomyConfig {
    /// Largest page the search endpoint returns.
    pub const MAX_PAGE_SIZE: u32 = 50;

    /// Creates a configuration for a title on the public API host.
    pub fn for_title(title_id: impl Into<String>) -> Self {
        let title_id = title_id.into();
        Self {
            base_url: format!("https://{title_id}.playfabapi.com"),
            title_id,
            page_size: Self::MAX_PAGE_SIZE,
            publish: true,
            timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the search page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.clamp(1, Self::MAX_PAGE_SIZE);
        self
    }

    /// Sets whether created items are published.
    pub fn with_publish(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds an endpoint URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
