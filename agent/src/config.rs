//! Agent configuration.

use std::str::FromStr;
use std::time::Duration;

/// Configuration for agent behavior.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of agent loop iterations.
    pub max_iterations: usize,

    /// System prompt to prepend to conversations.
    pub system_prompt: Option<String>,

    /// Backend routing configuration.
    pub router: RouterConfig,

    /// Tool results longer than this many characters are moved into the blob store.
    pub oversize_threshold: usize,

    /// Paged task execution configuration.
    pub task: TaskConfig,

    /// Upper bound for a single backend call.
    pub backend_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 32,
            system_prompt: None,
            router: RouterConfig::default(),
            oversize_threshold: 20_000,
            task: TaskConfig::default(),
            backend_timeout: Duration::from_secs(120),
        }
    }
}

impl AgentConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from the defaults overlaid with `HYPERFOCUS_*`
    /// environment variables.
    ///
    /// Recognized variables: `HYPERFOCUS_MAX_ITERATIONS`, `HYPERFOCUS_ROUTER_THRESHOLD`,
    /// `HYPERFOCUS_OVERSIZE_THRESHOLD`, `HYPERFOCUS_PAGE_SIZE`, `HYPERFOCUS_ROW_CAP` and
    /// `HYPERFOCUS_BACKEND_TIMEOUT_SECS`. Values that are not positive integers are
    /// ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).and_then(|raw| parse_positive(key, &raw));

        if let Some(value) = read("HYPERFOCUS_MAX_ITERATIONS") {
            config.max_iterations = value;
        }
        if let Some(value) = read("HYPERFOCUS_ROUTER_THRESHOLD") {
            config.router.history_threshold = value;
        }
        if let Some(value) = read("HYPERFOCUS_OVERSIZE_THRESHOLD") {
            config.oversize_threshold = value;
        }
        if let Some(value) = read("HYPERFOCUS_PAGE_SIZE") {
            config.task.page_size = value;
        }
        if let Some(value) = read("HYPERFOCUS_ROW_CAP") {
            config.task.row_cap = value;
        }
        let timeout = "HYPERFOCUS_BACKEND_TIMEOUT_SECS";
        if let Some(secs) = lookup(timeout).and_then(|raw| parse_positive::<u64>(timeout, &raw)) {
            config.backend_timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub const fn with_max_iterations(mut self, limit: usize) -> Self {
        self.max_iterations = limit;
        self
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the backend routing configuration.
    #[must_use]
    pub const fn with_router(mut self, router: RouterConfig) -> Self {
        self.router = router;
        self
    }

    /// Sets the oversize threshold for tool results, in characters.
    #[must_use]
    pub const fn with_oversize_threshold(mut self, threshold: usize) -> Self {
        self.oversize_threshold = threshold;
        self
    }

    /// Sets the paged task configuration.
    #[must_use]
    pub const fn with_task(mut self, task: TaskConfig) -> Self {
        self.task = task;
        self
    }

    /// Sets the timeout applied to every backend call.
    #[must_use]
    pub const fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }
}

/// Configuration for backend routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Histories longer than this many characters go to the high-capacity backend.
    pub history_threshold: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            history_threshold: 10_000,
        }
    }
}

impl RouterConfig {
    /// Sets the history length threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: usize) -> Self {
        self.history_threshold = threshold;
        self
    }
}

/// Configuration for paged task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskConfig {
    /// Default page size in characters.
    pub page_size: usize,
    /// Maximum number of rows processed from tabular data.
    pub row_cap: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            page_size: 2_000,
            row_cap: 200,
        }
    }
}

impl TaskConfig {
    /// Sets the default page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the row cap for tabular data.
    #[must_use]
    pub const fn with_row_cap(mut self, row_cap: usize) -> Self {
        self.row_cap = row_cap;
        self
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> Option<T>
where
    T: FromStr + PartialEq + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => Some(value),
        _ => {
            tracing::warn!(key, value = raw, "ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 32);
        assert_eq!(config.router.history_threshold, 10_000);
        assert_eq!(config.oversize_threshold, 20_000);
        assert_eq!(config.task.page_size, 2_000);
        assert_eq!(config.task.row_cap, 200);
        assert_eq!(config.backend_timeout, Duration::from_secs(120));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("HYPERFOCUS_MAX_ITERATIONS", "5"),
            ("HYPERFOCUS_ROUTER_THRESHOLD", "500"),
            ("HYPERFOCUS_PAGE_SIZE", " 1000 "),
            ("HYPERFOCUS_BACKEND_TIMEOUT_SECS", "9"),
        ]));
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.router.history_threshold, 500);
        assert_eq!(config.task.page_size, 1_000);
        assert_eq!(config.task.row_cap, 200);
        assert_eq!(config.backend_timeout, Duration::from_secs(9));
    }

    #[test]
    fn invalid_or_zero_values_keep_defaults() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("HYPERFOCUS_ROW_CAP", "0"),
            ("HYPERFOCUS_OVERSIZE_THRESHOLD", "lots"),
        ]));
        assert_eq!(config.task.row_cap, 200);
        assert_eq!(config.oversize_threshold, 20_000);
    }

    #[test]
    fn timeout_is_read_as_whole_seconds() {
        let huge = AgentConfig::from_lookup(lookup(&[(
            "HYPERFOCUS_BACKEND_TIMEOUT_SECS",
            "18446744073709551615",
        )]));
        assert_eq!(huge.backend_timeout, Duration::from_secs(u64::MAX));

        for raw in ["-5", "1.5", "0"] {
            let config =
                AgentConfig::from_lookup(lookup(&[("HYPERFOCUS_BACKEND_TIMEOUT_SECS", raw)]));
            assert_eq!(config.backend_timeout, Duration::from_secs(120), "{raw}");
        }
    }

    #[test]
    fn builder_setters() {
        let config = AgentConfig::new()
            .with_max_iterations(3)
            .with_system_prompt("be brief")
            .with_router(RouterConfig::default().with_threshold(42))
            .with_task(TaskConfig::default().with_page_size(10).with_row_cap(4))
            .with_oversize_threshold(99);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(config.router.history_threshold, 42);
        assert_eq!(config.task, TaskConfig { page_size: 10, row_cap: 4 });
        assert_eq!(config.oversize_threshold, 99);
    }
}
