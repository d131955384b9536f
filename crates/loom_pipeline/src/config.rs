//! Pipeline tuning.

use std::path::PathBuf;
use std::time::Duration;

use loom_source::DEFAULT_SOURCE_EXTENSIONS;

/// Default quiet period before a change triggers a compile.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Settings for a [`RecompilePipeline`](crate::RecompilePipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Quiet time measured from the last trigger before compiling.
    pub debounce: Duration,
    /// Entry file used when the editor has not reported an active file.
    pub entry: Option<PathBuf>,
    /// Extensions of files accepted as an active-file hint.
    pub source_extensions: Vec<String>,
}

impl PipelineConfig {
    /// Sets the debounce period.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the fallback entry file.
    pub fn with_entry(mut self, entry: impl Into<PathBuf>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    /// Sets the recognized source extensions.
    pub fn with_source_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            entry: None,
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(150));
        assert_eq!(config.entry, None);
        assert_eq!(config.source_extensions, vec!["loom".to_string()]);
    }

    #[test]
    fn builders() {
        let config = PipelineConfig::default()
            .with_debounce(Duration::ZERO)
            .with_entry("src/main.loom")
            .with_source_extensions(["loom", "lm"]);
        assert_eq!(config.debounce, Duration::ZERO);
        assert_eq!(config.entry, Some(PathBuf::from("src/main.loom")));
        assert_eq!(config.source_extensions.len(), 2);
    }
}
