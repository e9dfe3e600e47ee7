// This module holds the configuration of a vectorization run. PassConfig is built from
// Default plus chained setters and is validated once when a pass is constructed: only
// the 2-lane width is implemented, so any other width is refused up front instead of
// failing halfway through a module. CodegenMode selects between the complete rewrite
// (synthesize vector code, redirect scalar users, erase the originals and sweep leftover
// lane extracts) and an analysis-only run that collects chains and statistics without
// touching the IR. An optional function filter restricts the run to named functions.

//! Pass configuration.

use super::error::{PassError, PassResult};

/// Lane width the synthesizer implements.
pub const SUPPORTED_WIDTH: u32 = 2;

/// What the pass does with the chains it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodegenMode {
    /// Emit vector code and replace the scalar originals.
    #[default]
    Full,
    /// Collect chains and statistics only; the IR is left untouched.
    AnalyzeOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassConfig {
    pub width: u32,
    pub mode: CodegenMode,
    /// Restrict the run to these functions. `None` runs on every definition.
    pub functions: Option<Vec<String>>,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            width: SUPPORTED_WIDTH,
            mode: CodegenMode::Full,
            functions: None,
        }
    }
}

impl PassConfig {
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_mode(mut self, mode: CodegenMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> PassResult<()> {
        if self.width != SUPPORTED_WIDTH {
            return Err(PassError::UnsupportedWidth { width: self.width });
        }
        Ok(())
    }

    /// Whether the named function takes part in the run.
    pub fn selects(&self, name: &str) -> bool {
        match &self.functions {
            Some(names) => names.iter().any(|n| n == name),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_full_width_two() {
        let config = PassConfig::default();
        assert_eq!(config.width, 2);
        assert_eq!(config.mode, CodegenMode::Full);
        assert!(config.validate().is_ok());
        assert!(config.selects("anything"));
    }

    #[test]
    fn test_rejects_other_widths() {
        let err = PassConfig::default().with_width(4).validate().unwrap_err();
        assert!(matches!(err, PassError::UnsupportedWidth { width: 4 }));
    }

    #[test]
    fn test_function_filter() {
        let config = PassConfig::default().with_functions(["kernel"]);
        assert!(config.selects("kernel"));
        assert!(!config.selects("helper"));
    }
}
