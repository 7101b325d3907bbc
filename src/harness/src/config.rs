use std::path::{Path, PathBuf};

use crate::{fixtures::ENUMERATION_ENTRY, trigger::Trigger};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Configuration options that control what the suite runs and where.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Directory under test, inside the mounted layered filesystem. Fixtures are looked up
    /// directly underneath it.
    pub base: PathBuf,

    /// Restricts the copy-up scenarios to these triggers. Empty means all of them.
    ///
    /// The suite always runs the selected scenarios in catalog order, whatever order they are
    /// listed in here.
    pub only: Vec<Trigger>,

    /// Whether to run the directory enumeration check after the copy-up scenarios.
    ///
    /// The default value for this option is `true`.
    pub enumeration: bool,

    /// Directory the enumeration check lists.
    ///
    /// The default is `base`.
    pub enumeration_dir: Option<PathBuf>,

    /// Regular file that must appear in the enumerated directory.
    ///
    /// The default is `test.txt`.
    pub enumeration_entry: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SuiteConfig {
    /// Creates a configuration running every scenario against `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            only: Vec::new(),
            enumeration: true,
            enumeration_dir: None,
            enumeration_entry: ENUMERATION_ENTRY.to_string(),
        }
    }

    /// Restricts the copy-up scenarios to `triggers`.
    pub fn only(mut self, triggers: impl IntoIterator<Item = Trigger>) -> Self {
        self.only = triggers.into_iter().collect();
        self
    }

    /// Enables or disables the directory enumeration check.
    pub fn enumeration(mut self, enabled: bool) -> Self {
        self.enumeration = enabled;
        self
    }

    /// Lists `dir` instead of the base directory in the enumeration check.
    pub fn enumeration_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.enumeration_dir = Some(dir.into());
        self
    }

    /// Looks for `name` instead of `test.txt` in the enumeration check.
    pub fn enumeration_entry(mut self, name: impl Into<String>) -> Self {
        self.enumeration_entry = name.into();
        self
    }

    /// The triggers selected for this run, in catalog order.
    pub fn selected_triggers(&self) -> Vec<Trigger> {
        Trigger::ALL
            .into_iter()
            .filter(|t| self.only.is_empty() || self.only.contains(t))
            .collect()
    }

    /// The directory the enumeration check lists.
    pub fn enumeration_target(&self) -> &Path {
        self.enumeration_dir.as_deref().unwrap_or(&self.base)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
