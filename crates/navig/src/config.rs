use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::debug::set_debug_trace;
use crate::environment::DEFAULT_RESERVED_KEY;
use crate::loader::DEFAULT_TERM_KEY;
use crate::render::DEFAULT_EXPAND_DEPTH;
use crate::NavigError;

pub const CONFIG_FILE_NAME: &str = "navig.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavigConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(default = "default_auto_expand_depth")]
    pub auto_expand_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            auto_expand_depth: default_auto_expand_depth(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    #[serde(default = "default_reserved_key")]
    pub reserved_key: String,
    #[serde(default = "default_term_key")]
    pub term_key: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            reserved_key: default_reserved_key(),
            term_key: default_term_key(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    #[serde(default)]
    pub trace: bool,
}

fn default_auto_expand_depth() -> usize {
    DEFAULT_EXPAND_DEPTH
}

fn default_reserved_key() -> String {
    DEFAULT_RESERVED_KEY.to_string()
}

fn default_term_key() -> String {
    DEFAULT_TERM_KEY.to_string()
}

impl NavigConfig {
    pub fn load(path: &Path) -> Result<Self, NavigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
            .map_err(|err| NavigError::Config(format!("failed to parse {}: {err}", path.display())))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Nearest `navig.toml` in `dir` or its ancestors, or the defaults when
    /// there is none.
    pub fn discover(dir: &Path) -> Result<Self, NavigError> {
        match find_config(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Turns debug events on for this thread when the file asks for them.
    /// Leaves the switch alone otherwise so `NAVIG_DEBUG_TRACE` still applies.
    pub fn apply_debug(&self) {
        if self.debug.trace {
            set_debug_trace(Some(true));
        }
    }
}

fn find_config(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
