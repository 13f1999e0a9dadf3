//! Process configuration.
//!
//! Values come from the environment (a `.env` file in the working directory is
//! loaded first by `main`):
//!
//! - `STUADMD_WORKSPACE`: workspace directory opened at start-up.
//! - `STUADMD_HISTORY_LIMIT`: how many recently selected students to remember.

use std::path::PathBuf;

use tracing::warn;

const WORKSPACE_VAR: &str = "STUADMD_WORKSPACE";
const HISTORY_LIMIT_VAR: &str = "STUADMD_HISTORY_LIMIT";

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(WORKSPACE_VAR).filter(|v| !v.trim().is_empty()) {
            config.workspace = Some(PathBuf::from(path.trim()));
        }

        if let Some(raw) = lookup(HISTORY_LIMIT_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.history_limit = n,
                _ => warn!(value = %raw, "ignoring invalid {HISTORY_LIMIT_VAR}"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(load_from(&[]), Config::default());
    }

    #[test]
    fn reads_workspace_and_limit() {
        let cfg = load_from(&[(WORKSPACE_VAR, " /tmp/ws "), (HISTORY_LIMIT_VAR, "5")]);
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(cfg.history_limit, 5);
    }

    #[test]
    fn invalid_limit_falls_back() {
        assert_eq!(load_from(&[(HISTORY_LIMIT_VAR, "lots")]).history_limit, 20);
        assert_eq!(load_from(&[(HISTORY_LIMIT_VAR, "0")]).history_limit, 20);
    }
}
