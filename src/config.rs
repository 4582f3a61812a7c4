use crate::error::{Error, Result};

/// Thresholds that decide when a list leaves the compact encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    /// More entries than this forces conversion to the linked encoding.
    pub max_compact_entries: usize,
    /// A value longer than this (in bytes) forces conversion.
    pub max_compact_value: usize,
}

impl Default for ListLimits {
    fn default() -> Self {
        ListLimits {
            max_compact_entries: 128,
            max_compact_value: 64,
        }
    }
}

/// Engine configuration.
///
/// Recognised option names (as they appear in a config file):
///   - `list-max-ziplist-entries` → [`ListLimits::max_compact_entries`]
///   - `list-max-ziplist-value`   → [`ListLimits::max_compact_value`]
///   - `databases`                → number of numbered databases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub list_limits: ListLimits,
    pub databases: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            list_limits: ListLimits::default(),
            databases: 16,
        }
    }
}

impl Options {
    pub fn with_max_compact_entries(mut self, n: usize) -> Self {
        self.list_limits.max_compact_entries = n;
        self
    }

    pub fn with_max_compact_value(mut self, n: usize) -> Self {
        self.list_limits.max_compact_value = n;
        self
    }

    pub fn with_databases(mut self, n: usize) -> Self {
        self.databases = n;
        self
    }

    /// Apply one `name value` option.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let parsed = value
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::Config(format!("invalid value {value:?} for {name}")))?;
        match name.to_ascii_lowercase().as_str() {
            "list-max-ziplist-entries" => self.list_limits.max_compact_entries = parsed,
            "list-max-ziplist-value" => self.list_limits.max_compact_value = parsed,
            "databases" => {
                if parsed == 0 {
                    return Err(Error::Config("databases must be at least 1".into()));
                }
                self.databases = parsed;
            }
            _ => return Err(Error::Config(format!("unknown option {name:?}"))),
        }
        Ok(())
    }

    /// Parse config text: one `name value` pair per line, `#` comments and
    /// blank lines ignored. Unset options keep their defaults.
    pub fn parse(text: &str) -> Result<Self> {
        let mut options = Options::default();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(Error::Config(format!(
                    "line {}: expected `name value`, got {line:?}",
                    lineno + 1
                )));
            };
            options.set(name, value)?;
        }
        Ok(options)
    }
}
