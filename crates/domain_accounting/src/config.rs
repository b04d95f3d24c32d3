//! Accounting configuration

use serde::Deserialize;

/// Runtime options of the accounting core
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountingConfig {
    /// Character separating path components (`/` by default)
    #[serde(default = "default_path_separator")]
    pub path_separator: char,
    /// Whether children of a non-root account must share its stock/flux role
    #[serde(default = "default_enforce_typed_subtrees")]
    pub enforce_typed_subtrees: bool,
}

fn default_path_separator() -> char {
    '/'
}

fn default_enforce_typed_subtrees() -> bool {
    true
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            path_separator: default_path_separator(),
            enforce_typed_subtrees: default_enforce_typed_subtrees(),
        }
    }
}

impl AccountingConfig {
    /// Loads configuration from `ACCOUNTING_*` environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config: Self = config::Config::builder()
            .add_source(config::Environment::with_prefix("ACCOUNTING").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects separators that would make paths ambiguous
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.path_separator.is_whitespace() || self.path_separator.is_alphanumeric() {
            return Err(config::ConfigError::Message(format!(
                "invalid path separator {:?}",
                self.path_separator
            )));
        }
        Ok(())
    }

    /// Sets the path separator
    pub fn with_path_separator(mut self, separator: char) -> Self {
        self.path_separator = separator;
        self
    }

    /// Enables or disables the typed-subtree policy
    pub fn with_typed_subtrees(mut self, enforce: bool) -> Self {
        self.enforce_typed_subtrees = enforce;
        self
    }
}
