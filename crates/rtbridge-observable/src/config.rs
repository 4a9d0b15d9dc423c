//! Bridge configuration.

/// Identifier of the shared collaborator map on the model root.
pub const DEFAULT_ROSTER_MAP_ID: &str = "collaborators";

/// Configuration for the observable adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Root identifier of the shared collaborator map
    pub roster_map_id: String,

    /// Clear the shared collaborator map when a roster is disposed
    pub clear_on_dispose: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            roster_map_id: DEFAULT_ROSTER_MAP_ID.to_string(),
            clear_on_dispose: true,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RTBRIDGE_ROSTER_MAP_ID`: root id of the collaborator map
    /// - `RTBRIDGE_CLEAR_ON_DISPOSE`: `true`/`false`, `1`/`0`, `yes`/`no`
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(id) = lookup("RTBRIDGE_ROSTER_MAP_ID") {
            if id.trim().is_empty() {
                return Err(ConfigError::Empty("RTBRIDGE_ROSTER_MAP_ID"));
            }
            config.roster_map_id = id;
        }

        if let Some(flag) = lookup("RTBRIDGE_CLEAR_ON_DISPOSE") {
            config.clear_on_dispose = parse_bool(&flag).ok_or(ConfigError::InvalidBool {
                var: "RTBRIDGE_CLEAR_ON_DISPOSE",
                value: flag,
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Errors that can occur loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A boolean variable holds something else
    #[error("{var}: expected a boolean, got '{value}'")]
    InvalidBool {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
    /// A variable is set but blank
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = BridgeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.roster_map_id, "collaborators");
        assert!(config.clear_on_dispose);
    }

    #[test]
    fn variables_override_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("RTBRIDGE_ROSTER_MAP_ID", "people"),
            ("RTBRIDGE_CLEAR_ON_DISPOSE", "no"),
        ]))
        .unwrap();
        assert_eq!(config.roster_map_id, "people");
        assert!(!config.clear_on_dispose);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = BridgeConfig::from_lookup(lookup(&[("RTBRIDGE_CLEAR_ON_DISPOSE", "maybe")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidBool {
                var: "RTBRIDGE_CLEAR_ON_DISPOSE",
                value: "maybe".to_string()
            }
        );

        let err = BridgeConfig::from_lookup(lookup(&[("RTBRIDGE_ROSTER_MAP_ID", " ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty("RTBRIDGE_ROSTER_MAP_ID"));
    }
}
