//! Конфигурация injector-а
//!
//! ```toml
//! name = "app"
//! profile = true
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{DIResult, InjectError};

/// Настройки корневого injector-а; дочерние наследуют observer и имя-префикс
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorConfig {
    /// Имя для логов и снимков графа
    pub name: String,
    /// Логировать граф каждого injector-а через tracing (если observer не задан)
    pub profile: bool,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            name: "root".to_string(),
            profile: false,
        }
    }
}

impl InjectorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    /// Загрузить конфигурацию из TOML
    pub fn from_toml_str(source: &str) -> DIResult<Self> {
        toml::from_str(source).map_err(|e| {
            InjectError::configuration(format!("Invalid injector config: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InjectorConfig::default();
        assert_eq!(config.name, "root");
        assert!(!config.profile);
    }

    #[test]
    fn test_from_toml() {
        let config = InjectorConfig::from_toml_str("name = \"app\"\nprofile = true\n").unwrap();
        assert_eq!(config, InjectorConfig::new("app").with_profile(true));

        // отсутствующие поля берутся из default
        let partial = InjectorConfig::from_toml_str("profile = true").unwrap();
        assert_eq!(partial.name, "root");
    }

    #[test]
    fn test_invalid_toml() {
        let error = InjectorConfig::from_toml_str("profile = \"yes\"").unwrap_err();
        assert_eq!(error.category(), "configuration");
    }
}
