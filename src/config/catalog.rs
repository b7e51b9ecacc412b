//! Loads the service catalog: a JSON file mapping service name to its
//! declarative config, read once at startup.

use crate::config::error::ConfigError;
use crate::config::service::ServiceConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A loaded mapping from service name to its declarative config.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    services: HashMap<String, ServiceConfig>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&raw, &path)
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let entries: Vec<ServiceConfig> =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let services = entries
            .into_iter()
            .map(|cfg| (cfg.name.clone(), cfg))
            .collect();

        Ok(Self { services })
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.values()
    }

    pub fn get(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::service::ServiceType;

    #[test]
    fn parses_a_list_of_services() {
        let json = r#"[
            {"name": "a", "type": "executable", "command": "/bin/true"},
            {"name": "b", "type": "shell_script", "command": "/tmp/run.sh"}
        ]"#;
        let catalog = Catalog::parse(json, Path::new("catalog.json")).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a").unwrap().service_type, ServiceType::Executable);
        assert_eq!(catalog.get("b").unwrap().command, "/tmp/run.sh");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Catalog::parse("not json", Path::new("catalog.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
