//! Configuration du téléchargeur
//!
//! Ordre de priorité : valeurs par défaut, fichier JSON, variables
//! d'environnement, puis options de la ligne de commande.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::download::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_JOBS, DEFAULT_TIMEOUT_SECS};
use crate::error::{LidarError, Result};
use crate::projection::{ProjectionRegistry, SloProjection};
use crate::urls::SLO_LIDAR_BASE_DOWNLOAD_LINK;

pub const ENV_BASE_URL: &str = "SLOLIDADO_BASE_URL";
pub const ENV_FISHNET_DIR: &str = "SLOLIDADO_FISHNET_DIR";
pub const ENV_JOBS: &str = "SLOLIDADO_JOBS";
pub const ENV_TIMEOUT: &str = "SLOLIDADO_TIMEOUT";

/// Dossier des grilles officielles par défaut
pub const DEFAULT_FISHNET_DIR: &str = "data/fishnet";

/// Configuration principale
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base des URL de téléchargement
    pub base_url: String,

    /// Dossier contenant `LIDAR_FISHNET_D48.shp` et `LIDAR_FISHNET_D96.shp`
    pub fishnet_dir: PathBuf,

    /// Grilles remplaçant les fichiers officiels, par projection
    pub grids: HashMap<SloProjection, PathBuf>,

    /// Téléchargements simultanés
    pub jobs: usize,

    /// Timeout total d'une requête (secondes)
    pub timeout_secs: u64,

    /// Timeout de connexion (secondes)
    pub connect_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: SLO_LIDAR_BASE_DOWNLOAD_LINK.to_string(),
            fishnet_dir: PathBuf::from(DEFAULT_FISHNET_DIR),
            grids: HashMap::new(),
            jobs: DEFAULT_JOBS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            user_agent: concat!("slolidado/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier JSON
    ///
    /// Les clés absentes gardent leur valeur par défaut.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LidarError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&content).map_err(|e| match e {
            LidarError::Configuration(msg) => {
                LidarError::configuration(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Parse une configuration JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LidarError::configuration(format!("Failed to parse config JSON: {}", e)))
    }

    /// Applique les variables d'environnement `SLOLIDADO_*`
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Applique des surcharges lues par `lookup`
    ///
    /// Une valeur numérique invalide est ignorée avec un warning.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(dir) = lookup(ENV_FISHNET_DIR) {
            self.fishnet_dir = PathBuf::from(dir);
        }
        if let Some(jobs) = lookup(ENV_JOBS) {
            match jobs.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.jobs = n,
                _ => warn!(value = %jobs, "Ignoring invalid {}", ENV_JOBS),
            }
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            match timeout.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!(value = %timeout, "Ignoring invalid {}", ENV_TIMEOUT),
            }
        }
    }

    /// Vérifie les valeurs numériques
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(LidarError::configuration("jobs must be at least 1"));
        }
        if self.timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(LidarError::configuration("timeouts must be at least 1 second"));
        }
        if self.base_url.trim().is_empty() {
            return Err(LidarError::configuration("base_url must not be empty"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Construit le registre des projections avec les surcharges de grilles
    pub fn registry(&self) -> ProjectionRegistry {
        self.grids.iter().fold(
            ProjectionRegistry::new(&self.fishnet_dir),
            |registry, (&projection, path)| registry.with_grid(projection, path.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://gis.arso.gov.si/lidar");
        assert_eq!(config.jobs, 4);
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert!(config.user_agent.starts_with("slolidado/"));
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(
            r#"{
                "base_url": "http://mirror.test/lidar",
                "grids": { "D96TM": "/data/grid96.geojson" },
                "jobs": 8
            }"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://mirror.test/lidar");
        assert_eq!(config.jobs, 8);
        assert_eq!(config.timeout_secs, 300);

        let registry = config.registry();
        assert_eq!(
            registry.lookup(SloProjection::D96TM).unwrap().fishnet,
            PathBuf::from("/data/grid96.geojson")
        );
        assert_eq!(
            registry.lookup(SloProjection::D48GK).unwrap().fishnet,
            PathBuf::from("data/fishnet/LIDAR_FISHNET_D48.shp")
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Config::from_json(r#"{ "base_uri": "http://x" }"#);
        assert!(matches!(result, Err(LidarError::Configuration(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/slolidado.json"));
        match result {
            Err(LidarError::Configuration(msg)) => assert!(msg.contains("/nonexistent/slolidado.json")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "fishnet_dir": "/srv/fishnet", "timeout_secs": 60 }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.fishnet_dir, PathBuf::from("/srv/fishnet"));
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://127.0.0.1:8080"),
            (ENV_FISHNET_DIR, "/grids"),
            (ENV_JOBS, "2"),
            (ENV_TIMEOUT, "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.fishnet_dir, PathBuf::from("/grids"));
        assert_eq!(config.jobs, 2);
        // Valeur invalide ignorée
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn test_validate() {
        let config = Config {
            jobs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            connect_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
