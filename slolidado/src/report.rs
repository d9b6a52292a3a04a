//! Rapport de téléchargement
//!
//! Agrège les résultats par URL : compteurs, octets reçus, échecs, durée.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::download::DownloadOutcome;
use crate::error::LidarError;

/// Statut global du lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DownloadStatus {
    /// Tous les fichiers sont présents (écrits ou déjà là)
    Success,
    /// Au moins un échec et au moins un fichier présent
    PartialSuccess,
    /// Aucun fichier obtenu
    Failed,
    /// La sélection était vide, rien à télécharger
    NoTiles,
}

/// Échec d'une URL
#[derive(Debug, Clone, Serialize)]
pub struct DownloadFailure {
    pub url: String,
    pub message: String,
    /// Vrai si l'échec vient d'un timeout
    pub timeout: bool,
}

/// Rapport complet d'un lot
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub data_type: String,
    pub projection: String,
    pub destination: PathBuf,
    pub duration_secs: f64,
    pub status: DownloadStatus,

    /// Nombre de dalles sélectionnées
    pub tiles: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Octets reçus pour les fichiers écrits
    pub bytes: u64,

    pub failures: Vec<DownloadFailure>,
}

impl Default for DownloadReport {
    fn default() -> Self {
        Self {
            data_type: String::new(),
            projection: String::new(),
            destination: PathBuf::new(),
            duration_secs: 0.0,
            status: DownloadStatus::Success,
            tiles: 0,
            written: 0,
            skipped: 0,
            failed: 0,
            bytes: 0,
            failures: Vec::new(),
        }
    }
}

impl DownloadReport {
    /// Crée un rapport vide pour un produit, une projection et un dossier
    pub fn new(data_type: &str, projection: &str, destination: &Path) -> Self {
        Self {
            data_type: data_type.to_string(),
            projection: projection.to_string(),
            destination: destination.to_path_buf(),
            ..Default::default()
        }
    }

    /// Enregistre le résultat d'une URL
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Written { bytes, .. } => {
                self.written += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::SkippedExisting { .. } => self.skipped += 1,
            DownloadOutcome::Failed { url, error } => {
                self.failed += 1;
                self.failures.push(DownloadFailure {
                    url: url.clone(),
                    message: error.to_string(),
                    timeout: error.is_timeout(),
                });
            }
        }
    }

    /// Enregistre tous les résultats d'un lot
    pub fn record_all<'a>(&mut self, outcomes: impl IntoIterator<Item = &'a DownloadOutcome>) {
        for outcome in outcomes {
            self.record(outcome);
        }
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        let has_success = self.written > 0 || self.skipped > 0;

        self.status = if self.tiles == 0 && self.total() == 0 {
            DownloadStatus::NoTiles
        } else if self.failed == 0 {
            DownloadStatus::Success
        } else if has_success {
            DownloadStatus::PartialSuccess
        } else {
            DownloadStatus::Failed
        };
    }

    /// Nombre d'URL traitées
    pub fn total(&self) -> usize {
        self.written + self.skipped + self.failed
    }

    /// Vrai si au moins une URL a échoué
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// URL en échec, à relancer
    pub fn failed_urls(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.url.as_str()).collect()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("DOWNLOAD REPORT - {} {}", self.data_type, self.projection);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        println!("Destination: {}", self.destination.display());

        println!("\n--- SUMMARY ---");
        println!("Tiles: {}", self.tiles);
        println!(
            "Files: {} written, {} skipped, {} failed",
            self.written, self.skipped, self.failed
        );
        println!("Received: {:.1} MiB", self.bytes as f64 / (1024.0 * 1024.0));

        if !self.failures.is_empty() {
            println!("\n--- FAILURES ({}) ---", self.failures.len());
            for f in self.failures.iter().take(20) {
                println!("  {} {}", f.url, f.message);
            }
            if self.failures.len() > 20 {
                println!("  ... and {} more", self.failures.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), LidarError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| LidarError::configuration(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(path, json).map_err(|e| {
            LidarError::configuration(format!(
                "Failed to write report {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} {}: {} written, {} skipped, {} failed",
            self.data_type, self.projection, self.written, self.skipped, self.failed
        )
    }
}
