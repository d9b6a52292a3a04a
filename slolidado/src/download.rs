//! Téléchargement par lot des dalles
//!
//! Chaque URL produit exactement un [`DownloadOutcome`], dans l'ordre d'entrée.
//! Une erreur sur un fichier est journalisée et enregistrée, puis le lot continue.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode, Url};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{DownloadError, LidarError};

/// Nombre de téléchargements simultanés par défaut
pub const DEFAULT_JOBS: usize = 4;

/// Timeout total par requête par défaut (secondes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Timeout de connexion par défaut (secondes)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Suffixe des fichiers en cours de téléchargement
const PARTIAL_SUFFIX: &str = ".part";

/// Résultat du téléchargement d'une URL
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Fichier écrit (nombre d'octets reçus)
    Written { path: PathBuf, bytes: u64 },
    /// Fichier déjà présent, aucune requête émise
    SkippedExisting { path: PathBuf },
    /// Échec, le lot a continué
    Failed { url: String, error: DownloadError },
}

impl DownloadOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DownloadOutcome::Failed { .. })
    }
}

/// Crée le client HTTP partagé par les téléchargements
pub fn build_client(
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: &str,
) -> Result<Client, LidarError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| LidarError::configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Chemin local d'une URL : dernier segment du chemin dans `destination`
pub fn target_path(url: &str, destination: &Path) -> Result<PathBuf, DownloadError> {
    let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", url, e)))?;

    let name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .ok_or_else(|| DownloadError::InvalidUrl(format!("{}: no file name", url)))?;

    Ok(destination.join(name))
}

/// Fichier temporaire propre à une tentative, renommé en place au succès
///
/// Le fichier est créé à côté de la cible (`.<nom>.XXXXXX.part`) ; `TempPath`
/// le supprime au drop, donc aussi sur erreur, timeout ou annulation.
struct PartialFile {
    temp: TempPath,
    target: PathBuf,
    file: Option<tokio::fs::File>,
}

impl PartialFile {
    async fn create(target: &Path) -> Result<Self, DownloadError> {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let prefix = target
            .file_name()
            .map(|name| format!(".{}.", name.to_string_lossy()))
            .unwrap_or_else(|| ".".to_string());

        let created = {
            let dir = dir.clone();
            tokio::task::spawn_blocking(move || {
                tempfile::Builder::new()
                    .prefix(&prefix)
                    .suffix(PARTIAL_SUFFIX)
                    .tempfile_in(&dir)
            })
        }
        .await
        .map_err(|e| DownloadError::io(&dir, e.into()))?
        .map_err(|e| DownloadError::io(&dir, e))?;

        let (file, temp) = created.into_parts();
        Ok(Self {
            temp,
            target: target.to_path_buf(),
            file: Some(tokio::fs::File::from_std(file)),
        })
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), DownloadError> {
        let Some(file) = self.file.as_mut() else {
            return Err(DownloadError::io(
                &*self.temp,
                std::io::Error::other("partial file already closed"),
            ));
        };
        file.write_all(data)
            .await
            .map_err(|e| DownloadError::io(&*self.temp, e))
    }

    async fn commit(mut self) -> Result<(), DownloadError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(|e| DownloadError::io(&*self.temp, e))?;
            file.sync_all().await.map_err(|e| DownloadError::io(&*self.temp, e))?;
        }

        let PartialFile { temp, target, .. } = self;
        let destination = target.clone();
        // En cas d'échec, le TempPath rendu par l'erreur supprime le temporaire
        tokio::task::spawn_blocking(move || temp.persist(&target))
            .await
            .map_err(|e| DownloadError::io(&destination, e.into()))?
            .map_err(|e| DownloadError::io(&destination, e.error))
    }
}

/// Téléchargeur par lot
#[derive(Debug, Clone)]
pub struct BatchDownloader {
    client: Client,
    jobs: usize,
    cancel: CancellationToken,
}

impl BatchDownloader {
    /// Crée un téléchargeur séquentiel sur un client HTTP
    pub fn new(client: Client) -> Self {
        Self {
            client,
            jobs: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Nombre maximal de téléchargements simultanés (au moins 1)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Jeton d'annulation du lot
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Télécharge toutes les URL dans `destination`
    ///
    /// Retourne un résultat par URL, dans l'ordre de `urls`, quel que soit
    /// l'ordre de fin des téléchargements. Les URL qui aboutissent au même
    /// fichier local sont traitées l'une après l'autre, dans l'ordre d'entrée.
    pub async fn download_all(
        &self,
        urls: &[String],
        destination: &Path,
        overwrite: bool,
    ) -> Vec<DownloadOutcome> {
        let groups = group_by_target(urls, destination);

        let mut outcomes: Vec<(usize, DownloadOutcome)> = stream::iter(groups)
            .map(|group| async move {
                let mut done = Vec::with_capacity(group.len());
                for (index, url) in group {
                    let outcome = self.download_one(url, destination, overwrite).await;
                    done.push((index, outcome));
                }
                done
            })
            .buffered(self.jobs)
            .flat_map(stream::iter)
            .collect()
            .await;

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Télécharge une URL ; ne propage jamais d'erreur
    pub async fn download_one(
        &self,
        url: &str,
        destination: &Path,
        overwrite: bool,
    ) -> DownloadOutcome {
        let path = match target_path(url, destination) {
            Ok(path) => path,
            Err(error) => {
                error!(url = %url, "Error when download from URL: {}", error);
                return DownloadOutcome::Failed {
                    url: url.to_string(),
                    error,
                };
            }
        };

        // Une erreur de métadonnées vaut absence : le téléchargement la révélera
        let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
        if exists && !overwrite {
            info!(path = %path.display(), "File already exists");
            return DownloadOutcome::SkippedExisting { path };
        }

        if self.cancel.is_cancelled() {
            return DownloadOutcome::Failed {
                url: url.to_string(),
                error: DownloadError::Cancelled,
            };
        }

        info!(url = %url, path = %path.display(), "Start download");

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DownloadError::Cancelled),
            result = self.fetch(url, &path) => result,
        };

        match result {
            Ok(bytes) => {
                info!(url = %url, path = %path.display(), bytes = bytes, "Finish download");
                DownloadOutcome::Written { path, bytes }
            }
            Err(error) => {
                error!(
                    url = %url,
                    path = %path.display(),
                    "Error when download from URL: {}",
                    error
                );
                DownloadOutcome::Failed {
                    url: url.to_string(),
                    error,
                }
            }
        }
    }

    /// GET en streaming vers un fichier temporaire, renommé au succès
    async fn fetch(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DownloadError::Status(status));
        }

        let mut partial = PartialFile::create(path).await?;
        let mut bytes = 0u64;
        while let Some(chunk) = response.chunk().await? {
            partial.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        partial.commit().await?;

        Ok(bytes)
    }
}

/// Regroupe les URL par fichier local, groupes et URL dans l'ordre d'entrée
///
/// Une URL sans nom de fichier forme son propre groupe ; `download_one`
/// l'enregistre ensuite comme échec.
fn group_by_target<'a>(urls: &'a [String], destination: &Path) -> Vec<Vec<(usize, &'a str)>> {
    let mut groups: Vec<Vec<(usize, &'a str)>> = Vec::new();
    let mut by_target: HashMap<PathBuf, usize> = HashMap::new();

    for (index, url) in urls.iter().enumerate() {
        let Ok(path) = target_path(url, destination) else {
            groups.push(vec![(index, url.as_str())]);
            continue;
        };
        match by_target.get(&path) {
            Some(&group) => {
                warn!(url = %url, path = %path.display(), "Several URLs share the same local file");
                groups[group].push((index, url.as_str()));
            }
            None => {
                by_target.insert(path, groups.len());
                groups.push(vec![(index, url.as_str())]);
            }
        }
    }

    groups
}
