//! Téléchargement des pistes et albums
//!
//! Chaque appel est autonome : métadonnées, URL de streaming résolue juste
//! avant usage, flux vers un fichier temporaire voisin, couverture partagée
//! par l'album, tagging hors du chemin de transfert, renommage atomique.
//!
//! Les chemins sont dérivés du contenu : deux téléchargements concurrents de
//! la même piste se disputent le fichier temporaire — course connue et
//! acceptée (catalogue en lecture seule, noms déterministes), non verrouillée.
//!
//! Un échec de piste pendant un album est loggé et sauté : la réussite
//! partielle d'un album est la politique documentée.

use crate::artwork::{self, THUMB_FILENAME};
use crate::client::QobuzClient;
use crate::config::QobuzConfig;
use crate::error::{QobuzError, Result};
use crate::models::{Album, AudioFormat, Track};
use crate::tag;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

/// Callback de progression : (octets reçus, total ou 0 si inconnu, nom affiché)
pub type ProgressCallback = Arc<dyn Fn(u64, u64, &str) + Send + Sync>;

/// Métadonnées destinées au lecteur de l'interface appelante
#[derive(Debug, Clone)]
pub struct PlayerInfo {
    /// Titre complet de la piste
    pub title: String,
    /// Nom de l'interprète
    pub performer: String,
    /// Durée en secondes
    pub duration: u32,
    /// Chemin de la couverture, si téléchargée
    pub cover: Option<PathBuf>,
    /// Chemin de la miniature, si générée
    pub thumbnail: Option<PathBuf>,
    /// Dossier de l'album
    pub folder_path: PathBuf,
}

/// Résultat d'un téléchargement de piste
#[derive(Debug, Clone)]
pub struct DownloadedTrack {
    /// Chemin du fichier audio finalisé
    pub path: PathBuf,
    /// Chaîne d'information audio lisible ("FLAC Hi-Res 24-Bit / ...")
    pub caption: String,
    /// Métadonnées pour le lecteur
    pub player: PlayerInfo,
}

/// Téléchargeur de pistes et d'albums Qobuz
pub struct QobuzDownloader {
    /// Client API partagé
    client: Arc<QobuzClient>,
    /// Racine des téléchargements
    base_path: PathBuf,
    /// Qualité demandée (détermine aussi le conteneur et l'écrivain de tags)
    quality: AudioFormat,
    /// Client HTTP dédié au flux audio et aux couvertures : pas de timeout
    /// global, le budget dépend de la taille du fichier côté fournisseur
    http: reqwest::Client,
}

impl QobuzDownloader {
    /// Crée un téléchargeur ; la racine est créée si nécessaire
    pub fn new(
        client: Arc<QobuzClient>,
        base_path: impl Into<PathBuf>,
        quality: AudioFormat,
    ) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self {
            client,
            base_path,
            quality,
            http: reqwest::Client::new(),
        })
    }

    /// Crée un téléchargeur depuis la configuration
    pub fn from_config(client: Arc<QobuzClient>, config: &QobuzConfig) -> Result<Self> {
        Self::new(client, config.download_dir.clone(), config.format())
    }

    /// Nom de dossier d'un album : "Artiste - Album (Année)", nettoyé
    fn album_folder_name(album: &Album) -> String {
        tag::sanitize_filename(&format!(
            "{} - {} ({})",
            album.artist.name,
            album.title,
            album.year().unwrap_or("")
        ))
    }

    /// Nom de fichier d'une piste : "NN. Titre.ext", nettoyé
    fn track_filename(&self, track: &Track) -> String {
        tag::sanitize_filename(&format!(
            "{:02}. {}.{}",
            track.track_number,
            track.full_title(),
            self.quality.extension()
        ))
    }

    /// Télécharge une piste
    ///
    /// `album` évite un aller-retour quand le contexte album est déjà connu
    /// (téléchargement d'album) ; `folder` force le dossier de destination.
    ///
    /// Court-circuite avec succès si le fichier final existe déjà : aucun
    /// re-téléchargement, aucun re-tagging (le contenu est immuable par
    /// piste/qualité).
    pub async fn download_track(
        &self,
        track_id: &str,
        album: Option<&Album>,
        folder: Option<&Path>,
        progress: Option<ProgressCallback>,
    ) -> Result<DownloadedTrack> {
        let track = self.client.get_track(track_id).await?;
        let album = match album {
            Some(a) => a.clone(),
            None => track
                .album
                .as_deref()
                .cloned()
                .ok_or_else(|| QobuzError::NotFound(format!("no album for track {}", track_id)))?,
        };

        let folder_path = match folder {
            Some(f) => f.to_path_buf(),
            None => self.base_path.join(Self::album_folder_name(&album)),
        };
        let filename = self.track_filename(&track);
        let final_path = folder_path.join(&filename);

        if final_path.exists() {
            info!("File already exists: {}", filename);
            return Ok(self
                .already_downloaded(&track, &album, &folder_path, final_path)
                .await);
        }

        tokio::fs::create_dir_all(&folder_path).await?;

        // Couverture partagée par toutes les pistes du dossier
        let cover_path = artwork::download_cover(&self.http, &album.image, &folder_path).await;

        // L'URL de streaming expire vite : résolue juste avant le transfert
        let stream = self.client.get_file_url(track_id, self.quality).await?;
        let url = stream
            .url
            .ok_or_else(|| QobuzError::NoStreamAvailable(track_id.to_string()))?;

        let tmp_path = folder_path.join(format!("{}.tmp", filename));
        self.stream_to_file(&url, &tmp_path, &filename, progress.as_ref())
            .await?;

        // Miniature régénérée à chaque passe de tagging ; échec non fatal
        let thumbnail = match cover_path.clone() {
            Some(cover) => {
                match tokio::task::spawn_blocking(move || artwork::create_thumbnail(&cover)).await {
                    Ok(Ok(path)) => Some(path),
                    Ok(Err(e)) => {
                        warn!("Failed to create thumbnail: {}", e);
                        None
                    }
                    Err(e) => {
                        warn!("Thumbnail task failed: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        // Tagging hors du chemin de transfert ; ne démarre qu'une fois le flux
        // entièrement écrit. Un échec livre le fichier non taggé.
        self.tag_and_finalize(&tmp_path, &final_path, &track, &album, cover_path.clone())
            .await?;

        let caption = {
            let final_path = final_path.clone();
            let quality = self.quality;
            tokio::task::spawn_blocking(move || tag::audio_info(&final_path, quality))
                .await
                .unwrap_or_default()
        };

        Ok(DownloadedTrack {
            path: final_path,
            caption,
            player: PlayerInfo {
                title: track.full_title(),
                performer: album.artist.name.clone(),
                duration: track.duration,
                cover: cover_path,
                thumbnail,
                folder_path,
            },
        })
    }

    /// Télécharge un album complet, séquentiellement
    ///
    /// Une piste en échec est loggée et sautée ; les pistes sœurs sont
    /// quand même téléchargées.
    pub async fn download_album(
        &self,
        album_id: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<Vec<DownloadedTrack>> {
        let album = self.client.get_album(album_id).await?;
        let folder_path = self.base_path.join(Self::album_folder_name(&album));
        let tracks = album.tracks.as_ref().map(|p| p.items.clone()).unwrap_or_default();

        let mut downloaded = Vec::new();
        for track in &tracks {
            match self
                .download_track(&track.id, Some(&album), Some(&folder_path), progress.clone())
                .await
            {
                Ok(result) => downloaded.push(result),
                Err(e) => {
                    error!("Failed to download track {}: {}", track.title, e);
                }
            }
        }

        Ok(downloaded)
    }

    /// Résultat reconstruit sans réseau quand le fichier final existe déjà
    async fn already_downloaded(
        &self,
        track: &Track,
        album: &Album,
        folder_path: &Path,
        final_path: PathBuf,
    ) -> DownloadedTrack {
        let cover = folder_path.join(artwork::COVER_FILENAME);
        let thumbnail = folder_path.join(THUMB_FILENAME);
        // Lecture des propriétés audio hors de l'exécuteur, comme sur le
        // chemin de téléchargement
        let caption = {
            let path = final_path.clone();
            let quality = self.quality;
            tokio::task::spawn_blocking(move || tag::audio_info(&path, quality))
                .await
                .unwrap_or_default()
        };

        DownloadedTrack {
            path: final_path,
            caption,
            player: PlayerInfo {
                title: track.full_title(),
                performer: album.artist.name.clone(),
                duration: track.duration,
                cover: cover.exists().then_some(cover),
                thumbnail: thumbnail.exists().then_some(thumbnail),
                folder_path: folder_path.to_path_buf(),
            },
        }
    }

    /// Copie le corps HTTP vers le fichier temporaire, chunk par chunk
    ///
    /// Le callback de progression est invoqué après chaque chunk avec le
    /// total annoncé (0 si inconnu). Une erreur de transport laisse le
    /// fichier temporaire en place pour le nettoyage de l'appelant.
    async fn stream_to_file(
        &self,
        url: &str,
        tmp_path: &Path,
        display_name: &str,
        progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let total = response.content_length().unwrap_or(0);

        let mut file = tokio::fs::File::create(tmp_path).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            if let Some(cb) = progress {
                cb(downloaded, total, display_name);
            }
        }

        file.flush().await?;
        Ok(())
    }

    /// Applique l'écrivain de tags du format demandé puis finalise
    ///
    /// Un échec de tagging est dégradé en avertissement : le fichier est
    /// livré non taggé plutôt que perdu.
    async fn tag_and_finalize(
        &self,
        tmp_path: &Path,
        final_path: &Path,
        track: &Track,
        album: &Album,
        cover_path: Option<PathBuf>,
    ) -> Result<()> {
        let quality = self.quality;
        let (tmp, fin) = (tmp_path.to_path_buf(), final_path.to_path_buf());
        let (track, album) = (track.clone(), album.clone());

        let tagged = tokio::task::spawn_blocking(move || {
            tag::writer_for(quality).write(&tmp, &fin, &track, &album, cover_path.as_deref())
        })
        .await;

        match tagged {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!("Tagging failed, delivering untagged file: {}", e);
                tag::finalize(tmp_path, final_path)?;
                Ok(())
            }
            Err(e) => {
                warn!("Tagging task failed, delivering untagged file: {}", e);
                tag::finalize(tmp_path, final_path)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album_fixture(year: Option<&str>) -> Album {
        serde_json::from_value(serde_json::json!({
            "id": "a1",
            "title": "Kind of Blue",
            "artist": {"id": 72, "name": "Miles Davis"},
            "release_date_original": year,
        }))
        .unwrap()
    }

    #[test]
    fn test_album_folder_name() {
        let album = album_fixture(Some("1959-08-17"));
        assert_eq!(
            QobuzDownloader::album_folder_name(&album),
            "Miles Davis - Kind of Blue (1959)"
        );
    }

    #[test]
    fn test_album_folder_name_without_year() {
        let album = album_fixture(None);
        assert_eq!(
            QobuzDownloader::album_folder_name(&album),
            "Miles Davis - Kind of Blue ()"
        );
    }

    #[test]
    fn test_album_folder_name_is_stable() {
        let album = album_fixture(Some("1959-08-17"));
        let once = QobuzDownloader::album_folder_name(&album);
        assert_eq!(tag::sanitize_filename(&once), once);
    }
}
