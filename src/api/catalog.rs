//! Module d'accès au catalogue Qobuz (albums, tracks, artistes, recherche)

use super::QobuzApi;
use super::signing::{self, SignedCall};
use crate::error::{QobuzError, Result};
use crate::models::*;
use anyhow::anyhow;
use tracing::debug;

/// Type de recherche dans le catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Album,
    Artist,
    Track,
}

impl SearchKind {
    /// Retourne le préfixe d'endpoint pour ce type
    pub fn api_id(&self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Track => "track",
        }
    }
}

/// Type de sortie pour la discographie d'un artiste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseType {
    Album,
    Live,
    Compilation,
    EpSingle,
}

impl ReleaseType {
    /// Retourne l'identifiant API pour ce type
    pub fn api_id(&self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Live => "live",
            Self::Compilation => "compilation",
            Self::EpSingle => "epSingle",
        }
    }
}

impl QobuzApi {
    /// Récupère les détails d'un album (avec ses pistes dans l'ordre catalogue)
    pub async fn get_album(&self, album_id: &str) -> Result<Album> {
        debug!("Fetching album {}", album_id);
        let params = [("album_id", album_id)];
        self.get("/album/get", &params).await
    }

    /// Récupère les détails d'une track
    pub async fn get_track(&self, track_id: &str) -> Result<Track> {
        debug!("Fetching track {}", track_id);
        let params = [("track_id", track_id)];
        self.get("/track/get", &params).await
    }

    /// Récupère les détails d'un artiste
    pub async fn get_artist(&self, artist_id: &str) -> Result<Artist> {
        debug!("Fetching artist {}", artist_id);
        let params = [("artist_id", artist_id)];
        self.get("/artist/get", &params).await
    }

    /// Récupère la discographie d'un artiste, triée par date de sortie
    pub async fn get_artist_releases(
        &self,
        artist_id: &str,
        release_type: ReleaseType,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Album>> {
        debug!(
            "Fetching releases for artist {} (type: {})",
            artist_id,
            release_type.api_id()
        );
        let limit = limit.to_string();
        let offset = offset.to_string();
        let params = [
            ("artist_id", artist_id),
            ("release_type", release_type.api_id()),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
            ("sort", "release_date"),
        ];
        self.get("/artist/getReleasesList", &params).await
    }

    /// Recherche dans le catalogue
    ///
    /// L'endpoint dépend du type recherché (`album/search`, `track/search`,
    /// `artist/search`) ; seul le champ correspondant du résultat est peuplé.
    pub async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
        offset: u32,
    ) -> Result<SearchResult> {
        debug!("Searching for '{}' (kind: {})", query, kind.api_id());
        let limit = limit.to_string();
        let offset = offset.to_string();
        let params = [
            ("query", query),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ];
        let endpoint = format!("/{}/search", kind.api_id());
        self.get(&endpoint, &params).await
    }

    /// Récupère l'URL de streaming d'une track
    ///
    /// La requête est signée avec le secret actif ; l'URL retournée n'est
    /// valide que quelques minutes et doit être consommée immédiatement,
    /// jamais mise en cache.
    ///
    /// # Errors
    ///
    /// Retourne une erreur de configuration si aucun secret n'est établi.
    pub async fn get_file_url(&self, track_id: &str, format: AudioFormat) -> Result<StreamInfo> {
        let secret = self.secret().ok_or_else(|| {
            QobuzError::Config(anyhow!(
                "No app secret configured, cannot sign track/getFileUrl"
            ))
        })?;

        debug!("Fetching file URL for track {} (format {})", track_id, format.id());

        let format_id = format.id().to_string();
        let signature = signing::sign(
            &SignedCall::TrackGetFileUrl {
                format_id: &format_id,
                intent: "stream",
                track_id,
            },
            secret,
        );

        // L'ordre des paramètres suit l'implémentation de référence
        let params = [
            ("request_ts", signature.request_ts.as_str()),
            ("request_sig", signature.request_sig.as_str()),
            ("track_id", track_id),
            ("format_id", format_id.as_str()),
            ("intent", "stream"),
        ];

        let mut info: StreamInfo = self.get("/track/getFileUrl", &params).await?;
        info.expires_at = chrono::Utc::now() + chrono::Duration::minutes(5);
        Ok(info)
    }

    /// Sonde un secret candidat contre une track de test connue
    ///
    /// Émet une requête track/getFileUrl signée avec `secret` et retourne le
    /// code de statut HTTP brut. L'interprétation (200/403 = secret accepté,
    /// 401 = ambigu, autre = candidat suivant) appartient à l'appelant.
    pub(crate) async fn probe_secret(&self, track_id: &str, secret: &str) -> Result<u16> {
        let format_id = AudioFormat::Mp3_320.id().to_string();
        let signature = signing::sign(
            &SignedCall::TrackGetFileUrl {
                format_id: &format_id,
                intent: "stream",
                track_id,
            },
            secret,
        );

        let params = [
            ("request_ts", signature.request_ts.as_str()),
            ("request_sig", signature.request_sig.as_str()),
            ("track_id", track_id),
            ("format_id", format_id.as_str()),
            ("intent", "stream"),
        ];

        let response = self.get_raw("/track/getFileUrl", &params).await?;
        Ok(response.status().as_u16())
    }
}
