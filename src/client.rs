//! Client principal pour interagir avec l'API Qobuz
//!
//! Ce module fournit un client haut-niveau : phase d'initialisation
//! (découverte de l'App ID et des secrets, authentification, validation
//! empirique du secret actif), puis accès au catalogue avec cache.
//!
//! Le secret actif est établi une seule fois pendant `connect` et porté par
//! l'instance — jamais un état global du processus.

use crate::api::QobuzApi;
use crate::api::auth::AuthInfo;
use crate::api::catalog::{ReleaseType, SearchKind};
use crate::api::spoofer::Spoofer;
use crate::cache::QobuzCache;
use crate::config::QobuzConfig;
use crate::error::{QobuzError, Result};
use crate::models::*;
use tracing::{debug, info, warn};

/// Track publique connue servant de cible aux sondes de validation des secrets
const PROBE_TRACK_ID: &str = "5966783";

/// Client Qobuz haut-niveau avec cache de métadonnées
pub struct QobuzClient {
    /// API bas-niveau
    api: QobuzApi,
    /// Cache en mémoire
    cache: QobuzCache,
    /// Informations d'authentification (absentes en mode token pré-fourni)
    auth_info: Option<AuthInfo>,
}

/// Détermine quel secret candidat est actuellement accepté par le serveur
///
/// Émet une sonde track/getFileUrl signée avec chaque candidat, dans l'ordre,
/// contre une track de test publique :
/// - 200 ou 403 : le secret est accepté (403 signifie seulement que le
///   contenu ou le compte n'a pas accès à cette track précise) ;
/// - 401 : ambigu — le token, pas forcément le secret, peut être en cause.
///   Loggé, non disqualifiant, on passe au candidat suivant ;
/// - tout autre statut (typiquement 400, signature invalide) : candidat
///   suivant.
///
/// Dépendante du réseau, cette étape est exclue des tests unitaires
/// déterministes ; les étapes d'analyse du bundle sont testées à part.
///
/// # Errors
///
/// `QobuzError::NoValidSecret` si aucun candidat n'aboutit.
pub async fn find_active_secret(api: &QobuzApi, candidates: &[String]) -> Result<String> {
    for secret in candidates {
        if secret.is_empty() {
            continue;
        }
        let status = match api.probe_secret(PROBE_TRACK_ID, secret).await {
            Ok(status) => status,
            Err(e) => {
                debug!("Secret probe transport error: {}", e);
                continue;
            }
        };
        match status {
            200 | 403 => {
                info!("Found active secret");
                return Ok(secret.clone());
            }
            401 => {
                warn!(
                    "Token unauthorized during secret check. \
                     Secret might be valid but token is rejected."
                );
            }
            other => {
                debug!("Secret rejected with status {}", other);
            }
        }
    }
    Err(QobuzError::NoValidSecret)
}

impl QobuzClient {
    /// Initialise un client depuis la configuration
    ///
    /// Phase d'initialisation :
    /// 1. App ID et secrets candidats : pré-configurés, sinon extraits du
    ///    bundle web public ;
    /// 2. Authentification : token pré-fourni, sinon login email/mot de
    ///    passe — l'échec du login n'est fatal que parce qu'aucune
    ///    alternative n'existe alors ;
    /// 3. Secret actif : validé empiriquement parmi les candidats, sauf si
    ///    pré-configuré (rien à prouver) ; le chemin login valide toujours.
    pub async fn connect(config: &QobuzConfig) -> Result<Self> {
        // 1. App ID + candidats
        let (app_id, candidates) = if config.has_app_keys() {
            let app_id = config.app_id.clone().unwrap_or_default();
            let secret = config.app_secret.clone().unwrap_or_default();
            info!("Using provided App ID: {}", app_id);
            (app_id, vec![secret])
        } else {
            let http = reqwest::Client::new();
            let spoofer = Spoofer::fetch(&http).await?;
            let app_id = spoofer.app_id()?;
            let candidates = spoofer.candidate_secrets();
            info!(
                "Initialized from bundle with App ID {} ({} secret candidates)",
                app_id,
                candidates.len()
            );
            (app_id, candidates)
        };

        let api = QobuzApi::new(app_id)?;
        Self::initialize(api, config, candidates).await
    }

    /// Variante de `connect` ciblant une URL de base arbitraire
    ///
    /// Réservée aux tests d'intégration (serveur mock). La découverte via le
    /// bundle web n'est pas disponible sur ce chemin : l'App ID doit être
    /// fourni par la configuration.
    pub async fn connect_with_base_url(config: &QobuzConfig, base_url: &str) -> Result<Self> {
        let app_id = config.app_id.clone().unwrap_or_default();
        let candidates = config.app_secret.clone().map(|s| vec![s]).unwrap_or_default();
        let api = QobuzApi::with_base_url(app_id, base_url)?;
        Self::initialize(api, config, candidates).await
    }

    async fn initialize(
        mut api: QobuzApi,
        config: &QobuzConfig,
        candidates: Vec<String>,
    ) -> Result<Self> {
        // 2. Authentification
        let mut auth_info = None;
        // Un secret pré-configuré dispense de la sonde, sauf sur le chemin
        // login qui valide toujours après obtention du token
        let mut probe_needed = !config.has_app_keys();

        if let Some(ref token) = config.user_auth_token {
            info!("Using provided user auth token");
            api.set_auth_token(token.clone());
        } else if config.has_credentials() {
            let email = config.email.as_deref().unwrap_or_default();
            let password = config.password.as_deref().unwrap_or_default();
            auth_info = Some(api.login(email, password).await?);
            probe_needed = true;
        } else {
            info!("No credentials supplied, continuing unauthenticated");
        }

        // 3. Secret actif
        let active_secret = if probe_needed {
            find_active_secret(&api, &candidates).await?
        } else {
            candidates.into_iter().next().unwrap_or_default()
        };
        api.set_secret(active_secret);

        Ok(Self {
            api,
            cache: QobuzCache::new(),
            auth_info,
        })
    }

    /// Retourne les informations d'authentification du login
    pub fn auth_info(&self) -> Option<&AuthInfo> {
        self.auth_info.as_ref()
    }

    /// Accès à l'API bas-niveau
    pub fn api(&self) -> &QobuzApi {
        &self.api
    }

    // ============ Catalogue ============

    /// Récupère un album par son ID
    pub async fn get_album(&self, album_id: &str) -> Result<Album> {
        if let Some(album) = self.cache.get_album(album_id).await {
            debug!("Album {} found in cache", album_id);
            return Ok(album);
        }

        let album = self.api.get_album(album_id).await?;
        self.cache.put_album(album_id.to_string(), album.clone()).await;
        Ok(album)
    }

    /// Récupère une track par son ID
    pub async fn get_track(&self, track_id: &str) -> Result<Track> {
        if let Some(track) = self.cache.get_track(track_id).await {
            debug!("Track {} found in cache", track_id);
            return Ok(track);
        }

        let track = self.api.get_track(track_id).await?;
        self.cache.put_track(track_id.to_string(), track.clone()).await;
        Ok(track)
    }

    /// Récupère un artiste par son ID
    pub async fn get_artist(&self, artist_id: &str) -> Result<Artist> {
        self.api.get_artist(artist_id).await
    }

    /// Récupère la discographie d'un artiste, triée par date de sortie
    pub async fn get_artist_releases(
        &self,
        artist_id: &str,
        release_type: ReleaseType,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Album>> {
        self.api
            .get_artist_releases(artist_id, release_type, limit, offset)
            .await
    }

    /// Recherche dans le catalogue Qobuz
    pub async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
        offset: u32,
    ) -> Result<SearchResult> {
        let cache_key = format!("{}:{}:{}:{}", kind.api_id(), query, limit, offset);

        if let Some(result) = self.cache.get_search(&cache_key).await {
            debug!("Search results for '{}' found in cache", query);
            return Ok(result);
        }

        let result = self.api.search(query, kind, limit, offset).await?;
        self.cache.put_search(cache_key, result.clone()).await;
        Ok(result)
    }

    /// Résout l'URL de streaming d'une track
    ///
    /// Jamais mise en cache : l'URL expire en quelques minutes et doit être
    /// résolue immédiatement avant le téléchargement.
    pub async fn get_file_url(&self, track_id: &str, format: AudioFormat) -> Result<StreamInfo> {
        self.api.get_file_url(track_id, format).await
    }
}
