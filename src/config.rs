//! Configuration du téléchargeur Qobuz
//!
//! Charge la configuration depuis un fichier YAML (par défaut sous le
//! répertoire de configuration utilisateur), puis applique les surcharges
//! d'environnement préfixées `QBZDL_`.

use crate::models::AudioFormat;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

/// Préfixe des variables d'environnement de surcharge
const ENV_PREFIX: &str = "QBZDL_";

/// Qualité par défaut : FLAC CD
fn default_quality() -> u8 {
    AudioFormat::Flac_Lossless.id()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

/// Configuration du client et du téléchargeur
///
/// Soit `email` + `password`, soit un `user_auth_token` déjà obtenu. Si
/// `app_id` et `app_secret` sont tous deux fournis, la découverte des secrets
/// est entièrement court-circuitée.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QobuzConfig {
    /// Email du compte Qobuz
    pub email: Option<String>,
    /// Mot de passe du compte Qobuz
    pub password: Option<String>,
    /// Token d'authentification déjà obtenu (alternative au login)
    pub user_auth_token: Option<String>,
    /// App ID pré-connu (sinon découvert depuis le bundle)
    pub app_id: Option<String>,
    /// Secret applicatif pré-connu (sinon découvert et validé)
    pub app_secret: Option<String>,
    /// Racine des téléchargements
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Qualité par défaut, comme format id Qobuz (5, 6, 7 ou 27)
    #[serde(default = "default_quality")]
    pub quality: u8,
}

impl Default for QobuzConfig {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            user_auth_token: None,
            app_id: None,
            app_secret: None,
            download_dir: default_download_dir(),
            quality: default_quality(),
        }
    }
}

impl QobuzConfig {
    /// Charge la configuration depuis le chemin donné, ou l'emplacement
    /// par défaut (`<config_dir>/qbzdl/config.yaml`)
    ///
    /// Un fichier absent donne la configuration par défaut ; les variables
    /// d'environnement sont appliquées dans tous les cas.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let text = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&text)?
        } else {
            Self::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Emplacement par défaut du fichier de configuration
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| anyhow!("No config directory available"))?;
        Ok(dir.join("qbzdl").join("config.yaml"))
    }

    /// Applique les surcharges d'environnement (QBZDL_EMAIL, QBZDL_QUALITY, ...)
    fn apply_env(&mut self) {
        let over =
            |key: &str| -> Option<String> { env::var(format!("{}{}", ENV_PREFIX, key)).ok() };

        if let Some(v) = over("EMAIL") {
            self.email = Some(v);
        }
        if let Some(v) = over("PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = over("USER_AUTH_TOKEN") {
            self.user_auth_token = Some(v);
        }
        if let Some(v) = over("APP_ID") {
            self.app_id = Some(v);
        }
        if let Some(v) = over("APP_SECRET") {
            self.app_secret = Some(v);
        }
        if let Some(v) = over("DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }
        if let Some(v) = over("QUALITY") {
            if let Ok(q) = v.parse() {
                self.quality = q;
            }
        }
    }

    /// Vérifie la cohérence de la configuration
    fn validate(&self) -> Result<()> {
        if AudioFormat::from_id(self.quality).is_none() {
            return Err(anyhow!(
                "Invalid quality {} (expected one of 5, 6, 7, 27)",
                self.quality
            ));
        }
        Ok(())
    }

    /// Format audio demandé
    pub fn format(&self) -> AudioFormat {
        // validate() garantit un id connu
        AudioFormat::from_id(self.quality).unwrap_or_default()
    }

    /// Indique si un couple email/mot de passe est disponible
    pub fn has_credentials(&self) -> bool {
        self.email.is_some() && self.password.is_some()
    }

    /// Indique si la découverte des secrets peut être court-circuitée
    pub fn has_app_keys(&self) -> bool {
        self.app_id.is_some() && self.app_secret.is_some()
    }
}
