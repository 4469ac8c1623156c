//! Gestion des erreurs pour le cœur de téléchargement Qobuz

use thiserror::Error;

/// Type Result personnalisé pour qbzdl
pub type Result<T> = std::result::Result<T, QobuzError>;

/// Erreurs possibles lors de l'utilisation du client et du téléchargeur
#[derive(Error, Debug)]
pub enum QobuzError {
    /// Le bundle web public n'a pas pu être analysé (App ID ou URL introuvable).
    /// Fatal : sans App ID, aucun appel à l'API n'est possible.
    #[error("Bundle parse error: {0}")]
    BundleParse(String),

    /// Aucun secret candidat n'a été accepté par le serveur
    #[error("Could not find a valid app secret")]
    NoValidSecret,

    /// Échec du login (email/mot de passe refusés)
    #[error("Login failed: {0}")]
    Login(String),

    /// Erreur d'authentification (credentials ou token invalides)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Ressource non trouvée (album, track, etc.)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Pas d'URL de streaming pour cette piste (démo ou contenu restreint)
    #[error("No download URL available for track {0}. It might be a demo or restricted.")]
    NoStreamAvailable(String),

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur d'entrée/sortie (fichiers temporaires, renommages)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de configuration (fichier YAML, valeurs invalides)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Erreur de l'API Qobuz (réponse non-2xx ou status "error")
    #[error("Qobuz API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    /// Quota dépassé (rate limiting)
    #[error("Rate limit exceeded, please try again later")]
    RateLimitExceeded,

    /// Échec d'écriture des tags (non fatal : le fichier est livré non taggé)
    #[error("Tagging error: {0}")]
    Tagging(String),

    /// Échec du téléchargement ou du traitement de la couverture (non fatal)
    #[error("Artwork error: {0}")]
    Artwork(String),
}

impl QobuzError {
    /// Crée une erreur API depuis un code de statut HTTP et un message
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            429 => Self::RateLimitExceeded,
            _ => Self::ApiError {
                code,
                message: message.into(),
            },
        }
    }

    /// Vérifie si l'erreur est une erreur de credentials (401/403)
    pub fn is_auth_error(&self) -> bool {
        matches!(self, QobuzError::Unauthorized(_))
    }

    /// Vérifie si l'erreur est non fatale au niveau d'une piste
    /// (le fichier est quand même livré, sans tags ou sans couverture)
    pub fn is_warning(&self) -> bool {
        matches!(self, QobuzError::Tagging(_) | QobuzError::Artwork(_))
    }
}

impl From<lofty::error::LoftyError> for QobuzError {
    fn from(e: lofty::error::LoftyError) -> Self {
        QobuzError::Tagging(e.to_string())
    }
}

impl From<image::ImageError> for QobuzError {
    fn from(e: image::ImageError) -> Self {
        QobuzError::Artwork(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_code() {
        assert!(matches!(
            QobuzError::from_status_code(401, "bad token"),
            QobuzError::Unauthorized(_)
        ));
        assert!(matches!(
            QobuzError::from_status_code(404, "nope"),
            QobuzError::NotFound(_)
        ));
        assert!(matches!(
            QobuzError::from_status_code(429, ""),
            QobuzError::RateLimitExceeded
        ));
        assert!(matches!(
            QobuzError::from_status_code(400, "Invalid Request Signature parameter"),
            QobuzError::ApiError { code: 400, .. }
        ));
    }

    #[test]
    fn test_is_warning() {
        assert!(QobuzError::Tagging("x".into()).is_warning());
        assert!(QobuzError::Artwork("x".into()).is_warning());
        assert!(!QobuzError::NoValidSecret.is_warning());
    }
}
