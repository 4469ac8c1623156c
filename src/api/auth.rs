//! Module d'authentification pour l'API Qobuz

use super::QobuzApi;
use crate::error::{QobuzError, Result};
use serde::Deserialize;
use tracing::{debug, info};

/// Réponse de l'endpoint /user/login
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    user_auth_token: Option<String>,
    #[serde(default)]
    user: Option<UserInfo>,
}

/// Informations utilisateur retournées par l'API
#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    id: Option<String>,
    #[serde(default)]
    credential: Option<CredentialInfo>,
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    crate::models::deserialize_id(deserializer).map(Some)
}

/// Informations sur les credentials de l'utilisateur
#[derive(Debug, Deserialize)]
struct CredentialInfo {
    #[serde(default)]
    parameters: Option<CredentialParameters>,
}

/// Paramètres du niveau d'abonnement
#[derive(Debug, Deserialize)]
struct CredentialParameters {
    #[serde(default)]
    short_label: Option<String>,
}

/// Informations d'authentification obtenues au login
#[derive(Debug, Clone)]
pub struct AuthInfo {
    /// Token d'authentification longue durée
    pub token: String,
    /// ID utilisateur
    pub user_id: Option<String>,
    /// Label de l'abonnement (ex: "Studio", "Hi-Fi")
    pub subscription_label: Option<String>,
}

impl QobuzApi {
    /// Authentifie l'utilisateur avec email et mot de passe
    ///
    /// Échange les credentials (+ App ID) contre un token longue durée, qui
    /// est ensuite attaché à toutes les requêtes via X-User-Auth-Token.
    ///
    /// # Errors
    ///
    /// `QobuzError::Login` si le serveur ne retourne pas de token.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthInfo> {
        info!("Attempting to login to Qobuz as {}", email);

        let app_id = self.app_id().to_string();
        let params = [
            ("email", email),
            ("password", password),
            ("app_id", app_id.as_str()),
        ];

        let response: LoginResponse = self.get("/user/login", &params).await.map_err(|e| {
            // Un 401 au login signifie des credentials refusés
            match e {
                QobuzError::Unauthorized(msg) => QobuzError::Login(msg),
                other => other,
            }
        })?;

        let Some(token) = response.user_auth_token else {
            return Err(QobuzError::Login("no user_auth_token in response".to_string()));
        };

        let user_id = response.user.as_ref().and_then(|u| u.id.clone());
        let subscription_label = response
            .user
            .and_then(|u| u.credential)
            .and_then(|c| c.parameters)
            .and_then(|p| p.short_label);

        debug!(
            "Login successful - User ID: {:?}, Subscription: {:?}",
            user_id, subscription_label
        );

        self.set_auth_token(token.clone());

        Ok(AuthInfo {
            token,
            user_id,
            subscription_label,
        })
    }

    /// Vérifie si le client dispose d'un token d'authentification
    pub fn is_authenticated(&self) -> bool {
        self.auth_token().is_some()
    }
}
