//! Couche d'accès à l'API REST Qobuz
//!
//! Ce module fournit une interface bas-niveau pour communiquer avec l'API
//! Qobuz : en-têtes d'authentification, requêtes GET, traitement des erreurs.

pub mod auth;
pub mod catalog;
pub mod signing;
pub mod spoofer;

use crate::error::{QobuzError, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// URL de base de l'API Qobuz
const API_BASE_URL: &str = "https://www.qobuz.com/api.json/0.2";

/// User-Agent envoyé sur toutes les requêtes
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:83.0) Gecko/20100101 Firefox/83.0";

/// Client API bas-niveau pour communiquer avec Qobuz
pub struct QobuzApi {
    /// Client HTTP
    client: Client,
    /// URL de base (surchargée dans les tests)
    base_url: String,
    /// App ID pour l'authentification (header X-App-Id)
    app_id: String,
    /// Token d'authentification utilisateur (header X-User-Auth-Token)
    user_auth_token: Option<String>,
    /// Secret applicatif actif, établi une fois pendant l'initialisation
    secret: Option<String>,
}

impl QobuzApi {
    /// Crée une nouvelle instance de l'API
    pub fn new(app_id: impl Into<String>) -> Result<Self> {
        Self::with_base_url(app_id, API_BASE_URL)
    }

    /// Crée une instance pointant sur une URL de base arbitraire
    ///
    /// Utilisé par les tests d'intégration pour cibler un serveur mock.
    pub fn with_base_url(app_id: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            app_id: app_id.into(),
            user_auth_token: None,
            secret: None,
        })
    }

    /// Définit le token d'authentification
    pub fn set_auth_token(&mut self, token: String) {
        self.user_auth_token = Some(token);
    }

    /// Définit le secret applicatif actif
    ///
    /// Appelé une seule fois, pendant la phase d'initialisation du client
    /// haut-niveau. Le secret est traité comme immuable ensuite.
    pub fn set_secret(&mut self, secret: String) {
        self.secret = Some(secret);
    }

    /// Retourne l'App ID
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Retourne le token d'authentification si disponible
    pub fn auth_token(&self) -> Option<&str> {
        self.user_auth_token.as_deref()
    }

    /// Retourne le secret actif si disponible
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Effectue une requête GET à l'API
    ///
    /// Toutes les requêtes Qobuz sont des GET avec paramètres de query.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let response = self.get_raw(endpoint, params).await?;
        self.handle_response(response).await
    }

    /// Effectue une requête GET et retourne la réponse brute
    ///
    /// Utilisé par la sonde de validation des secrets, qui décide sur le code
    /// de statut seul sans interpréter le corps.
    pub(crate) async fn get_raw(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {} with {} params", url, params.len());

        let mut request = self.client.get(&url).header("X-App-Id", &self.app_id);
        if let Some(ref token) = self.user_auth_token {
            request = request.header("X-User-Auth-Token", token);
        }

        Ok(request.query(params).send().await?)
    }

    /// Traite la réponse HTTP
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let status_code = status.as_u16();

        debug!("Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("API error ({}): {}", status_code, error_text);
            return Err(QobuzError::from_status_code(status_code, error_text));
        }

        let text = response.text().await?;

        // Vérifier si la réponse contient une erreur Qobuz malgré le 2xx
        if let Ok(json) = serde_json::from_str::<Value>(&text) {
            if let Some(status_obj) = json.get("status") {
                if status_obj == "error" {
                    let message = json
                        .get("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("Unknown error");
                    warn!("Qobuz API error: {}", message);
                    return Err(QobuzError::ApiError {
                        code: status_code,
                        message: message.to_string(),
                    });
                }
            }
        }

        // Parser la réponse
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            QobuzError::JsonParse(e)
        })
    }
}
