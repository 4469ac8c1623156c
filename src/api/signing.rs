//! Module de signature MD5 pour les requêtes Qobuz
//!
//! Certaines requêtes (notamment track/getFileUrl) exigent une signature MD5
//! horodatée incluant le secret applicatif. Chaque méthode signée possède son
//! propre gabarit littéral de chaîne canonique : ajouter une méthode revient à
//! ajouter une variante, jamais à modifier l'algorithme.

use md5::{Digest, Md5};
use std::time::{SystemTime, UNIX_EPOCH};

/// Signature éphémère d'une requête : timestamp Unix + digest hexadécimal.
/// Jamais persistée, invalide au-delà de la tolérance d'horloge du serveur.
#[derive(Debug, Clone)]
pub struct Signature {
    /// Timestamp Unix (paramètre `request_ts`)
    pub request_ts: String,
    /// Digest MD5 hexadécimal (paramètre `request_sig`)
    pub request_sig: String,
}

/// Appel API signé, avec les paramètres entrant dans la chaîne canonique
///
/// Les gabarits sont méthode-dépendants et figés : l'ordre des tokens n'est
/// PAS un tri alphabétique des paramètres.
#[derive(Debug, Clone, Copy)]
pub enum SignedCall<'a> {
    /// track/getFileUrl : `trackgetFileUrlformat_id{f}intent{i}track_id{t}`
    TrackGetFileUrl {
        format_id: &'a str,
        intent: &'a str,
        track_id: &'a str,
    },
    /// favorite/getUserFavorites : `favoritegetUserFavorites`
    FavoriteGetUserFavorites,
    /// Méthode inconnue : repli sur `{entity}{method}`
    Other { entity: &'a str, method: &'a str },
}

/// Génère un timestamp Unix actuel
///
/// # Returns
///
/// Timestamp Unix sous forme de string (entier, sans décimales)
pub fn get_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

/// Construit la chaîne canonique d'un appel signé
///
/// Concatène le gabarit de la méthode, le timestamp puis le secret.
fn canonical_string(call: &SignedCall<'_>, timestamp: &str, secret: &str) -> String {
    let prefix = match call {
        SignedCall::TrackGetFileUrl {
            format_id,
            intent,
            track_id,
        } => format!(
            "trackgetFileUrlformat_id{}intent{}track_id{}",
            format_id, intent, track_id
        ),
        SignedCall::FavoriteGetUserFavorites => "favoritegetUserFavorites".to_string(),
        SignedCall::Other { entity, method } => format!("{}{}", entity, method),
    };
    format!("{}{}{}", prefix, timestamp, secret)
}

/// Signe un appel avec un timestamp injecté
///
/// Déterministe : mêmes entrées + même timestamp ⇒ même digest. Les tests
/// utilisent cette fonction avec une horloge fixe.
///
/// # Returns
///
/// Digest MD5 hexadécimal (32 caractères, minuscules)
pub fn sign_at(call: &SignedCall<'_>, timestamp: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonical_string(call, timestamp, secret).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Signe un appel avec l'horloge murale
pub fn sign(call: &SignedCall<'_>, secret: &str) -> Signature {
    let request_ts = get_timestamp();
    let request_sig = sign_at(call, &request_ts, secret);
    Signature {
        request_ts,
        request_sig,
    }
}
