//! Extraction dynamique de l'App ID et des secrets candidats
//!
//! Le bundle JavaScript public de Qobuz contient l'App ID et, dissimulés dans
//! des paires (seed, timezone) et (info, extras), les secrets applicatifs.
//! Ce module reproduit le protocole d'extraction :
//! 1. Récupère la page de login et en extrait l'URL du bundle versionné
//! 2. Télécharge le bundle
//! 3. Extrait l'App ID (9 chiffres) via regex
//! 4. Extrait les paires seed/timezone dans l'ordre du document
//! 5. Complète chaque timezone avec sa paire info/extras
//! 6. Concatène, retire le suffixe fixe de 44 caractères, décode en base64
//!
//! Les étapes d'analyse sont pures et testables sur un bundle capturé ; seule
//! la récupération du bundle touche le réseau. La validation empirique des
//! candidats (probe signée) est faite par `QobuzClient`.

use crate::error::{QobuzError, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, info, warn};

/// URL du site web public (page de login et bundle)
const WEB_BASE_URL: &str = "https://play.qobuz.com";

/// Longueur du suffixe fixe ajouté aux secrets encodés, à retirer avant décodage
const SECRET_SUFFIX_LEN: usize = 44;

/// Analyseur du bundle web public
pub struct Spoofer {
    /// Texte du bundle JavaScript
    bundle: String,
    seed_timezone_regex: Regex,
    app_id_regex: Regex,
    /// Gabarit de la regex info/extras, complété avec les timezones découvertes
    info_extras_template: &'static str,
}

impl Spoofer {
    /// Télécharge le bundle courant depuis la page de login publique
    pub async fn fetch(client: &reqwest::Client) -> Result<Self> {
        info!("Scraping Qobuz bundle for App ID and secrets");

        let login_page = client
            .get(format!("{}/login", WEB_BASE_URL))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let path = Self::bundle_path(&login_page)?;
        let bundle_url = format!("{}{}", WEB_BASE_URL, path);
        debug!("Fetching bundle from {}", bundle_url);

        let bundle = client
            .get(&bundle_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        debug!("Bundle downloaded ({} bytes)", bundle.len());
        Ok(Self::from_bundle(bundle))
    }

    /// Construit un analyseur depuis un bundle capturé (tests, rejeu hors ligne)
    pub fn from_bundle(bundle: impl Into<String>) -> Self {
        // Les regex sont littérales et valides, la compilation ne peut pas échouer
        let seed_timezone_regex = Regex::new(
            r#"[a-z]\.initialSeed\("(?P<seed>[\w=]+)",window\.utimezone\.(?P<timezone>[a-z]+)\)"#,
        )
        .unwrap();
        let app_id_regex =
            Regex::new(r#"production:\{api:\{appId:"(?P<app_id>\d{9})",appSecret:"\w{32}""#)
                .unwrap();

        Self {
            bundle: bundle.into(),
            seed_timezone_regex,
            app_id_regex,
            info_extras_template:
                r#"name:"\w+/(?P<timezone>{timezones})",info:"(?P<info>[\w=]+)",extras:"(?P<extras>[\w=]+)""#,
        }
    }

    /// Extrait le chemin du bundle versionné depuis la page de login
    pub fn bundle_path(login_page: &str) -> Result<String> {
        let bundle_url_regex = Regex::new(
            r#"<script src="(/resources/\d+\.\d+\.\d+-[a-z]\d{3}/bundle\.js)"></script>"#,
        )
        .unwrap();

        bundle_url_regex
            .captures(login_page)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| QobuzError::BundleParse("Could not find bundle URL".to_string()))
    }

    /// Extrait l'App ID (9 chiffres) depuis le bundle
    ///
    /// # Errors
    ///
    /// `QobuzError::BundleParse` si le motif est introuvable. Fatal : sans
    /// App ID, aucun appel à l'API n'est possible.
    pub fn app_id(&self) -> Result<String> {
        self.app_id_regex
            .captures(&self.bundle)
            .and_then(|cap| cap.name("app_id"))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| QobuzError::BundleParse("Could not find App ID in bundle".to_string()))
    }

    /// Extrait la liste ordonnée des secrets candidats
    ///
    /// La deuxième timezone rencontrée est replacée en tête : comportement
    /// empirique du service amont (son secret est le plus fiable), à
    /// préserver tel quel car il détermine quel candidat est essayé en
    /// premier. Les candidats non décodables sont ignorés sans erreur.
    pub fn candidate_secrets(&self) -> Vec<String> {
        // Étape 1 : paires seed/timezone dans l'ordre du document
        let mut raw: IndexMap<String, Vec<String>> = IndexMap::new();
        for captures in self.seed_timezone_regex.captures_iter(&self.bundle) {
            let (Some(seed), Some(timezone)) = (captures.name("seed"), captures.name("timezone"))
            else {
                continue;
            };
            // Une timezone revue remplace sa seed (dernière occurrence gagne),
            // sans changer sa position dans l'ordre du document
            raw.insert(
                timezone.as_str().to_string(),
                vec![seed.as_str().to_string()],
            );
        }

        debug!("Timezones found in bundle: {:?}", raw.keys().collect::<Vec<_>>());

        // Étape 2 : la deuxième timezone passe en tête
        if raw.len() > 1 {
            raw.move_index(1, 0);
        }

        // Étape 3 : regex info/extras limitée aux timezones découvertes
        let timezones_pattern = raw
            .keys()
            .map(|tz| capitalize(tz))
            .collect::<Vec<_>>()
            .join("|");
        let info_extras_regex = match Regex::new(
            &self
                .info_extras_template
                .replace("{timezones}", &timezones_pattern),
        ) {
            Ok(re) => re,
            Err(e) => {
                warn!("Failed to build info/extras regex: {}", e);
                return Vec::new();
            }
        };

        // Étape 4 : compléter chaque timezone avec info puis extras
        for captures in info_extras_regex.captures_iter(&self.bundle) {
            let (Some(tz), Some(info), Some(extras)) = (
                captures.name("timezone"),
                captures.name("info"),
                captures.name("extras"),
            ) else {
                continue;
            };
            if let Some(parts) = raw.get_mut(&tz.as_str().to_lowercase()) {
                parts.push(info.as_str().to_string());
                parts.push(extras.as_str().to_string());
            }
        }

        // Étape 5 : concaténer, retirer le suffixe fixe, décoder
        let mut secrets = Vec::new();
        for (timezone, parts) in raw {
            let concatenated = parts.concat();
            if concatenated.len() <= SECRET_SUFFIX_LEN {
                warn!("Secret payload for timezone {} too short, skipping", timezone);
                continue;
            }
            let trimmed = &concatenated[..concatenated.len() - SECRET_SUFFIX_LEN];
            match STANDARD
                .decode(trimmed)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
            {
                Some(secret) => secrets.push(secret),
                None => {
                    warn!("Secret payload for timezone {} is not decodable, skipping", timezone);
                }
            }
        }

        secrets
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Construit un bundle synthétique encodant `secrets` dans l'ordre donné.
    ///
    /// Chaque secret est encodé en base64 puis découpé en seed/info/extras,
    /// avec 44 caractères de bourrage appendus aux extras comme dans le
    /// bundle réel.
    fn bundle_with(app_id: Option<&str>, secrets: &[(&str, &str)]) -> String {
        let mut bundle = String::new();
        if let Some(id) = app_id {
            bundle.push_str(&format!(
                "production:{{api:{{appId:\"{}\",appSecret:\"{}\"",
                id,
                "a".repeat(32)
            ));
        }
        for (tz, secret) in secrets {
            let encoded = STANDARD.encode(secret);
            let seed = &encoded[..8];
            bundle.push_str(&format!(
                "g.initialSeed(\"{}\",window.utimezone.{})\n",
                seed, tz
            ));
        }
        for (tz, secret) in secrets {
            let encoded = STANDARD.encode(secret);
            let info = &encoded[8..20.min(encoded.len())];
            let extras = format!("{}{}", &encoded[20.min(encoded.len())..], "A".repeat(44));
            bundle.push_str(&format!(
                "name:\"q/{}\",info:\"{}\",extras:\"{}\"\n",
                capitalize(tz),
                info,
                extras
            ));
        }
        bundle
    }

    #[test]
    fn test_bundle_path() {
        let page = r#"<html><script src="/resources/7.1.2-b012/bundle.js"></script></html>"#;
        assert_eq!(
            Spoofer::bundle_path(page).unwrap(),
            "/resources/7.1.2-b012/bundle.js"
        );
    }

    #[test]
    fn test_bundle_path_missing() {
        assert!(matches!(
            Spoofer::bundle_path("<html></html>"),
            Err(QobuzError::BundleParse(_))
        ));
    }

    #[test]
    fn test_app_id_extraction() {
        let spoofer = Spoofer::from_bundle(bundle_with(Some("950096963"), &[]));
        assert_eq!(spoofer.app_id().unwrap(), "950096963");
    }

    #[test]
    fn test_app_id_missing_is_fatal() {
        let spoofer = Spoofer::from_bundle(bundle_with(None, &[("london", "whatever-secret!!")]));
        assert!(matches!(spoofer.app_id(), Err(QobuzError::BundleParse(_))));
    }

    #[test]
    fn test_second_timezone_comes_first() {
        // Propriété d'ordre : avec ≥ 2 timezones, le premier candidat est
        // le secret de la deuxième timezone rencontrée.
        let spoofer = Spoofer::from_bundle(bundle_with(
            Some("123456789"),
            &[
                ("london", "london-secret-0123456789abcdef"),
                ("berlin", "berlin-secret-0123456789abcdef"),
            ],
        ));
        let secrets = spoofer.candidate_secrets();
        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets[0], "berlin-secret-0123456789abcdef");
        assert_eq!(secrets[1], "london-secret-0123456789abcdef");
    }

    #[test]
    fn test_single_timezone_untouched() {
        let spoofer = Spoofer::from_bundle(bundle_with(
            None,
            &[("paris", "only-secret-0123456789abcdefgh")],
        ));
        let secrets = spoofer.candidate_secrets();
        assert_eq!(secrets, vec!["only-secret-0123456789abcdefgh".to_string()]);
    }

    #[test]
    fn test_undecodable_candidate_dropped() {
        // seed + info + bourrage : après retrait du suffixe il reste 6
        // caractères, longueur invalide en base64 standard — candidat ignoré.
        let mut bundle = bundle_with(None, &[("berlin", "berlin-secret-0123456789abcdef")]);
        bundle.push_str("g.initialSeed(\"AAAAA\",window.utimezone.tokyo)\n");
        bundle.push_str(&format!(
            "name:\"q/Tokyo\",info:\"B\",extras:\"{}\"\n",
            "A".repeat(44)
        ));

        let spoofer = Spoofer::from_bundle(bundle);
        let secrets = spoofer.candidate_secrets();
        // tokyo passe en tête (deuxième rencontrée) mais ne décode pas
        assert_eq!(secrets, vec!["berlin-secret-0123456789abcdef".to_string()]);
    }

    #[test]
    fn test_duplicate_timezone_keeps_last_seed() {
        // Une seed périmée précède la bonne pour la même timezone : seule la
        // dernière compte, sinon le payload concaténé serait corrompu
        let mut bundle = String::from("g.initialSeed(\"ZZZZZZZZ\",window.utimezone.berlin)\n");
        bundle.push_str(&bundle_with(
            None,
            &[("berlin", "berlin-secret-0123456789abcdef")],
        ));

        let spoofer = Spoofer::from_bundle(bundle);
        assert_eq!(
            spoofer.candidate_secrets(),
            vec!["berlin-secret-0123456789abcdef".to_string()]
        );
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let spoofer = Spoofer::from_bundle(bundle_with(
            Some("123456789"),
            &[
                ("london", "london-secret-0123456789abcdef"),
                ("berlin", "berlin-secret-0123456789abcdef"),
            ],
        ));
        assert_eq!(spoofer.candidate_secrets(), spoofer.candidate_secrets());
        assert_eq!(spoofer.app_id().unwrap(), spoofer.app_id().unwrap());
    }
}
