//! Structures de données pour représenter les objets Qobuz

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Désérialiseur flexible pour les IDs qui peuvent être des strings ou des integers
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("ID must be a string or number")),
    }
}

/// Représente un artiste Qobuz (artiste principal, interprète ou compositeur)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    /// Identifiant unique de l'artiste
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    /// Nom de l'artiste
    pub name: String,
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Null => Ok(None),
        _ => Err(Error::custom("ID must be a string or number")),
    }
}

/// Label d'un album
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Label {
    /// Nom du label
    pub name: String,
}

/// URLs de la couverture d'un album à différentes résolutions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverImage {
    /// Petite résolution (typiquement 230px)
    #[serde(default)]
    pub small: Option<String>,
    /// Grande résolution (typiquement 600px)
    #[serde(default)]
    pub large: Option<String>,
    /// Vignette (typiquement 50px)
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Page de résultats paginée de l'API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: None,
            limit: None,
            offset: None,
        }
    }
}

/// Représente un album Qobuz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    /// Identifiant unique de l'album
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Titre de l'album
    pub title: String,
    /// Artiste principal de l'album
    pub artist: Artist,
    /// Label de l'album
    #[serde(default)]
    pub label: Option<Label>,
    /// Genres (chaînes composées, ex: "Pop/Rock→Rock")
    #[serde(default)]
    pub genres_list: Vec<String>,
    /// Date de sortie originale (format ISO, ex: "1959-08-17")
    #[serde(default)]
    pub release_date_original: Option<String>,
    /// Nombre de pistes
    #[serde(default)]
    pub tracks_count: u32,
    /// Copyright de l'album
    #[serde(default)]
    pub copyright: Option<String>,
    /// URLs de la couverture
    #[serde(default)]
    pub image: CoverImage,
    /// Pistes de l'album, dans l'ordre du catalogue (présentes sur /album/get)
    #[serde(default)]
    pub tracks: Option<Page<Track>>,
}

/// Représente une piste (track) Qobuz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Identifiant unique de la piste
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Titre de la piste
    pub title: String,
    /// Version (ex: "Remastered 2019"), suffixée au titre
    #[serde(default)]
    pub version: Option<String>,
    /// Œuvre classique (ex: "Symphonie n°9"), préfixée au titre
    #[serde(default)]
    pub work: Option<String>,
    /// Interprète de la piste (peut différer de l'artiste de l'album)
    #[serde(default)]
    pub performer: Option<Artist>,
    /// Compositeur
    #[serde(default)]
    pub composer: Option<Artist>,
    /// Durée en secondes
    #[serde(default)]
    pub duration: u32,
    /// Numéro de piste
    #[serde(default = "default_one")]
    pub track_number: u32,
    /// Numéro de disque (pour les albums multi-disques)
    #[serde(default = "default_one")]
    pub media_number: u32,
    /// Code ISRC
    #[serde(default)]
    pub isrc: Option<String>,
    /// Copyright de la piste
    #[serde(default)]
    pub copyright: Option<String>,
    /// Album contenant la piste (présent sur /track/get, jamais possédé)
    #[serde(default)]
    pub album: Option<Box<Album>>,
}

fn default_one() -> u32 {
    1
}

/// Résultats de recherche (un seul type est peuplé selon le endpoint interrogé)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// Albums trouvés
    #[serde(default)]
    pub albums: Page<Album>,
    /// Artistes trouvés
    #[serde(default)]
    pub artists: Page<Artist>,
    /// Pistes trouvées
    #[serde(default)]
    pub tracks: Page<Track>,
}

/// Informations de streaming retournées par track/getFileUrl
///
/// L'URL n'est valide que quelques minutes : elle doit être résolue juste
/// avant le téléchargement et ne jamais être mise en cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    /// URL de streaming (absente pour les démos ou contenus restreints)
    #[serde(default)]
    pub url: Option<String>,
    /// Type MIME
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Fréquence d'échantillonnage (kHz)
    #[serde(default)]
    pub sampling_rate: Option<f64>,
    /// Profondeur de bits
    #[serde(default)]
    pub bit_depth: Option<u32>,
    /// Format ID Qobuz
    #[serde(default)]
    pub format_id: Option<u8>,
    /// Date d'expiration estimée de l'URL
    #[serde(skip, default = "Utc::now")]
    pub expires_at: DateTime<Utc>,
}

/// Format audio demandé pour le streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum AudioFormat {
    /// MP3 320 kbps
    Mp3_320 = 5,
    /// FLAC 16 bit / 44.1 kHz (CD Quality)
    Flac_Lossless = 6,
    /// FLAC 24 bit / jusqu'à 96 kHz (Hi-Res)
    Flac_HiRes_96 = 7,
    /// FLAC 24 bit / jusqu'à 192 kHz (Hi-Res+)
    Flac_HiRes_192 = 27,
}

impl AudioFormat {
    /// Retourne l'ID du format pour l'API Qobuz
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Construit un format depuis son ID Qobuz
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            5 => Some(AudioFormat::Mp3_320),
            6 => Some(AudioFormat::Flac_Lossless),
            7 => Some(AudioFormat::Flac_HiRes_96),
            27 => Some(AudioFormat::Flac_HiRes_192),
            _ => None,
        }
    }

    /// Extension de fichier produite par ce format
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3_320 => "mp3",
            _ => "flac",
        }
    }

    /// Indique si le format est sans perte
    pub fn is_lossless(&self) -> bool {
        !matches!(self, AudioFormat::Mp3_320)
    }

    /// Retourne une description lisible du format
    pub fn description(&self) -> &'static str {
        match self {
            AudioFormat::Mp3_320 => "MP3 320 kbps",
            AudioFormat::Flac_Lossless => "FLAC 16 bit / 44.1 kHz",
            AudioFormat::Flac_HiRes_96 => "FLAC 24 bit / up to 96 kHz",
            AudioFormat::Flac_HiRes_192 => "FLAC 24 bit / up to 192 kHz",
        }
    }

    /// Retourne le type MIME associé
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3_320 => "audio/mpeg",
            _ => "audio/flac",
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        AudioFormat::Flac_Lossless
    }
}

impl Track {
    /// Titre complet : œuvre en préfixe, version en suffixe
    ///
    /// `work: Some("Sym. 9"), title: "Adagio", version: Some("Live")`
    /// donne `"Sym. 9: Adagio (Live)"`.
    pub fn full_title(&self) -> String {
        let mut title = self.title.clone();
        if let Some(ref version) = self.version {
            title = format!("{} ({})", title, version);
        }
        if let Some(ref work) = self.work {
            title = format!("{}: {}", work, title);
        }
        title
    }

    /// Nom de l'artiste à afficher : interprète, sinon artiste de l'album
    pub fn display_artist(&self) -> Option<&str> {
        self.performer
            .as_ref()
            .map(|p| p.name.as_str())
            .or_else(|| self.album.as_ref().map(|a| a.artist.name.as_str()))
    }
}

impl Album {
    /// Année de sortie extraite de la date originale
    pub fn year(&self) -> Option<&str> {
        self.release_date_original
            .as_deref()
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_title() {
        let mut track: Track = serde_json::from_value(serde_json::json!({
            "id": 123,
            "title": "Adagio",
        }))
        .unwrap();
        assert_eq!(track.full_title(), "Adagio");

        track.version = Some("Live".to_string());
        assert_eq!(track.full_title(), "Adagio (Live)");

        track.work = Some("Symphonie n°9".to_string());
        assert_eq!(track.full_title(), "Symphonie n°9: Adagio (Live)");
    }

    #[test]
    fn test_deserialize_numeric_id() {
        let track: Track = serde_json::from_value(serde_json::json!({
            "id": 5966783,
            "title": "So What",
            "duration": 545,
            "track_number": 1,
            "media_number": 1,
        }))
        .unwrap();
        assert_eq!(track.id, "5966783");
        assert_eq!(track.track_number, 1);
    }

    #[test]
    fn test_album_year() {
        let album: Album = serde_json::from_value(serde_json::json!({
            "id": "0060253705723",
            "title": "Kind of Blue",
            "artist": {"id": 72, "name": "Miles Davis"},
            "release_date_original": "1959-08-17",
        }))
        .unwrap();
        assert_eq!(album.year(), Some("1959"));
    }

    #[test]
    fn test_format_extension_mapping() {
        assert_eq!(AudioFormat::Mp3_320.extension(), "mp3");
        assert_eq!(AudioFormat::Flac_Lossless.extension(), "flac");
        assert_eq!(AudioFormat::Flac_HiRes_96.extension(), "flac");
        assert_eq!(AudioFormat::Flac_HiRes_192.extension(), "flac");
    }

    #[test]
    fn test_format_from_id() {
        assert_eq!(AudioFormat::from_id(5), Some(AudioFormat::Mp3_320));
        assert_eq!(AudioFormat::from_id(27), Some(AudioFormat::Flac_HiRes_192));
        assert_eq!(AudioFormat::from_id(42), None);
    }

    #[test]
    fn test_display_artist_fallback() {
        let track: Track = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "So What",
            "album": {
                "id": "a1",
                "title": "Kind of Blue",
                "artist": {"id": 72, "name": "Miles Davis"},
            },
        }))
        .unwrap();
        assert_eq!(track.display_artist(), Some("Miles Davis"));
    }
}
