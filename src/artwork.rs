//! Couvertures d'albums et miniatures
//!
//! La couverture est téléchargée une seule fois par dossier d'album
//! (`cover.jpg`) via une chaîne de repli ordonnée : variante "résolution
//! originale" devinée, puis grande, puis petite. La miniature (`thumb.jpg`)
//! est régénérée à chaque piste depuis la couverture. Aucun échec ici n'est
//! fatal : la piste est livrée sans image.

use crate::error::{QobuzError, Result};
use crate::models::CoverImage;
use image::codecs::jpeg::JpegEncoder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Nom du fichier de couverture partagé par toutes les pistes de l'album
pub const COVER_FILENAME: &str = "cover.jpg";
/// Nom du fichier de miniature, régénéré à chaque piste
pub const THUMB_FILENAME: &str = "thumb.jpg";

/// Budget de temps par tentative de couverture
const COVER_TIMEOUT: Duration = Duration::from_secs(10);
/// Côté maximal de la miniature
const THUMB_MAX_SIZE: u32 = 320;
/// Qualité JPEG de la miniature
const THUMB_JPEG_QUALITY: u8 = 90;

/// Construit la liste ordonnée des URLs candidates pour la couverture
///
/// La variante originale est devinée depuis l'URL 600px ; viennent ensuite
/// la grande puis la petite résolution. Les URLs absentes sont omises.
pub fn candidate_urls(image: &CoverImage) -> Vec<String> {
    let mut urls = Vec::new();
    if let Some(ref large) = image.large {
        urls.push(large.replace("_600.jpg", "_org.jpg"));
        urls.push(large.clone());
    }
    if let Some(ref small) = image.small {
        urls.push(small.clone());
    }
    urls
}

/// Télécharge la couverture de l'album dans le dossier donné
///
/// Une couverture déjà présente est réutilisée telle quelle. Chaque URL est
/// essayée par un GET complet (pas de sonde HEAD) ; la première réponse 200
/// gagne. L'échec de toutes les candidates est loggé et retourne `None`.
pub async fn download_cover(
    client: &reqwest::Client,
    image: &CoverImage,
    folder: &Path,
) -> Option<PathBuf> {
    let cover_path = folder.join(COVER_FILENAME);
    if cover_path.exists() {
        return Some(cover_path);
    }

    for url in candidate_urls(image) {
        let response = match client.get(&url).timeout(COVER_TIMEOUT).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("Failed to download cover from {}: {}", url, e);
                continue;
            }
        };
        if response.status().as_u16() != 200 {
            debug!("Cover candidate {} returned {}", url, response.status());
            continue;
        }
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                debug!("Failed to read cover body from {}: {}", url, e);
                continue;
            }
        };
        if let Err(e) = tokio::fs::write(&cover_path, &bytes).await {
            warn!("Failed to write cover to {}: {}", cover_path.display(), e);
            return None;
        }
        info!("Downloaded cover art: {}", url);
        return Some(cover_path);
    }

    warn!("Failed to download any cover art");
    None
}

/// Génère la miniature 320×320 de la couverture
///
/// Redimensionne en conservant les proportions, ré-encode en JPEG qualité 90.
/// Une miniature périmée au même chemin est supprimée d'abord. Opération CPU,
/// à exécuter hors du chemin de transfert (spawn_blocking).
pub fn create_thumbnail(cover_path: &Path) -> Result<PathBuf> {
    let folder = cover_path
        .parent()
        .ok_or_else(|| QobuzError::Artwork("cover path has no parent".to_string()))?;
    let thumb_path = folder.join(THUMB_FILENAME);

    if thumb_path.exists() {
        let _ = fs::remove_file(&thumb_path);
    }

    let img = image::open(cover_path)?;
    let thumb = img.thumbnail(THUMB_MAX_SIZE, THUMB_MAX_SIZE).to_rgb8();

    let mut out = fs::File::create(&thumb_path)?;
    thumb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, THUMB_JPEG_QUALITY))?;

    debug!("Created thumbnail: {}", thumb_path.display());
    Ok(thumb_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_candidate_urls_order() {
        let image = CoverImage {
            small: Some("https://img/230.jpg".to_string()),
            large: Some("https://img/abc_600.jpg".to_string()),
            thumbnail: None,
        };
        assert_eq!(
            candidate_urls(&image),
            vec![
                "https://img/abc_org.jpg".to_string(),
                "https://img/abc_600.jpg".to_string(),
                "https://img/230.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_candidate_urls_missing_entries() {
        let image = CoverImage {
            small: Some("https://img/230.jpg".to_string()),
            large: None,
            thumbnail: None,
        };
        assert_eq!(candidate_urls(&image), vec!["https://img/230.jpg".to_string()]);
        assert!(candidate_urls(&CoverImage::default()).is_empty());
    }

    #[test]
    fn test_create_thumbnail_preserves_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join(COVER_FILENAME);
        RgbImage::new(640, 480).save(&cover).unwrap();

        let thumb_path = create_thumbnail(&cover).unwrap();
        let thumb = image::open(&thumb_path).unwrap();
        assert_eq!(thumb.width(), 320);
        assert_eq!(thumb.height(), 240);
    }

    #[test]
    fn test_create_thumbnail_replaces_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join(COVER_FILENAME);
        RgbImage::new(100, 100).save(&cover).unwrap();

        let stale = dir.path().join(THUMB_FILENAME);
        fs::write(&stale, b"stale garbage").unwrap();

        let thumb_path = create_thumbnail(&cover).unwrap();
        assert_eq!(thumb_path, stale);
        // La miniature régénérée est une image valide
        assert!(image::open(&thumb_path).is_ok());
    }

    #[test]
    fn test_create_thumbnail_invalid_cover() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join(COVER_FILENAME);
        fs::write(&cover, b"not an image").unwrap();
        assert!(matches!(
            create_thumbnail(&cover),
            Err(QobuzError::Artwork(_))
        ));
    }
}
