//! Écriture des métadonnées dans les fichiers audio téléchargés
//!
//! Deux écrivains partagent le même contrat : recevoir le fichier temporaire,
//! le chemin final et les métadonnées track/album, produire un fichier taggé
//! finalisé (remplacement atomique du fichier final). L'écrivain est choisi
//! par le format audio demandé, jamais par inspection de l'extension.

pub mod flac;
pub mod id3;

use crate::error::Result;
use crate::models::{Album, AudioFormat, Track};
use lofty::file::AudioFile;
use lofty::probe::Probe;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Glyphe ℗ (phonogramme)
const PHON_COPYRIGHT: &str = "\u{2117}";
/// Glyphe ©
const COPYRIGHT: &str = "\u{00a9}";

/// Taille maximale d'un bloc METADATA_BLOCK_PICTURE FLAC (2^24 - 1)
pub(crate) const FLAC_MAX_BLOCKSIZE: u64 = 16_777_215;

/// Contrat commun des écrivains de tags
///
/// `write` tagge le fichier temporaire puis le finalise (remplacement du
/// fichier final existant et renommage atomique). En cas d'échec, le fichier
/// temporaire est laissé en place pour que l'appelant décide.
pub trait TagWriter {
    fn write(
        &self,
        tmp_path: &Path,
        final_path: &Path,
        track: &Track,
        album: &Album,
        cover_path: Option<&Path>,
    ) -> Result<()>;
}

/// Sélectionne l'écrivain correspondant au format demandé
pub fn writer_for(format: AudioFormat) -> Box<dyn TagWriter + Send + Sync> {
    match format {
        AudioFormat::Mp3_320 => Box::new(id3::Id3Writer),
        _ => Box::new(flac::FlacWriter),
    }
}

/// Remplace atomiquement le fichier final par le fichier temporaire
///
/// Supprime un éventuel fichier final préexistant puis renomme. Utilisé par
/// les écrivains après le tagging, et par le téléchargeur en repli quand le
/// tagging échoue (le fichier est livré non taggé plutôt que perdu).
pub fn finalize(tmp_path: &Path, final_path: &Path) -> std::io::Result<()> {
    if final_path.exists() {
        fs::remove_file(final_path)?;
    }
    fs::rename(tmp_path, final_path)
}

/// Substitue les glyphes (P)/(C) dans une chaîne de copyright
pub fn format_copyright(s: &str) -> String {
    s.replace("(P)", PHON_COPYRIGHT).replace("(C)", COPYRIGHT)
}

/// Normalise une liste de genres Qobuz
///
/// Les genres arrivent sous forme composée ("Pop/Rock→Rock") : découpe sur
/// les séparateurs, déduplique en préservant l'ordre, rejoint avec ", ".
pub fn format_genres(genres: &[String]) -> String {
    let mut seen: Vec<String> = Vec::new();
    for segment in genres.join("/").split(['/', '\u{2192}']) {
        if segment.is_empty() {
            continue;
        }
        if !seen.iter().any(|s| s == segment) {
            seen.push(segment.to_string());
        }
    }
    seen.join(", ")
}

/// Nettoie un nom de fichier pour le système de fichiers
///
/// Supprime les caractères invalides et les caractères de contrôle, puis
/// retire les points et espaces de fin. Déterministe et stable : appliquer
/// deux fois donne le même résultat.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') && !c.is_control())
        .collect();
    cleaned.trim_end_matches([' ', '.']).to_string()
}

/// Classifie un fichier sans perte : "Hi-Res" au-delà de 16 bits ou 48 kHz,
/// "CD" sinon
pub fn classify(bit_depth: u32, sample_rate: u32) -> &'static str {
    if bit_depth > 16 || sample_rate > 48_000 {
        "Hi-Res"
    } else {
        "CD"
    }
}

fn format_khz(sample_rate: u32) -> String {
    let khz = sample_rate as f64 / 1000.0;
    if khz.fract() == 0.0 {
        format!("{}", khz as u32)
    } else {
        format!("{}", khz)
    }
}

/// Produit la chaîne d'information audio du fichier final
///
/// Lue sur le fichier livré (pas sur les métadonnées du catalogue) :
/// format, classification Hi-Res/CD, profondeur, fréquence, débit. Le débit
/// est celui du flux si disponible, sinon estimé depuis la taille du fichier.
/// Une erreur de lecture n'est jamais fatale : chaîne vide.
pub fn audio_info(path: &Path, format: AudioFormat) -> String {
    let properties = match Probe::open(path).and_then(|p| p.read()) {
        Ok(tagged) => tagged.properties().clone(),
        Err(e) => {
            warn!("Failed to read audio properties from {}: {}", path.display(), e);
            return String::new();
        }
    };

    let duration_secs = properties.duration().as_secs_f64();
    let bitrate = properties.audio_bitrate().filter(|&b| b > 0).unwrap_or_else(|| {
        if duration_secs > 0.0 {
            let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            (size as f64 * 8.0 / duration_secs / 1000.0) as u32
        } else {
            0
        }
    });

    if format.is_lossless() {
        let bit_depth = properties.bit_depth().map(u32::from).unwrap_or(16);
        let sample_rate = properties.sample_rate().unwrap_or(44_100);
        format!(
            "FLAC {} {}-Bit / {} kHz / {} kbps",
            classify(bit_depth, sample_rate),
            bit_depth,
            format_khz(sample_rate),
            bitrate
        )
    } else {
        format!("MP3 {} kbps", bitrate)
    }
}

/// Nom de l'artiste d'une piste pour les tags : interprète, sinon artiste
/// de l'album passé en contexte
pub(crate) fn tag_artist<'a>(track: &'a Track, album: &'a Album) -> &'a str {
    track
        .performer
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or(album.artist.name.as_str())
}

/// Copyright d'une piste : celui de la piste, sinon celui de l'album
pub(crate) fn tag_copyright(track: &Track, album: &Album) -> String {
    let raw = track
        .copyright
        .as_deref()
        .or(album.copyright.as_deref())
        .unwrap_or("n/a");
    format_copyright(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sanitize_strips_invalid_chars() {
        assert_eq!(sanitize_filename("AC/DC: Live?"), "ACDC Live");
        assert_eq!(sanitize_filename("What <is> \"this\"*"), "What is this");
    }

    #[test]
    fn test_sanitize_is_fixed_point() {
        let inputs = [
            "Artist - Album (2020)",
            "Weird/Name: <with> everything?*.",
            "trailing dots...",
            "  plain  ",
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "not stable for {:?}", input);
        }
    }

    #[test]
    fn test_format_copyright_glyphs() {
        assert_eq!(
            format_copyright("(P) 2020 (C) Some Label"),
            "\u{2117} 2020 \u{a9} Some Label"
        );
        assert_eq!(format_copyright("n/a"), "n/a");
    }

    #[test]
    fn test_format_genres_dedup_and_split() {
        let genres = vec![
            "Pop/Rock\u{2192}Rock".to_string(),
            "Rock".to_string(),
            "Jazz".to_string(),
        ];
        assert_eq!(format_genres(&genres), "Pop, Rock, Jazz");
        assert_eq!(format_genres(&[]), "");
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(24, 44_100), "Hi-Res");
        assert_eq!(classify(16, 44_100), "CD");
        assert_eq!(classify(16, 48_000), "CD");
        assert_eq!(classify(16, 96_000), "Hi-Res");
    }

    #[test]
    fn test_format_khz() {
        assert_eq!(format_khz(44_100), "44.1");
        assert_eq!(format_khz(96_000), "96");
        assert_eq!(format_khz(192_000), "192");
    }

    #[test]
    fn test_finalize_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join("track.flac.tmp");
        let final_path = dir.path().join("track.flac");

        fs::File::create(&tmp).unwrap().write_all(b"new").unwrap();
        fs::File::create(&final_path).unwrap().write_all(b"old").unwrap();

        finalize(&tmp, &final_path).unwrap();
        assert!(!tmp.exists());
        assert_eq!(fs::read(&final_path).unwrap(), b"new");
    }

    #[test]
    fn test_audio_info_unreadable_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-audio.flac");
        fs::write(&path, b"garbage").unwrap();
        assert_eq!(audio_info(&path, AudioFormat::Flac_Lossless), "");
    }
}
