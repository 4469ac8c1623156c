//! Écrivain de tags FLAC (Vorbis comments + bloc image unique)

use super::{FLAC_MAX_BLOCKSIZE, TagWriter, finalize, format_genres, tag_artist, tag_copyright};
use crate::error::Result;
use crate::models::{Album, Track};
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Accessor, ItemKey, Tag, TagExt, TagType};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Écrivain sans perte : Vorbis comments
pub struct FlacWriter;

/// Vérifie que l'image tient dans un bloc METADATA_BLOCK_PICTURE
///
/// La taille d'un bloc FLAC est codée sur 24 bits : une image plus grosse
/// est refusée (avertissement, pas d'échec — la piste est livrée sans image).
pub(super) fn cover_embeddable(cover_path: &Path) -> bool {
    match fs::metadata(cover_path) {
        Ok(meta) if meta.len() > FLAC_MAX_BLOCKSIZE => {
            warn!("Cover size too large for FLAC embedding, skipping");
            false
        }
        Ok(_) => true,
        Err(e) => {
            warn!("Cannot read cover {}: {}", cover_path.display(), e);
            false
        }
    }
}

impl TagWriter for FlacWriter {
    fn write(
        &self,
        tmp_path: &Path,
        final_path: &Path,
        track: &Track,
        album: &Album,
        cover_path: Option<&Path>,
    ) -> Result<()> {
        let mut tag = Tag::new(TagType::VorbisComments);

        tag.set_title(track.full_title());
        tag.set_track(track.track_number);
        tag.set_disk(track.media_number);
        tag.set_track_total(album.tracks_count);
        if let Some(ref composer) = track.composer {
            tag.insert_text(ItemKey::Composer, composer.name.clone());
        }
        tag.set_artist(tag_artist(track, album).to_string());
        tag.insert_text(ItemKey::AlbumArtist, album.artist.name.clone());
        tag.insert_text(
            ItemKey::Label,
            album.label.as_ref().map(|l| l.name.clone()).unwrap_or_else(|| "n/a".to_string()),
        );
        tag.set_genre(format_genres(&album.genres_list));
        tag.set_album(album.title.clone());
        if let Some(ref date) = album.release_date_original {
            tag.insert_text(ItemKey::RecordingDate, date.clone());
        }
        tag.insert_text(ItemKey::CopyrightMessage, tag_copyright(track, album));

        // Image unique : le tag est écrit en remplacement complet, ce qui
        // efface toute image précédemment attachée
        if let Some(cover) = cover_path {
            if cover_embeddable(cover) {
                let data = fs::read(cover)?;
                tag.push_picture(Picture::new_unchecked(
                    PictureType::CoverFront,
                    Some(MimeType::Jpeg),
                    Some("cover".to_string()),
                    data,
                ));
            }
        }

        tag.save_to_path(tmp_path, WriteOptions::default())?;
        finalize(tmp_path, final_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QobuzError;

    fn sample_track() -> Track {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "So What",
            "track_number": 1,
            "media_number": 1,
        }))
        .unwrap()
    }

    fn sample_album() -> Album {
        serde_json::from_value(serde_json::json!({
            "id": "a1",
            "title": "Kind of Blue",
            "artist": {"id": 72, "name": "Miles Davis"},
            "tracks_count": 5,
        }))
        .unwrap()
    }

    #[test]
    fn test_oversized_cover_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join("cover.jpg");
        let file = fs::File::create(&cover).unwrap();
        file.set_len(FLAC_MAX_BLOCKSIZE + 1).unwrap();
        assert!(!cover_embeddable(&cover));

        file.set_len(1024).unwrap();
        assert!(cover_embeddable(&cover));
    }

    #[test]
    fn test_unparseable_file_fails_and_keeps_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join("track.flac.tmp");
        let final_path = dir.path().join("track.flac");
        fs::write(&tmp, b"not a flac stream").unwrap();

        let result = FlacWriter.write(&tmp, &final_path, &sample_track(), &sample_album(), None);
        assert!(matches!(result, Err(QobuzError::Tagging(_))));
        // Le fichier temporaire reste pour le repli de l'appelant
        assert!(tmp.exists());
        assert!(!final_path.exists());
    }
}
