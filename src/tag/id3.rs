//! Écrivain de tags MP3 (trames de texte ID3v2 + image attachée unique)

use super::{TagWriter, finalize, format_genres, tag_artist, tag_copyright};
use crate::error::Result;
use crate::models::{Album, Track};
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Accessor, ItemKey, Tag, TagExt, TagType};
use std::fs;
use std::path::Path;

/// Écrivain avec perte : trames ID3v2 (écrites en v2.3 pour compatibilité)
pub struct Id3Writer;

impl TagWriter for Id3Writer {
    fn write(
        &self,
        tmp_path: &Path,
        final_path: &Path,
        track: &Track,
        album: &Album,
        cover_path: Option<&Path>,
    ) -> Result<()> {
        let mut tag = Tag::new(TagType::Id3v2);

        tag.set_title(track.full_title());
        tag.set_album(album.title.clone());
        tag.set_artist(tag_artist(track, album).to_string());
        tag.insert_text(ItemKey::AlbumArtist, album.artist.name.clone());
        // Numéro de piste combiné avec le total, et numéro de disque
        tag.set_track(track.track_number);
        tag.set_track_total(album.tracks_count);
        tag.set_disk(track.media_number);
        if let Some(ref date) = album.release_date_original {
            tag.insert_text(ItemKey::RecordingDate, date.clone());
            if date.len() >= 4 {
                tag.insert_text(ItemKey::Year, date[..4].to_string());
            }
        }
        tag.set_genre(format_genres(&album.genres_list));
        tag.insert_text(ItemKey::CopyrightMessage, tag_copyright(track, album));
        tag.insert_text(
            ItemKey::Label,
            album.label.as_ref().map(|l| l.name.clone()).unwrap_or_else(|| "n/a".to_string()),
        );

        // Image attachée unique : le remplacement complet du tag efface les
        // trames APIC existantes
        if let Some(cover) = cover_path {
            let data = fs::read(cover)?;
            tag.push_picture(Picture::new_unchecked(
                PictureType::CoverFront,
                Some(MimeType::Jpeg),
                Some(String::new()),
                data,
            ));
        }

        tag.save_to_path(tmp_path, WriteOptions::default().use_id3v23(true))?;
        finalize(tmp_path, final_path)?;
        Ok(())
    }
}
