//! Cache en mémoire pour les métadonnées Qobuz
//!
//! Cache avec TTL pour minimiser les requêtes à l'API. Seules les métadonnées
//! (albums, tracks, recherches) sont cachées : les URLs de streaming expirent
//! en quelques minutes et doivent être résolues juste avant usage, jamais
//! mises en cache.

use crate::models::{Album, SearchResult, Track};
use moka::future::Cache as MokaCache;
use std::sync::Arc;
use std::time::Duration;

/// Cache des métadonnées Qobuz
#[derive(Clone)]
pub struct QobuzCache {
    /// Cache des albums (TTL: 1 heure)
    albums: Arc<MokaCache<String, Album>>,
    /// Cache des tracks (TTL: 1 heure)
    tracks: Arc<MokaCache<String, Track>>,
    /// Cache des résultats de recherche (TTL: 15 minutes)
    searches: Arc<MokaCache<String, SearchResult>>,
}

impl QobuzCache {
    /// Crée un nouveau cache avec les paramètres par défaut
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Crée un nouveau cache avec une capacité spécifique
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            albums: Arc::new(
                MokaCache::builder()
                    .max_capacity(max_capacity)
                    .time_to_live(Duration::from_secs(3600))
                    .build(),
            ),
            tracks: Arc::new(
                MokaCache::builder()
                    .max_capacity(max_capacity)
                    .time_to_live(Duration::from_secs(3600))
                    .build(),
            ),
            searches: Arc::new(
                MokaCache::builder()
                    .max_capacity(max_capacity)
                    .time_to_live(Duration::from_secs(900))
                    .build(),
            ),
        }
    }

    /// Récupère un album depuis le cache
    pub async fn get_album(&self, album_id: &str) -> Option<Album> {
        self.albums.get(album_id).await
    }

    /// Met un album en cache
    pub async fn put_album(&self, album_id: String, album: Album) {
        self.albums.insert(album_id, album).await;
    }

    /// Récupère une track depuis le cache
    pub async fn get_track(&self, track_id: &str) -> Option<Track> {
        self.tracks.get(track_id).await
    }

    /// Met une track en cache
    pub async fn put_track(&self, track_id: String, track: Track) {
        self.tracks.insert(track_id, track).await;
    }

    /// Récupère un résultat de recherche depuis le cache
    pub async fn get_search(&self, key: &str) -> Option<SearchResult> {
        self.searches.get(key).await
    }

    /// Met un résultat de recherche en cache
    pub async fn put_search(&self, key: String, result: SearchResult) {
        self.searches.insert(key, result).await;
    }
}

impl Default for QobuzCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> Track {
        serde_json::from_value(serde_json::json!({
            "id": 5966783,
            "title": "So What",
            "duration": 545,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_track_roundtrip() {
        let cache = QobuzCache::new();
        assert!(cache.get_track("5966783").await.is_none());

        cache.put_track("5966783".to_string(), sample_track()).await;
        let cached = cache.get_track("5966783").await.unwrap();
        assert_eq!(cached.title, "So What");
    }

    #[tokio::test]
    async fn test_missing_album() {
        let cache = QobuzCache::new();
        assert!(cache.get_album("nope").await.is_none());
    }
}
