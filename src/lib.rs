//! # qbzdl - Cœur de téléchargement Qobuz
//!
//! Cette crate fournit un client Rust pour l'API Qobuz et une chaîne de
//! téléchargement complète : découverte des secrets applicatifs,
//! authentification, résolution des URLs de streaming, téléchargement des
//! pistes et des couvertures, écriture des tags.
//!
//! ## Vue d'ensemble
//!
//! - Découverte sans configuration préalable de l'App ID et du secret actif
//!   depuis le bundle web public (avec validation empirique par sonde signée)
//! - Signature MD5 horodatée des requêtes qui l'exigent (track/getFileUrl)
//! - Accès au catalogue (recherche, albums, tracks, artistes, discographies)
//!   avec cache en mémoire
//! - Téléchargement de pistes et d'albums avec reprise-par-saut (un fichier
//!   final présent n'est jamais retéléchargé), callback de progression et
//!   fichiers temporaires
//! - Couverture par album avec chaîne de repli d'URLs et miniature 320×320
//! - Tags FLAC (Vorbis comments) ou MP3 (ID3v2) avec image intégrée,
//!   finalisation atomique
//!
//! La couche appelante (bot, interface) consomme `download_track` /
//! `download_album` ; le transport du bot, les menus et la persistance des
//! préférences utilisateurs ne font pas partie de cette crate.
//!
//! ## Structure des modules
//!
//! ```text
//! qbzdl/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── client.rs           # Client haut-niveau et validation des secrets
//! │   ├── models.rs           # Structures de données
//! │   ├── api/
//! │   │   ├── mod.rs          # API bas-niveau (headers, GET, erreurs)
//! │   │   ├── signing.rs      # Signatures MD5 horodatées
//! │   │   ├── spoofer.rs      # Extraction App ID + secrets du bundle
//! │   │   ├── auth.rs         # Authentification
//! │   │   └── catalog.rs      # Accès au catalogue
//! │   ├── cache.rs            # Cache en mémoire avec TTL
//! │   ├── config.rs           # Configuration YAML + environnement
//! │   ├── downloader.rs       # Téléchargement pistes/albums
//! │   ├── artwork.rs          # Couvertures et miniatures
//! │   ├── tag/
//! │   │   ├── mod.rs          # Contrat des écrivains + helpers
//! │   │   ├── flac.rs         # Écrivain Vorbis comments
//! │   │   └── id3.rs          # Écrivain ID3v2
//! │   └── error.rs            # Gestion des erreurs
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use qbzdl::{QobuzClient, QobuzConfig, QobuzDownloader};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = QobuzConfig::load(None)?;
//!     let client = Arc::new(QobuzClient::connect(&config).await?);
//!     let downloader = QobuzDownloader::from_config(client, &config)?;
//!
//!     let result = downloader.download_track("5966783", None, None, None).await?;
//!     println!("{} -> {}", result.caption, result.path.display());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Formats audio supportés
//!
//! - Format 5 : MP3 320 kbps
//! - Format 6 : FLAC 16 bit / 44.1 kHz (CD Quality)
//! - Format 7 : FLAC 24 bit / jusqu'à 96 kHz (Hi-Res)
//! - Format 27 : FLAC 24 bit / jusqu'à 192 kHz (Hi-Res+)
//!
//! ## Gestion des erreurs
//!
//! La crate utilise `thiserror` pour définir des erreurs typées. Les erreurs
//! de bundle (`BundleParse`) et d'épuisement des secrets (`NoValidSecret`)
//! sont fatales ; les échecs de tags et de couvertures sont dégradés en
//! avertissements et la piste est livrée quand même. Aucune politique de
//! retry n'est intégrée : l'appelant décide.

pub mod api;
pub mod artwork;
pub mod cache;
pub mod client;
pub mod config;
pub mod downloader;
pub mod error;
pub mod models;
pub mod tag;

pub use api::QobuzApi;
pub use api::catalog::{ReleaseType, SearchKind};
pub use client::{QobuzClient, find_active_secret};
pub use config::QobuzConfig;
pub use downloader::{DownloadedTrack, PlayerInfo, ProgressCallback, QobuzDownloader};
pub use error::{QobuzError, Result};
pub use models::{Album, Artist, AudioFormat, SearchResult, StreamInfo, Track};
