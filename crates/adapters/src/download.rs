// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build artifact download and `application.ini` extraction (§6 "Artifact
//! format"). Builds are zip archives; the `[App]` section of the bundled
//! `application.ini` carries the `SourceStamp`/`Version`/`SourceRepository`
//! triple used to populate a [`Job`](autophone_core::Job).

use crate::error::DownloadError;
use async_trait::async_trait;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Parsed `[App]` section of a build's bundled `application.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIni {
    pub source_stamp: String,
    pub version: String,
    pub source_repository: String,
}

/// Fetches a build artifact and extracts its `application.ini` (§6).
#[async_trait]
pub trait Downloader: Send + Sync + 'static {
    /// Fetch `url` to a local path (caller owns cleanup).
    async fn fetch(&self, url: &str) -> Result<PathBuf, DownloadError>;

    /// Fetch and parse the bundled `application.ini` in one step.
    async fn fetch_app_ini(&self, url: &str) -> Result<AppIni, DownloadError> {
        let path = self.fetch(url).await?;
        extract_application_ini(&path)
    }
}

/// Reads `application.ini` out of a zip archive and parses its `[App]`
/// section. Missing required keys are a hard error (§6): a build whose
/// metadata can't be read can't be dispatched meaningfully.
pub fn extract_application_ini(zip_path: &Path) -> Result<AppIni, DownloadError> {
    let file = std::fs::File::open(zip_path)
        .map_err(|e| DownloadError::Extract(format!("open {}: {e}", zip_path.display())))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| DownloadError::Extract(e.to_string()))?;

    let mut ini_text = String::new();
    {
        let mut entry = archive
            .by_name("application.ini")
            .map_err(|_| DownloadError::Extract("application.ini not found in archive".into()))?;
        entry
            .read_to_string(&mut ini_text)
            .map_err(|e| DownloadError::Extract(e.to_string()))?;
    }

    parse_application_ini(&ini_text)
}

fn parse_application_ini(text: &str) -> Result<AppIni, DownloadError> {
    let conf = ini::Ini::load_from_str(text)
        .map_err(|e| DownloadError::Extract(format!("malformed application.ini: {e}")))?;
    let app = conf
        .section(Some("App"))
        .ok_or_else(|| DownloadError::MissingKey("section".to_string()))?;

    let get = |key: &str| -> Result<String, DownloadError> {
        app.get(key)
            .map(str::to_string)
            .ok_or_else(|| DownloadError::MissingKey(key.to_string()))
    };

    Ok(AppIni {
        source_stamp: get("SourceStamp")?,
        version: get("Version")?,
        source_repository: get("SourceRepository")?,
    })
}

/// HTTP-backed downloader used in production.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

/// Fetches `url` into a fresh temp file. Shared by [`HttpDownloader`] and the
/// Device Driver's install path, which downloads the same artifact kind.
pub(crate) async fn fetch_to_tempfile(url: &str) -> Result<PathBuf, DownloadError> {
    let response = reqwest::get(url).await.map_err(|e| DownloadError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let bytes = response.bytes().await.map_err(|e| DownloadError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let mut file = tempfile::Builder::new()
        .suffix(".apk")
        .tempfile()
        .map_err(|e| DownloadError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    std::io::Write::write_all(&mut file, &bytes).map_err(|e| DownloadError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let (_, path) = file.keep().map_err(|e| DownloadError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(path)
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let bytes = response.bytes().await.map_err(|e| DownloadError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let mut file = tempfile::Builder::new()
            .suffix(".zip")
            .tempfile()
            .map_err(|e| DownloadError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        std::io::Write::write_all(&mut file, &bytes).map_err(|e| DownloadError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let (_, path) = file.keep().map_err(|e| DownloadError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(path)
    }
}

/// Fake downloader for tests: returns a canned [`AppIni`] without touching
/// the network or filesystem.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeDownloader {
    pub app_ini: AppIni,
    pub fetch_path: PathBuf,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeDownloader {
    fn default() -> Self {
        Self {
            app_ini: AppIni {
                source_stamp: "abc123".to_string(),
                version: "1.0".to_string(),
                source_repository: "https://hg.mozilla.org/mozilla-central".to_string(),
            },
            fetch_path: PathBuf::from("/tmp/fake-build.zip"),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Downloader for FakeDownloader {
    async fn fetch(&self, _url: &str) -> Result<PathBuf, DownloadError> {
        Ok(self.fetch_path.clone())
    }

    async fn fetch_app_ini(&self, _url: &str) -> Result<AppIni, DownloadError> {
        Ok(self.app_ini.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_application_ini() {
        let text = "[App]\nSourceStamp=abc123\nVersion=56.0a1\nSourceRepository=https://hg.mozilla.org/mozilla-central\n";
        let parsed = parse_application_ini(text).unwrap();
        assert_eq!(parsed.source_stamp, "abc123");
        assert_eq!(parsed.version, "56.0a1");
        assert_eq!(
            parsed.source_repository,
            "https://hg.mozilla.org/mozilla-central"
        );
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let text = "[App]\nSourceStamp=abc123\n";
        let err = parse_application_ini(text).unwrap_err();
        assert!(matches!(err, DownloadError::MissingKey(_)));
    }

    #[test]
    fn missing_app_section_is_an_error() {
        let text = "[Other]\nkey=value\n";
        let err = parse_application_ini(text).unwrap_err();
        assert!(matches!(err, DownloadError::MissingKey(_)));
    }

    #[tokio::test]
    async fn fake_downloader_returns_canned_app_ini() {
        let downloader = FakeDownloader::default();
        let app_ini = downloader.fetch_app_ini("http://example/build.zip").await.unwrap();
        assert_eq!(app_ini.source_stamp, "abc123");
    }
}
