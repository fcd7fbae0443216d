//! Staging of the engine's static assets into local files.
//!
//! The transcoder is loaded from two fixed assets, a runtime module and its
//! binary payload. They are fetched from an HTTP base URL or read from a
//! directory, checked, and copied into a private temporary directory whose
//! files stay valid for as long as the returned [`StagedAssets`] lives.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use thiserror::Error;
use url::Url;

use engine_logging::{engine_debug, engine_info};

const WASM_MAGIC: &[u8] = b"\0asm";
const WASM_CONTENT_TYPE: &str = "application/wasm";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid asset location {0}")]
    InvalidLocation(String),
    #[error("http status {status} fetching {url}")]
    HttpStatus { status: u16, url: String },
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },
    #[error("{asset} has content type {actual}, expected {expected}")]
    ContentType {
        asset: String,
        expected: String,
        actual: String,
    },
    #[error("{asset} is larger than {max_bytes} bytes")]
    TooLarge { asset: String, max_bytes: u64 },
    #[error("{asset} is empty")]
    Empty { asset: String },
    #[error("{asset} is not a WebAssembly module")]
    NotWasm { asset: String },
    #[error("io error on {asset}: {source}")]
    Io {
        asset: String,
        #[source]
        source: io::Error,
    },
}

impl AssetError {
    fn io(asset: impl Into<String>, source: io::Error) -> Self {
        AssetError::Io {
            asset: asset.into(),
            source,
        }
    }
}

/// Where the assets are served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Asset paths are resolved against this URL like a page resolves them.
    Http(Url),
    Dir(PathBuf),
}

impl FromStr for AssetSource {
    type Err = AssetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Url::parse(value.trim())
                .map(AssetSource::Http)
                .map_err(|err| AssetError::InvalidLocation(format!("{value}: {err}")))
        } else if value.trim().is_empty() {
            Err(AssetError::InvalidLocation("empty asset location".to_string()))
        } else {
            Ok(AssetSource::Dir(PathBuf::from(value.trim())))
        }
    }
}

/// One asset: its path relative to the source root and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    pub path: String,
    pub content_type: String,
    /// Other content types servers commonly use for the same asset.
    pub aliases: Vec<String>,
}

impl AssetSpec {
    pub fn runtime_module() -> Self {
        Self {
            path: "/ffmpeg-core.js".to_string(),
            content_type: "text/javascript".to_string(),
            aliases: vec![
                "application/javascript".to_string(),
                "application/x-javascript".to_string(),
            ],
        }
    }

    pub fn binary_payload() -> Self {
        Self {
            path: "/ffmpeg-core.wasm".to_string(),
            content_type: WASM_CONTENT_TYPE.to_string(),
            aliases: Vec::new(),
        }
    }

    fn file_name(&self) -> &str {
        self.path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or("asset")
    }

    fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim();
        std::iter::once(&self.content_type)
            .chain(self.aliases.iter())
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub source: AssetSource,
    pub runtime: AssetSpec,
    pub binary: AssetSpec,
    pub settings: AssetSettings,
}

impl AssetConfig {
    pub fn new(source: AssetSource) -> Self {
        Self {
            source,
            runtime: AssetSpec::runtime_module(),
            binary: AssetSpec::binary_payload(),
            settings: AssetSettings::default(),
        }
    }
}

/// A verified local copy of one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    pub path: PathBuf,
    pub content_type: String,
    pub byte_len: u64,
    /// Hex-encoded SHA-256 of the content.
    pub sha256: String,
}

/// Both staged assets. Dropping this removes the local copies.
#[derive(Debug)]
pub struct StagedAssets {
    _dir: TempDir,
    runtime: StagedAsset,
    binary: StagedAsset,
}

impl StagedAssets {
    pub fn runtime(&self) -> &StagedAsset {
        &self.runtime
    }

    pub fn binary(&self) -> &StagedAsset {
        &self.binary
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetStager {
    settings: AssetSettings,
}

impl AssetStager {
    pub fn new(settings: AssetSettings) -> Self {
        Self { settings }
    }

    /// Stages the runtime module and the binary payload described by `config`.
    pub async fn stage_all(&self, config: &AssetConfig) -> Result<StagedAssets, AssetError> {
        let dir = tempfile::Builder::new()
            .prefix("webm2mp4-assets-")
            .tempdir()
            .map_err(|err| AssetError::io("asset directory", err))?;
        let runtime = self.stage(&config.source, &config.runtime, dir.path()).await?;
        let binary = self.stage(&config.source, &config.binary, dir.path()).await?;
        Ok(StagedAssets {
            _dir: dir,
            runtime,
            binary,
        })
    }

    pub async fn stage(
        &self,
        source: &AssetSource,
        spec: &AssetSpec,
        dest_dir: &Path,
    ) -> Result<StagedAsset, AssetError> {
        let (content, served_type) = match source {
            AssetSource::Http(base) => self.fetch_http(base, spec).await?,
            AssetSource::Dir(root) => self.read_local(root, spec).await?,
        };

        if let Some(served) = served_type.as_deref() {
            if !spec.accepts(served) {
                return Err(AssetError::ContentType {
                    asset: spec.path.clone(),
                    expected: spec.content_type.clone(),
                    actual: served.to_string(),
                });
            }
        }
        if content.is_empty() {
            return Err(AssetError::Empty {
                asset: spec.path.clone(),
            });
        }
        if spec.content_type.eq_ignore_ascii_case(WASM_CONTENT_TYPE)
            && !content.starts_with(WASM_MAGIC)
        {
            return Err(AssetError::NotWasm {
                asset: spec.path.clone(),
            });
        }

        let target = dest_dir.join(spec.file_name());
        tokio::fs::write(&target, &content)
            .await
            .map_err(|err| AssetError::io(spec.path.clone(), err))?;

        let staged = StagedAsset {
            path: target,
            content_type: spec.content_type.clone(),
            byte_len: content.len() as u64,
            sha256: sha256_hex(&content),
        };
        engine_info!(
            "Staged {} ({} bytes, sha256 {})",
            spec.path,
            staged.byte_len,
            staged.sha256
        );
        Ok(staged)
    }

    async fn fetch_http(
        &self,
        base: &Url,
        spec: &AssetSpec,
    ) -> Result<(Vec<u8>, Option<String>), AssetError> {
        let url = asset_url(base, &spec.path)
            .map_err(|err| AssetError::InvalidLocation(format!("{}: {err}", spec.path)))?;
        let url_text = url.to_string();
        engine_debug!("Fetching asset {}", url_text);

        let client = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| map_reqwest_error(&url_text, err))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| map_reqwest_error(&url_text, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::HttpStatus {
                status: status.as_u16(),
                url: url_text,
            });
        }

        let max_bytes = self.settings.max_bytes;
        if response
            .content_length()
            .is_some_and(|content_len| content_len > max_bytes)
        {
            return Err(AssetError::TooLarge {
                asset: spec.path.clone(),
                max_bytes,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(&url_text, err))?;
            if body.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(AssetError::TooLarge {
                    asset: spec.path.clone(),
                    max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok((body.to_vec(), content_type))
    }

    async fn read_local(
        &self,
        root: &Path,
        spec: &AssetSpec,
    ) -> Result<(Vec<u8>, Option<String>), AssetError> {
        let path = root.join(spec.path.trim_start_matches('/'));
        engine_debug!("Reading asset {:?}", path);

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|err| AssetError::io(path.display().to_string(), err))?;
        if metadata.len() > self.settings.max_bytes {
            return Err(AssetError::TooLarge {
                asset: spec.path.clone(),
                max_bytes: self.settings.max_bytes,
            });
        }

        let content = tokio::fs::read(&path)
            .await
            .map_err(|err| AssetError::io(path.display().to_string(), err))?;
        Ok((content, content_type_for(&path).map(ToOwned::to_owned)))
    }
}

/// Content type a static file server would assign based on the extension.
fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?;
    if extension.eq_ignore_ascii_case("js") || extension.eq_ignore_ascii_case("mjs") {
        Some("text/javascript")
    } else if extension.eq_ignore_ascii_case("wasm") {
        Some(WASM_CONTENT_TYPE)
    } else {
        None
    }
}

/// Resolves `asset` below the path of `base`, which is treated as a
/// directory whether or not it ends in `/`.
fn asset_url(base: &Url, asset: &str) -> Result<Url, url::ParseError> {
    let mut dir = base.clone();
    if !dir.path().ends_with('/') {
        let path = format!("{}/", dir.path());
        dir.set_path(&path);
    }
    dir.join(asset.trim_start_matches('/'))
}

fn sha256_hex(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> AssetError {
    if err.is_timeout() {
        return AssetError::Timeout {
            url: url.to_string(),
        };
    }
    AssetError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}
