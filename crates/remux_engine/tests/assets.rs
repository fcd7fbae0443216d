use std::fs;
use std::time::Duration;

use remux_engine::{AssetConfig, AssetError, AssetSettings, AssetSource, AssetSpec, AssetStager};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WASM: &[u8] = b"\0asm\x01\0\0\0";
const RUNTIME: &str = "var createFFmpegCore = function() {};";

fn asset_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ffmpeg-core.js"), RUNTIME).unwrap();
    fs::write(dir.path().join("ffmpeg-core.wasm"), WASM).unwrap();
    dir
}

async fn serve(server: &MockServer, asset: &str, body: &[u8], content_type: &str) {
    Mock::given(method("GET"))
        .and(path(asset))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
        .mount(server)
        .await;
}

#[test]
fn asset_source_parses_urls_and_directories() {
    assert!(matches!(
        "https://cdn.example.com/core/".parse::<AssetSource>(),
        Ok(AssetSource::Http(_))
    ));
    assert_eq!(
        "./public".parse::<AssetSource>().unwrap(),
        AssetSource::Dir("./public".into())
    );
    assert!("   ".parse::<AssetSource>().is_err());
}

#[tokio::test]
async fn stages_both_assets_from_directory() {
    let dir = asset_dir();
    let config = AssetConfig::new(AssetSource::Dir(dir.path().to_path_buf()));

    let staged = AssetStager::default().stage_all(&config).await.unwrap();

    assert_eq!(staged.runtime().content_type, "text/javascript");
    assert_eq!(staged.runtime().byte_len, RUNTIME.len() as u64);
    assert_eq!(fs::read(&staged.binary().path).unwrap(), WASM);
    assert_eq!(staged.binary().content_type, "application/wasm");
    assert_eq!(staged.binary().sha256.len(), 64);
    assert_ne!(staged.binary().path.parent(), Some(dir.path()));

    let staged_path = staged.runtime().path.clone();
    drop(staged);
    assert!(!staged_path.exists());
}

#[tokio::test]
async fn missing_asset_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ffmpeg-core.js"), RUNTIME).unwrap();
    let config = AssetConfig::new(AssetSource::Dir(dir.path().to_path_buf()));

    let err = AssetStager::default().stage_all(&config).await.unwrap_err();
    assert!(matches!(err, AssetError::Io { .. }));
}

#[tokio::test]
async fn rejects_binary_without_wasm_header() {
    let dir = asset_dir();
    fs::write(dir.path().join("ffmpeg-core.wasm"), b"<html>404</html>").unwrap();
    let config = AssetConfig::new(AssetSource::Dir(dir.path().to_path_buf()));

    let err = AssetStager::default().stage_all(&config).await.unwrap_err();
    assert!(matches!(err, AssetError::NotWasm { .. }));
}

#[tokio::test]
async fn stages_assets_below_the_base_url_path() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/core/ffmpeg-core.js",
        RUNTIME.as_bytes(),
        "application/javascript; charset=utf-8",
    )
    .await;
    serve(&server, "/core/ffmpeg-core.wasm", WASM, "application/wasm").await;

    for base in [format!("{}/core", server.uri()), format!("{}/core/", server.uri())] {
        let config = AssetConfig::new(base.parse().unwrap());

        let staged = AssetStager::default().stage_all(&config).await.unwrap();
        assert_eq!(fs::read_to_string(&staged.runtime().path).unwrap(), RUNTIME);
        assert_eq!(staged.binary().byte_len, WASM.len() as u64);
    }
}

#[tokio::test]
async fn rejects_wrong_content_type() {
    let server = MockServer::start().await;
    serve(&server, "/ffmpeg-core.wasm", WASM, "text/html").await;

    let stager = AssetStager::default();
    let source: AssetSource = server.uri().parse().unwrap();
    let dest = TempDir::new().unwrap();

    let err = stager
        .stage(&source, &AssetSpec::binary_payload(), dest.path())
        .await
        .unwrap_err();
    match err {
        AssetError::ContentType {
            expected, actual, ..
        } => {
            assert_eq!(expected, "application/wasm");
            assert_eq!(actual, "text/html");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ffmpeg-core.js"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source: AssetSource = server.uri().parse().unwrap();
    let dest = TempDir::new().unwrap();
    let err = AssetStager::default()
        .stage(&source, &AssetSpec::runtime_module(), dest.path())
        .await
        .unwrap_err();
    assert!(matches!(err, AssetError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn enforces_size_limit() {
    let server = MockServer::start().await;
    let oversized = [WASM, &[0u8; 64][..]].concat();
    serve(&server, "/ffmpeg-core.wasm", &oversized, "application/wasm").await;

    let stager = AssetStager::new(AssetSettings {
        max_bytes: 16,
        ..AssetSettings::default()
    });
    let source: AssetSource = server.uri().parse().unwrap();
    let dest = TempDir::new().unwrap();
    let err = stager
        .stage(&source, &AssetSpec::binary_payload(), dest.path())
        .await
        .unwrap_err();
    assert!(matches!(err, AssetError::TooLarge { max_bytes: 16, .. }));
}

#[tokio::test]
async fn times_out_on_slow_asset_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ffmpeg-core.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string(RUNTIME),
        )
        .mount(&server)
        .await;

    let stager = AssetStager::new(AssetSettings {
        request_timeout: Duration::from_millis(50),
        ..AssetSettings::default()
    });
    let source: AssetSource = server.uri().parse().unwrap();
    let dest = TempDir::new().unwrap();
    let err = stager
        .stage(&source, &AssetSpec::runtime_module(), dest.path())
        .await
        .unwrap_err();
    assert!(matches!(err, AssetError::Timeout { .. }));
}
