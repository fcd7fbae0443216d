use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use remux_engine::{
    run_remux, AssetConfig, AssetSource, EngineConfig, EngineError, EngineEvent, EngineHandle,
    FailureKind, ProgressSink, StagedAssets, Transcoder,
};
use tempfile::TempDir;

/// Transcoder double that records every call and replays scripted results.
struct ScriptedTranscoder {
    calls: Mutex<Vec<String>>,
    progress: Vec<f64>,
    execute_error: Option<EngineError>,
    panic_on_write: bool,
    output: Vec<u8>,
}

impl ScriptedTranscoder {
    fn succeeding(progress: Vec<f64>, output: Vec<u8>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            progress,
            execute_error: None,
            panic_on_write: false,
            output,
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            execute_error: Some(EngineError::new(
                FailureKind::Execution { exit_code: Some(1) },
                message,
            )),
            ..Self::succeeding(Vec::new(), Vec::new())
        }
    }

    fn panicking() -> Self {
        Self {
            panic_on_write: true,
            ..Self::succeeding(Vec::new(), Vec::new())
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl Transcoder for ScriptedTranscoder {
    async fn load(&self, assets: &StagedAssets) -> Result<(), EngineError> {
        self.record(format!(
            "load {} {}",
            assets.runtime().byte_len,
            assets.binary().byte_len
        ));
        Ok(())
    }

    async fn write_input(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        self.record(format!("write {name} {}", bytes.len()));
        if self.panic_on_write {
            panic!("decoder state corrupted");
        }
        Ok(())
    }

    async fn execute(
        &self,
        args: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<(), EngineError> {
        self.record(format!("execute {}", args.join(" ")));
        for fraction in &self.progress {
            progress.report(*fraction);
        }
        match &self.execute_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn read_output(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.record(format!("read {name}"));
        Ok(self.output.clone())
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.record(format!("delete {name}"));
        Ok(())
    }
}

#[derive(Default)]
struct CollectingSink {
    fractions: Mutex<Vec<f64>>,
}

impl ProgressSink for CollectingSink {
    fn report(&self, fraction: f64) {
        self.fractions.lock().unwrap().push(fraction);
    }
}

fn asset_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ffmpeg-core.js"), "core();").unwrap();
    fs::write(dir.path().join("ffmpeg-core.wasm"), b"\0asm\x01\0\0\0").unwrap();
    dir
}

fn engine_for(transcoder: Arc<ScriptedTranscoder>, assets: &TempDir) -> EngineHandle {
    let config = EngineConfig {
        assets: AssetConfig::new(AssetSource::Dir(assets.path().to_path_buf())),
    };
    EngineHandle::new(transcoder, config).unwrap()
}

fn next_event(engine: &EngineHandle) -> EngineEvent {
    engine
        .recv_timeout(Duration::from_secs(10))
        .unwrap()
        .expect("engine event")
}

#[tokio::test]
async fn run_remux_issues_fixed_request_and_cleans_up() {
    let transcoder = ScriptedTranscoder::succeeding(vec![0.5, 1.0], vec![0x00, 0x01]);
    let sink = CollectingSink::default();

    let output = run_remux(&transcoder, &[7; 10], &sink).await.unwrap();

    assert_eq!(output, vec![0x00, 0x01]);
    assert_eq!(*sink.fractions.lock().unwrap(), vec![0.5, 1.0]);
    assert_eq!(
        transcoder.calls(),
        vec![
            "write input.webm 10",
            "execute -i input.webm -c:v copy output.mp4",
            "read output.mp4",
            "delete input.webm",
            "delete output.mp4",
        ]
    );
}

#[tokio::test]
async fn run_remux_cleans_up_after_failure() {
    let transcoder = ScriptedTranscoder::failing("Invalid data found when processing input");
    let sink = CollectingSink::default();

    let err = run_remux(&transcoder, b"junk", &sink).await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid data found when processing input");
    assert_eq!(
        transcoder.calls(),
        vec![
            "write input.webm 4",
            "execute -i input.webm -c:v copy output.mp4",
            "delete input.webm",
            "delete output.mp4",
        ]
    );
}

#[test]
fn load_then_convert_reports_progress_and_output() {
    engine_logging::initialize_for_tests();
    let assets = asset_dir();
    let transcoder = Arc::new(ScriptedTranscoder::succeeding(
        vec![0.0, 0.5, 1.0],
        vec![0x00, 0x01],
    ));
    let engine = engine_for(transcoder.clone(), &assets);

    engine.load();
    assert_eq!(next_event(&engine), EngineEvent::LoadCompleted(Ok(())));
    assert_eq!(transcoder.calls(), vec!["load 7 8"]);

    engine.convert(1, vec![1u8; 10].into());
    for fraction in [0.0, 0.5, 1.0] {
        assert_eq!(
            next_event(&engine),
            EngineEvent::Progress {
                run_id: 1,
                fraction
            }
        );
    }
    assert_eq!(
        next_event(&engine),
        EngineEvent::ConversionCompleted {
            run_id: 1,
            result: Ok(vec![0x00, 0x01].into()),
        }
    );
}

#[test]
fn load_is_performed_once() {
    let assets = asset_dir();
    let transcoder = Arc::new(ScriptedTranscoder::succeeding(Vec::new(), Vec::new()));
    let engine = engine_for(transcoder.clone(), &assets);

    engine.load();
    engine.load();
    assert_eq!(next_event(&engine), EngineEvent::LoadCompleted(Ok(())));
    assert_eq!(next_event(&engine), EngineEvent::LoadCompleted(Ok(())));
    assert_eq!(transcoder.calls().len(), 1);
}

#[test]
fn convert_before_load_fails_without_touching_transcoder() {
    let assets = asset_dir();
    let transcoder = Arc::new(ScriptedTranscoder::succeeding(vec![0.5], vec![1]));
    let engine = engine_for(transcoder.clone(), &assets);

    engine.convert(3, vec![1, 2, 3].into());
    match next_event(&engine) {
        EngineEvent::ConversionCompleted { run_id, result } => {
            assert_eq!(run_id, 3);
            assert_eq!(result.unwrap_err().kind, FailureKind::NotLoaded);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(transcoder.calls().is_empty());
}

#[test]
fn missing_assets_fail_the_load() {
    let empty = TempDir::new().unwrap();
    let transcoder = Arc::new(ScriptedTranscoder::succeeding(Vec::new(), Vec::new()));
    let engine = engine_for(transcoder.clone(), &empty);

    engine.load();
    match next_event(&engine) {
        EngineEvent::LoadCompleted(Err(err)) => {
            assert_eq!(err.kind, FailureKind::Assets);
            assert!(err.message.contains("ffmpeg-core.js"), "{}", err.message);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(transcoder.calls().is_empty());
}

#[test]
fn execution_failure_is_reported_for_the_run() {
    let assets = asset_dir();
    let transcoder = Arc::new(ScriptedTranscoder::failing("exit status: 1"));
    let engine = engine_for(transcoder, &assets);

    engine.load();
    assert_eq!(next_event(&engine), EngineEvent::LoadCompleted(Ok(())));

    engine.convert(1, vec![0].into());
    assert_eq!(
        next_event(&engine),
        EngineEvent::ConversionCompleted {
            run_id: 1,
            result: Err(EngineError::new(
                FailureKind::Execution { exit_code: Some(1) },
                "exit status: 1"
            )),
        }
    );
}

#[test]
fn transcoder_panic_fails_the_run_and_keeps_the_worker() {
    let assets = asset_dir();
    let transcoder = Arc::new(ScriptedTranscoder::panicking());
    let engine = engine_for(transcoder.clone(), &assets);

    engine.load();
    assert_eq!(next_event(&engine), EngineEvent::LoadCompleted(Ok(())));

    for run_id in [1, 2] {
        engine.convert(run_id, vec![0; 4].into());
        assert_eq!(
            next_event(&engine),
            EngineEvent::ConversionCompleted {
                run_id,
                result: Err(EngineError::new(
                    FailureKind::Runtime,
                    "engine panicked: decoder state corrupted"
                )),
            }
        );
    }
    assert_eq!(
        engine.recv_timeout(Duration::from_millis(50)).unwrap(),
        None
    );
    assert_eq!(
        transcoder
            .calls()
            .iter()
            .filter(|call| call.starts_with("write"))
            .count(),
        2
    );
}
