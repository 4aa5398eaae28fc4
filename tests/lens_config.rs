use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use heritage_lens::LensConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "HERITAGE_CONFIG",
        "HERITAGE_BACKEND",
        "HERITAGE_MODEL_PATH",
        "HERITAGE_CONFIDENCE",
        "HERITAGE_STORED_STRIDE",
        "HERITAGE_STREAMED_STRIDE",
        "HERITAGE_STREAM_TIMEOUT_SECS",
        "HERITAGE_RESOLVER",
        "HERITAGE_FONT_PATH",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    std::io::Write::write_all(&mut file, contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_toml_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".toml",
        r#"
[detector]
model_path = "models/heritage.onnx"
confidence_threshold = 0.4

[session]
stored_stride = 10
stall_backoff_ms = 50

[resolver]
timeout_secs = 12
"#,
    );

    std::env::set_var("HERITAGE_CONFIG", file.path());
    std::env::set_var("HERITAGE_STREAMED_STRIDE", "3");
    std::env::set_var("HERITAGE_RESOLVER", "/opt/bin/yt-dlp");

    let cfg = LensConfig::load().expect("load config");

    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.detector.model_path, PathBuf::from("models/heritage.onnx"));
    assert!((cfg.detector.confidence_threshold - 0.4).abs() < 1e-6);
    assert_eq!(cfg.session.stored_stride, 10);
    assert_eq!(cfg.session.streamed_stride, 3);
    assert_eq!(cfg.session.stall_backoff, Duration::from_millis(50));
    assert_eq!(cfg.session.stream_timeout, Duration::from_secs(300));
    assert_eq!(cfg.resolver.program, "/opt/bin/yt-dlp");
    assert_eq!(cfg.resolver.timeout, Duration::from_secs(12));

    clear_env();
}

#[test]
fn loads_json_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".json",
        r#"{
            "session": { "stream_timeout_secs": 60 },
            "annotate": { "font_path": "/usr/share/fonts/DejaVuSans.ttf", "font_scale": 24.0 }
        }"#,
    );

    let cfg = LensConfig::load_from(Some(file.path())).expect("load config");

    assert_eq!(cfg.session.stream_timeout, Duration::from_secs(60));
    assert_eq!(
        cfg.annotate.font_path,
        Some(PathBuf::from("/usr/share/fonts/DejaVuSans.ttf"))
    );
    assert!((cfg.annotate.font_scale - 24.0).abs() < 1e-6);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HERITAGE_STORED_STRIDE", "0");
    assert!(LensConfig::load().is_err());
    clear_env();

    std::env::set_var("HERITAGE_CONFIDENCE", "high");
    assert!(LensConfig::load().is_err());
    clear_env();

    std::env::set_var("HERITAGE_BACKEND", "opencv");
    let err = LensConfig::load().unwrap_err();
    assert!(err.to_string().contains("unknown detector backend"));
    clear_env();

    let file = config_file(".toml", "[session\nstored_stride = ");
    assert!(LensConfig::load_from(Some(file.path())).is_err());

    clear_env();
}

#[test]
fn rejects_out_of_range_timeouts() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HERITAGE_STREAM_TIMEOUT_SECS", u64::MAX.to_string());
    let err = LensConfig::load().unwrap_err();
    assert!(err.to_string().contains("stream timeout"));
    clear_env();

    let file = config_file(".toml", "[resolver]\ntimeout_secs = 100000\n");
    let err = LensConfig::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("resolver timeout"));

    let file = config_file(".toml", "[resolver]\ntimeout_secs = 86400\n");
    let cfg = LensConfig::load_from(Some(file.path())).expect("one day is allowed");
    assert_eq!(cfg.resolver.timeout, Duration::from_secs(86_400));

    clear_env();
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = LensConfig::load().expect("load defaults");
    assert_eq!(cfg.session.stored_stride, 5);
    assert_eq!(cfg.session.streamed_stride, 2);
    assert_eq!(cfg.resolver.format, "best[ext=mp4]/best");
    assert!(cfg.annotate.font_path.is_none());
}
