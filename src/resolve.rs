//! Resolving video page links to directly playable stream URLs.
//!
//! Resolution is delegated to an external tool (`yt-dlp` by default) run as a
//! subprocess. Each call is bounded by a timeout; the three ways the tool can
//! fail (not installed, too slow, refused the link) stay distinguishable so
//! the user gets a matching remediation hint.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ResolverSettings;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const SUPPORTED_HOSTS: [&str; 2] = ["youtube.com", "youtu.be"];

/// A playable stream and whatever metadata the resolver could fetch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub stream_url: String,
    pub title: Option<String>,
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{program} is not installed or not on PATH")]
    ToolMissing { program: String },

    #[error("{program} timed out after {}s", .after.as_secs_f64())]
    Timeout { program: String, after: Duration },

    #[error("stream resolution rejected: {reason}")]
    Rejected { reason: String },

    #[error("unsupported video link '{link}'")]
    InvalidLink { link: String },
}

impl ResolveError {
    pub fn user_message(&self) -> String {
        match self {
            ResolveError::ToolMissing { program } => format!(
                "{program} not found. Please install it (e.g. `pip install {program}`) \
                 and make sure it is on PATH."
            ),
            ResolveError::Timeout { .. } => {
                "Timeout connecting to the video service. Please try again.".to_string()
            }
            ResolveError::Rejected { reason } => {
                format!("Failed to get video stream ({reason}). Please check the URL.")
            }
            ResolveError::InvalidLink { .. } => {
                "Please enter a valid YouTube URL (youtube.com or youtu.be).".to_string()
            }
        }
    }
}

/// Turns a page link into a playable stream URL.
pub trait StreamResolver {
    fn resolve(&self, link: &str) -> Result<StreamInfo, ResolveError>;
}

/// `yt-dlp` invoked as a subprocess.
#[derive(Clone, Debug)]
pub struct YtDlpResolver {
    program: String,
    timeout: Duration,
    format: String,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            format: "best[ext=mp4]/best".to_string(),
        }
    }

    pub fn from_settings(settings: &ResolverSettings) -> Self {
        Self::new(settings.program.clone(), settings.timeout).with_format(settings.format.clone())
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Title and duration. Failures here are not fatal to resolution.
    fn fetch_metadata(&self, link: &str) -> Result<(Option<String>, Option<f64>), ResolveError> {
        let output = run_with_timeout(
            &self.program,
            &["--dump-json", "--no-playlist", link],
            self.timeout,
        )?;
        if !output.status.success() {
            log::warn!(
                "{} metadata lookup failed: {}",
                self.program,
                last_line(&output.stderr)
            );
            return Ok((None, None));
        }
        match serde_json::from_str::<serde_json::Value>(&output.stdout) {
            Ok(info) => Ok((
                info.get("title").and_then(|t| t.as_str()).map(str::to_string),
                info.get("duration").and_then(|d| d.as_f64()),
            )),
            Err(err) => {
                log::warn!("{} returned unreadable metadata: {}", self.program, err);
                Ok((None, None))
            }
        }
    }
}

impl StreamResolver for YtDlpResolver {
    fn resolve(&self, link: &str) -> Result<StreamInfo, ResolveError> {
        validate_link(link)?;

        let (title, duration_secs) = self.fetch_metadata(link)?;
        if let Some(title) = &title {
            log::info!(
                "resolving '{}' ({}s)",
                title,
                duration_secs.unwrap_or_default()
            );
        }

        let output = run_with_timeout(
            &self.program,
            &["--get-url", "--format", &self.format, link],
            self.timeout,
        )?;
        if !output.status.success() {
            return Err(ResolveError::Rejected {
                reason: last_line(&output.stderr),
            });
        }
        let stream_url = output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| ResolveError::Rejected {
                reason: format!("{} printed no stream url", self.program),
            })?
            .to_string();

        Ok(StreamInfo {
            stream_url,
            title,
            duration_secs,
        })
    }
}

/// Accept only links to the supported video hosts.
pub fn validate_link(link: &str) -> Result<Url, ResolveError> {
    let invalid = || ResolveError::InvalidLink {
        link: link.to_string(),
    };
    let url = Url::parse(link.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    let host = url.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
    let supported = SUPPORTED_HOSTS
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{h}")));
    if supported {
        Ok(url)
    } else {
        Err(invalid())
    }
}

struct ToolOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Result<ToolOutput, ResolveError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ResolveError::ToolMissing {
                    program: program.to_string(),
                }
            }
            _ => ResolveError::Rejected {
                reason: format!("failed to start {program}: {err}"),
            },
        })?;

    // Drain pipes on their own threads so a chatty child cannot block on a full pipe.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    // A timeout too large to represent as an Instant never expires.
    let deadline = Instant::now().checked_add(timeout);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if deadline.is_some_and(|d| Instant::now() >= d) => {
                kill(&mut child);
                return Err(ResolveError::Timeout {
                    program: program.to_string(),
                    after: timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => {
                kill(&mut child);
                return Err(ResolveError::Rejected {
                    reason: format!("failed waiting for {program}: {err}"),
                });
            }
        }
    };

    Ok(ToolOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no error output")
        .to_string()
}
