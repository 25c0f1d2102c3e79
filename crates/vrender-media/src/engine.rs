//! Render engine seam and the Remotion CLI implementation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{ProcessRunner, RemotionCommand};
use crate::error::{MediaError, MediaResult};
use crate::progress::{ProgressCallback, ProgressTracker, RenderProgress};

/// Codec every render is encoded with.
pub const DEFAULT_CODEC: &str = "h264";

/// Built, servable project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRef {
    /// Serve URL or bundle directory understood by the renderer
    pub location: String,
    /// Directory owned by this bundle, removed on release
    pub owned_dir: Option<PathBuf>,
}

/// A composition as inventoried from a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionInfo {
    pub id: String,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub duration_in_frames: u64,
}

/// Engine time limits.
///
/// `overall` bounds one render call end to end; `delay_render` bounds any
/// single pause the renderer takes while loading media. The outer limit
/// must exceed the inner one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTimeouts {
    overall: Duration,
    delay_render: Duration,
}

impl RenderTimeouts {
    /// 7 minutes.
    pub const DEFAULT_OVERALL: Duration = Duration::from_millis(420_000);
    /// 5 minutes.
    pub const DEFAULT_DELAY_RENDER: Duration = Duration::from_millis(300_000);

    pub fn new(overall: Duration, delay_render: Duration) -> MediaResult<Self> {
        if overall <= delay_render {
            return Err(MediaError::InvalidConfig(format!(
                "overall render timeout ({}ms) must exceed the delay-render timeout ({}ms)",
                overall.as_millis(),
                delay_render.as_millis()
            )));
        }
        Ok(Self {
            overall,
            delay_render,
        })
    }

    pub fn overall(&self) -> Duration {
        self.overall
    }

    pub fn delay_render(&self) -> Duration {
        self.delay_render
    }
}

impl Default for RenderTimeouts {
    fn default() -> Self {
        Self {
            overall: Self::DEFAULT_OVERALL,
            delay_render: Self::DEFAULT_DELAY_RENDER,
        }
    }
}

/// Everything the renderer needs for one output file.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub composition: CompositionInfo,
    pub bundle: BundleRef,
    pub codec: String,
    pub output_path: PathBuf,
    pub frames: u64,
    pub timeouts: RenderTimeouts,
}

/// External bundler, composition inventory and renderer.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Build `entry_point` into a servable bundle. No build overrides are applied.
    async fn bundle(&self, entry_point: &Path, cancel: &CancellationToken) -> MediaResult<BundleRef>;

    /// List the compositions a bundle registers.
    async fn list_compositions(
        &self,
        bundle: &BundleRef,
        cancel: &CancellationToken,
    ) -> MediaResult<Vec<CompositionInfo>>;

    /// Render `job.frames` frames to `job.output_path`.
    async fn render(
        &self,
        job: &RenderJob,
        on_progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> MediaResult<()>;

    /// Drop whatever the bundle left on disk.
    async fn release(&self, _bundle: &BundleRef) -> MediaResult<()> {
        Ok(())
    }
}

/// Remotion CLI settings.
#[derive(Debug, Clone)]
pub struct RemotionConfig {
    /// Launcher binary
    pub launcher: String,
    /// Node project with `remotion` installed; commands run from here
    pub project_dir: PathBuf,
    /// Parent directory for bundle output
    pub bundle_dir: PathBuf,
    /// Remotion `--log` level
    pub log_level: String,
}

impl Default for RemotionConfig {
    fn default() -> Self {
        Self {
            launcher: "npx".to_string(),
            project_dir: PathBuf::from("remotion"),
            bundle_dir: std::env::temp_dir().join("vrender-bundles"),
            log_level: "info".to_string(),
        }
    }
}

impl RemotionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            launcher: std::env::var("NPX_BIN").unwrap_or(defaults.launcher),
            project_dir: std::env::var("REMOTION_PROJECT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.project_dir),
            bundle_dir: std::env::var("REMOTION_BUNDLE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.bundle_dir),
            log_level: std::env::var("REMOTION_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

/// [`RenderEngine`] backed by `npx remotion`.
#[derive(Debug, Clone)]
pub struct RemotionCli {
    config: RemotionConfig,
}

impl RemotionCli {
    pub fn new(config: RemotionConfig) -> Self {
        Self { config }
    }

    /// Absolute bundle directory for `entry_point`.
    ///
    /// Commands run from `project_dir`, so a relative path would land
    /// somewhere other than where it is created and released.
    fn bundle_out_dir(&self, entry_point: &Path) -> MediaResult<PathBuf> {
        let stem = entry_point
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| MediaError::internal("entry point has no file name"))?;
        Ok(absolute(&self.config.bundle_dir)?.join(format!("bundle-{}", stem)))
    }

    fn command(&self, subcommand: &'static str) -> RemotionCommand {
        RemotionCommand::new(self.config.launcher.clone(), subcommand)
            .working_dir(&self.config.project_dir)
            .env("FORCE_COLOR", "0")
            .env("NO_COLOR", "1")
    }
}

#[async_trait]
impl RenderEngine for RemotionCli {
    fn name(&self) -> &'static str {
        "remotion-cli"
    }

    async fn bundle(&self, entry_point: &Path, cancel: &CancellationToken) -> MediaResult<BundleRef> {
        let out_dir = self.bundle_out_dir(entry_point)?;
        tokio::fs::create_dir_all(absolute(&self.config.bundle_dir)?).await?;

        let cmd = self
            .command("bundle")
            .path_arg(absolute(entry_point)?)
            .flag("out-dir", out_dir.display())
            .log_level(&self.config.log_level);

        let bundle = BundleRef {
            location: out_dir.to_string_lossy().to_string(),
            owned_dir: Some(out_dir),
        };
        if let Err(e) = ProcessRunner::new().with_cancel(cancel.clone()).run(&cmd).await {
            if let Err(cleanup) = self.release(&bundle).await {
                warn!(bundle = %bundle.location, "Failed to remove partial bundle: {}", cleanup);
            }
            return Err(e);
        }

        info!(bundle = %bundle.location, "Bundled project");
        Ok(bundle)
    }

    async fn list_compositions(
        &self,
        bundle: &BundleRef,
        cancel: &CancellationToken,
    ) -> MediaResult<Vec<CompositionInfo>> {
        let cmd = self
            .command("compositions")
            .arg(bundle.location.clone())
            .log_level("error");

        let output = ProcessRunner::new().with_cancel(cancel.clone()).run(&cmd).await?;
        let compositions = parse_compositions(&output.stdout);
        debug!(count = compositions.len(), "Listed compositions");
        Ok(compositions)
    }

    async fn render(
        &self,
        job: &RenderJob,
        on_progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> MediaResult<()> {
        if job.frames == 0 {
            return Err(MediaError::NoFrames {
                seconds: 0.0,
                fps: job.composition.fps,
            });
        }

        let cmd = self
            .command("render")
            .arg(job.bundle.location.clone())
            .arg(job.composition.id.clone())
            .path_arg(absolute(&job.output_path)?)
            .flag("codec", &job.codec)
            .flag("frames", format!("0-{}", job.frames - 1))
            .flag("timeout", job.timeouts.delay_render().as_millis())
            .switch("overwrite")
            .log_level(&self.config.log_level);

        let total = job.frames;
        let on_progress: Arc<ProgressCallback> = Arc::new(on_progress);
        let tracker = Arc::new(Mutex::new(ProgressTracker::new()));

        let line_progress = Arc::clone(&on_progress);
        let line_tracker = Arc::clone(&tracker);
        ProcessRunner::new()
            .with_cancel(cancel.clone())
            .with_timeout(job.timeouts.overall())
            .run_with_lines(&cmd, move |line| {
                if let Some(update) = parse_progress_line(line, total) {
                    let forwarded = line_tracker
                        .lock()
                        .ok()
                        .and_then(|mut t| t.observe(update));
                    if let Some(update) = forwarded {
                        line_progress(update);
                    }
                }
            })
            .await?;

        let closing = tracker.lock().ok().and_then(|mut t| t.finish());
        if let Some(update) = closing {
            on_progress(update);
        }
        Ok(())
    }

    async fn release(&self, bundle: &BundleRef) -> MediaResult<()> {
        if let Some(dir) = &bundle.owned_dir {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> MediaResult<PathBuf> {
    Ok(std::path::absolute(path)?)
}

/// Parse the table printed by `remotion compositions`.
///
/// Rows look like `<id>  <fps>  <width>x<height>  <frames> (<secs> sec)`;
/// headers and log lines are skipped.
pub fn parse_compositions(stdout: &str) -> Vec<CompositionInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let id = cols.next()?;
            let fps: f64 = cols.next()?.parse().ok()?;
            let (width, height) = cols.next()?.split_once('x')?;
            let duration_in_frames = cols.next()?.parse().ok()?;
            Some(CompositionInfo {
                id: id.to_string(),
                fps,
                width: width.parse().ok()?,
                height: height.parse().ok()?,
                duration_in_frames,
            })
        })
        .collect()
}

/// Extract `done/total` from a renderer output line.
///
/// Only counters whose total equals `total_frames` are considered, so
/// unrelated fractions in log output are ignored.
pub fn parse_progress_line(line: &str, total_frames: u64) -> Option<RenderProgress> {
    line.split_whitespace().find_map(|token| {
        let token = token.trim_matches(|c: char| !c.is_ascii_digit());
        let (done, total) = token.split_once('/')?;
        let done: u64 = done.parse().ok()?;
        let total: u64 = total.parse().ok()?;
        (total == total_frames && done <= total).then(|| RenderProgress::from_frames(done, total))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_outer_must_exceed_inner() {
        let defaults = RenderTimeouts::default();
        assert_eq!(defaults.overall(), Duration::from_secs(7 * 60));
        assert_eq!(defaults.delay_render(), Duration::from_secs(5 * 60));

        assert!(RenderTimeouts::new(Duration::from_secs(60), Duration::from_secs(60)).is_err());
        assert!(RenderTimeouts::new(Duration::from_secs(30), Duration::from_secs(60)).is_err());
        assert!(RenderTimeouts::new(Duration::from_secs(61), Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_parse_compositions_table() {
        let stdout = "\
The following compositions are available:

DynamicVideo-1700000000000-abcdef012345    30      1080x1920      150 (5.00 sec)
Other                                       25      1920x1080      250 (10.00 sec)
";
        let comps = parse_compositions(stdout);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].id, "DynamicVideo-1700000000000-abcdef012345");
        assert_eq!(comps[0].fps, 30.0);
        assert_eq!((comps[0].width, comps[0].height), (1080, 1920));
        assert_eq!(comps[0].duration_in_frames, 150);
        assert_eq!(comps[1].fps, 25.0);
    }

    #[test]
    fn test_parse_compositions_ignores_noise() {
        assert!(parse_compositions("").is_empty());
        assert!(parse_compositions("Bundling 100%\nGetting compositions...").is_empty());
    }

    #[test]
    fn test_parse_progress_line() {
        let p = parse_progress_line("Rendered 45/150, time remaining: 12s", 150).unwrap();
        assert_eq!(p.percent, 30);

        let p = parse_progress_line("Encoded (150/150)", 150).unwrap();
        assert!(p.is_final);

        assert!(parse_progress_line("Downloaded 3/4 assets", 150).is_none());
        assert!(parse_progress_line("no numbers here", 150).is_none());
    }

    #[tokio::test]
    async fn test_release_removes_owned_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let owned = dir.path().join("bundle-x");
        tokio::fs::create_dir_all(owned.join("assets")).await.unwrap();

        let engine = RemotionCli::new(RemotionConfig::default());
        let bundle = BundleRef {
            location: owned.to_string_lossy().to_string(),
            owned_dir: Some(owned.clone()),
        };
        engine.release(&bundle).await.unwrap();
        assert!(!owned.exists());

        // Releasing twice is fine.
        engine.release(&bundle).await.unwrap();
    }

    #[test]
    fn test_bundle_out_dir_is_absolute() {
        let engine = RemotionCli::new(RemotionConfig {
            bundle_dir: PathBuf::from("relative-bundles"),
            ..RemotionConfig::default()
        });
        let out_dir = engine
            .bundle_out_dir(Path::new("/work/index-1700000000000-abc.jsx"))
            .unwrap();
        assert!(out_dir.is_absolute());
        assert!(out_dir.ends_with("relative-bundles/bundle-index-1700000000000-abc"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_bundle_removes_partial_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let launcher = crate::command::tests::write_launcher(
            dir.path(),
            r#"for arg in "$@"; do
  case "$arg" in --out-dir=*) mkdir -p "${arg#--out-dir=}/assets" ;; esac
done
exit 1"#,
        );
        let bundle_dir = dir.path().join("bundles");
        let engine = RemotionCli::new(RemotionConfig {
            launcher: launcher.to_string_lossy().to_string(),
            project_dir: dir.path().to_path_buf(),
            bundle_dir: bundle_dir.clone(),
            log_level: "error".to_string(),
        });

        let entry = dir.path().join("index-1.jsx");
        let err = tokio_test::assert_err!(engine.bundle(&entry, &CancellationToken::new()).await);
        assert!(matches!(err, MediaError::EngineFailed { step: "bundle", .. }));
        assert!(bundle_dir.exists());
        assert!(!bundle_dir.join("bundle-index-1").exists());
    }
}
