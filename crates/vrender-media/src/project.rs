//! Remotion project generation.
//!
//! Every request gets its own two-file project in the work directory:
//!
//! - `<id>-index.jsx` registers exactly one `<Composition>` whose id is the
//!   request's component name
//! - `<id>-Video.jsx` holds the component itself
//!
//! The component file name is derived from the entry file name, so cleanup
//! only needs the entry path. Every request value is embedded as a JSON
//! string literal, which is also a valid JS literal.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use vrender_models::{frames_for, RenderId, RenderRequest};

use crate::error::{MediaError, MediaResult};

/// Suffix of the generated entry file.
pub const ENTRY_SUFFIX: &str = "index.jsx";

/// Suffix of the generated component file.
pub const COMPONENT_SUFFIX: &str = "Video.jsx";

/// Project generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Directory the project files are written to (inside the Remotion project)
    pub work_dir: PathBuf,
    /// Composition frame rate
    pub fps: u32,
    /// Composition width in pixels
    pub width: u32,
    /// Composition height in pixels
    pub height: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("remotion/src/dynamic"),
            fps: 30,
            width: 1080,
            height: 1920,
        }
    }
}

impl GeneratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("REMOTION_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            fps: std::env::var("RENDER_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|fps| *fps > 0)
                .unwrap_or(defaults.fps),
            width: std::env::var("RENDER_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.width),
            height: std::env::var("RENDER_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.height),
        }
    }
}

/// The two files generated for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProject {
    pub id: RenderId,
    /// Entry point handed to the bundler
    pub entry_path: PathBuf,
    /// Component file, derived from `entry_path`
    pub component_path: PathBuf,
    /// Id of the registered composition
    pub component_name: String,
    /// Duration declared on the composition
    pub duration_in_frames: u64,
}

/// Path of the component file belonging to `entry`.
///
/// `…index.jsx` / `…index.js` → `…Video.jsx`; `None` for anything else.
pub fn component_path_for(entry: &Path) -> Option<PathBuf> {
    let name = entry.file_name()?.to_str()?;
    let stem = name
        .strip_suffix("index.jsx")
        .or_else(|| name.strip_suffix("index.js"))?;
    Some(entry.with_file_name(format!("{}{}", stem, COMPONENT_SUFFIX)))
}

/// Write the project for `request` and return its description.
///
/// Nothing is written when the duration yields no frames. If the second
/// file cannot be written the first one is removed again.
pub async fn generate_project(
    request: &RenderRequest,
    config: &GeneratorConfig,
    id: RenderId,
) -> MediaResult<GeneratedProject> {
    let fps = f64::from(config.fps);
    let frames = frames_for(request.duration_in_seconds, fps);
    if frames < 1 {
        return Err(MediaError::NoFrames {
            seconds: request.duration_in_seconds,
            fps,
        });
    }
    let duration_in_frames = frames as u64;

    let component_name = id.component_name();
    let entry_path = config.work_dir.join(format!("{}-{}", id, ENTRY_SUFFIX));
    let component_path = component_path_for(&entry_path)
        .ok_or_else(|| MediaError::internal("entry file name does not end in index.jsx"))?;
    let component_file = component_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MediaError::internal("component file name is not UTF-8"))?
        .to_string();

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .map_err(|source| MediaError::Generation {
            path: config.work_dir.clone(),
            source,
        })?;

    let component_source = render_component(request, config.fps)?;
    let entry_source = render_entry(&component_name, &component_file, duration_in_frames, config)?;

    tokio::fs::write(&component_path, component_source)
        .await
        .map_err(|source| MediaError::Generation {
            path: component_path.clone(),
            source,
        })?;

    if let Err(source) = tokio::fs::write(&entry_path, entry_source).await {
        if let Err(e) = tokio::fs::remove_file(&component_path).await {
            warn!(path = %component_path.display(), "Failed to remove partial project file: {}", e);
        }
        return Err(MediaError::Generation {
            path: entry_path,
            source,
        });
    }

    info!(
        component = %component_name,
        entry = %entry_path.display(),
        frames = duration_in_frames,
        "Generated dynamic project"
    );

    Ok(GeneratedProject {
        id,
        entry_path,
        component_path,
        component_name,
        duration_in_frames,
    })
}

/// Composition properties as declared by a generated entry file.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredComposition {
    pub id: String,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub duration_in_frames: u64,
}

/// Read back the composition an entry file registers.
///
/// Only understands the layout [`generate_project`] writes: one
/// `prop={value}` per line inside the `<Composition>` element.
pub fn declared_composition(entry_source: &str) -> Option<DeclaredComposition> {
    let prop = |name: &str| {
        let prefix = format!("{}={{", name);
        entry_source.lines().find_map(|line| {
            line.trim()
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix('}'))
                .map(str::to_string)
        })
    };

    Some(DeclaredComposition {
        id: serde_json::from_str(&prop("id")?).ok()?,
        fps: prop("fps")?.parse().ok()?,
        width: prop("width")?.parse().ok()?,
        height: prop("height")?.parse().ok()?,
        duration_in_frames: prop("durationInFrames")?.parse().ok()?,
    })
}

const ENTRY_TEMPLATE: &str = r#"import React from "react";
import { Composition, registerRoot } from "remotion";
import { DynamicVideo } from __COMPONENT_IMPORT__;

const RemotionRoot = () => {
  return (
    <Composition
      id={__COMPOSITION_ID__}
      component={DynamicVideo}
      durationInFrames={__DURATION_IN_FRAMES__}
      fps={__FPS__}
      width={__WIDTH__}
      height={__HEIGHT__}
    />
  );
};

registerRoot(RemotionRoot);
"#;

const COMPONENT_TEMPLATE: &str = r#"import React from "react";
import { AbsoluteFill, Audio, OffthreadVideo, Sequence } from "remotion";

const TITLE_TEXT = __TITLE_TEXT__;
const VIDEO_SOURCE = __VIDEO_SOURCE__;
const DEMO_VIDEO_SOURCE = __DEMO_VIDEO_SOURCE__;
const AUDIO_SOURCE = __AUDIO_SOURCE__;
const AUDIO_OFFSET_FRAMES = __AUDIO_OFFSET_FRAMES__;

const fill = { width: "100%", height: "100%", objectFit: "cover" };

const Pane = ({ src }) => (
  <div style={{ flex: 1, position: "relative", overflow: "hidden" }}>
    {src ? <OffthreadVideo src={src} style={fill} /> : null}
  </div>
);

export const DynamicVideo = () => {
  return (
    <AbsoluteFill style={{ backgroundColor: "black" }}>
__BODY__
__AUDIO__
      <AbsoluteFill
        style={{
          justifyContent: __JUSTIFY_CONTENT__,
          alignItems: "center",
          padding: 80,
        }}
      >
        <h1
          style={{
            color: "white",
            fontSize: 72,
            fontFamily: "sans-serif",
            textAlign: "center",
            textShadow: "0 4px 16px rgba(0, 0, 0, 0.8)",
            margin: 0,
          }}
        >
          {TITLE_TEXT}
        </h1>
      </AbsoluteFill>
    </AbsoluteFill>
  );
};
"#;

fn render_entry(
    component_name: &str,
    component_file: &str,
    duration_in_frames: u64,
    config: &GeneratorConfig,
) -> MediaResult<String> {
    let import = format!("./{}", component_file);
    Ok(fill_template(
        ENTRY_TEMPLATE,
        &[
            ("__COMPONENT_IMPORT__", js_literal(&import)?),
            ("__COMPOSITION_ID__", js_literal(component_name)?),
            ("__DURATION_IN_FRAMES__", duration_in_frames.to_string()),
            ("__FPS__", config.fps.to_string()),
            ("__WIDTH__", config.width.to_string()),
            ("__HEIGHT__", config.height.to_string()),
        ],
    ))
}

fn render_component(request: &RenderRequest, fps: u32) -> MediaResult<String> {
    let body = match request.split_position.filter(|_| request.split_screen) {
        Some(split) => {
            let direction = if split.is_horizontal() { "row" } else { "column" };
            let (first, second) = if split.main_first() {
                ("VIDEO_SOURCE", "DEMO_VIDEO_SOURCE")
            } else {
                ("DEMO_VIDEO_SOURCE", "VIDEO_SOURCE")
            };
            format!(
                "      <AbsoluteFill style={{{{ flexDirection: \"{}\" }}}}>\n        <Pane src={{{}}} />\n        <Pane src={{{}}} />\n      </AbsoluteFill>",
                direction, first, second
            )
        }
        None => "      {VIDEO_SOURCE ? <OffthreadVideo src={VIDEO_SOURCE} style={fill} /> : null}".to_string(),
    };

    let audio = if request.enable_audio {
        "      <Sequence from={AUDIO_OFFSET_FRAMES}>\n        <Audio src={AUDIO_SOURCE} />\n      </Sequence>"
    } else {
        "      {/* no additional audio track */}"
    };

    let audio_offset_frames = frames_for(request.audio_offset_in_seconds, f64::from(fps));
    debug!(
        split = ?request.split_position,
        audio = request.enable_audio,
        audio_offset_frames,
        "Rendering component template"
    );

    Ok(fill_template(
        COMPONENT_TEMPLATE,
        &[
            ("__TITLE_TEXT__", js_literal(&request.title_text)?),
            ("__VIDEO_SOURCE__", js_literal(&request.video_source_url)?),
            ("__DEMO_VIDEO_SOURCE__", js_literal(&request.demo_video_source_url)?),
            ("__AUDIO_SOURCE__", js_literal(&request.audio_source_url)?),
            ("__AUDIO_OFFSET_FRAMES__", audio_offset_frames.to_string()),
            ("__JUSTIFY_CONTENT__", js_literal(request.text_position.justify_content())?),
            ("__BODY__", body),
            ("__AUDIO__", audio.to_string()),
        ],
    ))
}

/// Serialize a value as a JS literal (`null` for `None`).
fn js_literal<T: Serialize + ?Sized>(value: &T) -> MediaResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Single pass over `template`; substituted text is never rescanned.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("__") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push_str("__");
                rest = &tail[2..];
            }
        }
    }

    out.push_str(rest);
    out
}
