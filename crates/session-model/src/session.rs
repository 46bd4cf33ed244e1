//! Session metadata and the on-disk session directory.
//!
//! A session directory holds everything needed to rebuild a timeline:
//!
//! ```text
//! <root>/
//!   meta/session.json   metadata
//!   meta/events.jsonl   one event per line after a `#` header
//!   meta/points.json    the quantized point buffer
//!   audio/              raw PCM written by the capture side
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use inkcast_common::clock::TimeMs;
use inkcast_common::config::RecordingDefaults;

use crate::event::{self, Event, EventBody, EventKind};
use crate::point_buffer::{PointBuffer, ResampleConfig};

/// Session metadata (`meta/session.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Schema version.
    pub version: String,

    /// Human-readable session name.
    pub name: String,

    /// Unique session identifier (UUID).
    pub id: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Canvas and geometry settings used while recording.
    pub canvas: CanvasConfig,

    /// PCM layout of the narration track.
    pub audio: AudioFormat,

    /// Upper bound of recorded time across events and audio.
    #[serde(default)]
    pub total_time_recorded: TimeMs,

    /// Relative path of the raw PCM file, if one was captured.
    #[serde(default)]
    pub audio_file: Option<String>,
}

/// Canvas geometry settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Canvas height / width ratio.
    pub ratio: f64,

    pub resample: ResampleConfig,

    /// Maximum number of points in the geometry buffer.
    pub point_capacity: usize,
}

/// Mono PCM layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,

    /// Bytes per sample.
    pub sample_size: u32,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 40_000,
            sample_size: 2,
        }
    }
}

impl AudioFormat {
    /// Bytes per second of audio.
    pub fn bytes_per_second(&self) -> u64 {
        self.sample_size as u64 * self.sample_rate as u64
    }
}

impl SessionMeta {
    /// Create metadata from the configured recording defaults.
    pub fn new(name: impl Into<String>, defaults: &RecordingDefaults) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1.0".to_string(),
            name: name.into(),
            id: uuid_v4(),
            created_at: now.clone(),
            modified_at: now,
            canvas: CanvasConfig {
                ratio: defaults.canvas_ratio,
                resample: ResampleConfig {
                    spacing: defaults.resample_spacing,
                    y_scale: defaults.canvas_ratio,
                },
                point_capacity: defaults.point_capacity,
            },
            audio: AudioFormat {
                sample_rate: defaults.audio_sample_rate,
                sample_size: defaults.audio_sample_size,
            },
            total_time_recorded: 0,
            audio_file: None,
        }
    }

    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

/// A session loaded from disk.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    /// Filesystem path to the session directory.
    pub root: PathBuf,

    pub meta: SessionMeta,

    /// Event log, sorted by start time.
    pub events: Vec<Event>,

    pub points: PointBuffer,
}

impl LoadedSession {
    /// Load a session from a directory.
    ///
    /// Missing event or point files load as empty.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, SessionError> {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join("meta");

        let meta_path = meta_dir.join("session.json");
        let meta_json = read(&meta_path)?;
        let meta: SessionMeta =
            serde_json::from_str(&meta_json).map_err(|e| SessionError::ParseError {
                path: meta_path,
                source: e,
            })?;

        let events_path = meta_dir.join("events.jsonl");
        let events = if events_path.exists() {
            let jsonl = read(&events_path)?;
            event::parse_events(&jsonl).map_err(|e| SessionError::ParseError {
                path: events_path,
                source: e,
            })?
        } else {
            Vec::new()
        };

        let points_path = meta_dir.join("points.json");
        let points = if points_path.exists() {
            let json = read(&points_path)?;
            serde_json::from_str(&json).map_err(|e| SessionError::ParseError {
                path: points_path,
                source: e,
            })?
        } else {
            PointBuffer::new(meta.canvas.resample, meta.canvas.point_capacity)
        };

        tracing::debug!(
            root = %root.display(),
            events = events.len(),
            points = PointBuffer::len(&points),
            "Loaded session"
        );

        Ok(Self {
            root,
            meta,
            events,
            points,
        })
    }

    /// Save metadata, events and points to disk.
    pub fn save(&self) -> Result<(), SessionError> {
        let meta_dir = self.root.join("meta");
        std::fs::create_dir_all(&meta_dir).map_err(|e| SessionError::IoError {
            path: meta_dir.clone(),
            source: e,
        })?;

        let meta_path = meta_dir.join("session.json");
        let meta_json =
            serde_json::to_string_pretty(&self.meta).map_err(|e| SessionError::ParseError {
                path: meta_path.clone(),
                source: e,
            })?;
        write(&meta_path, meta_json)?;

        let events_path = meta_dir.join("events.jsonl");
        let jsonl = event::serialize_events(&self.events).map_err(|e| SessionError::ParseError {
            path: events_path.clone(),
            source: e,
        })?;
        write(&events_path, jsonl)?;

        let points_path = meta_dir.join("points.json");
        let points_json =
            serde_json::to_string(&self.points).map_err(|e| SessionError::ParseError {
                path: points_path.clone(),
                source: e,
            })?;
        write(&points_path, points_json)?;

        Ok(())
    }

    /// Create a new, empty session on disk with the standard layout.
    pub fn create(
        root: impl AsRef<Path>,
        name: impl Into<String>,
        defaults: &RecordingDefaults,
    ) -> Result<Self, SessionError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["meta", "audio"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| SessionError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let meta = SessionMeta::new(name, defaults);
        let points = PointBuffer::new(meta.canvas.resample, meta.canvas.point_capacity);
        let loaded = Self {
            root,
            meta,
            events: Vec::new(),
            points,
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Check the stored log against the timeline invariants.
    ///
    /// Returns one human-readable message per problem found.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];

        if let Some(pos) = self
            .events
            .windows(2)
            .position(|w| w[0].start_time > w[1].start_time)
        {
            errors.push(format!(
                "Events not sorted by start time at index {}",
                pos + 1
            ));
        }

        let mut seen = HashSet::new();
        let mut open_per_kind: HashMap<EventKind, usize> = HashMap::new();
        for ev in &self.events {
            if !seen.insert(ev.id) {
                errors.push(format!("Duplicate event id {}", ev.id));
            }
            if let Some(end) = ev.end_time {
                if end < ev.start_time {
                    errors.push(format!("Event {} ends before it starts", ev.id));
                }
            } else {
                *open_per_kind.entry(ev.kind()).or_default() += 1;
            }
            if ev.sample_count() == 0 {
                errors.push(format!("Event {} has no samples", ev.id));
            }
            if !ev.samples_well_formed() {
                errors.push(format!("Event {} has unordered samples", ev.id));
            }
            if let EventBody::Stroke(s) = &ev.body {
                if s.pb_end() > self.points.len() {
                    errors.push(format!(
                        "Stroke {} references point {} past buffer length {}",
                        ev.id,
                        s.pb_end(),
                        self.points.len()
                    ));
                }
            }
        }

        for (kind, count) in open_per_kind {
            if count > 1 {
                errors.push(format!("{count} open events of kind {kind:?}"));
            }
        }

        if let Some(audio) = &self.meta.audio_file {
            if !self.root.join(audio).exists() {
                errors.push(format!("Audio file missing: {audio}"));
            }
        }

        errors
    }

    /// Like [`LoadedSession::validate`], folding every report into one error.
    pub fn ensure_valid(&self) -> Result<(), SessionError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SessionError::ValidationError {
                message: errors.join("; "),
            })
        }
    }
}

fn read(path: &Path) -> Result<String, SessionError> {
    std::fs::read_to_string(path).map_err(|e| SessionError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write(path: &Path, contents: String) -> Result<(), SessionError> {
    std::fs::write(path, contents).map_err(|e| SessionError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors that can occur when working with session directories.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid session: {message}")]
    ValidationError { message: String },
}

/// Generate a time-seeded UUID v4 string.
fn uuid_v4() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFF_FFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3FFF) as u16) | 0x8000,
        (seed >> 76) & 0xFFFF_FFFF_FFFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventId, MarkerKind, Stroke};
    use crate::geometry::{Point2D, Rgb};
    use crate::sample::StrokeSample;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("inkcast_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_meta_uses_recording_defaults() {
        let meta = SessionMeta::new("Lecture", &RecordingDefaults::default());
        assert_eq!(meta.audio.sample_rate, 40_000);
        assert_eq!(meta.audio.sample_size, 2);
        assert!((meta.canvas.resample.y_scale - 2.0).abs() < 1e-9);
        assert_eq!(meta.id.len(), 36);
    }

    #[test]
    fn test_create_and_load_roundtrip() {
        let dir = temp_dir("session_roundtrip");
        let mut created =
            LoadedSession::create(&dir, "Roundtrip", &RecordingDefaults::default()).unwrap();

        let end = created.points.add_point(Point2D::new(0.0, 0.0));
        let mut stroke = Event::stroke(
            EventId(0),
            0,
            Stroke::pen(Rgb::BLACK, 3.0, 0),
            StrokeSample::new(0, Point2D::new(0.0, 0.0), end),
        );
        stroke.close(40);
        created.events.push(stroke);
        created
            .events
            .push(Event::marker(EventId(1), 50, MarkerKind::Undo));
        created.meta.total_time_recorded = 50;
        created.save().unwrap();

        let loaded = LoadedSession::load(&dir).unwrap();
        assert_eq!(loaded.meta.name, "Roundtrip");
        assert_eq!(loaded.meta.total_time_recorded, 50);
        assert_eq!(loaded.events, created.events);
        assert_eq!(loaded.points.len(), 1);
        assert!(loaded.validate().is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_session_reports_path() {
        let dir = temp_dir("session_missing");
        let err = LoadedSession::load(&dir).unwrap_err();
        assert!(err.to_string().contains("session.json"));
    }

    #[test]
    fn test_validate_reports_broken_log() {
        let dir = temp_dir("session_validate");
        let mut loaded =
            LoadedSession::create(&dir, "Broken", &RecordingDefaults::default()).unwrap();
        loaded
            .events
            .push(Event::marker(EventId(4), 100, MarkerKind::Undo));
        loaded
            .events
            .push(Event::marker(EventId(4), 10, MarkerKind::Undo));
        loaded.events.push(Event::stroke(
            EventId(5),
            200,
            Stroke::pen(Rgb::BLACK, 3.0, 0),
            StrokeSample::new(200, Point2D::new(0.0, 0.0), 99),
        ));
        loaded.meta.audio_file = Some("audio/narration.pcm".to_string());

        let errors = loaded.validate();
        assert!(errors.iter().any(|e| e.contains("not sorted")));
        assert!(errors.iter().any(|e| e.contains("Duplicate event id")));
        assert!(errors.iter().any(|e| e.contains("past buffer length")));
        assert!(errors.iter().any(|e| e.contains("Audio file missing")));
        assert!(matches!(
            loaded.ensure_valid(),
            Err(SessionError::ValidationError { .. })
        ));

        std::fs::remove_dir_all(&dir).ok();
    }
}
