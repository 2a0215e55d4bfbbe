//! Clip identifiers and reaction clip sets.
//!
//! A clip is a named animated-image asset played for a fixed duration. A
//! [`ClipSpec`] pairs an idle clip with the ordered list of reaction clips
//! played on a tap. Specs are validated when built so that a bad
//! configuration is rejected at startup rather than during playback.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Idle clip of the built-in ragdoll bear.
const BEAR_IDLE: &str = "ragdoll-bear-standing.gif";

/// Reaction clips of the built-in ragdoll bear, with durations in milliseconds.
const BEAR_REACTION: [(&str, u64); 4] = [
    ("ragdoll-bear-action-1.gif", 3500),
    ("ragdoll-bear-action-2.gif", 4950),
    ("ragdoll-bear-action-3.gif", 4950),
    ("ragdoll-bear-action-4.gif", 4500),
];

/// Identifier of an animated-image asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(String);

impl ClipId {
    /// Create a clip identifier from an asset name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The asset name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClipId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A single reaction clip and how long it plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    /// The asset to show.
    pub id: ClipId,
    /// How long the clip stays on screen.
    pub duration: Duration,
}

/// The idle clip plus the ordered reaction clips played on a tap.
///
/// Always holds at least one reaction clip, and every duration is non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSpec {
    idle: ClipId,
    reaction: Vec<Clip>,
}

/// On-disk layout of a clip set.
#[derive(Debug, Deserialize)]
struct ClipFile {
    idle: String,
    clips: Vec<String>,
    durations: Vec<f64>,
}

impl ClipSpec {
    /// Build a spec from clip identifiers and durations paired index-for-index.
    ///
    /// # Errors
    ///
    /// Returns `Error::ClipMismatch` if the two lists differ in length,
    /// `Error::EmptyReaction` if there are no clips, and
    /// `Error::InvalidDuration` if any duration is zero.
    pub fn new(
        idle: impl Into<ClipId>,
        clips: Vec<ClipId>,
        durations: Vec<Duration>,
    ) -> Result<Self> {
        if clips.len() != durations.len() {
            return Err(Error::ClipMismatch {
                clips: clips.len(),
                durations: durations.len(),
            });
        }
        if clips.is_empty() {
            return Err(Error::EmptyReaction);
        }

        let reaction = clips
            .into_iter()
            .zip(durations)
            .map(|(id, duration)| {
                if duration.is_zero() {
                    Err(Error::InvalidDuration {
                        clip: id.to_string(),
                        seconds: 0.0,
                    })
                } else {
                    Ok(Clip { id, duration })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            idle: idle.into(),
            reaction,
        })
    }

    /// Build a spec from durations given in (fractional) seconds.
    ///
    /// # Errors
    ///
    /// As [`ClipSpec::new`], plus `Error::InvalidDuration` for negative or
    /// non-finite values.
    pub fn from_secs(idle: impl Into<ClipId>, clips: Vec<ClipId>, secs: &[f64]) -> Result<Self> {
        if clips.len() != secs.len() {
            return Err(Error::ClipMismatch {
                clips: clips.len(),
                durations: secs.len(),
            });
        }

        let durations = clips
            .iter()
            .zip(secs)
            .map(|(id, &seconds)| {
                Duration::try_from_secs_f64(seconds).map_err(|_| Error::InvalidDuration {
                    clip: id.to_string(),
                    seconds,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(idle, clips, durations)
    }

    /// Load a clip set from a JSON file.
    ///
    /// The file holds `{ "idle": ..., "clips": [...], "durations": [...] }`
    /// with durations in seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if its
    /// contents fail validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::ClipReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let file: ClipFile =
            serde_json::from_str(&content).map_err(|source| Error::ClipParseError {
                path: path.to_path_buf(),
                source,
            })?;

        let clips = file.clips.into_iter().map(ClipId::from).collect();
        Self::from_secs(file.idle, clips, &file.durations)
    }

    /// The built-in ragdoll bear clip set.
    pub fn ragdoll_bear() -> Self {
        Self {
            idle: ClipId::from(BEAR_IDLE),
            reaction: BEAR_REACTION
                .iter()
                .map(|&(name, millis)| Clip {
                    id: ClipId::from(name),
                    duration: Duration::from_millis(millis),
                })
                .collect(),
        }
    }

    /// The clip shown while not reacting.
    pub fn idle(&self) -> &ClipId {
        &self.idle
    }

    /// The reaction clips in playback order.
    pub fn reaction(&self) -> &[Clip] {
        &self.reaction
    }

    /// Total time a full reaction takes.
    pub fn total_duration(&self) -> Duration {
        self.reaction.iter().map(|c| c.duration).sum()
    }
}

impl Default for ClipSpec {
    fn default() -> Self {
        Self::ragdoll_bear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ClipId> {
        names.iter().map(|n| ClipId::from(*n)).collect()
    }

    #[test]
    fn test_ragdoll_bear_defaults() {
        let spec = ClipSpec::ragdoll_bear();
        assert_eq!(spec.idle().as_str(), BEAR_IDLE);
        assert_eq!(spec.reaction().len(), 4);
        assert_eq!(spec.reaction()[1].duration, Duration::from_millis(4950));
        assert_eq!(spec.total_duration(), Duration::from_millis(17_900));
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let result = ClipSpec::new(
            "idle.gif",
            ids(&["a.gif", "b.gif"]),
            vec![Duration::from_secs(1)],
        );
        assert!(matches!(
            result,
            Err(Error::ClipMismatch {
                clips: 2,
                durations: 1
            })
        ));
    }

    #[test]
    fn test_new_rejects_empty_reaction() {
        let result = ClipSpec::new("idle.gif", vec![], vec![]);
        assert!(matches!(result, Err(Error::EmptyReaction)));
    }

    #[test]
    fn test_new_rejects_zero_duration() {
        let result = ClipSpec::new(
            "idle.gif",
            ids(&["a.gif", "b.gif"]),
            vec![Duration::from_secs(1), Duration::ZERO],
        );
        match result {
            Err(Error::InvalidDuration { clip, .. }) => assert_eq!(clip, "b.gif"),
            other => panic!("expected InvalidDuration, got {:?}", other),
        }
    }

    #[test]
    fn test_from_secs_rejects_negative_and_nan() {
        let result = ClipSpec::from_secs("idle.gif", ids(&["a.gif"]), &[-2.0]);
        assert!(matches!(result, Err(Error::InvalidDuration { .. })));

        let result = ClipSpec::from_secs("idle.gif", ids(&["a.gif"]), &[f64::NAN]);
        assert!(matches!(result, Err(Error::InvalidDuration { .. })));
    }

    #[test]
    fn test_from_secs_rejects_mismatch_before_parsing_durations() {
        let result = ClipSpec::from_secs("idle.gif", ids(&["a.gif"]), &[1.0, -1.0]);
        assert!(matches!(result, Err(Error::ClipMismatch { .. })));
    }

    #[test]
    fn test_from_secs_builds_spec() {
        let spec = ClipSpec::from_secs("idle.gif", ids(&["a.gif", "b.gif"]), &[0.25, 1.5])
            .expect("valid spec");
        assert_eq!(spec.reaction()[0].duration, Duration::from_millis(250));
        assert_eq!(spec.total_duration(), Duration::from_millis(1750));
        assert_eq!(spec.idle().as_str(), "idle.gif");
        assert_eq!(spec.reaction()[1].id.as_str(), "b.gif");
    }

    #[test]
    fn test_load_from_file() {
        let temp_path = std::env::temp_dir().join("bearpet_test_clips.json");
        std::fs::write(
            &temp_path,
            r#"{"idle": "sit.gif", "clips": ["jump.gif", "spin.gif"], "durations": [1.0, 2.5]}"#,
        )
        .unwrap();

        let spec = ClipSpec::load(&temp_path).expect("should load");
        assert_eq!(spec.idle().as_str(), "sit.gif");
        assert_eq!(spec.reaction()[1].id.as_str(), "spin.gif");
        assert_eq!(spec.reaction()[1].duration, Duration::from_millis(2500));

        std::fs::remove_file(&temp_path).ok();
    }

    #[test]
    fn test_load_mismatched_file_fails_fast() {
        let temp_path = std::env::temp_dir().join("bearpet_test_clips_mismatch.json");
        std::fs::write(
            &temp_path,
            r#"{"idle": "sit.gif", "clips": ["jump.gif", "spin.gif"], "durations": [1.0]}"#,
        )
        .unwrap();

        let result = ClipSpec::load(&temp_path);
        assert!(matches!(result, Err(Error::ClipMismatch { .. })));

        std::fs::remove_file(&temp_path).ok();
    }

    #[test]
    fn test_load_missing_and_invalid_files() {
        let missing = std::env::temp_dir().join("bearpet_no_such_clips.json");
        assert!(matches!(
            ClipSpec::load(&missing),
            Err(Error::ClipReadError { .. })
        ));

        let temp_path = std::env::temp_dir().join("bearpet_test_clips_invalid.json");
        std::fs::write(&temp_path, "not json").unwrap();
        assert!(matches!(
            ClipSpec::load(&temp_path),
            Err(Error::ClipParseError { .. })
        ));
        std::fs::remove_file(&temp_path).ok();
    }
}
