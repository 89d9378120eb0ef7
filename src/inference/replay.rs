//! Landmark replay backend
//!
//! Recordings are JSON lines. Each line is either `null` (no hand in that
//! frame) or an array of 21 `[x, y, z]` triples. Blank lines and lines
//! starting with `#` are ignored.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;

use super::{DetectorFactory, DetectorOptions, InitializationError, LandmarkDetector};
use crate::gesture::HandLandmarkSet;
use crate::pipeline::types::VideoFrame;

/// Parse a recording into one entry per detection call
pub fn parse_recording(text: &str) -> Result<Vec<Option<HandLandmarkSet>>> {
    let mut entries = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let triples: Option<Vec<[f32; 3]>> = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid landmark record", index + 1))?;

        let hand = match triples {
            Some(triples) => Some(
                HandLandmarkSet::from_triples(&triples)
                    .with_context(|| format!("line {}", index + 1))?,
            ),
            None => None,
        };
        entries.push(hand);
    }

    Ok(entries)
}

/// Loads a recording from disk on `init`
pub struct ReplayDetectorFactory {
    path: PathBuf,
    looping: bool,
}

impl ReplayDetectorFactory {
    pub fn new(path: impl Into<PathBuf>, looping: bool) -> Self {
        Self {
            path: path.into(),
            looping,
        }
    }
}

#[async_trait]
impl DetectorFactory for ReplayDetectorFactory {
    async fn init(
        &self,
        options: &DetectorOptions,
    ) -> Result<Box<dyn LandmarkDetector>, InitializationError> {
        if options.num_hands != 1 {
            return Err(InitializationError::UnsupportedOptions(format!(
                "replay recordings hold one hand, {} requested",
                options.num_hands
            )));
        }

        let model_error = |reason: String| InitializationError::ModelLoad {
            path: self.path.display().to_string(),
            reason,
        };

        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| model_error(e.to_string()))?;
        let entries = parse_recording(&text).map_err(|e| model_error(format!("{e:#}")))?;
        if entries.is_empty() {
            return Err(model_error("recording is empty".to_string()));
        }

        info!(
            "Loaded {} landmark records from {}{}",
            entries.len(),
            self.path.display(),
            if self.looping { " (looping)" } else { "" }
        );

        Ok(Box::new(ReplayDetector::new(entries, self.looping)))
    }
}

/// Returns recorded landmark sets, one per detection call
pub struct ReplayDetector {
    entries: Vec<Option<HandLandmarkSet>>,
    cursor: usize,
    looping: bool,
    last_timestamp_ms: Option<f64>,
}

impl ReplayDetector {
    pub fn new(entries: Vec<Option<HandLandmarkSet>>, looping: bool) -> Self {
        Self {
            entries,
            cursor: 0,
            looping,
            last_timestamp_ms: None,
        }
    }

    /// Number of records consumed so far
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        !self.looping && self.cursor >= self.entries.len()
    }
}

#[async_trait]
impl LandmarkDetector for ReplayDetector {
    async fn detect(
        &mut self,
        _frame: &VideoFrame,
        timestamp_ms: f64,
    ) -> Result<Option<HandLandmarkSet>> {
        if let Some(last) = self.last_timestamp_ms {
            if timestamp_ms <= last {
                bail!("timestamp {timestamp_ms}ms is not after previous {last}ms");
            }
        }
        self.last_timestamp_ms = Some(timestamp_ms);

        if self.entries.is_empty() {
            return Ok(None);
        }
        if self.cursor >= self.entries.len() {
            if !self.looping {
                return Ok(None);
            }
            debug!("Replay wrapped after {} records", self.entries.len());
            self.cursor = 0;
        }

        let hand = self.entries[self.cursor].clone();
        self.cursor += 1;
        Ok(hand)
    }

    fn close(&mut self) {
        debug!("Replay detector closed at record {}", self.cursor);
        self.entries.clear();
    }
}
