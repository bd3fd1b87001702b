//! Segment declarations: contiguous gene ranges sharing parameters.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{ConfigError, GeneParams};

/// Which boundary each segment declares.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SegmentAnchor {
    /// `index` is the first gene of the segment.
    #[default]
    Start,
    /// `index` is the last gene of the segment.
    End,
}

/// A partition of the declared genome into segments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentLayout {
    #[serde(default)]
    pub anchor: SegmentAnchor,
    pub segments: Vec<SegmentDeclaration>,
}

/// One segment and its parameter overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDeclaration {
    pub index: usize,
    #[serde(flatten)]
    pub params: GeneParams,
}

impl SegmentLayout {
    /// Resolve segment boundaries into gene ranges covering `[0, length)`.
    pub fn ranges(&self, length: usize) -> Result<Vec<Range<usize>>, ConfigError> {
        if self.segments.is_empty() {
            return Err(ConfigError::InvalidSegment {
                path: "segments.segments".into(),
                reason: "at least one segment must be declared".into(),
            });
        }

        for (k, segment) in self.segments.iter().enumerate() {
            if segment.index >= length {
                return Err(ConfigError::InvalidSegment {
                    path: format!("segments.segments.{k}.index"),
                    reason: format!(
                        "index {} is outside the genome (length {length})",
                        segment.index
                    ),
                });
            }
            if k > 0 && segment.index <= self.segments[k - 1].index {
                return Err(ConfigError::InvalidSegment {
                    path: format!("segments.segments.{k}.index"),
                    reason: format!(
                        "index {} must be greater than the previous segment's {}",
                        segment.index,
                        self.segments[k - 1].index
                    ),
                });
            }
        }

        let count = self.segments.len();
        match self.anchor {
            SegmentAnchor::Start => {
                if self.segments[0].index != 0 {
                    return Err(ConfigError::InvalidSegment {
                        path: "segments.segments.0.index".into(),
                        reason: format!(
                            "first segment must start at gene 0, not {}",
                            self.segments[0].index
                        ),
                    });
                }
                Ok((0..count)
                    .map(|k| {
                        let start = self.segments[k].index;
                        let end = self.segments.get(k + 1).map_or(length, |s| s.index);
                        start..end
                    })
                    .collect())
            }
            SegmentAnchor::End => {
                let last = self.segments[count - 1].index;
                if last != length - 1 {
                    return Err(ConfigError::InvalidSegment {
                        path: format!("segments.segments.{}.index", count - 1),
                        reason: format!(
                            "last segment must end at gene {}, not {last}",
                            length - 1
                        ),
                    });
                }
                Ok((0..count)
                    .map(|k| {
                        let start = if k == 0 {
                            0
                        } else {
                            self.segments[k - 1].index + 1
                        };
                        start..self.segments[k].index + 1
                    })
                    .collect())
            }
        }
    }
}
