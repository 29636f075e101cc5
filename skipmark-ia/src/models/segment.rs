//! Detected segment boundaries

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A detected recurring segment (intro) within one episode
///
/// Times are seconds from stream start. Existence of a segment for an
/// episode id is what marks that episode as "already analyzed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSegment {
    /// Episode the segment belongs to
    pub episode_id: Uuid,
    /// Segment start (seconds)
    pub start: f64,
    /// Segment end (seconds)
    pub end: f64,
}

impl MediaSegment {
    /// Segment length in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// A segment is usable when it spans a positive amount of time
    pub fn is_valid(&self) -> bool {
        self.end > self.start && self.start >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_and_validity() {
        let segment = MediaSegment {
            episode_id: Uuid::new_v4(),
            start: 12.5,
            end: 98.0,
        };
        assert!((segment.duration() - 85.5).abs() < f64::EPSILON);
        assert!(segment.is_valid());
    }

    #[test]
    fn test_degenerate_segment_is_invalid() {
        let segment = MediaSegment {
            episode_id: Uuid::new_v4(),
            start: 30.0,
            end: 30.0,
        };
        assert!(!segment.is_valid());
    }
}
