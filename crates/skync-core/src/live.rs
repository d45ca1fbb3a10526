//! Live buffer for strokes other peers are still drawing.
//!
//! Remote `drawing` segments are collected here so the renderer can show a
//! stroke before its author lets go. The entry is dropped when the stroke's
//! completion arrives; by then the replica holds the committed copy. Entries
//! of a peer that disconnects mid-stroke are dropped with its departure.

use crate::drawable::{ConnectionId, DrawableId, StrokePoint};
use crate::protocol::StrokeSegment;
use std::collections::HashMap;

/// One unfinished stroke and the peer drawing it.
#[derive(Debug, Clone)]
struct LiveStroke {
    author: ConnectionId,
    points: Vec<StrokePoint>,
}

#[derive(Debug, Clone, Default)]
pub struct LiveBuffer {
    strokes: HashMap<DrawableId, LiveStroke>,
}

impl LiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment drawn by `author`. An unseen stroke starts with both
    /// segment ends. Returns true if this segment started a new entry.
    pub fn push_segment(&mut self, author: &str, segment: &StrokeSegment) -> bool {
        match self.strokes.get_mut(&segment.stroke_id) {
            Some(live) => {
                live.points.push(segment.end());
                false
            }
            None => {
                self.strokes.insert(
                    segment.stroke_id.clone(),
                    LiveStroke {
                        author: author.to_string(),
                        points: vec![segment.start(), segment.end()],
                    },
                );
                true
            }
        }
    }

    /// Drop the entry of a completed stroke, returning its points.
    pub fn complete(&mut self, stroke_id: &str) -> Option<Vec<StrokePoint>> {
        self.strokes.remove(stroke_id).map(|live| live.points)
    }

    /// Drop every stroke `author` was still drawing.
    /// Returns the number of entries removed.
    pub fn drop_author(&mut self, author: &str) -> usize {
        let before = self.strokes.len();
        self.strokes.retain(|_, live| live.author != author);
        before - self.strokes.len()
    }

    pub fn get(&self, stroke_id: &str) -> Option<&[StrokePoint]> {
        self.strokes.get(stroke_id).map(|live| live.points.as_slice())
    }

    /// Peer drawing a stroke.
    pub fn author(&self, stroke_id: &str) -> Option<&str> {
        self.strokes.get(stroke_id).map(|live| live.author.as_str())
    }

    pub fn contains(&self, stroke_id: &str) -> bool {
        self.strokes.contains_key(stroke_id)
    }

    /// In-progress strokes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[StrokePoint])> {
        self.strokes
            .iter()
            .map(|(id, live)| (id.as_str(), live.points.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawable::PenStyle;

    fn segment(id: &str, from: (f64, f64), to: (f64, f64)) -> StrokeSegment {
        let style = PenStyle::default();
        StrokeSegment::new(
            id,
            &StrokePoint::new(from.0, from.1, &style),
            &StrokePoint::new(to.0, to.1, &style),
        )
    }

    #[test]
    fn test_first_segment_seeds_two_points() {
        let mut live = LiveBuffer::new();
        assert!(live.push_segment("peer", &segment("s", (0.0, 0.0), (5.0, 5.0))));
        let points = live.get("s").unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].x).abs() < f64::EPSILON);
        assert!((points[1].x - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_later_segments_append() {
        let mut live = LiveBuffer::new();
        live.push_segment("peer", &segment("s", (0.0, 0.0), (1.0, 1.0)));
        assert!(!live.push_segment("peer", &segment("s", (1.0, 1.0), (2.0, 2.0))));
        assert!(!live.push_segment("peer", &segment("s", (2.0, 2.0), (3.0, 3.0))));
        assert_eq!(live.get("s").map(<[StrokePoint]>::len), Some(4));
    }

    #[test]
    fn test_complete_removes_entry() {
        let mut live = LiveBuffer::new();
        live.push_segment("peer", &segment("a", (0.0, 0.0), (1.0, 1.0)));
        live.push_segment("peer", &segment("b", (0.0, 0.0), (1.0, 1.0)));

        assert!(live.complete("a").is_some());
        assert!(live.complete("a").is_none());
        assert!(!live.contains("a"));
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn test_drop_author_keeps_other_peers() {
        let mut live = LiveBuffer::new();
        live.push_segment("peer-a", &segment("a1", (0.0, 0.0), (1.0, 1.0)));
        live.push_segment("peer-a", &segment("a2", (0.0, 0.0), (1.0, 1.0)));
        live.push_segment("peer-b", &segment("b1", (0.0, 0.0), (1.0, 1.0)));
        assert_eq!(live.author("a1"), Some("peer-a"));

        assert_eq!(live.drop_author("peer-a"), 2);
        assert_eq!(live.drop_author("peer-a"), 0);
        assert!(!live.contains("a1"));
        assert_eq!(live.author("b1"), Some("peer-b"));
        assert_eq!(live.len(), 1);
    }
}
