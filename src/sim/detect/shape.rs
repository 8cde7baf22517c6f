//! Freehand triangle recognition (level 6)
//!
//! A drag is decimated into a point buffer. On release we look for sharp
//! turns along the path, keep at most three, and accept the drawing if they
//! form a closed triangle of reasonable size.

use std::fmt;

use glam::Vec2;

use crate::config::ShapeTuning;

/// A sharp turn found on the path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub point: Vec2,
    /// Vertex angle in degrees (180 = straight)
    pub angle: f32,
    /// Index into the decimated buffer
    pub index: usize,
}

/// Why a drawing was not accepted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    TooFewPoints(usize),
    CornerCount(usize),
    CornerAngle(f32),
    NotClosed { gap: f32, limit: f32 },
    TooSmall(f32),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooFewPoints(n) => write!(f, "only {} points drawn", n),
            Rejection::CornerCount(n) => write!(f, "found {} corners, need 3", n),
            Rejection::CornerAngle(a) => write!(f, "corner angle {:.0}° out of range", a),
            Rejection::NotClosed { gap, limit } => {
                write!(f, "shape not closed ({:.0}px gap, max {:.0}px)", gap, limit)
            }
            Rejection::TooSmall(area) => write!(f, "triangle too small ({:.0}px²)", area),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeVerdict {
    Accepted { corners: [Corner; 3], area: f32 },
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    Idle,
    Drawing,
    Accepted,
}

/// Angle at `vertex` between the rays to `from` and `to`, in degrees.
/// `None` when either ray has zero length.
pub fn vertex_angle(from: Vec2, vertex: Vec2, to: Vec2) -> Option<f32> {
    let a = from - vertex;
    let b = to - vertex;
    let mags = a.length() * b.length();
    if mags == 0.0 {
        return None;
    }
    let cos = (a.dot(b) / mags).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Shoelace area of a triangle
pub fn triangle_area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    ((a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y)) / 2.0).abs()
}

/// Sharp turns along `points`, at most three, in path order
pub fn detect_corners(points: &[Vec2], tuning: &ShapeTuning) -> Vec<Corner> {
    let la = tuning.look_ahead.max(1);
    let mut corners: Vec<Corner> = Vec::new();
    if points.len() < la * 2 + 1 {
        return corners;
    }

    let max_angle = 180.0 - tuning.angle_threshold;
    for i in la..points.len() - la {
        let Some(angle) = vertex_angle(points[i - la], points[i], points[i + la]) else {
            continue;
        };
        if angle >= max_angle {
            continue;
        }
        let far_enough = corners
            .last()
            .is_none_or(|c| c.point.distance(points[i]) > tuning.min_corner_distance);
        if far_enough {
            corners.push(Corner {
                point: points[i],
                angle,
                index: i,
            });
        }
    }

    if corners.len() > 3 {
        corners.sort_by(|a, b| a.angle.total_cmp(&b.angle));
        corners.truncate(3);
        corners.sort_by_key(|c| c.index);
    }
    corners
}

/// Judge a finished path
pub fn classify(points: &[Vec2], surface: Vec2, tuning: &ShapeTuning) -> ShapeVerdict {
    if points.len() < 3 {
        return ShapeVerdict::Rejected(Rejection::TooFewPoints(points.len()));
    }

    let corners = detect_corners(points, tuning);
    log::debug!(
        "Shape: {} points, {} corners {:?}",
        points.len(),
        corners.len(),
        corners.iter().map(|c| c.angle.round()).collect::<Vec<_>>()
    );
    let corners: [Corner; 3] = match corners.try_into() {
        Ok(c) => c,
        Err(found) => return ShapeVerdict::Rejected(Rejection::CornerCount(found.len())),
    };

    if let Some(bad) = corners
        .iter()
        .find(|c| c.angle <= tuning.min_corner_angle || c.angle >= tuning.max_corner_angle)
    {
        return ShapeVerdict::Rejected(Rejection::CornerAngle(bad.angle));
    }

    let (first, last) = (points[0], points[points.len() - 1]);
    let gap = first.distance(last);
    let limit = surface.min_element() * tuning.closure_ratio;
    if gap >= limit {
        return ShapeVerdict::Rejected(Rejection::NotClosed { gap, limit });
    }

    let area = triangle_area(corners[0].point, corners[1].point, corners[2].point);
    if area <= tuning.min_area {
        return ShapeVerdict::Rejected(Rejection::TooSmall(area));
    }

    ShapeVerdict::Accepted { corners, area }
}

/// Collects one drag at a time and judges it on release
#[derive(Debug, Clone)]
pub struct TriangleDetector {
    tuning: ShapeTuning,
    surface: Vec2,
    points: Vec<Vec2>,
    phase: DrawPhase,
}

impl TriangleDetector {
    pub fn new(tuning: ShapeTuning, surface: Vec2) -> Self {
        Self {
            tuning,
            surface,
            points: Vec::new(),
            phase: DrawPhase::Idle,
        }
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Start a new drag; any previous buffer is discarded
    pub fn begin(&mut self, pos: Vec2) {
        if self.phase == DrawPhase::Accepted {
            return;
        }
        self.points.clear();
        self.points.push(pos);
        self.phase = DrawPhase::Drawing;
    }

    /// Add a point if it is far enough from the last one. Returns whether
    /// it was kept.
    pub fn extend(&mut self, pos: Vec2) -> bool {
        if self.phase != DrawPhase::Drawing {
            return false;
        }
        let far = self
            .points
            .last()
            .is_none_or(|last| last.distance(pos) > self.tuning.min_point_distance);
        if far {
            self.points.push(pos);
        }
        far
    }

    /// End the drag. The buffer is consumed either way; `None` when no
    /// drag was in progress.
    pub fn finish(&mut self) -> Option<ShapeVerdict> {
        if self.phase != DrawPhase::Drawing {
            return None;
        }
        let points = std::mem::take(&mut self.points);
        let verdict = classify(&points, self.surface, &self.tuning);
        self.phase = match verdict {
            ShapeVerdict::Accepted { .. } => DrawPhase::Accepted,
            ShapeVerdict::Rejected(_) => DrawPhase::Idle,
        };
        Some(verdict)
    }

    /// Abandon the drag (pointer cancelled)
    pub fn cancel(&mut self) {
        self.points.clear();
        if self.phase == DrawPhase::Drawing {
            self.phase = DrawPhase::Idle;
        }
    }
}
