//! Separating axis search with support points.

use vek::Vec2;

use crate::{body::Body, math::VecExt};

/// Best separating axis of `body` against `other`.
#[derive(Debug, Clone, Copy)]
pub struct SeparatingAxis {
    /// Edge index on `body` whose outward normal is the axis.
    pub edge: usize,
    /// Support separation along the axis, negative while penetrating.
    pub separation: f64,
}

/// Find the edge of `body` that separates it most from `other`.
///
/// For every edge normal the deepest vertex of `other` is projected onto it;
/// the edge where that deepest point penetrates the least wins. A positive
/// separation on the winning edge proves the polygons are disjoint.
pub fn find_min_separating_axis(body: &Body, other: &Body) -> SeparatingAxis {
    let mut best = SeparatingAxis {
        edge: 0,
        separation: f64::NEG_INFINITY,
    };

    for edge in 0..body.vertex_count() {
        let origin = body.world_vertex(edge);
        let normal = body.edge_at(edge).normal();

        let separation = support_separation(other, origin, normal);
        if separation > best.separation {
            best = SeparatingAxis { edge, separation };
        }
    }

    best
}

/// Smallest signed distance of `body`'s vertices to the plane through
/// `origin` with the given outward `normal`.
fn support_separation(body: &Body, origin: Vec2<f64>, normal: Vec2<f64>) -> f64 {
    (0..body.vertex_count())
        .map(|index| (body.world_vertex(index) - origin).dot(normal))
        .fold(f64::INFINITY, f64::min)
}
