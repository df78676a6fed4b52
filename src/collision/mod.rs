//! Narrow-phase collision detection between convex polygons.
//!
//! A pair of bodies goes through a support-point separating axis test first;
//! if no separating axis exists the edge with the least penetration becomes
//! the reference edge and the most anti-parallel edge of the other body the
//! incident edge. The incident edge is clipped against the side planes of
//! the reference polygon, leaving up to two contact points.

pub mod sat;

use arrayvec::ArrayVec;
use vek::Vec2;

use crate::{
    arbiter::{Arbiter, Contact, FeatureId, MAX_CONTACTS},
    body::Body,
    math::{cross_scalar_vec, VecExt},
    world::{BodyKey, Settings},
};

use self::sat::find_min_separating_axis;

/// Candidate contact point while clipping.
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    position: Vec2<f64>,
    feature: FeatureId,
}

/// Collide two convex polygons, returning the contact manifold.
///
/// Returns `None` when a separating axis exists, when clipping leaves fewer
/// than two candidates, or when every clipped point ends up outside the
/// reference face. Degenerate geometry is treated as a miss for this step.
pub(crate) fn collide(
    a_key: BodyKey,
    b_key: BodyKey,
    a: &Body,
    b: &Body,
    dt: f64,
    settings: &Settings,
) -> Option<Arbiter> {
    puffin::profile_function!();

    let axis_a = find_min_separating_axis(a, b);
    if axis_a.separation >= 0.0 {
        return None;
    }
    let axis_b = find_min_separating_axis(b, a);
    if axis_b.separation >= 0.0 {
        return None;
    }

    // The body penetrated the least becomes the reference so contacts are
    // defined on the shallow side, which clips more stably
    let (reference_key, incident_key, reference, incident, reference_edge) =
        if axis_a.separation < axis_b.separation {
            (b_key, a_key, b, a, axis_b.edge)
        } else {
            (a_key, b_key, a, b, axis_a.edge)
        };

    let edge_origin = reference.world_vertex(reference_edge);
    let mut normal = reference.edge_at(reference_edge).normal();

    // Keep the normal pointing at the incident body
    if (incident.world_centroid() - reference.world_centroid()).dot(normal) < 0.0 {
        normal = -normal;
    }

    // The incident edge faces the reference normal most directly; its two
    // endpoints seed the clipping
    let incident_edge = find_incident_edge(normal, incident);
    let incident_next = (incident_edge + 1) % incident.vertex_count();
    let mut candidates = [
        ClipVertex {
            position: incident.world_vertex(incident_edge),
            feature: FeatureId::incident(incident_edge),
        },
        ClipVertex {
            position: incident.world_vertex(incident_next),
            feature: FeatureId::incident(incident_next),
        },
    ];

    // Clip against every side plane of the reference polygon
    for edge in 0..reference.vertex_count() {
        if edge == reference_edge {
            continue;
        }

        let v0 = reference.world_vertex(edge);
        let v1 = reference.world_vertex((edge + 1) % reference.vertex_count());
        candidates = clip_segment(candidates, edge, v0, v1)?;
    }

    let mut contacts: ArrayVec<Contact, MAX_CONTACTS> = ArrayVec::new();
    for candidate in candidates {
        let separation = (candidate.position - edge_origin).dot(normal);
        if separation > 0.0 {
            // Outside the reference face
            continue;
        }

        let ra = candidate.position - reference.world_centroid();
        let rb = candidate.position - incident.world_centroid();
        let tangent = normal.normal();

        contacts.push(Contact {
            position: candidate.position,
            ra,
            rb,
            separation,
            pn: 0.0,
            pt: 0.0,
            mass_normal: effective_mass(reference, incident, ra, rb, normal),
            mass_tangent: effective_mass(reference, incident, ra, rb, tangent),
            bias: -settings.bias_factor / dt
                * (separation + settings.allowed_penetration).min(0.0),
            feature: candidate.feature,
        });
    }

    if contacts.is_empty() {
        return None;
    }

    Some(Arbiter {
        a: reference_key,
        b: incident_key,
        normal,
        friction: (a.friction * b.friction).sqrt(),
        contacts,
    })
}

/// Edge of `body` whose outward normal is the most anti-parallel to `normal`.
fn find_incident_edge(normal: Vec2<f64>, body: &Body) -> usize {
    let mut incident = 0;
    let mut min_dot = f64::INFINITY;

    for edge in 0..body.vertex_count() {
        let dot = body.edge_at(edge).normal().dot(normal);
        if dot < min_dot {
            min_dot = dot;
            incident = edge;
        }
    }

    incident
}

/// Clip a two-point segment against the side plane through `v0 -> v1`.
///
/// Points on the inner side survive unchanged; a crossing produces an
/// interpolated point re-tagged with the clipping edge. `None` when fewer
/// than two points survive or the plane direction degenerates, both of which
/// reject the collision for this step.
fn clip_segment(
    candidates: [ClipVertex; 2],
    edge: usize,
    v0: Vec2<f64>,
    v1: Vec2<f64>,
) -> Option<[ClipVertex; 2]> {
    let Some(direction) = (v1 - v0).try_normalized() else {
        log::trace!("skipping degenerate clip edge");
        return None;
    };

    let distance0 = (candidates[0].position - v0).cross(direction);
    let distance1 = (candidates[1].position - v0).cross(direction);

    let mut survivors: ArrayVec<ClipVertex, 2> = ArrayVec::new();
    if distance0 <= 0.0 {
        survivors.push(candidates[0]);
    }
    if distance1 <= 0.0 {
        survivors.push(candidates[1]);
    }

    if distance0 * distance1 < 0.0 {
        let total = distance0 - distance1;
        let position =
            (candidates[0].position * -distance1 + candidates[1].position * distance0) / total;

        // The interpolated point is produced by the clipping edge of the
        // reference polygon; keep the discarded endpoint's incident tag in
        // the second slot so the two corners stay distinguishable
        let discarded = if distance0 > 0.0 {
            candidates[0]
        } else {
            candidates[1]
        };
        let feature = FeatureId {
            indices: [edge, discarded.feature.indices[1]],
            from_a: [true, discarded.feature.from_a[1]],
        };

        survivors.push(ClipVertex { position, feature });
    }

    survivors.into_inner().ok()
}

/// Scalar mapping an impulse along `axis` at the contact offsets to the
/// resulting relative velocity change along that axis.
fn effective_mass(a: &Body, b: &Body, ra: Vec2<f64>, rb: Vec2<f64>, axis: Vec2<f64>) -> f64 {
    let angular = cross_scalar_vec(ra.cross(axis), ra) * a.inv_inertia
        + cross_scalar_vec(rb.cross(axis), rb) * b.inv_inertia;

    (a.inv_mass + b.inv_mass + angular.dot(axis)).recip()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use slotmap::SlotMap;
    use vek::{Extent2, Vec2};

    use super::collide;
    use crate::{
        body::Body,
        world::{BodyKey, Settings},
    };

    fn keys() -> (BodyKey, BodyKey) {
        let mut map: SlotMap<BodyKey, ()> = SlotMap::with_key();

        (map.insert(()), map.insert(()))
    }

    #[test]
    fn disjoint_boxes_produce_no_manifold() {
        let (ka, kb) = keys();
        let a = Body::rect(1.0, Extent2::new(1.0, 1.0), Vec2::zero());
        let b = Body::rect(1.0, Extent2::new(1.0, 1.0), Vec2::new(0.0, 2.0));

        let manifold = collide(ka, kb, &a, &b, 1.0 / 60.0, &Settings::default());
        assert!(manifold.is_none());
    }

    #[test]
    fn stacked_boxes_touch_on_two_corners() {
        let (ka, kb) = keys();
        let a = Body::rect(1.0, Extent2::new(1.0, 1.0), Vec2::zero());
        let b = Body::rect(1.0, Extent2::new(1.0, 1.0), Vec2::new(0.0, 0.9));

        let arbiter = collide(ka, kb, &a, &b, 1.0 / 60.0, &Settings::default())
            .expect("overlapping boxes must collide");

        // Equal penetration on both bodies keeps the first body the reference
        assert_eq!(arbiter.bodies(), (ka, kb));
        assert_relative_eq!(arbiter.normal().x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(arbiter.normal().y, 1.0, epsilon = 1e-12);

        let contacts = arbiter.contacts();
        assert_eq!(contacts.len(), 2);
        for contact in contacts {
            // Contacts sit on the incident body's bottom edge
            assert_relative_eq!(contact.position.y, 0.4, epsilon = 1e-12);
            assert_relative_eq!(contact.separation, -0.1, epsilon = 1e-12);
            assert_relative_eq!(contact.position.x.abs(), 0.5, epsilon = 1e-12);
            assert_eq!(contact.pn, 0.0);
            assert_eq!(contact.pt, 0.0);
        }
    }

    #[test]
    fn small_box_contacts_are_clipped_to_its_width() {
        let (ka, kb) = keys();
        // Wide ground with a small box sunk into it
        let ground = Body::rect(f64::INFINITY, Extent2::new(20.0, 1.0), Vec2::new(0.0, -0.5));
        let cube = Body::rect(1.0, Extent2::new(1.0, 1.0), Vec2::new(0.0, 0.45));

        let arbiter = collide(ka, kb, &ground, &cube, 1.0 / 60.0, &Settings::default())
            .expect("sunk box must collide");

        let contacts = arbiter.contacts();
        assert_eq!(contacts.len(), 2);
        for contact in contacts {
            assert_relative_eq!(contact.position.x.abs(), 0.5, epsilon = 1e-12);
            assert_relative_eq!(contact.separation, -0.05, epsilon = 1e-12);
        }

        // Deep penetration gets a positive restoring bias
        assert!(contacts[0].bias > 0.0);
    }

    #[test]
    fn shallower_body_becomes_the_reference() {
        let (ka, kb) = keys();
        // Rotate the second box so its corner pokes into the first: the
        // upright box has the shallower axis and must stay the reference
        let a = Body::rect(1.0, Extent2::new(1.0, 1.0), Vec2::zero());
        let mut b = Body::rect(1.0, Extent2::new(1.0, 1.0), Vec2::new(0.0, 1.0));
        b.set_rotation_angle(std::f64::consts::FRAC_PI_4);

        let arbiter = collide(ka, kb, &a, &b, 1.0 / 60.0, &Settings::default())
            .expect("poking corner must collide");

        assert_eq!(arbiter.bodies(), (ka, kb));
        // Normal still points up from the reference towards the rotated box
        assert!(arbiter.normal().y > 0.99);
    }
}
