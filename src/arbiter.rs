use arrayvec::ArrayVec;
use vek::Vec2;

use crate::{
    body::Body,
    math::{cross_scalar_vec, VecExt},
    world::BodyKey,
};

/// A manifold never holds more than two points for polygons in 2D.
pub const MAX_CONTACTS: usize = 2;

/// Tag identifying which edges produced a contact point.
///
/// Slot 0 and 1 each record a vertex index and whether that index refers to
/// an edge of the reference polygon instead of the incident one. Matching
/// tags across two consecutive steps means the contact is the same physical
/// touch point, so its accumulated impulses may be carried over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureId {
    /// Vertex indices that clipped this contact.
    pub indices: [usize; 2],
    /// Whether the matching index refers to the reference polygon.
    pub from_a: [bool; 2],
}

impl FeatureId {
    /// Tag for an unclipped endpoint of the incident edge.
    pub(crate) fn incident(index: usize) -> Self {
        Self {
            indices: [index; 2],
            from_a: [false; 2],
        }
    }

    /// Whether two tags identify the same touch point, slots may be swapped.
    pub fn matches(self, other: Self) -> bool {
        let direct = self.indices == other.indices && self.from_a == other.from_a;
        let swapped = self.indices == [other.indices[1], other.indices[0]]
            && self.from_a == [other.from_a[1], other.from_a[0]];

        direct || swapped
    }
}

/// A single collision point inside an [`Arbiter`].
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Touch point in world coordinates.
    pub position: Vec2<f64>,
    /// Offset from the reference body's centroid to the touch point.
    pub ra: Vec2<f64>,
    /// Offset from the incident body's centroid to the touch point.
    pub rb: Vec2<f64>,
    /// Signed distance along the normal, negative while penetrating.
    pub separation: f64,
    /// Accumulated normal impulse, persisted across steps.
    pub pn: f64,
    /// Accumulated tangent impulse, persisted across steps.
    pub pt: f64,
    /// Effective mass along the normal.
    pub mass_normal: f64,
    /// Effective mass along the tangent.
    pub mass_tangent: f64,
    /// Baumgarte velocity bias correcting the position error.
    pub bias: f64,
    /// Which edges produced this point.
    pub feature: FeatureId,
}

/// Persistent contact manifold between one pair of bodies.
///
/// Body `a` is the reference body chosen by the separating axis test, `b`
/// the incident one; the normal points from `a` towards `b`.
#[derive(Debug, Clone)]
pub struct Arbiter {
    /// Reference body.
    pub(crate) a: BodyKey,
    /// Incident body.
    pub(crate) b: BodyKey,
    /// Contact normal from `a` towards `b`.
    pub(crate) normal: Vec2<f64>,
    /// Combined friction of the pair, `sqrt(a * b)`.
    pub(crate) friction: f64,
    /// Up to two touch points.
    pub(crate) contacts: ArrayVec<Contact, MAX_CONTACTS>,
}

impl Arbiter {
    /// Reference and incident body keys.
    pub fn bodies(&self) -> (BodyKey, BodyKey) {
        (self.a, self.b)
    }

    /// Contact normal, pointing from the reference body to the incident one.
    pub fn normal(&self) -> Vec2<f64> {
        self.normal
    }

    /// Combined friction coefficient of the pair.
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Current touch points.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Replace this manifold with a freshly detected one, carrying over the
    /// accumulated impulses of every contact that matches by feature.
    ///
    /// Carried-over impulses are immediately re-applied to the bodies so the
    /// solver starts warm and converges in fewer sweeps.
    pub(crate) fn update_from(&mut self, mut new: Arbiter, a: &mut Body, b: &mut Body) {
        let tangent = new.normal.normal();

        for contact in &mut new.contacts {
            let matched = self
                .contacts
                .iter()
                .find(|old| old.feature.matches(contact.feature));

            if let Some(old) = matched {
                contact.pn = old.pn;
                contact.pt = old.pt;

                let impulse = new.normal * contact.pn + tangent * contact.pt;
                a.apply_impulse(-impulse, contact.ra);
                b.apply_impulse(impulse, contact.rb);
            }
        }

        *self = new;
    }

    /// One solver sweep: correct the velocities of both bodies so every
    /// contact approaches zero penetration velocity without tension, and
    /// friction stays inside the Coulomb cone.
    pub(crate) fn apply_impulse(&mut self, a: &mut Body, b: &mut Body) {
        let tangent = self.normal.normal();

        for contact in &mut self.contacts {
            let relative_velocity = (b.velocity + cross_scalar_vec(b.angular_velocity, contact.rb))
                - (a.velocity + cross_scalar_vec(a.angular_velocity, contact.ra));

            // Normal impulse, accumulated and clamped so contacts only push
            let normal_velocity = relative_velocity.dot(self.normal);
            let pn_delta = (-normal_velocity + contact.bias) * contact.mass_normal;
            let pn_new = (contact.pn + pn_delta).max(0.0);
            let pn_applied = pn_new - contact.pn;

            // Friction impulse, clamped to the cone of the updated normal impulse
            let tangent_velocity = relative_velocity.dot(tangent);
            let pt_delta = -tangent_velocity * contact.mass_tangent;
            let pt_limit = self.friction * pn_new;
            let pt_new = (contact.pt + pt_delta).clamp(-pt_limit, pt_limit);
            let pt_applied = pt_new - contact.pt;

            let impulse = self.normal * pn_applied + tangent * pt_applied;
            a.apply_impulse(-impulse, contact.ra);
            b.apply_impulse(impulse, contact.rb);

            contact.pn = pn_new;
            contact.pt = pt_new;
        }
    }
}

/// Unordered pair of body keys, the slot of an [`Arbiter`] in the world.
///
/// `(a, b)` and `(b, a)` produce the same key so a collision pair maps to
/// one persistent manifold regardless of scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArbiterKey {
    first: BodyKey,
    second: BodyKey,
}

impl ArbiterKey {
    /// Construct the key for a pair of bodies in any order.
    pub fn new(a: BodyKey, b: BodyKey) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };

        Self { first, second }
    }
}
