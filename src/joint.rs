//! Joints constraining pairs of bodies, resolved by the impulse solver.

use vek::Vec2;

use crate::{
    body::Body,
    math::{cross_scalar_vec, Mat2},
    world::BodyKey,
};

/// A two-body constraint.
///
/// Only the revolute variant exists today; the enum keeps the solver loop
/// free of virtual dispatch when more joint kinds are added.
#[derive(Debug, Clone)]
pub enum Joint {
    /// Pin two bodies together at a world point.
    Revolute(RevoluteJoint),
}

impl Joint {
    /// Keys of the two constrained bodies.
    pub fn bodies(&self) -> (BodyKey, BodyKey) {
        match self {
            Self::Revolute(joint) => (joint.a, joint.b),
        }
    }

    /// Anchor points in world coordinates, useful for rendering.
    ///
    /// Both anchors coincide while the constraint is satisfied.
    pub fn anchors_world(&self, a: &Body, b: &Body) -> (Vec2<f64>, Vec2<f64>) {
        match self {
            Self::Revolute(joint) => (joint.world_anchor_a(a), joint.world_anchor_b(b)),
        }
    }

    /// Per-step precomputation and warm starting.
    pub(crate) fn pre_step(&mut self, dt: f64, bias_factor: f64, a: &mut Body, b: &mut Body) {
        match self {
            Self::Revolute(joint) => joint.pre_step(dt, bias_factor, a, b),
        }
    }

    /// One solver sweep.
    pub(crate) fn apply_impulse(&mut self, a: &mut Body, b: &mut Body) {
        match self {
            Self::Revolute(joint) => joint.apply_impulse(a, b),
        }
    }
}

/// Pin joint fixing two bodies to share one world point.
///
/// The anchor is captured in each body's local frame at construction; the
/// velocity constraint then pulls the two anchor points back together with a
/// position-error bias, so the pin survives integration drift.
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    /// First constrained body.
    a: BodyKey,
    /// Second constrained body.
    b: BodyKey,
    /// Anchor relative to the first body's centroid, in its unrotated frame.
    local_anchor_a: Vec2<f64>,
    /// Anchor relative to the second body's centroid, in its unrotated frame.
    local_anchor_b: Vec2<f64>,
    /// Rotated anchor offset of the first body, cached per step.
    ra: Vec2<f64>,
    /// Rotated anchor offset of the second body, cached per step.
    rb: Vec2<f64>,
    /// Inverse of the constraint-space mass matrix, cached per step.
    effective_mass: Mat2,
    /// Velocity bias correcting the anchor divergence, cached per step.
    bias: Vec2<f64>,
    /// Accumulated impulse, persisted across steps for warm starting.
    p: Vec2<f64>,
}

impl RevoluteJoint {
    /// Pin `a` and `b` together at a world point, captured at their current
    /// poses.
    pub(crate) fn new(
        a_key: BodyKey,
        b_key: BodyKey,
        anchor: Vec2<f64>,
        a: &Body,
        b: &Body,
    ) -> Self {
        let local_anchor_a = a.rotation.transpose() * (anchor - a.world_centroid());
        let local_anchor_b = b.rotation.transpose() * (anchor - b.world_centroid());

        Self {
            a: a_key,
            b: b_key,
            local_anchor_a,
            local_anchor_b,
            ra: Vec2::zero(),
            rb: Vec2::zero(),
            effective_mass: Mat2::identity(),
            bias: Vec2::zero(),
            p: Vec2::zero(),
        }
    }

    /// Anchor point of the first body in world coordinates.
    pub fn world_anchor_a(&self, a: &Body) -> Vec2<f64> {
        a.local_to_world(a.rotation * self.local_anchor_a + a.centroid())
    }

    /// Anchor point of the second body in world coordinates.
    pub fn world_anchor_b(&self, b: &Body) -> Vec2<f64> {
        b.local_to_world(b.rotation * self.local_anchor_b + b.centroid())
    }

    /// Cache the rotated anchors, the constraint-space mass and the position
    /// bias for this step, then re-apply the accumulated impulse.
    fn pre_step(&mut self, dt: f64, bias_factor: f64, a: &mut Body, b: &mut Body) {
        self.ra = a.rotation * self.local_anchor_a;
        self.rb = b.rotation * self.local_anchor_b;

        let k = Mat2::identity() * (a.inv_mass + b.inv_mass)
            + Mat2::new(
                self.ra.y * self.ra.y,
                -self.ra.y * self.ra.x,
                -self.ra.y * self.ra.x,
                self.ra.x * self.ra.x,
            ) * a.inv_inertia
            + Mat2::new(
                self.rb.y * self.rb.y,
                -self.rb.y * self.rb.x,
                -self.rb.y * self.rb.x,
                self.rb.x * self.rb.x,
            ) * b.inv_inertia;
        self.effective_mass = k.inverse();

        let divergence = (b.world_centroid() + self.rb) - (a.world_centroid() + self.ra);
        self.bias = -divergence * bias_factor / dt;

        // Warm start with last step's impulse
        a.apply_impulse(-self.p, self.ra);
        b.apply_impulse(self.p, self.rb);
    }

    /// One solver sweep: cancel the relative anchor velocity plus the bias.
    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body) {
        let relative_velocity = (b.velocity + cross_scalar_vec(b.angular_velocity, self.rb))
            - (a.velocity + cross_scalar_vec(a.angular_velocity, self.ra));

        let impulse = self.effective_mass * (-relative_velocity + self.bias);

        a.apply_impulse(-impulse, self.ra);
        b.apply_impulse(impulse, self.rb);

        self.p += impulse;
    }

    /// Accumulated impulse of this step, persisted for warm starting.
    pub fn impulse(&self) -> Vec2<f64> {
        self.p
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use slotmap::SlotMap;
    use vek::{Extent2, Vec2};

    use super::RevoluteJoint;
    use crate::{body::Body, world::BodyKey};

    fn keys() -> (BodyKey, BodyKey) {
        let mut map: SlotMap<BodyKey, ()> = SlotMap::with_key();

        (map.insert(()), map.insert(()))
    }

    #[test]
    fn anchors_start_at_the_construction_point() {
        let (ka, kb) = keys();
        let mut a = Body::rect(1.0, Extent2::new(1.0, 1.0), Vec2::new(-2.0, 0.0));
        a.set_rotation_angle(0.4);
        let b = Body::rect(1.0, Extent2::new(1.0, 1.0), Vec2::new(2.0, 1.0));

        let anchor = Vec2::new(0.5, 0.25);
        let joint = RevoluteJoint::new(ka, kb, anchor, &a, &b);

        let world_a = joint.world_anchor_a(&a);
        let world_b = joint.world_anchor_b(&b);
        assert_relative_eq!(world_a.x, anchor.x, epsilon = 1e-12);
        assert_relative_eq!(world_a.y, anchor.y, epsilon = 1e-12);
        assert_relative_eq!(world_b.x, anchor.x, epsilon = 1e-12);
        assert_relative_eq!(world_b.y, anchor.y, epsilon = 1e-12);
    }

    #[test]
    fn joint_impulses_conserve_momentum() {
        let (ka, kb) = keys();
        let mut a = Body::rect(2.0, Extent2::new(1.0, 1.0), Vec2::new(-1.0, 0.0));
        let mut b = Body::rect(3.0, Extent2::new(1.0, 1.0), Vec2::new(1.0, 0.0));
        a.set_velocity(Vec2::new(1.0, 0.5));
        b.set_velocity(Vec2::new(-0.5, 0.25));

        let momentum_before = a.velocity() * a.mass() + b.velocity() * b.mass();

        let mut joint = RevoluteJoint::new(ka, kb, Vec2::zero(), &a, &b);
        let dt = 1.0 / 60.0;
        joint.pre_step(dt, 0.2, &mut a, &mut b);
        for _ in 0..10 {
            joint.apply_impulse(&mut a, &mut b);
        }

        let momentum_after = a.velocity() * a.mass() + b.velocity() * b.mass();
        assert_relative_eq!(momentum_after.x, momentum_before.x, epsilon = 1e-9);
        assert_relative_eq!(momentum_after.y, momentum_before.y, epsilon = 1e-9);

        // The anchor points move with the same velocity once solved
        let anchor_velocity_a =
            a.velocity() + crate::math::cross_scalar_vec(a.angular_velocity(), Vec2::new(1.0, 0.0));
        let anchor_velocity_b = b.velocity()
            + crate::math::cross_scalar_vec(b.angular_velocity(), Vec2::new(-1.0, 0.0));
        let relative = anchor_velocity_b - anchor_velocity_a;
        assert!(relative.magnitude() < 1e-9);
    }
}
