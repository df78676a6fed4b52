use miette::Diagnostic;
use thiserror::Error;
use vek::{Extent2, Vec2};

use crate::math::{Mat2, VecExt};

/// Convex polygon rigid body.
///
/// A body with infinite mass is static: it never moves, ignores gravity and
/// external forces, and acts as an immovable wall for everything colliding
/// with it.
#[derive(Debug, Clone)]
pub struct Body {
    /// Mass, infinite for static bodies.
    pub(crate) mass: f64,
    /// Inverse of the mass, zero for static bodies.
    pub(crate) inv_mass: f64,
    /// Polar moment of inertia around the centroid.
    pub(crate) inertia: f64,
    /// Inverse of the inertia, zero for static bodies.
    pub(crate) inv_inertia: f64,
    /// Global position.
    pub(crate) position: Vec2<f64>,
    /// Orientation as a rotation matrix.
    pub(crate) rotation: Mat2,
    /// Linear velocity.
    pub(crate) velocity: Vec2<f64>,
    /// Angular velocity in radians per second.
    pub(crate) angular_velocity: f64,
    /// Accumulated external force, reset every step.
    pub(crate) force: Vec2<f64>,
    /// Accumulated external torque, reset every step.
    pub(crate) torque: f64,
    /// Surface friction coefficient.
    pub(crate) friction: f64,
    /// Bounciness, stored for embedders but not used by the solver.
    pub(crate) restitution: f64,
    /// Counter-clockwise convex vertices in body-local coordinates.
    vertices: Vec<Vec2<f64>>,
    /// Geometric centroid of the vertices, the body rotates around it.
    centroid: Vec2<f64>,
}

/// Why a vertex list can't be used as a collision polygon.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum ShapeError {
    #[error("a polygon needs at least 3 vertices, got {found}")]
    TooFewVertices { found: usize },
    #[error("vertices {index} and {index}+1 coincide")]
    DegenerateEdge { index: usize },
    #[error("vertices must be in counter-clockwise order")]
    NotCounterClockwise,
    #[error("polygon is concave at vertex {index}")]
    NotConvex { index: usize },
}

impl Body {
    /// Construct a rectangle body centered on its position.
    pub fn rect(mass: f64, size: Extent2<f64>, position: Vec2<f64>) -> Self {
        let half = size / 2.0;
        let vertices = vec![
            Vec2::new(-half.w, -half.h),
            Vec2::new(half.w, -half.h),
            Vec2::new(half.w, half.h),
            Vec2::new(-half.w, half.h),
        ];

        Self::polygon(mass, vertices, position)
    }

    /// Construct a body from a counter-clockwise convex vertex list.
    ///
    /// The caller guarantees the polygon is valid, only checked in debug
    /// builds. Use [`Body::try_polygon`] to validate unconditionally.
    pub fn polygon(mass: f64, vertices: Vec<Vec2<f64>>, position: Vec2<f64>) -> Self {
        debug_assert!(mass > 0.0, "mass must be positive or infinite");
        debug_assert!(
            validate_polygon(&vertices).is_ok(),
            "invalid collision polygon: {:?}",
            validate_polygon(&vertices)
        );

        let centroid = polygon_centroid(&vertices);
        let inertia = polygon_inertia(mass, &vertices);

        Self {
            mass,
            inv_mass: invert_or_zero(mass),
            inertia,
            inv_inertia: invert_or_zero(inertia),
            position,
            rotation: Mat2::identity(),
            velocity: Vec2::zero(),
            angular_velocity: 0.0,
            force: Vec2::zero(),
            torque: 0.0,
            friction: 1.0,
            restitution: 0.0,
            vertices,
            centroid,
        }
    }

    /// Construct a body from a vertex list, validating it.
    pub fn try_polygon(
        mass: f64,
        vertices: Vec<Vec2<f64>>,
        position: Vec2<f64>,
    ) -> Result<Self, ShapeError> {
        validate_polygon(&vertices)?;

        Ok(Self::polygon(mass, vertices, position))
    }

    /// Whether this body has infinite mass.
    pub fn is_static(&self) -> bool {
        self.mass.is_infinite()
    }

    /// Whether a collision between these bodies could move anything.
    ///
    /// Two static bodies can overlap freely.
    pub fn should_collide(&self, other: &Self) -> bool {
        !(self.is_static() && other.is_static())
    }

    /// Amount of vertices of the collision polygon.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Local vertex rotated around the centroid by the current orientation.
    pub fn rotated_vertex(&self, index: usize) -> Vec2<f64> {
        self.rotation * (self.vertices[index] - self.centroid) + self.centroid
    }

    /// Vertex in world coordinates.
    pub fn world_vertex(&self, index: usize) -> Vec2<f64> {
        self.local_to_world(self.rotated_vertex(index))
    }

    /// Edge vector from vertex `index` to the next vertex.
    pub fn edge_at(&self, index: usize) -> Vec2<f64> {
        let next = (index + 1) % self.vertices.len();

        self.rotated_vertex(next) - self.rotated_vertex(index)
    }

    /// Translate a rotated local point to world coordinates.
    pub fn local_to_world(&self, point: Vec2<f64>) -> Vec2<f64> {
        self.position + point
    }

    /// Centroid in world coordinates.
    pub fn world_centroid(&self) -> Vec2<f64> {
        self.local_to_world(self.centroid)
    }

    /// Centroid in body-local coordinates.
    pub fn centroid(&self) -> Vec2<f64> {
        self.centroid
    }

    /// Apply an impulse at offset `r` from the centroid.
    pub fn apply_impulse(&mut self, impulse: Vec2<f64>, r: Vec2<f64>) {
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * r.cross(impulse);
    }

    /// Accumulate an external force for the next step.
    pub fn apply_force(&mut self, force: Vec2<f64>) {
        self.force += force;
    }

    /// Accumulate an external torque for the next step.
    pub fn apply_torque(&mut self, torque: f64) {
        self.torque += torque;
    }

    /// First integration half: fold gravity and external forces into the
    /// velocities.
    pub(crate) fn integrate_forces(&mut self, gravity: Vec2<f64>, dt: f64) {
        if self.is_static() {
            return;
        }

        self.velocity += (gravity + self.force * self.inv_mass) * dt;
        self.angular_velocity += self.torque * self.inv_inertia * dt;
    }

    /// Second integration half: move along the solved velocities and clear
    /// the force accumulators.
    pub(crate) fn integrate_velocities(&mut self, dt: f64) {
        if !self.is_static() {
            self.position += self.velocity * dt;
            self.rotation = Mat2::from_angle(self.angular_velocity * dt) * self.rotation;
        }

        self.force = Vec2::zero();
        self.torque = 0.0;
    }

    /// Mass of the body.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Change the mass, keeping the inertia consistent with the polygon.
    pub fn set_mass(&mut self, mass: f64) {
        debug_assert!(mass > 0.0, "mass must be positive or infinite");

        self.mass = mass;
        self.inv_mass = invert_or_zero(mass);
        self.inertia = polygon_inertia(mass, &self.vertices);
        self.inv_inertia = invert_or_zero(self.inertia);
    }

    /// Inverse of the mass.
    pub fn inverse_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Polar moment of inertia around the centroid.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Inverse of the inertia.
    pub fn inverse_inertia(&self) -> f64 {
        self.inv_inertia
    }

    /// Global position.
    pub fn position(&self) -> Vec2<f64> {
        self.position
    }

    /// Set the global position.
    pub fn set_position(&mut self, position: Vec2<f64>) {
        self.position = position;
    }

    /// Orientation as a rotation matrix.
    pub fn rotation(&self) -> Mat2 {
        self.rotation
    }

    /// Set the orientation from a rotation matrix.
    pub fn set_rotation(&mut self, rotation: Mat2) {
        self.rotation = rotation;
    }

    /// Set the orientation from an angle in radians.
    pub fn set_rotation_angle(&mut self, angle: f64) {
        self.rotation = Mat2::from_angle(angle);
    }

    /// Linear velocity.
    pub fn velocity(&self) -> Vec2<f64> {
        self.velocity
    }

    /// Set the linear velocity.
    pub fn set_velocity(&mut self, velocity: Vec2<f64>) {
        self.velocity = velocity;
    }

    /// Angular velocity in radians per second.
    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    /// Set the angular velocity.
    pub fn set_angular_velocity(&mut self, angular_velocity: f64) {
        self.angular_velocity = angular_velocity;
    }

    /// Friction coefficient.
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Set the friction coefficient.
    pub fn set_friction(&mut self, friction: f64) {
        self.friction = friction;
    }

    /// Bounciness in `[0, 1]`.
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Set the bounciness.
    pub fn set_restitution(&mut self, restitution: f64) {
        self.restitution = restitution;
    }

    /// Accumulated external force.
    pub fn force(&self) -> Vec2<f64> {
        self.force
    }

    /// Accumulated external torque.
    pub fn torque(&self) -> f64 {
        self.torque
    }
}

/// Reciprocal that maps infinity to zero, so static bodies drop out of the
/// impulse formulas.
fn invert_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value.recip()
    } else {
        0.0
    }
}

/// Check the polygon preconditions: enough vertices, counter-clockwise
/// winding, convex corners, no coinciding neighbours.
pub fn validate_polygon(vertices: &[Vec2<f64>]) -> Result<(), ShapeError> {
    if vertices.len() < 3 {
        return Err(ShapeError::TooFewVertices {
            found: vertices.len(),
        });
    }

    let count = vertices.len();
    for index in 0..count {
        let edge = vertices[(index + 1) % count] - vertices[index];
        if edge.magnitude_squared() == 0.0 {
            return Err(ShapeError::DegenerateEdge { index });
        }
    }

    if polygon_area(vertices) <= 0.0 {
        return Err(ShapeError::NotCounterClockwise);
    }

    for index in 0..count {
        let edge = vertices[(index + 1) % count] - vertices[index];
        let next_edge = vertices[(index + 2) % count] - vertices[(index + 1) % count];
        if edge.cross(next_edge) < 0.0 {
            return Err(ShapeError::NotConvex {
                index: (index + 1) % count,
            });
        }
    }

    Ok(())
}

/// Signed polygon area, positive for counter-clockwise winding.
fn polygon_area(vertices: &[Vec2<f64>]) -> f64 {
    let mut area = 0.0;
    for (index, vertex) in vertices.iter().enumerate() {
        let next = vertices[(index + 1) % vertices.len()];
        area += vertex.cross(next);
    }

    area / 2.0
}

/// Geometric centroid from the signed area formula.
fn polygon_centroid(vertices: &[Vec2<f64>]) -> Vec2<f64> {
    let mut centroid = Vec2::zero();
    for (index, vertex) in vertices.iter().enumerate() {
        let next = vertices[(index + 1) % vertices.len()];
        centroid += (*vertex + next) * vertex.cross(next);
    }

    centroid / 6.0 / polygon_area(vertices)
}

/// Polar moment of inertia of the polygon around its centroid.
fn polygon_inertia(mass: f64, vertices: &[Vec2<f64>]) -> f64 {
    let mut acc0 = 0.0;
    let mut acc1 = 0.0;
    for (index, vertex) in vertices.iter().enumerate() {
        let a = *vertex;
        let b = vertices[(index + 1) % vertices.len()];

        let cross = a.cross(b).abs();
        acc0 += cross * (a.dot(a) + b.dot(b) + a.dot(b));
        acc1 += cross;
    }

    mass * acc0 / 6.0 / acc1
}
