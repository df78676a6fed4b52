//! Impulse based 2D physics engine for convex polygons.
//!
//! Bodies are convex polygons under uniform gravity, optionally pinned
//! together with revolute joints. Collisions are found with a separating
//! axis test plus incident-edge clipping and resolved by a sequential
//! impulse solver with warm-started accumulated impulses and Baumgarte
//! position correction.
//!
//! Based on: <https://box2d.org/files/ErinCatto_SequentialImpulses_GDC2006.pdf>
//!
//! ```
//! use tumble::{Body, Extent2, Vec2, World};
//!
//! let mut world = World::new(Vec2::new(0.0, -9.8));
//!
//! // A static floor with a box resting on it
//! world.add_body(Body::rect(
//!     f64::INFINITY,
//!     Extent2::new(20.0, 1.0),
//!     Vec2::new(0.0, -0.5),
//! ));
//! let falling = world.add_body(Body::rect(
//!     1.0,
//!     Extent2::new(1.0, 1.0),
//!     Vec2::new(0.0, 4.0),
//! ));
//!
//! for _ in 0..120 {
//!     world.step(1.0 / 60.0);
//! }
//!
//! assert!(world.body(falling).position().y > 0.4);
//! ```

pub mod arbiter;
pub mod body;
pub mod collision;
pub mod joint;
pub mod math;
pub mod world;

pub use vek::{Extent2, Vec2};

pub use arbiter::{Arbiter, ArbiterKey, Contact, FeatureId};
pub use body::{Body, ShapeError};
pub use joint::{Joint, RevoluteJoint};
pub use math::{Mat2, VecExt};
pub use world::{BodyKey, JointKey, Settings, World};
