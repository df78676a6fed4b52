//! The world owning every body, joint and contact manifold.

use std::collections::{btree_map::Entry, BTreeMap};

use itertools::Itertools;
use serde::Deserialize;
use slotmap::{new_key_type, SlotMap};
use vek::Vec2;

use crate::{
    arbiter::{Arbiter, ArbiterKey},
    body::Body,
    collision::collide,
    joint::{Joint, RevoluteJoint},
};

new_key_type! {
    /// Stable reference to a body owned by a [`World`].
    pub struct BodyKey;

    /// Stable reference to a joint owned by a [`World`].
    pub struct JointKey;
}

/// Solver tuning knobs.
///
/// The defaults match the values the engine is stable with at a 1/60 s
/// timestep; they can also be deserialized from an embedder's settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Solver sweeps over all contacts and joints per step.
    pub iterations: u32,
    /// Baumgarte factor, the fraction of position error corrected per step.
    pub bias_factor: f64,
    /// Penetration depth tolerated before the bias pushes bodies apart.
    pub allowed_penetration: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            iterations: 10,
            bias_factor: 0.2,
            allowed_penetration: 0.01,
        }
    }
}

/// Physics simulation state.
///
/// Owns all bodies and joints in arenas and keeps one persistent [`Arbiter`]
/// per colliding pair, so contact impulses survive across steps and warm
/// start the solver.
pub struct World {
    /// Uniform gravity applied to every dynamic body.
    gravity: Vec2<f64>,
    /// Solver configuration.
    settings: Settings,
    /// All bodies.
    bodies: SlotMap<BodyKey, Body>,
    /// All joints.
    joints: SlotMap<JointKey, Joint>,
    /// Persistent contact manifolds keyed by unordered body pair.
    arbiters: BTreeMap<ArbiterKey, Arbiter>,
}

impl World {
    /// Create an empty world with the default solver settings.
    pub fn new(gravity: Vec2<f64>) -> Self {
        Self::with_settings(gravity, Settings::default())
    }

    /// Create an empty world with custom solver settings.
    pub fn with_settings(gravity: Vec2<f64>, settings: Settings) -> Self {
        Self {
            gravity,
            settings,
            bodies: SlotMap::with_key(),
            joints: SlotMap::with_key(),
            arbiters: BTreeMap::new(),
        }
    }

    /// Register a body, transferring ownership to the world.
    pub fn add_body(&mut self, body: Body) -> BodyKey {
        self.bodies.insert(body)
    }

    /// Pin two registered bodies together at a world point, captured at
    /// their current poses.
    pub fn add_revolute_joint(
        &mut self,
        a: BodyKey,
        b: BodyKey,
        anchor: Vec2<f64>,
    ) -> JointKey {
        debug_assert!(a != b, "a joint needs two distinct bodies");

        let joint = RevoluteJoint::new(a, b, anchor, &self.bodies[a], &self.bodies[b]);

        self.joints.insert(Joint::Revolute(joint))
    }

    /// Shared access to a body.
    pub fn body(&self, key: BodyKey) -> &Body {
        &self.bodies[key]
    }

    /// Exclusive access to a body.
    pub fn body_mut(&mut self, key: BodyKey) -> &mut Body {
        &mut self.bodies[key]
    }

    /// Shared access to a joint.
    pub fn joint(&self, key: JointKey) -> &Joint {
        &self.joints[key]
    }

    /// All bodies in insertion order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyKey, &Body)> {
        self.bodies.iter()
    }

    /// All joints in insertion order.
    pub fn joints(&self) -> impl Iterator<Item = (JointKey, &Joint)> {
        self.joints.iter()
    }

    /// All live contact manifolds, sorted by their pair key.
    pub fn arbiters(&self) -> impl Iterator<Item = (&ArbiterKey, &Arbiter)> {
        self.arbiters.iter()
    }

    /// The gravity the world was created with.
    pub fn gravity(&self) -> Vec2<f64> {
        self.gravity
    }

    /// The solver settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Destroy every body, joint and contact manifold.
    pub fn clear(&mut self) {
        log::debug!("clearing physics world");

        self.bodies.clear();
        self.joints.clear();
        self.arbiters.clear();
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// A single step integrates gravity and external forces into the
    /// velocities, re-detects all contacts while carrying over accumulated
    /// impulses, sweeps the impulse solver over contacts and joints, and
    /// finally moves the bodies along the corrected velocities.
    pub fn step(&mut self, dt: f64) {
        puffin::profile_scope!("Physics step");

        if dt <= 0.0 {
            log::warn!("ignoring physics step with non-positive dt {dt}");
            return;
        }

        let Self {
            gravity,
            settings,
            bodies,
            joints,
            arbiters,
        } = self;

        {
            puffin::profile_scope!("Integrate forces");

            for body in bodies.values_mut() {
                body.integrate_forces(*gravity, dt);
            }
        }

        {
            puffin::profile_scope!("Narrow phase");

            // Pairwise scan in insertion order; a broad phase could prune
            // this list without touching anything below
            let keys: Vec<BodyKey> = bodies.keys().collect();
            for (a_key, b_key) in keys.iter().copied().tuple_combinations::<(_, _)>() {
                let (a, b) = (&bodies[a_key], &bodies[b_key]);
                if !a.should_collide(b) {
                    continue;
                }

                let pair = ArbiterKey::new(a_key, b_key);
                match collide(a_key, b_key, a, b, dt, settings) {
                    Some(manifold) => match arbiters.entry(pair) {
                        Entry::Occupied(mut occupied) => {
                            let (reference_key, incident_key) = manifold.bodies();
                            let [reference, incident] = bodies
                                .get_disjoint_mut([reference_key, incident_key])
                                .expect("colliding bodies are distinct");
                            occupied.get_mut().update_from(manifold, reference, incident);
                        }
                        Entry::Vacant(vacant) => {
                            vacant.insert(manifold);
                        }
                    },
                    None => {
                        arbiters.remove(&pair);
                    }
                }
            }
        }

        {
            puffin::profile_scope!("Joint pre-step");

            for joint in joints.values_mut() {
                let (a_key, b_key) = joint.bodies();
                let [a, b] = bodies
                    .get_disjoint_mut([a_key, b_key])
                    .expect("joint bodies are distinct");
                joint.pre_step(dt, settings.bias_factor, a, b);
            }
        }

        {
            puffin::profile_scope!("Solver iterations");

            for _ in 0..settings.iterations {
                for arbiter in arbiters.values_mut() {
                    let (reference_key, incident_key) = arbiter.bodies();
                    let [reference, incident] = bodies
                        .get_disjoint_mut([reference_key, incident_key])
                        .expect("colliding bodies are distinct");
                    arbiter.apply_impulse(reference, incident);
                }

                for joint in joints.values_mut() {
                    let (a_key, b_key) = joint.bodies();
                    let [a, b] = bodies
                        .get_disjoint_mut([a_key, b_key])
                        .expect("joint bodies are distinct");
                    joint.apply_impulse(a, b);
                }
            }
        }

        {
            puffin::profile_scope!("Integrate velocities");

            for body in bodies.values_mut() {
                body.integrate_velocities(dt);
            }
        }

        log::trace!(
            "stepped physics, {} arbiters and {} joints active",
            arbiters.len(),
            joints.len()
        );
    }
}
