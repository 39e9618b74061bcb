//! Custom tread force injection.
//!
//! Once per step, during force assembly, the injector turns every tread
//! collision cached by the [`CollisionFilter`] into a pair of equal and
//! opposite point loads computed by a pluggable [`ForceLaw`].

use bevy::log::debug;
use bevy::math::Vec3;

use crate::engine::{BodyStates, BodyView, LoadSink, PointLoad};
use crate::filter::CollisionFilter;
use crate::types::CollisionRecord;

/// Tread contact force model supplied by the vehicle.
///
/// Returns the force acting on body B (the shoe), global frame. Body A
/// receives the negated force.
pub trait ForceLaw {
    fn compute_force(
        &mut self,
        collision: &CollisionRecord,
        body_a: &BodyView,
        body_b: &BodyView,
        is_idler: bool,
    ) -> Vec3;
}

impl<F> ForceLaw for F
where
    F: FnMut(&CollisionRecord, &BodyView, &BodyView, bool) -> Vec3,
{
    fn compute_force(
        &mut self,
        collision: &CollisionRecord,
        body_a: &BodyView,
        body_b: &BodyView,
        is_idler: bool,
    ) -> Vec3 {
        self(collision, body_a, body_b, is_idler)
    }
}

/// Penetration spring with normal damping, no adhesion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSpringDamperLaw {
    pub stiffness: f32,
    pub damping: f32,
}

impl Default for LinearSpringDamperLaw {
    fn default() -> Self {
        Self {
            stiffness: 2.0e5,
            damping: 1.0e3,
        }
    }
}

impl ForceLaw for LinearSpringDamperLaw {
    fn compute_force(
        &mut self,
        collision: &CollisionRecord,
        body_a: &BodyView,
        body_b: &BodyView,
        _is_idler: bool,
    ) -> Vec3 {
        let penetration = collision.penetration();
        if penetration <= 0.0 {
            return Vec3::ZERO;
        }
        let n = collision.normal;
        let v_rel =
            body_b.point_velocity(collision.point_b) - body_a.point_velocity(collision.point_a);
        let magnitude = self.stiffness * penetration - self.damping * v_rel.dot(n);
        n * magnitude.max(0.0)
    }
}

/// Applies the force law to cached tread collisions once per step.
pub struct CustomForceInjector {
    law: Box<dyn ForceLaw + Send + Sync>,
    loads: Vec<PointLoad>,
    time: f64,
}

impl std::fmt::Debug for CustomForceInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomForceInjector")
            .field("loads", &self.loads.len())
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl CustomForceInjector {
    pub fn new(law: impl ForceLaw + Send + Sync + 'static) -> Self {
        Self {
            law: Box::new(law),
            loads: Vec::new(),
            time: 0.0,
        }
    }

    /// Force-assembly entry point; call exactly once per step, after the
    /// filter's caches are final.
    pub fn setup<S: BodyStates + ?Sized>(
        &mut self,
        filter: &CollisionFilter,
        bodies: &S,
        sink: &mut dyn LoadSink,
    ) {
        self.apply_forces(filter, bodies);
        self.update_loads(sink);
    }

    /// Rebuild this step's load list from the cached tread collisions.
    pub fn apply_forces<S: BodyStates + ?Sized>(&mut self, filter: &CollisionFilter, bodies: &S) {
        self.loads.clear();

        for collision in filter.idler_collisions() {
            self.add_pair(collision, bodies, true);
        }
        for collision in filter.wheel_collisions() {
            self.add_pair(collision, bodies, false);
        }

        debug!(
            "tread forces at t={}: {} idler-shoe, {} wheel-shoe, {} loads",
            self.time,
            filter.idler_collisions().len(),
            filter.wheel_collisions().len(),
            self.loads.len()
        );
    }

    fn add_pair<S: BodyStates + ?Sized>(
        &mut self,
        collision: &CollisionRecord,
        bodies: &S,
        is_idler: bool,
    ) {
        let (Some(body_a), Some(body_b)) = (
            bodies.body_view(collision.body_a),
            bodies.body_view(collision.body_b),
        ) else {
            debug!(
                "skipping tread collision {:?}-{:?}: body no longer available",
                collision.body_a, collision.body_b
            );
            return;
        };

        let force_b = self.law.compute_force(collision, &body_a, &body_b, is_idler);

        self.loads.push(PointLoad {
            body: collision.body_a,
            force: -force_b,
            local_point: collision.local_point_a,
        });
        self.loads.push(PointLoad {
            body: collision.body_b,
            force: force_b,
            local_point: collision.local_point_b,
        });
    }

    /// Hand the current load list to the engine, replacing the previous step's.
    fn update_loads(&self, sink: &mut dyn LoadSink) {
        sink.clear_point_loads();
        for load in &self.loads {
            sink.add_point_load(load);
        }
    }

    /// Advance the time stamp only. The engine may call this several times
    /// per step; collision data is final only once per step, so forces are
    /// computed in [`CustomForceInjector::setup`].
    pub fn update(&mut self, time: f64) {
        self.time = time;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn loads(&self) -> &[PointLoad] {
        &self.loads
    }
}
