//! Rapier3d backend for the contact core.
//!
//! - [`PhysicsState`] owns the rapier pipeline and steps it with hooks.
//! - [`TrackPhysicsHooks`] runs the [`CollisionFilter`] inside rapier's
//!   solver-contact modification hook; an intercepted manifold has its solver
//!   contacts cleared.
//! - [`RapierVehicle`] exposes a [`TrackRig`] and the narrow phase as a
//!   [`TrackedVehicle`] / [`BodyStates`].
//! - [`RapierLoadBuffer`] lands injector loads on rapier bodies and withdraws
//!   them again on the next step, leaving other user forces untouched.
//!
//! Rapier runs collision detection and the solve inside one `step`, so tread
//! forces computed from step N act during step N+1.

use std::sync::{Mutex, MutexGuard, PoisonError};

use bevy::math::{Quat, Vec3};
use bevy::prelude::Resource;
use rapier3d::prelude as rapier;
use rapier::nalgebra::Vector3;

use crate::engine::{
    BodyStates, BodyView, CandidateBody, CollisionCandidate, LoadSink, PointLoad,
    ReportContactCallback, ResolvedContact, TrackedVehicle,
};
use crate::filter::CollisionFilter;
use crate::rig::TrackRig;
use crate::types::{contact_frame, BodyFrame, BodyId, BodyRole, VehicleSide};

#[derive(Resource)]
pub struct PhysicsState {
    pub gravity: Vector3<f32>,
    pub integration_parameters: rapier::IntegrationParameters,
    pub physics_pipeline: rapier::PhysicsPipeline,
    pub island_manager: rapier::IslandManager,
    pub broad_phase: rapier::DefaultBroadPhase,
    pub narrow_phase: rapier::NarrowPhase,
    pub rigid_body_set: rapier::RigidBodySet,
    pub collider_set: rapier::ColliderSet,
    pub impulse_joint_set: rapier::ImpulseJointSet,
    pub multibody_joint_set: rapier::MultibodyJointSet,
    pub ccd_solver: rapier::CCDSolver,
    /// Simulated time, advanced by one `dt` per step.
    pub time: f64,
}

impl PhysicsState {
    pub fn new() -> Self {
        Self {
            gravity: Vector3::new(0.0, -9.81, 0.0),
            integration_parameters: rapier::IntegrationParameters::default(),
            physics_pipeline: rapier::PhysicsPipeline::new(),
            island_manager: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            rigid_body_set: rapier::RigidBodySet::new(),
            collider_set: rapier::ColliderSet::new(),
            impulse_joint_set: rapier::ImpulseJointSet::new(),
            multibody_joint_set: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            time: 0.0,
        }
    }

    /// Advance one step, running `hooks` during the narrow phase.
    pub fn step(&mut self, hooks: &dyn rapier::PhysicsHooks) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            hooks,
            &(),
        );
        self.time += f64::from(self.integration_parameters.dt);
    }

    /// Body state views over this world.
    pub fn bodies(&self) -> RapierBodies<'_> {
        RapierBodies(&self.rigid_body_set)
    }
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn body_id(handle: rapier::RigidBodyHandle) -> BodyId {
    let (index, generation) = handle.into_raw_parts();
    BodyId((u64::from(generation) << 32) | u64::from(index))
}

pub fn body_handle(id: BodyId) -> rapier::RigidBodyHandle {
    rapier::RigidBodyHandle::from_raw_parts((id.0 & 0xffff_ffff) as u32, (id.0 >> 32) as u32)
}

/// Role tag for `user_data`.
pub fn role_user_data(role: BodyRole) -> u128 {
    u128::from(role.tag())
}

pub fn body_role(body: &rapier::RigidBody) -> BodyRole {
    BodyRole::from_tag((body.user_data & 0xff) as u8)
}

fn vec3(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn point3(p: &rapier::Point<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

fn frame_of(body: &rapier::RigidBody) -> BodyFrame {
    let pos = body.translation();
    let rot = body.rotation();
    BodyFrame::new(
        Vec3::new(pos.x, pos.y, pos.z),
        Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w),
    )
}

fn candidate_body(
    bodies: &rapier::RigidBodySet,
    handle: Option<rapier::RigidBodyHandle>,
) -> Option<CandidateBody> {
    let handle = handle?;
    let body = bodies.get(handle)?;
    Some(CandidateBody {
        id: body_id(handle),
        role: body_role(body),
        frame: frame_of(body),
    })
}

/// Physics hooks that route every solver-contact manifold through a
/// [`CollisionFilter`].
///
/// Colliders of wheels, idlers and shoes need
/// `ActiveHooks::MODIFY_SOLVER_CONTACTS` for rapier to call in.
#[derive(Debug, Default)]
pub struct TrackPhysicsHooks {
    filter: Mutex<CollisionFilter>,
}

impl TrackPhysicsHooks {
    pub fn new(filter: CollisionFilter) -> Self {
        Self {
            filter: Mutex::new(filter),
        }
    }

    /// Access the filter. A poisoned lock still yields the filter; its caches
    /// are plain data.
    pub fn filter(&self) -> MutexGuard<'_, CollisionFilter> {
        self.filter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the filter caches ahead of the next narrow phase.
    pub fn reset(&self) {
        self.filter().reset();
    }
}

impl rapier::PhysicsHooks for TrackPhysicsHooks {
    fn modify_solver_contacts(&self, context: &mut rapier::ContactModificationContext) {
        let (Some(co1), Some(co2)) = (
            context.colliders.get(context.collider1),
            context.colliders.get(context.collider2),
        ) else {
            return;
        };
        let body_a = candidate_body(context.bodies, context.rigid_body1);
        let body_b = candidate_body(context.bodies, context.rigid_body2);
        let normal = vec3(&*context.normal);

        let mut generate = true;
        {
            let mut filter = self.filter();
            for point in &context.manifold.points {
                let candidate = CollisionCandidate {
                    body_a,
                    body_b,
                    point_a: point3(&(co1.position() * point.local_p1)),
                    point_b: point3(&(co2.position() * point.local_p2)),
                    normal,
                    distance: point.dist,
                };
                generate &= filter.on_narrowphase(&candidate);
            }
        }

        if !generate {
            context.solver_contacts.clear();
        }
    }
}

/// A [`TrackRig`] inside a [`PhysicsState`], seen as a tracked vehicle.
pub struct RapierVehicle<'a> {
    physics: &'a PhysicsState,
    rig: &'a TrackRig,
}

impl<'a> RapierVehicle<'a> {
    pub fn new(physics: &'a PhysicsState, rig: &'a TrackRig) -> Self {
        Self { physics, rig }
    }
}

impl TrackedVehicle for RapierVehicle<'_> {
    fn time(&self) -> f64 {
        self.physics.time
    }

    fn hull(&self) -> BodyId {
        body_id(self.rig.hull)
    }

    fn sprocket(&self, side: VehicleSide) -> BodyId {
        body_id(self.rig.sprockets[side.index()])
    }

    fn idler(&self, side: VehicleSide) -> BodyId {
        body_id(self.rig.idlers[side.index()])
    }

    fn num_track_shoes(&self, side: VehicleSide) -> usize {
        self.rig.shoes[side.index()].len()
    }

    fn track_shoe(&self, side: VehicleSide, index: usize) -> Option<BodyId> {
        self.rig.shoes[side.index()].get(index).copied().map(body_id)
    }

    fn body_frame(&self, body: BodyId) -> Option<BodyFrame> {
        self.physics
            .rigid_body_set
            .get(body_handle(body))
            .map(frame_of)
    }

    /// Walk the narrow phase's contact pairs. Each manifold point's normal
    /// impulse from the last solve becomes a reaction force along the contact
    /// normal; rapier does not keep a stable friction basis, so tangential
    /// components are reported as zero.
    ///
    /// Manifolds without solver contacts this step are skipped: an intercepted
    /// manifold keeps its last solved impulses on its points.
    fn report_all_contacts(&self, reporter: &mut dyn ReportContactCallback) {
        let dt = self.physics.integration_parameters.dt;
        if dt <= 0.0 {
            return;
        }
        let colliders = &self.physics.collider_set;

        for pair in self.physics.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let (Some(co1), Some(co2)) =
                (colliders.get(pair.collider1), colliders.get(pair.collider2))
            else {
                continue;
            };
            let body_a = co1.parent().map(body_id);
            let body_b = co2.parent().map(body_id);

            for manifold in &pair.manifolds {
                if manifold.data.solver_contacts.is_empty() {
                    continue;
                }
                let frame = contact_frame(vec3(&manifold.data.normal));
                for point in &manifold.points {
                    let contact = ResolvedContact {
                        point_a: point3(&(co1.position() * point.local_p1)),
                        point_b: point3(&(co2.position() * point.local_p2)),
                        frame,
                        distance: point.dist,
                        effective_radius: 0.0,
                        force: Vec3::new(point.data.impulse / dt, 0.0, 0.0),
                        torque: Vec3::ZERO,
                        body_a,
                        body_b,
                    };
                    if !reporter.on_report_contact(&contact) {
                        return;
                    }
                }
            }
        }
    }
}

/// Body state lookup over a rapier body set.
pub struct RapierBodies<'a>(pub &'a rapier::RigidBodySet);

impl BodyStates for RapierBodies<'_> {
    fn body_view(&self, body: BodyId) -> Option<BodyView> {
        let rb = self.0.get(body_handle(body))?;
        Some(BodyView {
            id: body,
            role: body_role(rb),
            frame: frame_of(rb),
            linear_velocity: vec3(rb.linvel()),
            angular_velocity: vec3(rb.angvel()),
        })
    }
}

impl BodyStates for RapierVehicle<'_> {
    fn body_view(&self, body: BodyId) -> Option<BodyView> {
        self.physics.bodies().body_view(body)
    }
}

/// A wrench applied to a rapier body on behalf of the injector.
#[derive(Debug, Clone, Copy)]
struct AppliedWrench {
    body: rapier::RigidBodyHandle,
    force: Vector3<f32>,
    torque: Vector3<f32>,
}

/// Step-scoped point loads destined for rapier bodies.
///
/// Loads collected through [`LoadSink`] are pending until
/// [`RapierLoadBuffer::apply`] moves them onto the bodies, first withdrawing
/// whatever the previous `apply` added.
#[derive(Debug, Default)]
pub struct RapierLoadBuffer {
    pending: Vec<PointLoad>,
    applied: Vec<AppliedWrench>,
}

impl RapierLoadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[PointLoad] {
        &self.pending
    }

    /// Number of loads currently acting on bodies.
    pub fn applied_len(&self) -> usize {
        self.applied.len()
    }

    pub fn apply(&mut self, bodies: &mut rapier::RigidBodySet) {
        for wrench in self.applied.drain(..) {
            if let Some(rb) = bodies.get_mut(wrench.body) {
                rb.add_force(-wrench.force, false);
                rb.add_torque(-wrench.torque, false);
            }
        }

        for load in &self.pending {
            let handle = body_handle(load.body);
            let Some(rb) = bodies.get_mut(handle) else {
                continue;
            };
            let frame = frame_of(rb);
            let point = frame.point_to_global(load.local_point);
            let com = point3(rb.center_of_mass());
            let torque = (point - com).cross(load.force);

            let force = Vector3::new(load.force.x, load.force.y, load.force.z);
            let torque = Vector3::new(torque.x, torque.y, torque.z);
            rb.add_force(force, true);
            rb.add_torque(torque, true);
            self.applied.push(AppliedWrench {
                body: handle,
                force,
                torque,
            });
        }
    }
}

impl LoadSink for RapierLoadBuffer {
    fn clear_point_loads(&mut self) {
        self.pending.clear();
    }

    fn add_point_load(&mut self, load: &PointLoad) {
        self.pending.push(*load);
    }
}
