//! Contact monitoring and custom tread forces for tracked vehicles.
//!
//! The core ([`ContactObserver`], [`CollisionFilter`], [`CustomForceInjector`])
//! talks to the physics engine only through the traits in [`engine`]. The
//! [`rapier_world`] module implements those traits over rapier3d, and
//! [`TrackContactPlugin`] wires everything into a bevy schedule:
//!
//! reset filter → step rapier with hooks → observe contacts → inject forces

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod injector;
pub mod observer;
pub mod rapier_world;
pub mod rig;
pub mod snapshot;
pub mod types;

use bevy::prelude::*;

pub use config::TrackContactConfig;
pub use engine::{
    BodyStates, BodyView, CandidateBody, CollisionCandidate, LoadSink, PointLoad,
    ReportContactCallback, ResolvedContact, TrackedVehicle,
};
pub use error::{TrackContactError, TrackContactResult};
pub use filter::{CollisionFilter, LateralAxis, LATERAL_NORMAL_THRESHOLD};
pub use injector::{CustomForceInjector, ForceLaw, LinearSpringDamperLaw};
pub use observer::ContactObserver;
pub use rapier_world::{
    PhysicsState, RapierBodies, RapierLoadBuffer, RapierVehicle, TrackPhysicsHooks,
};
pub use rig::{RigDescription, TrackRig};
pub use snapshot::{ContactLog, SnapshotRow};
pub use types::{
    BodyFrame, BodyId, BodyRole, CollisionRecord, ContactRecord, MonitorFlags, TrackPart,
    VehicleSide,
};

/// Runs the tracked rig with contact monitoring and tread force injection.
#[derive(Default)]
pub struct TrackContactPlugin {
    pub config: TrackContactConfig,
    pub rig: RigDescription,
}

impl TrackContactPlugin {
    pub fn new(config: TrackContactConfig) -> Self {
        Self {
            config,
            rig: RigDescription::default(),
        }
    }
}

impl Plugin for TrackContactPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(PhysicsState::new())
            .insert_resource(TrackContactState::from_config(&self.config))
            .insert_resource(self.rig.clone())
            .add_systems(Startup, setup_track_rig)
            .add_systems(
                Update,
                (
                    reset_collision_filter,
                    step_physics,
                    observe_contacts,
                    inject_custom_forces,
                )
                    .chain(),
            );
    }
}

/// Contact pipeline state carried between steps.
#[derive(Resource, Debug)]
pub struct TrackContactState {
    pub observer: ContactObserver,
    pub hooks: TrackPhysicsHooks,
    pub injector: CustomForceInjector,
    pub loads: RapierLoadBuffer,
}

impl TrackContactState {
    pub fn from_config(config: &TrackContactConfig) -> Self {
        Self {
            observer: config.build_observer(),
            hooks: TrackPhysicsHooks::new(config.build_filter()),
            injector: CustomForceInjector::new(config.force_law()),
            loads: RapierLoadBuffer::new(),
        }
    }
}

fn setup_track_rig(
    mut commands: Commands,
    mut physics: ResMut<PhysicsState>,
    desc: Res<RigDescription>,
) {
    let rig = TrackRig::build(physics.as_mut(), &desc);
    info!(
        "Track rig built: {} shoes, {} road wheels per side",
        desc.shoes_per_side,
        desc.wheel_positions.len()
    );
    commands.insert_resource(rig);
}

fn reset_collision_filter(state: Res<TrackContactState>) {
    state.hooks.reset();
}

fn step_physics(mut physics: ResMut<PhysicsState>, state: Res<TrackContactState>) {
    physics.step(&state.hooks);
}

fn observe_contacts(
    physics: Res<PhysicsState>,
    rig: Option<Res<TrackRig>>,
    mut state: ResMut<TrackContactState>,
) {
    let Some(rig) = rig else {
        return;
    };
    let vehicle = RapierVehicle::new(&physics, &rig);
    state.observer.process(&vehicle);
}

fn inject_custom_forces(mut physics: ResMut<PhysicsState>, mut state: ResMut<TrackContactState>) {
    let TrackContactState {
        hooks,
        injector,
        loads,
        ..
    } = state.as_mut();

    injector.setup(&hooks.filter(), &physics.bodies(), loads);
    loads.apply(&mut physics.rigid_body_set);
    injector.update(physics.time);
}
