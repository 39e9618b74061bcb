//! The seam between the contact core and the physics engine.
//!
//! The core never talks to an engine directly. A vehicle model (or engine
//! adapter such as [`crate::rapier_world`]) implements these traits and feeds
//! contacts, candidates and body state through them.

use bevy::math::{Mat3, Vec3};

use crate::types::{BodyFrame, BodyId, BodyRole, VehicleSide};

/// A contact that survived the engine's collision pipeline, as enumerated
/// after contact resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedContact {
    /// Contact point on body A, global frame.
    pub point_a: Vec3,
    /// Contact point on body B, global frame.
    pub point_b: Vec3,
    /// Contact frame: columns are normal, tangent 1, tangent 2.
    pub frame: Mat3,
    /// Signed separation; positive means the shapes are apart.
    pub distance: f32,
    /// Effective curvature radius at the contact, zero when unknown.
    pub effective_radius: f32,
    /// Reaction force in the contact frame.
    pub force: Vec3,
    /// Reaction torque in the contact frame.
    pub torque: Vec3,
    /// Body owning contactable A, if it is a rigid body.
    pub body_a: Option<BodyId>,
    /// Body owning contactable B, if it is a rigid body.
    pub body_b: Option<BodyId>,
}

/// Receives every resolved contact during a contact traversal.
pub trait ReportContactCallback {
    /// Return `false` to stop the traversal early.
    fn on_report_contact(&mut self, contact: &ResolvedContact) -> bool;
}

/// Vehicle-side accessors consumed by [`crate::ContactObserver::process`].
pub trait TrackedVehicle {
    /// Current simulation time.
    fn time(&self) -> f64;

    fn hull(&self) -> BodyId;

    fn sprocket(&self, side: VehicleSide) -> BodyId;

    fn idler(&self, side: VehicleSide) -> BodyId;

    fn num_track_shoes(&self, side: VehicleSide) -> usize;

    fn track_shoe(&self, side: VehicleSide, index: usize) -> Option<BodyId>;

    /// Current global pose of a body, `None` if the body is gone.
    fn body_frame(&self, body: BodyId) -> Option<BodyFrame>;

    /// Enumerate all currently resolved contacts through `reporter`.
    fn report_all_contacts(&self, reporter: &mut dyn ReportContactCallback);
}

/// A participant of a narrow-phase candidate that resolved to a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateBody {
    pub id: BodyId,
    pub role: BodyRole,
    pub frame: BodyFrame,
}

/// One candidate geometric collision offered to the narrow-phase hook,
/// before the engine turns it into a contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionCandidate {
    /// `None` when participant A is not a rigid body.
    pub body_a: Option<CandidateBody>,
    /// `None` when participant B is not a rigid body.
    pub body_b: Option<CandidateBody>,
    pub point_a: Vec3,
    pub point_b: Vec3,
    /// Unit normal from A towards B, global frame.
    pub normal: Vec3,
    pub distance: f32,
}

/// Read-only view of a body handed to a force law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyView {
    pub id: BodyId,
    pub role: BodyRole,
    pub frame: BodyFrame,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl BodyView {
    /// Velocity of a material point given in global coordinates.
    pub fn point_velocity(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.frame.position)
    }
}

/// Current body state lookup.
pub trait BodyStates {
    fn body_view(&self, body: BodyId) -> Option<BodyView>;
}

/// A transient point force on one body, valid for a single step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLoad {
    pub body: BodyId,
    /// Force in the global frame.
    pub force: Vec3,
    /// Application point in the body's local frame.
    pub local_point: Vec3,
}

/// Destination of the injector's point loads in the engine's force assembly.
pub trait LoadSink {
    /// Drop every load this sink received for the previous step.
    fn clear_point_loads(&mut self);

    fn add_point_load(&mut self, load: &PointLoad);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Quat;

    #[test]
    fn test_point_velocity_includes_spin() {
        let view = BodyView {
            id: BodyId(1),
            role: BodyRole::Wheel,
            frame: BodyFrame::new(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY),
            linear_velocity: Vec3::new(2.0, 0.0, 0.0),
            angular_velocity: Vec3::new(0.0, 0.0, -2.0),
        };
        // Bottom of a rolling wheel of radius 1 is at rest.
        let v = view.point_velocity(Vec3::ZERO);
        assert!(v.length() < 1e-6, "expected rest, got {v:?}");
    }
}
