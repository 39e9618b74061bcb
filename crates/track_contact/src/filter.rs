//! Narrow-phase interception of wheel/idler versus track-shoe collisions.
//!
//! For every candidate collision where exactly one side is a track shoe, the
//! collision normal is expressed in the other body's frame. A normal that
//! points mostly along the wheel axle comes from a guide pin and is left to
//! the engine. Anything else is a tread contact: it is cached for the custom
//! force law and the engine is told not to generate a contact for it.

use serde::{Deserialize, Serialize};

use crate::engine::{CandidateBody, CollisionCandidate};
use crate::types::{BodyRole, CollisionRecord};

/// Above this lateral normal component a contact is treated as a guide-pin
/// contact.
pub const LATERAL_NORMAL_THRESHOLD: f32 = 0.8;

/// Wheel-local axis along which lateral (guide-pin) contacts are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LateralAxis {
    X,
    #[default]
    Y,
    Z,
}

impl LateralAxis {
    fn component(self, v: bevy::math::Vec3) -> f32 {
        match self {
            LateralAxis::X => v.x,
            LateralAxis::Y => v.y,
            LateralAxis::Z => v.z,
        }
    }
}

/// Classifies and caches tread collisions for one step.
#[derive(Debug, Clone)]
pub struct CollisionFilter {
    idler_shoe: bool,
    wheel_shoe: bool,
    lateral_axis: LateralAxis,
    idler_collisions: Vec<CollisionRecord>,
    wheel_collisions: Vec<CollisionRecord>,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionFilter {
    /// Both interceptions enabled, lateral axis `Y`.
    pub fn new() -> Self {
        Self {
            idler_shoe: true,
            wheel_shoe: true,
            lateral_axis: LateralAxis::default(),
            idler_collisions: Vec::new(),
            wheel_collisions: Vec::new(),
        }
    }

    pub fn set_idler_shoe(&mut self, enabled: bool) {
        self.idler_shoe = enabled;
    }

    pub fn set_wheel_shoe(&mut self, enabled: bool) {
        self.wheel_shoe = enabled;
    }

    pub fn idler_shoe(&self) -> bool {
        self.idler_shoe
    }

    pub fn wheel_shoe(&self) -> bool {
        self.wheel_shoe
    }

    pub fn set_lateral_axis(&mut self, axis: LateralAxis) {
        self.lateral_axis = axis;
    }

    /// Empty both caches. Call once per step before the narrow phase.
    pub fn reset(&mut self) {
        self.idler_collisions.clear();
        self.wheel_collisions.clear();
    }

    pub fn idler_collisions(&self) -> &[CollisionRecord] {
        &self.idler_collisions
    }

    pub fn wheel_collisions(&self) -> &[CollisionRecord] {
        &self.wheel_collisions
    }

    /// Classify one candidate. Returns `true` if the engine should generate
    /// its normal contact, `false` if the collision was intercepted.
    pub fn on_narrowphase(&mut self, candidate: &CollisionCandidate) -> bool {
        let (Some(a), Some(b)) = (candidate.body_a, candidate.body_b) else {
            return true;
        };

        let (wheel, swapped) = if b.role == BodyRole::Shoe {
            (a, false)
        } else if a.role == BodyRole::Shoe {
            (b, true)
        } else {
            return true;
        };

        let local_normal = wheel.frame.direction_to_local(candidate.normal);
        if self.lateral_axis.component(local_normal).abs() > LATERAL_NORMAL_THRESHOLD {
            return true;
        }

        let cache = match wheel.role {
            BodyRole::Idler if self.idler_shoe => &mut self.idler_collisions,
            BodyRole::Wheel if self.wheel_shoe => &mut self.wheel_collisions,
            _ => return true,
        };

        let mut record = capture(candidate, &a, &b);
        if swapped {
            record.swap_bodies();
        }
        cache.push(record);
        false
    }
}

fn capture(
    candidate: &CollisionCandidate,
    a: &CandidateBody,
    b: &CandidateBody,
) -> CollisionRecord {
    CollisionRecord {
        body_a: a.id,
        body_b: b.id,
        point_a: candidate.point_a,
        point_b: candidate.point_b,
        local_point_a: a.frame.point_to_local(candidate.point_a),
        local_point_b: b.frame.point_to_local(candidate.point_b),
        normal: candidate.normal,
        distance: candidate.distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BodyFrame, BodyId};
    use bevy::math::{Quat, Vec3};

    fn body(id: u64, role: BodyRole) -> CandidateBody {
        CandidateBody {
            id: BodyId(id),
            role,
            frame: BodyFrame::new(Vec3::new(id as f32, 0.0, 0.0), Quat::IDENTITY),
        }
    }

    fn candidate(a: CandidateBody, b: CandidateBody, normal: Vec3) -> CollisionCandidate {
        CollisionCandidate {
            body_a: Some(a),
            body_b: Some(b),
            point_a: Vec3::new(0.0, -0.5, 0.0),
            point_b: Vec3::new(0.0, -0.49, 0.0),
            normal,
            distance: -0.01,
        }
    }

    /// Unit normal with lateral (y) component `lateral`.
    fn normal_with_lateral(lateral: f32) -> Vec3 {
        Vec3::new(0.0, lateral, -(1.0 - lateral * lateral).sqrt())
    }

    #[test]
    fn test_non_body_participant_passes_through() {
        let mut filter = CollisionFilter::new();
        let mut c = candidate(body(1, BodyRole::Wheel), body(2, BodyRole::Shoe), Vec3::NEG_Z);
        c.body_b = None;
        assert!(filter.on_narrowphase(&c));
        assert!(filter.wheel_collisions().is_empty());
    }

    #[test]
    fn test_pairs_without_shoe_pass_through() {
        let mut filter = CollisionFilter::new();
        let c = candidate(body(1, BodyRole::Wheel), body(2, BodyRole::Hull), Vec3::NEG_Z);
        assert!(filter.on_narrowphase(&c));
        assert!(filter.wheel_collisions().is_empty());
        assert!(filter.idler_collisions().is_empty());
    }

    #[test]
    fn test_lateral_threshold() {
        let mut filter = CollisionFilter::new();

        let lateral = candidate(
            body(1, BodyRole::Wheel),
            body(2, BodyRole::Shoe),
            normal_with_lateral(0.81),
        );
        assert!(filter.on_narrowphase(&lateral), "0.81 is a guide-pin contact");
        assert!(filter.wheel_collisions().is_empty());

        let tread = candidate(
            body(1, BodyRole::Wheel),
            body(2, BodyRole::Shoe),
            normal_with_lateral(0.79),
        );
        assert!(!filter.on_narrowphase(&tread), "0.79 is a tread contact");
        assert_eq!(filter.wheel_collisions().len(), 1);
    }

    #[test]
    fn test_lateral_measured_in_wheel_frame() {
        let mut filter = CollisionFilter::new();
        let mut wheel = body(1, BodyRole::Wheel);
        // Wheel axle (local y) points along global z.
        wheel.frame.rotation = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);

        let c = candidate(wheel, body(2, BodyRole::Shoe), Vec3::NEG_Y);
        assert!(!filter.on_narrowphase(&c));
        let c = candidate(wheel, body(2, BodyRole::Shoe), Vec3::Z);
        assert!(filter.on_narrowphase(&c));
        assert_eq!(filter.wheel_collisions().len(), 1);
    }

    #[test]
    fn test_idler_and_wheel_go_to_separate_caches() {
        let mut filter = CollisionFilter::new();
        let (idler, wheel) = (body(1, BodyRole::Idler), body(3, BodyRole::Wheel));
        let (shoe, other_shoe) = (body(2, BodyRole::Shoe), body(4, BodyRole::Shoe));
        let n = Vec3::NEG_Z;
        assert!(!filter.on_narrowphase(&candidate(idler, shoe, n)));
        assert!(!filter.on_narrowphase(&candidate(wheel, shoe, n)));
        assert!(!filter.on_narrowphase(&candidate(wheel, other_shoe, n)));
        assert_eq!(filter.idler_collisions().len(), 1);
        assert_eq!(filter.wheel_collisions().len(), 2);
    }

    #[test]
    fn test_shoe_reported_first_is_swapped() {
        let mut filter = CollisionFilter::new();
        let shoe = body(2, BodyRole::Shoe);
        let idler = body(1, BodyRole::Idler);
        let c = candidate(shoe, idler, Vec3::Z);
        assert!(!filter.on_narrowphase(&c));

        let record = filter.idler_collisions()[0];
        assert_eq!(record.body_a, BodyId(1));
        assert_eq!(record.body_b, BodyId(2));
        assert_eq!(record.point_a, c.point_b);
        assert_eq!(record.point_b, c.point_a);
        assert_eq!(record.normal, Vec3::NEG_Z);
        // Local points follow their bodies.
        assert_eq!(record.local_point_a, idler.frame.point_to_local(c.point_b));
        assert_eq!(record.local_point_b, shoe.frame.point_to_local(c.point_a));
    }

    #[test]
    fn test_disabled_interception_passes_through() {
        let mut filter = CollisionFilter::new();
        filter.set_idler_shoe(false);
        filter.set_wheel_shoe(false);
        let shoe = body(2, BodyRole::Shoe);
        let n = Vec3::NEG_Z;
        assert!(filter.on_narrowphase(&candidate(body(1, BodyRole::Idler), shoe, n)));
        assert!(filter.on_narrowphase(&candidate(body(3, BodyRole::Wheel), shoe, n)));
        assert!(filter.idler_collisions().is_empty());
        assert!(filter.wheel_collisions().is_empty());
    }

    #[test]
    fn test_other_roles_against_shoe_pass_through() {
        let mut filter = CollisionFilter::new();
        let n = Vec3::NEG_Z;
        for role in [BodyRole::Sprocket, BodyRole::Hull, BodyRole::Shoe, BodyRole::Unclassified] {
            assert!(filter.on_narrowphase(&candidate(body(1, role), body(2, BodyRole::Shoe), n)));
        }
        assert!(filter.idler_collisions().is_empty());
        assert!(filter.wheel_collisions().is_empty());
    }

    #[test]
    fn test_reset_empties_caches() {
        let mut filter = CollisionFilter::new();
        let n = Vec3::NEG_Z;
        filter.on_narrowphase(&candidate(body(1, BodyRole::Idler), body(2, BodyRole::Shoe), n));
        filter.on_narrowphase(&candidate(body(3, BodyRole::Wheel), body(2, BodyRole::Shoe), n));
        filter.reset();
        assert!(filter.idler_collisions().is_empty());
        assert!(filter.wheel_collisions().is_empty());
    }
}
