//! Shared vocabulary for tracked-vehicle contact monitoring.
//!
//! Everything here is plain data: body identities and roles, the monitored part
//! taxonomy, and the per-contact / per-collision records produced each step.

use bevy::math::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Non-owning identity of a rigid body in the host engine.
///
/// The core never dereferences it; it only compares identities and hands the
/// id back to the engine when it needs a body's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

/// Role tag attached to a body when the vehicle topology is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyRole {
    #[default]
    Unclassified,
    Hull,
    Sprocket,
    Idler,
    Wheel,
    Shoe,
}

impl BodyRole {
    /// Compact tag stored alongside the body in the engine.
    pub const fn tag(self) -> u8 {
        match self {
            BodyRole::Unclassified => 0,
            BodyRole::Hull => 1,
            BodyRole::Sprocket => 2,
            BodyRole::Idler => 3,
            BodyRole::Wheel => 4,
            BodyRole::Shoe => 5,
        }
    }

    /// Inverse of [`BodyRole::tag`]. Unknown tags are unclassified.
    pub const fn from_tag(tag: u8) -> Self {
        match tag {
            1 => BodyRole::Hull,
            2 => BodyRole::Sprocket,
            3 => BodyRole::Idler,
            4 => BodyRole::Wheel,
            5 => BodyRole::Shoe,
            _ => BodyRole::Unclassified,
        }
    }
}

/// Vehicle side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleSide {
    Left,
    Right,
}

impl VehicleSide {
    pub const BOTH: [VehicleSide; 2] = [VehicleSide::Left, VehicleSide::Right];

    pub const fn index(self) -> usize {
        match self {
            VehicleSide::Left => 0,
            VehicleSide::Right => 1,
        }
    }
}

bitflags::bitflags! {
    /// Selects which vehicle parts the contact observer records.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MonitorFlags: u8 {
        const HULL = 1 << 0;
        const SPROCKET_LEFT = 1 << 1;
        const SPROCKET_RIGHT = 1 << 2;
        const IDLER_LEFT = 1 << 3;
        const IDLER_RIGHT = 1 << 4;
        const SHOES_LEFT = 1 << 5;
        const SHOES_RIGHT = 1 << 6;
    }
}

/// One of the seven monitored vehicle sub-bodies.
///
/// The declaration order is the fixed order used for snapshot rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackPart {
    Hull,
    SprocketLeft,
    SprocketRight,
    IdlerLeft,
    IdlerRight,
    ShoesLeft,
    ShoesRight,
}

impl TrackPart {
    pub const COUNT: usize = 7;

    pub const ALL: [TrackPart; TrackPart::COUNT] = [
        TrackPart::Hull,
        TrackPart::SprocketLeft,
        TrackPart::SprocketRight,
        TrackPart::IdlerLeft,
        TrackPart::IdlerRight,
        TrackPart::ShoesLeft,
        TrackPart::ShoesRight,
    ];

    pub const fn index(self) -> usize {
        match self {
            TrackPart::Hull => 0,
            TrackPart::SprocketLeft => 1,
            TrackPart::SprocketRight => 2,
            TrackPart::IdlerLeft => 3,
            TrackPart::IdlerRight => 4,
            TrackPart::ShoesLeft => 5,
            TrackPart::ShoesRight => 6,
        }
    }

    pub const fn flag(self) -> MonitorFlags {
        match self {
            TrackPart::Hull => MonitorFlags::HULL,
            TrackPart::SprocketLeft => MonitorFlags::SPROCKET_LEFT,
            TrackPart::SprocketRight => MonitorFlags::SPROCKET_RIGHT,
            TrackPart::IdlerLeft => MonitorFlags::IDLER_LEFT,
            TrackPart::IdlerRight => MonitorFlags::IDLER_RIGHT,
            TrackPart::ShoesLeft => MonitorFlags::SHOES_LEFT,
            TrackPart::ShoesRight => MonitorFlags::SHOES_RIGHT,
        }
    }

    pub const fn sprocket(side: VehicleSide) -> Self {
        match side {
            VehicleSide::Left => TrackPart::SprocketLeft,
            VehicleSide::Right => TrackPart::SprocketRight,
        }
    }

    pub const fn idler(side: VehicleSide) -> Self {
        match side {
            VehicleSide::Left => TrackPart::IdlerLeft,
            VehicleSide::Right => TrackPart::IdlerRight,
        }
    }

    pub const fn shoes(side: VehicleSide) -> Self {
        match side {
            VehicleSide::Left => TrackPart::ShoesLeft,
            VehicleSide::Right => TrackPart::ShoesRight,
        }
    }

    /// True for the two track-shoe parts.
    pub const fn is_shoe(self) -> bool {
        matches!(self, TrackPart::ShoesLeft | TrackPart::ShoesRight)
    }

    /// Vehicle side of the part, `None` for the hull.
    pub const fn side(self) -> Option<VehicleSide> {
        match self {
            TrackPart::Hull => None,
            TrackPart::SprocketLeft | TrackPart::IdlerLeft | TrackPart::ShoesLeft => {
                Some(VehicleSide::Left)
            }
            TrackPart::SprocketRight | TrackPart::IdlerRight | TrackPart::ShoesRight => {
                Some(VehicleSide::Right)
            }
        }
    }
}

/// Pose of a body in the global frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFrame {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for BodyFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BodyFrame {
    pub const IDENTITY: BodyFrame = BodyFrame {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Express a global point in this body's local frame.
    pub fn point_to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.position)
    }

    /// Express a global direction in this body's local frame.
    pub fn direction_to_local(&self, direction: Vec3) -> Vec3 {
        self.rotation.inverse() * direction
    }

    /// Express a local point in the global frame.
    pub fn point_to_global(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.position
    }
}

/// Build a contact-local orientation frame whose first column is `normal`.
///
/// The two tangents complete a right-handed orthonormal basis.
pub fn contact_frame(normal: Vec3) -> Mat3 {
    let normal = normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        return Mat3::IDENTITY;
    }
    let (t1, t2) = normal.any_orthonormal_pair();
    Mat3::from_cols(normal, t1, t2)
}

/// A resolved contact recorded against one monitored part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactRecord {
    /// Contact point on the monitored body, global frame.
    pub point: Vec3,
    /// Contact frame: columns are normal, tangent 1, tangent 2.
    pub frame: Mat3,
    /// Reaction force expressed in the contact frame.
    pub force: Vec3,
    /// Reaction torque expressed in the contact frame.
    pub torque: Vec3,
}

impl ContactRecord {
    pub fn global_force(&self) -> Vec3 {
        self.frame * self.force
    }

    pub fn global_torque(&self) -> Vec3 {
        self.frame * self.torque
    }
}

/// A tread collision captured before contact resolution.
///
/// Body A is always the non-shoe body (wheel or idler), body B the shoe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRecord {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Contact point on A, global frame.
    pub point_a: Vec3,
    /// Contact point on B, global frame.
    pub point_b: Vec3,
    /// Contact point on A, in A's local frame.
    pub local_point_a: Vec3,
    /// Contact point on B, in B's local frame.
    pub local_point_b: Vec3,
    /// Unit normal from A towards B, global frame.
    pub normal: Vec3,
    /// Signed separation; negative when penetrating.
    pub distance: f32,
}

impl CollisionRecord {
    /// Exchange the roles of the two bodies.
    pub fn swap_bodies(&mut self) {
        std::mem::swap(&mut self.body_a, &mut self.body_b);
        std::mem::swap(&mut self.point_a, &mut self.point_b);
        std::mem::swap(&mut self.local_point_a, &mut self.local_point_b);
        self.normal = -self.normal;
    }

    /// Penetration depth, zero when separated.
    pub fn penetration(&self) -> f32 {
        (-self.distance).max(0.0)
    }
}
