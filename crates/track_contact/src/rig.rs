//! A small tracked rig built directly in rapier.
//!
//! Vehicle frame: +X forward, +Y up, +Z left. Wheels, idlers and sprockets are
//! balls on revolute joints about Z; the track is a row of fixed shoe plates
//! laid on the ground under each side. The rig is only meant to exercise the
//! contact pipeline, not to drive.

use bevy::prelude::Resource;
use rapier3d::prelude as rapier;
use rapier::nalgebra::{Point3, Vector3};

use crate::rapier_world::{role_user_data, PhysicsState};
use crate::types::{BodyRole, VehicleSide};

/// Dimensions of the rig.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct RigDescription {
    pub hull_half_extents: Vector3<f32>,
    pub hull_height: f32,
    /// Lateral offset of each track from the centerline.
    pub track_offset: f32,
    pub sprocket_radius: f32,
    pub idler_radius: f32,
    pub wheel_radius: f32,
    /// Longitudinal positions of the road wheels.
    pub wheel_positions: Vec<f32>,
    pub shoes_per_side: usize,
    pub shoe_half_extents: Vector3<f32>,
}

impl Default for RigDescription {
    fn default() -> Self {
        Self {
            hull_half_extents: Vector3::new(2.0, 0.4, 1.0),
            hull_height: 1.2,
            track_offset: 1.4,
            sprocket_radius: 0.35,
            idler_radius: 0.35,
            wheel_radius: 0.3,
            wheel_positions: vec![-0.9, 0.0, 0.9],
            shoes_per_side: 16,
            shoe_half_extents: Vector3::new(0.15, 0.05, 0.3),
        }
    }
}

/// Rapier handles of the rig's bodies.
#[derive(Resource, Debug, Clone)]
pub struct TrackRig {
    pub hull: rapier::RigidBodyHandle,
    pub sprockets: [rapier::RigidBodyHandle; 2],
    pub idlers: [rapier::RigidBodyHandle; 2],
    pub wheels: [Vec<rapier::RigidBodyHandle>; 2],
    pub shoes: [Vec<rapier::RigidBodyHandle>; 2],
}

impl TrackRig {
    /// Insert the ground and the rig into `physics`.
    pub fn build(physics: &mut PhysicsState, desc: &RigDescription) -> Self {
        let p = physics;

        let ground = p
            .rigid_body_set
            .insert(rapier::RigidBodyBuilder::fixed().translation(Vector3::new(0.0, -0.5, 0.0)));
        p.collider_set.insert_with_parent(
            rapier::ColliderBuilder::cuboid(20.0, 0.5, 20.0),
            ground,
            &mut p.rigid_body_set,
        );

        let hull = p.rigid_body_set.insert(
            rapier::RigidBodyBuilder::dynamic()
                .translation(Vector3::new(0.0, desc.hull_height, 0.0))
                .user_data(role_user_data(BodyRole::Hull)),
        );
        p.collider_set.insert_with_parent(
            rapier::ColliderBuilder::cuboid(
                desc.hull_half_extents.x,
                desc.hull_half_extents.y,
                desc.hull_half_extents.z,
            ),
            hull,
            &mut p.rigid_body_set,
        );

        let x_front = desc.hull_half_extents.x - desc.sprocket_radius * 0.5;
        let x_rear = -(desc.hull_half_extents.x - desc.idler_radius * 0.5);
        let mut sprockets = Vec::with_capacity(2);
        let mut idlers = Vec::with_capacity(2);
        let mut wheels: [Vec<rapier::RigidBodyHandle>; 2] = Default::default();
        let mut shoes: [Vec<rapier::RigidBodyHandle>; 2] = Default::default();

        for side in VehicleSide::BOTH {
            let z = match side {
                VehicleSide::Left => desc.track_offset,
                VehicleSide::Right => -desc.track_offset,
            };

            // Sprocket and idler ride above the track; only road wheels touch it.
            let sprocket_y = 2.0 * desc.shoe_half_extents.y + desc.sprocket_radius + 0.15;
            sprockets.push(spin_body(
                p,
                hull,
                desc,
                Point3::new(x_front, sprocket_y, z),
                desc.sprocket_radius,
                BodyRole::Sprocket,
            ));
            let idler_y = 2.0 * desc.shoe_half_extents.y + desc.idler_radius + 0.15;
            idlers.push(spin_body(
                p,
                hull,
                desc,
                Point3::new(x_rear, idler_y, z),
                desc.idler_radius,
                BodyRole::Idler,
            ));

            let wheel_y = 2.0 * desc.shoe_half_extents.y + desc.wheel_radius;
            for &x in &desc.wheel_positions {
                wheels[side.index()].push(spin_body(
                    p,
                    hull,
                    desc,
                    Point3::new(x, wheel_y, z),
                    desc.wheel_radius,
                    BodyRole::Wheel,
                ));
            }

            let pitch = 2.0 * desc.shoe_half_extents.x + 0.02;
            let start = -pitch * (desc.shoes_per_side as f32 - 1.0) * 0.5;
            for i in 0..desc.shoes_per_side {
                let shoe = p.rigid_body_set.insert(
                    rapier::RigidBodyBuilder::fixed()
                        .translation(Vector3::new(
                            start + pitch * i as f32,
                            desc.shoe_half_extents.y,
                            z,
                        ))
                        .user_data(role_user_data(BodyRole::Shoe)),
                );
                p.collider_set.insert_with_parent(
                    rapier::ColliderBuilder::cuboid(
                        desc.shoe_half_extents.x,
                        desc.shoe_half_extents.y,
                        desc.shoe_half_extents.z,
                    )
                    .active_hooks(rapier::ActiveHooks::MODIFY_SOLVER_CONTACTS),
                    shoe,
                    &mut p.rigid_body_set,
                );
                shoes[side.index()].push(shoe);
            }
        }

        Self {
            hull,
            sprockets: [sprockets[0], sprockets[1]],
            idlers: [idlers[0], idlers[1]],
            wheels,
            shoes,
        }
    }
}

/// A ball body hinged to the hull about the lateral axis.
fn spin_body(
    p: &mut PhysicsState,
    hull: rapier::RigidBodyHandle,
    desc: &RigDescription,
    position: Point3<f32>,
    radius: f32,
    role: BodyRole,
) -> rapier::RigidBodyHandle {
    let handle = p.rigid_body_set.insert(
        rapier::RigidBodyBuilder::dynamic()
            .translation(position.coords)
            .user_data(role_user_data(role)),
    );
    p.collider_set.insert_with_parent(
        rapier::ColliderBuilder::ball(radius)
            .active_hooks(rapier::ActiveHooks::MODIFY_SOLVER_CONTACTS),
        handle,
        &mut p.rigid_body_set,
    );

    let anchor = Point3::new(position.x, position.y - desc.hull_height, position.z);
    let joint = rapier::RevoluteJointBuilder::new(Vector3::z_axis())
        .local_anchor1(anchor)
        .local_anchor2(Point3::origin());
    p.impulse_joint_set.insert(hull, handle, joint, true);
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rapier_world::body_role;

    #[test]
    fn test_rig_roles_and_counts() {
        let mut physics = PhysicsState::new();
        let desc = RigDescription::default();
        let rig = TrackRig::build(&mut physics, &desc);

        let role = |h: rapier::RigidBodyHandle| body_role(&physics.rigid_body_set[h]);
        assert_eq!(role(rig.hull), BodyRole::Hull);
        for side in VehicleSide::BOTH {
            let i = side.index();
            assert_eq!(role(rig.sprockets[i]), BodyRole::Sprocket);
            assert_eq!(role(rig.idlers[i]), BodyRole::Idler);
            assert_eq!(rig.wheels[i].len(), desc.wheel_positions.len());
            assert_eq!(rig.shoes[i].len(), desc.shoes_per_side);
            assert!(rig.wheels[i].iter().all(|&h| role(h) == BodyRole::Wheel));
            assert!(rig.shoes[i].iter().all(|&h| role(h) == BodyRole::Shoe));
        }
    }
}
