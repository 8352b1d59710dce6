// src/physics.rs
//
// PhysicsWorld: rapier backend + the per-tick kart integrator.
//
// Tick pipeline (fixed order, single-threaded):
//   1) latch driver input, derive steer angle
//   2) suspension pass (per wheel): probe -> spring/damper -> impulse,
//      writes normal force + telemetry consumed later in the same tick
//   3) ground-contact classification (4 underbody probes, grounded = >= 2 hits)
//   4) aerodynamics (drag, downforce, ground effect)
//   5) grounded: engine -> drive split -> per-wheel tire solve -> impulses
//      airborne: corrective righting torque
//   6) rapier pipeline step
//
// Integration convention: every force is applied as an impulse J = F * dt
// through apply_impulse_at_point / apply_torque_impulse, uniformly.

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;
use rapier3d::prelude::{Group, InteractionGroups};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::kart::{
    aero, drive_force_per_wheel, probe_down, solve_tire, suspension_step, Engine, KartConfig,
    KartTelemetry, TireInput, WheelId, WheelRole, WheelState, WheelTelemetry,
};

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

/// Long probe used only for the ride-height telemetry readout.
const TELEMETRY_PROBE_RANGE: Real = 10.0;

/// Midair tilt below this is left alone by the stabilizer.
const STABILIZATION_TILT_DEADZONE: Real = 10.0 * std::f32::consts::PI / 180.0;

pub struct Kart {
    pub body: RigidBodyHandle,
    pub config: KartConfig,

    pub throttle: f32,    // -1.0 (full reverse) .. 1.0 (full forward)
    pub steer: f32,       // -1.0 (full left) .. 1.0 (full right)
    pub handbrake: bool,
    pub steer_angle: f32, // radians, derived each tick from steer input

    pub grounded: bool,
    pub wheels: [WheelState; 4],
    pub engine: Engine,
    pub telemetry: KartTelemetry,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,

    pub karts: HashMap<String, Kart>, // playerId -> kart
    pub body_to_player: HashMap<RigidBodyHandle, String>,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let gravity = vector![0.0, -9.81, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Big static ground slab, top surface at y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -1.0, 0.0])
            .build();
        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 1.0, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        info!(bodies = bodies.len(), colliders = colliders.len(), "ground inserted");

        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            karts: HashMap::new(),
            body_to_player: HashMap::new(),
        }
    }

    /// Latch input for a player's kart. Just stores it; forces are applied in
    /// `step`.
    pub fn apply_player_input(
        &mut self,
        player_id: &str,
        throttle: f32,
        steer: f32,
        handbrake: bool,
    ) {
        if let Some(kart) = self.karts.get_mut(player_id) {
            kart.throttle = throttle.clamp(-1.0, 1.0);
            kart.steer = steer.clamp(-1.0, 1.0);
            kart.handbrake = handbrake;
        }
    }

    /// Spawn a kart for this player: dynamic body + box collider, four wheel
    /// states, one engine. The kart falls from spawn height and settles on
    /// its suspension.
    pub fn spawn_kart_for_player(&mut self, id: String, position: [f32; 3]) -> RigidBodyHandle {
        let config = KartConfig::f1_prac();

        let [hx, hy, hz] = config.chassis_half_extents;
        let [cx, cy, cz] = config.chassis_com_offset;
        let volume = 8.0 * hx * hy * hz;
        let density = config.mass / volume.max(1e-3);

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], position[1], position[2]])
            .linear_damping(config.linear_damping)
            .angular_damping(config.angular_damping)
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![cx, cy, cz])
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .density(density)
            .friction(0.0) // wheel forces own all traction
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.body_to_player.insert(handle, id.clone());

        let wheels = Self::make_wheels(&config);
        let engine = Engine::new(&config);

        self.karts.insert(
            id.clone(),
            Kart {
                body: handle,
                config,
                throttle: 0.0,
                steer: 0.0,
                handbrake: false,
                steer_angle: 0.0,
                grounded: false,
                wheels,
                engine,
                telemetry: KartTelemetry::default(),
            },
        );

        info!(player = %id, ?position, "spawned kart");
        handle
    }

    pub fn remove_kart(&mut self, player_id: &str) {
        if let Some(kart) = self.karts.remove(player_id) {
            self.body_to_player.remove(&kart.body);
            self.bodies.remove(
                kart.body,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            );
            info!(player = %player_id, "removed kart");
        }
    }

    fn make_wheels(config: &KartConfig) -> [WheelState; 4] {
        let weight = config.mass * 9.81;
        let front_load = weight * config.front_axle_share * 0.5;
        let rear_load = weight * (1.0 - config.front_axle_share) * 0.5;

        [
            WheelState::new(WheelId::FL, WheelRole::FrontSteer, point![-0.8, 0.0, 1.5], front_load),
            WheelState::new(WheelId::FR, WheelRole::FrontSteer, point![0.8, 0.0, 1.5], front_load),
            WheelState::new(WheelId::RL, WheelRole::RearDrive, point![-0.8, 0.0, -1.5], rear_load),
            WheelState::new(WheelId::RR, WheelRole::RearDrive, point![0.8, 0.0, -1.5], rear_load),
        ]
    }

    /// All per-kart dynamics for one tick. Collects impulses while reading
    /// body state, then applies them in one batch.
    fn step_karts(&mut self, dt: Real) {
        self.query_pipeline.update(&self.colliders);

        let mut impulses: Vec<(RigidBodyHandle, Vector<Real>, Option<Point<Real>>)> = Vec::new();
        let mut torque_impulses: Vec<(RigidBodyHandle, Vector<Real>)> = Vec::new();

        for kart in self.karts.values_mut() {
            let Some(body) = self.bodies.get(kart.body) else { continue };
            let cfg = &kart.config;

            let pos = *body.position();
            let rot = pos.rotation;
            let linvel = *body.linvel();
            let angvel = *body.angvel();
            let com = *body.center_of_mass();

            let local_up = rot * Vector::y();
            let local_down = -local_up;
            let chassis_forward = rot * Vector::z();

            kart.steer_angle = kart.steer * cfg.max_steer_angle;

            let filter = QueryFilter::default().exclude_rigid_body(kart.body);
            let speed = linvel.magnitude();

            // ------------------------------------------------------------
            // 1) Suspension pass (also writes telemetry + normal forces)
            // ------------------------------------------------------------
            let probe_len = cfg.rest_length + cfg.spring_travel + cfg.wheel_radius;

            for wheel in kart.wheels.iter_mut() {
                let origin = pos * wheel.offset;

                // long probe feeds the ride-height readout only
                wheel.ride_height = probe_down(
                    &self.query_pipeline,
                    &self.bodies,
                    &self.colliders,
                    origin,
                    local_down,
                    TELEMETRY_PROBE_RANGE,
                    filter,
                )
                .map(|h| h.distance - cfg.wheel_radius)
                .unwrap_or(TELEMETRY_PROBE_RANGE);

                let hit = probe_down(
                    &self.query_pipeline,
                    &self.bodies,
                    &self.colliders,
                    origin,
                    local_down,
                    probe_len,
                    filter,
                );

                let forces = suspension_step(cfg, wheel, hit.map(|h| h.distance), dt);

                if let Some(hit) = hit {
                    wheel.contact_point = Some(hit.point);
                    if forces.total > 0.0 {
                        // applied at the contact point, off-center on purpose:
                        // braking/cornering load transfer falls out of this
                        impulses.push((kart.body, local_up * (forces.total * dt), Some(hit.point)));
                    }
                } else {
                    wheel.contact_point = None;
                }
            }

            // ------------------------------------------------------------
            // 2) Ground-contact classification
            // ------------------------------------------------------------
            let [ox, oy, oz] = cfg.ground_ray_offset;
            let corners: [Vector<Real>; 4] = [
                vector![0.5, 0.0, 0.5],
                vector![-0.5, 0.0, 0.5],
                vector![0.5, 0.0, -0.5],
                vector![-0.5, 0.0, -0.5],
            ];

            let mut rays_hit = 0;
            for corner in corners {
                let origin = pos * point![ox + corner.x, oy + corner.y, oz + corner.z];
                if probe_down(
                    &self.query_pipeline,
                    &self.bodies,
                    &self.colliders,
                    origin,
                    local_down,
                    cfg.ground_ray_length,
                    filter,
                )
                .is_some()
                {
                    rays_hit += 1;
                }
            }
            kart.grounded = rays_hit >= 2;

            // ------------------------------------------------------------
            // 3) Aerodynamics
            // ------------------------------------------------------------
            let mut aero_out = aero::AeroForces::default();

            aero_out.drag = aero::drag_force(cfg, speed);
            if speed > aero::AERO_MIN_SPEED {
                let drag_dir = -linvel / speed;
                impulses.push((kart.body, drag_dir * (aero_out.drag * dt), None));
            }

            aero_out.downforce = aero::downforce(cfg, speed);
            impulses.push((kart.body, local_down * (aero_out.downforce * dt), None));

            let chassis_origin = Point::from(pos.translation.vector);
            if let Some(hit) = probe_down(
                &self.query_pipeline,
                &self.bodies,
                &self.colliders,
                chassis_origin,
                local_down,
                cfg.ground_effect_max_dist,
                filter,
            ) {
                aero_out.ground_effect = aero::ground_effect_force(cfg, hit.distance);
                impulses.push((kart.body, local_down * (aero_out.ground_effect * dt), None));
            }

            // ------------------------------------------------------------
            // 4) Engine + tires (grounded) / righting torque (airborne)
            // ------------------------------------------------------------
            let mut front_axle_fy = 0.0;
            let mut rear_axle_fx = 0.0;

            if kart.grounded {
                let forward_speed = linvel.dot(&chassis_forward);
                let throttle_abs = kart.throttle.abs();
                let engine_torque = kart.engine.simulate(cfg, throttle_abs, forward_speed, dt);
                let drive_force = drive_force_per_wheel(cfg, engine_torque, kart.throttle);

                let steer_local =
                    UnitQuaternion::from_axis_angle(&Vector::y_axis(), kart.steer_angle);

                for wheel in kart.wheels.iter_mut() {
                    let (wheel_forward, wheel_right) = match wheel.role {
                        WheelRole::FrontSteer => (
                            rot * (steer_local * Vector::z()),
                            rot * (steer_local * Vector::x()),
                        ),
                        WheelRole::RearDrive => (rot * Vector::z(), rot * Vector::x()),
                    };

                    let apply_point = wheel.contact_point.unwrap_or(pos * wheel.offset);
                    let r = apply_point.coords - com.coords;
                    let point_vel = linvel + angvel.cross(&r); // v = v_com + w x r

                    let v_long = point_vel.dot(&wheel_forward);
                    let v_lat = point_vel.dot(&wheel_right);

                    let input = TireInput {
                        v_long,
                        v_lat,
                        drive_force: match wheel.role {
                            WheelRole::RearDrive => drive_force,
                            WheelRole::FrontSteer => 0.0,
                        },
                        normal_force: wheel.normal_force,
                        handbrake: kart.handbrake,
                    };
                    let tire = solve_tire(cfg, wheel.role, &input);

                    wheel.long_force = tire.fx;
                    wheel.lat_force = tire.fy;
                    wheel.lat_vel = v_lat;

                    let force = wheel_forward * tire.fx + wheel_right * tire.fy;
                    if force.magnitude() > 1e-6 {
                        impulses.push((kart.body, force * dt, Some(apply_point)));
                    }

                    match wheel.role {
                        WheelRole::FrontSteer => front_axle_fy += tire.fy,
                        WheelRole::RearDrive => rear_axle_fx += force.dot(&chassis_forward),
                    }
                }
            } else {
                let world_up = Vector::y();
                if local_up.angle(&world_up) > STABILIZATION_TILT_DEADZONE {
                    let torque = local_up.cross(&world_up) * cfg.stabilization_gain;
                    torque_impulses.push((kart.body, torque * dt));
                }
            }

            // ------------------------------------------------------------
            // 5) Telemetry snapshot for this tick
            // ------------------------------------------------------------
            kart.telemetry = KartTelemetry {
                speed_ms: speed,
                rpm: kart.engine.rpm,
                engine_torque: kart.engine.current_torque,
                smoothed_throttle: kart.engine.smoothed_throttle,
                rev_limiter_factor: kart.engine.rev_limiter_factor,
                front_axle_fy,
                rear_axle_fx,
                drag_force: aero_out.drag,
                downforce: aero_out.downforce,
                ground_effect_force: aero_out.ground_effect,
                grounded: kart.grounded,
                handbrake: kart.handbrake,
                wheels: kart
                    .wheels
                    .iter()
                    .map(|w| WheelTelemetry {
                        id: w.id.as_str(),
                        spring_force: w.spring_force,
                        damper_force: w.damper_force,
                        total_force: w.total_force,
                        compression_pct: w.compression_pct,
                        ride_height: w.ride_height,
                        lat_vel: w.lat_vel,
                    })
                    .collect(),
            };
        }

        for (handle, impulse, point) in impulses {
            if let Some(body) = self.bodies.get_mut(handle) {
                match point {
                    Some(p) => body.apply_impulse_at_point(impulse, p, true),
                    None => body.apply_impulse(impulse, true),
                }
            }
        }
        for (handle, torque) in torque_impulses {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.apply_torque_impulse(torque, true);
            }
        }
    }

    pub fn step(&mut self, dt: Real) {
        self.step_karts(dt);

        let hooks = ();
        let events = ();

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );

        // Safety: never let a body escape to insane coordinates.
        for (_, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = !pos.x.is_finite()
                || !pos.y.is_finite()
                || !pos.z.is_finite()
                || pos.x.abs() > 1_000.0
                || pos.y.abs() > 1_000.0
                || pos.z.abs() > 1_000.0;

            if bad {
                warn!(?pos, "resetting runaway body");
                body.set_translation(vector![0.0, 1.0, 0.0], true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: Real = 1.0 / 60.0;

    #[test]
    fn kart_settles_on_its_suspension() {
        let mut world = PhysicsWorld::new();
        world.spawn_kart_for_player("p1".into(), [0.0, 1.3, 0.0]);

        // 5 simulated seconds with no input
        for _ in 0..300 {
            world.step(DT);
        }

        let kart = world.karts.get("p1").unwrap();
        let body = world.bodies.get(kart.body).unwrap();
        let y = body.translation().y;

        assert!(y.is_finite());
        assert!(y > 0.2 && y < 2.0, "kart should rest on its springs, y = {y}");
        assert!(kart.grounded, "settled kart must classify as grounded");
        assert!(
            kart.telemetry.wheels.iter().all(|w| w.total_force >= 0.0),
            "suspension never pulls"
        );
    }

    #[test]
    fn throttle_moves_the_kart_forward() {
        let mut world = PhysicsWorld::new();
        world.spawn_kart_for_player("p1".into(), [0.0, 1.3, 0.0]);

        // let it settle, then floor it
        for _ in 0..240 {
            world.step(DT);
        }
        world.apply_player_input("p1", 1.0, 0.0, false);
        for _ in 0..240 {
            world.step(DT);
        }

        let kart = world.karts.get("p1").unwrap();
        let body = world.bodies.get(kart.body).unwrap();
        assert!(
            body.translation().z > 1.0,
            "kart should have driven forward, z = {}",
            body.translation().z
        );
        assert!(kart.engine.rpm > kart.config.idle_rpm);
    }

    #[test]
    fn removing_a_kart_frees_its_body() {
        let mut world = PhysicsWorld::new();
        let handle = world.spawn_kart_for_player("p1".into(), [0.0, 1.3, 0.0]);
        world.step(DT);

        world.remove_kart("p1");
        assert!(world.karts.is_empty());
        assert!(world.bodies.get(handle).is_none());
        assert!(world.body_to_player.is_empty());
    }
}
