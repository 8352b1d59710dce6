// ==============================================================================
// probe.rs — TERRAIN CONTACT PROBE
// ------------------------------------------------------------------------------
// Downward raycast against the scene. A miss (terrain gap, out of range, or
// backend query coming back empty) is a valid, frequent state and is reported
// as None, never as an error.
// ==============================================================================

use rapier3d::prelude::{
    ColliderSet, Point, QueryFilter, QueryPipeline, Ray, Real, RigidBodySet, Vector,
};

/// A successful contact sample. `distance` is measured from the origin along
/// the cast direction (the vehicle's local down axis).
#[derive(Copy, Clone, Debug)]
pub struct ProbeHit {
    pub distance: Real,
    pub point: Point<Real>,
}

/// Cast a ray from `origin` along `direction` (unit, local down in world
/// space), up to `max_distance`.
pub fn probe_down(
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    origin: Point<Real>,
    direction: Vector<Real>,
    max_distance: Real,
    filter: QueryFilter,
) -> Option<ProbeHit> {
    let ray = Ray::new(origin, direction);
    let (_collider, toi) = query.cast_ray(bodies, colliders, &ray, max_distance, true, filter)?;
    Some(ProbeHit {
        distance: toi,
        point: origin + direction * toi,
    })
}
