use glam::{Quat, Vec3};

use crate::scene::{Bounds, Transform};

const PARALLEL_EPSILON: f32 = 1e-6;

/// Half-line the controller points along, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Builds the aiming ray from a controller pose; controllers point along
    /// their local negative Z axis.
    pub fn from_transform(transform: &Transform) -> Self {
        Self::new(transform.translation, transform.rotation * Vec3::NEG_Z)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersection with an infinite plane, `None` when the ray is parallel
    /// to it or the plane lies behind the origin.
    pub fn intersect_plane(&self, plane: &Plane) -> Option<Vec3> {
        let denom = plane.normal.dot(self.direction);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = plane.normal.dot(plane.point - self.origin) / denom;
        (t >= 0.0).then(|| self.at(t))
    }

    /// Slab test against an axis-aligned box.
    pub fn intersects_bounds(&self, bounds: &Bounds) -> bool {
        let origin = self.origin.to_array();
        let direction = self.direction.to_array();
        let min = bounds.min.to_array();
        let max = bounds.max.to_array();

        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            if direction[axis].abs() < PARALLEL_EPSILON {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return false;
                }
                continue;
            }
            let inverse = 1.0 / direction[axis];
            let mut t0 = (min[axis] - origin[axis]) * inverse;
            let mut t1 = (max[axis] - origin[axis]) * inverse;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// Infinite plane described by a unit normal and a point on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub point: Vec3,
}

impl Plane {
    pub fn new(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
            point,
        }
    }
}

/// Where the judged ray met the target plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneContact {
    pub point: Vec3,
    /// Distance from the contact point to the target anchor.
    pub distance: f32,
}

/// Outcome of judging one confirm event during play.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Judgement {
    /// Contact landed closer to the target anchor than the tolerance.
    Hit(PlaneContact),
    /// Contact landed too far away, or (`None`) the ray never reached the
    /// target plane.
    Miss(Option<PlaneContact>),
    /// The ray missed the model entirely; not a placement attempt.
    OffModel,
}

/// Judges a placement attempt.
///
/// The ray must first touch the model's geometry at all, otherwise the event
/// is ignored as an off-model gesture. The attempt is then measured on the
/// plane through the target anchor oriented like the anchored model, so depth
/// along the aiming direction never skews the distance.
pub fn judge(
    ray: &Ray,
    anchor: Vec3,
    model_rotation: Quat,
    model_bounds: &[Bounds],
    tolerance: f32,
) -> Judgement {
    let touches_model = model_bounds
        .iter()
        .any(|bounds| ray.intersects_bounds(bounds));
    if !touches_model {
        return Judgement::OffModel;
    }

    let plane = Plane::new(model_rotation * Vec3::Z, anchor);
    let Some(point) = ray.intersect_plane(&plane) else {
        return Judgement::Miss(None);
    };
    let contact = PlaneContact {
        point,
        distance: point.distance(anchor),
    };
    if contact.distance < tolerance {
        Judgement::Hit(contact)
    } else {
        Judgement::Miss(Some(contact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_bounds_at(center: Vec3) -> Bounds {
        Bounds::new(center - Vec3::splat(0.5), center + Vec3::splat(0.5))
    }

    #[test]
    fn ray_points_down_the_controller_forward_axis() {
        let pose = Transform::from_pose(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let ray = Ray::from_transform(&pose);
        assert_eq!(ray.origin, Vec3::new(1.0, 2.0, 3.0));
        // Yaw by 90 degrees turns -Z into -X.
        assert!((ray.direction - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn plane_intersection_hits_in_front() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z);
        let plane = Plane::new(Vec3::Z, Vec3::ZERO);
        let point = ray.intersect_plane(&plane).unwrap();
        assert!((point - Vec3::ZERO).length() < 1e-5);
    }

    #[test]
    fn plane_behind_the_origin_is_ignored() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::NEG_Z);
        let plane = Plane::new(Vec3::Z, Vec3::ZERO);
        assert!(ray.intersect_plane(&plane).is_none());
    }

    #[test]
    fn parallel_ray_misses_the_plane() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::X);
        let plane = Plane::new(Vec3::Z, Vec3::ZERO);
        assert!(ray.intersect_plane(&plane).is_none());
    }

    #[test]
    fn slab_test_accepts_and_rejects() {
        let bounds = unit_bounds_at(Vec3::ZERO);
        let towards = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let away = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        let offset = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(towards.intersects_bounds(&bounds));
        assert!(!away.intersects_bounds(&bounds));
        assert!(!offset.intersects_bounds(&bounds));
    }

    #[test]
    fn axis_parallel_ray_inside_the_slab_hits() {
        let bounds = unit_bounds_at(Vec3::ZERO);
        let inside = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::NEG_Z);
        assert!(inside.intersects_bounds(&bounds));
    }

    #[test]
    fn judge_scores_a_close_attempt_as_hit() {
        let anchor = Vec3::new(0.0, 1.0, 0.0);
        let bounds = [unit_bounds_at(anchor)];
        let ray = Ray::new(Vec3::new(0.05, 1.0, 2.0), Vec3::NEG_Z);
        match judge(&ray, anchor, Quat::IDENTITY, &bounds, 0.09) {
            Judgement::Hit(contact) => {
                assert!((contact.distance - 0.05).abs() < 1e-5);
                assert!((contact.point - Vec3::new(0.05, 1.0, 0.0)).length() < 1e-5);
            }
            other => panic!("expected a hit, got {other:?}"),
        }
    }

    #[test]
    fn judge_scores_a_far_attempt_as_miss() {
        let anchor = Vec3::new(0.0, 1.0, 0.0);
        let bounds = [unit_bounds_at(anchor)];
        let ray = Ray::new(Vec3::new(0.4, 1.0, 2.0), Vec3::NEG_Z);
        match judge(&ray, anchor, Quat::IDENTITY, &bounds, 0.09) {
            Judgement::Miss(Some(contact)) => assert!((contact.distance - 0.4).abs() < 1e-5),
            other => panic!("expected a miss, got {other:?}"),
        }
    }

    #[test]
    fn judge_ignores_rays_that_miss_the_model() {
        let anchor = Vec3::new(0.0, 1.0, 0.0);
        let bounds = [unit_bounds_at(anchor)];
        let ray = Ray::new(Vec3::new(10.0, 10.0, 2.0), Vec3::NEG_Z);
        assert_eq!(
            judge(&ray, anchor, Quat::IDENTITY, &bounds, 0.09),
            Judgement::OffModel
        );
    }

    #[test]
    fn judge_plane_follows_the_model_rotation() {
        // Model yawed by 90 degrees: the target plane normal becomes +X, so a
        // ray flying along -X measures against a plane it can actually cross.
        let anchor = Vec3::new(0.0, 1.0, 0.0);
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let bounds = [unit_bounds_at(anchor)];
        let ray = Ray::new(Vec3::new(2.0, 1.0, 0.03), Vec3::NEG_X);
        match judge(&ray, anchor, rotation, &bounds, 0.09) {
            Judgement::Hit(contact) => assert!((contact.distance - 0.03).abs() < 1e-4),
            other => panic!("expected a hit, got {other:?}"),
        }
    }

    #[test]
    fn judge_parallel_ray_is_a_miss_without_contact() {
        let anchor = Vec3::ZERO;
        let bounds = [unit_bounds_at(anchor)];
        let ray = Ray::new(Vec3::new(-2.0, 0.2, 0.0), Vec3::X);
        assert_eq!(
            judge(&ray, anchor, Quat::IDENTITY, &bounds, 0.09),
            Judgement::Miss(None)
        );
    }

    #[test]
    fn tolerance_boundary_counts_as_miss() {
        let anchor = Vec3::ZERO;
        let bounds = [Bounds::new(Vec3::splat(-1.0), Vec3::splat(1.0))];
        // Contact lands at exactly the tolerance; only strictly closer wins.
        let ray = Ray::new(Vec3::new(0.09, 0.0, 2.0), Vec3::NEG_Z);
        match judge(&ray, anchor, Quat::IDENTITY, &bounds, 0.09) {
            Judgement::Miss(Some(contact)) => assert_eq!(contact.distance, 0.09),
            other => panic!("expected a miss, got {other:?}"),
        }
    }
}
