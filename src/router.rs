use glam::Mat4;

use crate::placement::Ray;
use crate::session::Phase;
use crate::shell::{ControlTag, PanelId, PanelLayout};

/// Resolved meaning of one confirm event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Anchor the model at the detected surface.
    PlaceModel,
    /// Activate a panel control.
    InvokeControl(ControlTag),
    /// Judge the ray against the current target.
    AttemptPlacement,
    NoOp,
}

/// The panel that owns confirm input in a given phase.
pub fn active_panel(phase: Phase) -> Option<PanelId> {
    match phase {
        Phase::MenuOpen => Some(PanelId::Menu),
        Phase::RulesOpen => Some(PanelId::Rules),
        Phase::DifficultyOpen => Some(PanelId::Difficulty),
        Phase::WaitingForPlacement | Phase::Playing | Phase::Victory => None,
    }
}

/// Maps a confirm event onto an action using only the current phase.
///
/// `panel` must be the layout of `active_panel(phase)` when there is one; a
/// ray that touches no control resolves to no action at all.
pub fn route(
    phase: Phase,
    surface_detected: bool,
    ray: &Ray,
    panel: Option<&PanelLayout>,
) -> Action {
    match phase {
        Phase::WaitingForPlacement if surface_detected => Action::PlaceModel,
        Phase::WaitingForPlacement => Action::NoOp,
        Phase::MenuOpen | Phase::RulesOpen | Phase::DifficultyOpen => panel
            .and_then(|layout| pick_control(ray, layout))
            .map(Action::InvokeControl)
            .unwrap_or(Action::NoOp),
        Phase::Playing => Action::AttemptPlacement,
        Phase::Victory => Action::NoOp,
    }
}

/// The nearest control quad the ray passes through, if any.
///
/// Each control is tested in its own local space, so the result follows the
/// panel wherever the shell has billboarded it.
pub fn pick_control(ray: &Ray, layout: &PanelLayout) -> Option<ControlTag> {
    let panel_matrix = layout.transform.to_matrix();
    let mut nearest: Option<(f32, ControlTag)> = None;
    for control in &layout.controls {
        let matrix = panel_matrix * Mat4::from_translation(control.offset);
        let inverse = matrix.inverse();
        let origin = inverse.transform_point3(ray.origin);
        let direction = inverse.transform_vector3(ray.direction);
        if direction.z.abs() < 1e-6 {
            continue;
        }
        let t = -origin.z / direction.z;
        if t < 0.0 {
            continue;
        }
        let point = origin + direction * t;
        if point.x.abs() > control.width * 0.5 || point.y.abs() > control.height * 0.5 {
            continue;
        }
        if nearest.map_or(true, |(best, _)| t < best) {
            nearest = Some((t, control.tag));
        }
    }
    nearest.map(|(_, tag)| tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Transform;
    use crate::shell::{default_layouts, PanelControl};
    use glam::{Quat, Vec3};

    fn menu() -> PanelLayout {
        default_layouts()
            .into_iter()
            .find(|layout| layout.panel == PanelId::Menu)
            .unwrap()
    }

    fn aim(x: f32, y: f32) -> Ray {
        Ray::new(Vec3::new(x, y, 1.0), Vec3::NEG_Z)
    }

    #[test]
    fn picks_the_button_under_the_ray() {
        let layout = menu();
        assert_eq!(pick_control(&aim(0.0, 0.2), &layout), Some(ControlTag::Start));
        assert_eq!(pick_control(&aim(0.0, 0.0), &layout), Some(ControlTag::Rules));
        assert_eq!(
            pick_control(&aim(0.1, -0.22), &layout),
            Some(ControlTag::Settings)
        );
    }

    #[test]
    fn gaps_between_buttons_pick_nothing() {
        let layout = menu();
        assert_eq!(pick_control(&aim(0.0, 0.11), &layout), None);
        assert_eq!(pick_control(&aim(0.5, 0.2), &layout), None);
    }

    #[test]
    fn picking_follows_the_panel_pose() {
        let mut layout = menu();
        layout.transform = Transform::from_translation(Vec3::new(-1.0, 1.3, -0.5));
        let ray = Ray::new(Vec3::new(-1.0, 1.5, 1.0), Vec3::NEG_Z);
        assert_eq!(pick_control(&ray, &layout), Some(ControlTag::Start));
        // The old spot no longer hits anything.
        assert_eq!(pick_control(&aim(0.0, 0.2), &layout), None);
    }

    #[test]
    fn picking_follows_a_billboarded_rotation() {
        let mut layout = menu();
        layout.transform = Transform::from_pose(
            Vec3::ZERO,
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let ray = Ray::new(Vec3::new(1.0, 0.2, 0.0), Vec3::NEG_X);
        assert_eq!(pick_control(&ray, &layout), Some(ControlTag::Start));
    }

    #[test]
    fn nearest_control_wins_on_overlap() {
        let mut layout = PanelLayout::new(
            PanelId::Menu,
            vec![
                PanelControl {
                    tag: ControlTag::Rules,
                    offset: Vec3::new(0.0, 0.0, 0.03),
                    width: 0.6,
                    height: 0.2,
                },
                PanelControl {
                    tag: ControlTag::Start,
                    offset: Vec3::new(0.0, 0.0, 0.2),
                    width: 0.6,
                    height: 0.2,
                },
            ],
        );
        layout.transform = Transform::IDENTITY;
        assert_eq!(pick_control(&aim(0.0, 0.0), &layout), Some(ControlTag::Start));
    }

    #[test]
    fn ray_pointing_away_picks_nothing() {
        let layout = menu();
        let ray = Ray::new(Vec3::new(0.0, 0.2, 1.0), Vec3::Z);
        assert_eq!(pick_control(&ray, &layout), None);
    }

    #[test]
    fn routing_depends_on_the_phase() {
        let layout = menu();
        let ray = aim(0.0, 0.2);
        assert_eq!(
            route(Phase::WaitingForPlacement, true, &ray, None),
            Action::PlaceModel
        );
        assert_eq!(
            route(Phase::WaitingForPlacement, false, &ray, None),
            Action::NoOp
        );
        assert_eq!(
            route(Phase::MenuOpen, true, &ray, Some(&layout)),
            Action::InvokeControl(ControlTag::Start)
        );
        assert_eq!(route(Phase::MenuOpen, true, &aim(0.5, 0.5), Some(&layout)), Action::NoOp);
        assert_eq!(route(Phase::MenuOpen, true, &ray, None), Action::NoOp);
        assert_eq!(route(Phase::Playing, true, &ray, None), Action::AttemptPlacement);
        assert_eq!(route(Phase::Victory, true, &ray, None), Action::NoOp);
    }

    #[test]
    fn active_panel_tracks_menu_phases() {
        assert_eq!(active_panel(Phase::MenuOpen), Some(PanelId::Menu));
        assert_eq!(active_panel(Phase::RulesOpen), Some(PanelId::Rules));
        assert_eq!(active_panel(Phase::DifficultyOpen), Some(PanelId::Difficulty));
        assert_eq!(active_panel(Phase::Playing), None);
        assert_eq!(active_panel(Phase::WaitingForPlacement), None);
    }
}
