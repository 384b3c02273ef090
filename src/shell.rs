use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::scene::{NodeId, Transform};

/// Panels the shell can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelId {
    Menu,
    Rules,
    Difficulty,
}

/// Action tags carried by interactive panel controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlTag {
    Start,
    Rules,
    Settings,
    Back,
    Simple,
    Advanced,
}

/// Strength of a controller vibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Haptic {
    /// Success feedback, full amplitude for 100 ms.
    Strong,
    /// Error and menu feedback, half amplitude for 50 ms.
    Light,
}

/// Per-frame sample delivered by the shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Time since the session started.
    pub now: Duration,
    pub controller: Transform,
    /// Pose of the detected real-world surface, when tracking has one.
    pub surface: Option<Transform>,
}

/// An interactive quad on a panel, in panel-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelControl {
    pub tag: ControlTag,
    pub offset: Vec3,
    pub width: f32,
    pub height: f32,
}

/// A panel's interactive controls plus its current world pose.
///
/// The shell owns panel placement and billboarding; it reports the resulting
/// pose back so controls can be picked in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelLayout {
    pub panel: PanelId,
    pub controls: Vec<PanelControl>,
    pub transform: Transform,
}

impl PanelLayout {
    pub fn new(panel: PanelId, controls: Vec<PanelControl>) -> Self {
        Self {
            panel,
            controls,
            transform: Transform::IDENTITY,
        }
    }
}

/// The control arrangement of the stock panels.
pub fn default_layouts() -> Vec<PanelLayout> {
    vec![
        PanelLayout::new(
            PanelId::Menu,
            vec![
                control(ControlTag::Start, 0.0, 0.2, 0.6, 0.12),
                control(ControlTag::Rules, 0.0, 0.0, 0.6, 0.12),
                control(ControlTag::Settings, 0.0, -0.2, 0.6, 0.12),
            ],
        ),
        PanelLayout::new(
            PanelId::Rules,
            vec![control(ControlTag::Back, 0.0, -0.65, 0.3, 0.1)],
        ),
        PanelLayout::new(
            PanelId::Difficulty,
            vec![
                control(ControlTag::Simple, -0.3, 0.0, 0.5, 0.2),
                control(ControlTag::Advanced, 0.3, 0.0, 0.5, 0.2),
            ],
        ),
    ]
}

fn control(tag: ControlTag, x: f32, y: f32, width: f32, height: f32) -> PanelControl {
    PanelControl {
        tag,
        // Buttons sit slightly proud of the panel face.
        offset: Vec3::new(x, y, 0.03),
        width,
        height,
    }
}

/// Commands the session issues to the presentation shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShellCommand {
    ShowPanel(PanelId),
    HidePanel(PanelId),
    /// Show prompt text; lines are separated by `\n`.
    SetPrompt(String),
    ClearPrompt,
    /// Attach the model tree to the world at the detected surface pose.
    AnchorModel(Transform),
    /// A node renders when it and all of its ancestors are visible.
    SetNodeVisible { node: NodeId, visible: bool },
    /// Toggle the emissive flash material on a node.
    SetNodeHighlight { node: NodeId, highlighted: bool },
    /// Fetch a sound; the shell answers through `on_sound_loaded`.
    LoadSound { path: String },
    PlaySound { path: String, position: Vec3 },
    StartLoop { path: String, position: Vec3 },
    StopLoop { path: String },
    Haptic(Haptic),
    /// Celebration burst around the completed model.
    SpawnParticles { position: Vec3, duration: Duration },
    /// Short-lived marker at a missed attempt.
    SpawnMarker { position: Vec3, lifetime: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layouts_cover_every_panel() {
        let layouts = default_layouts();
        assert_eq!(layouts.len(), 3);
        let menu = layouts.iter().find(|l| l.panel == PanelId::Menu).unwrap();
        assert_eq!(menu.controls.len(), 3);
        assert_eq!(menu.controls[0].tag, ControlTag::Start);
        assert_eq!(menu.controls[0].offset.y, 0.2);

        let rules = layouts.iter().find(|l| l.panel == PanelId::Rules).unwrap();
        assert_eq!(rules.controls[0].tag, ControlTag::Back);

        let difficulty = layouts
            .iter()
            .find(|l| l.panel == PanelId::Difficulty)
            .unwrap();
        let tags: Vec<_> = difficulty.controls.iter().map(|c| c.tag).collect();
        assert_eq!(tags, vec![ControlTag::Simple, ControlTag::Advanced]);
    }

    #[test]
    fn layouts_start_at_the_identity_pose() {
        for layout in default_layouts() {
            assert_eq!(layout.transform, Transform::IDENTITY);
        }
    }
}
