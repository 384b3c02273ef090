//! Core systems of the Anatomica AR anatomy trainer, rewritten in Rust.
//!
//! The crate owns everything with game meaning: classifying a loaded model
//! tree into organ groups, anchoring them in world space, judging ray-based
//! placement attempts, and the session state machine that decides what a
//! confirm press means at any moment. Rendering, XR session management,
//! audio output and haptics are intentionally kept outside of the crate; the
//! presentation layer feeds poses and events in through [`GameSession`] and
//! executes the [`ShellCommand`]s it gets back, so the code remains testable
//! and easy to embed in headless tools.

pub mod assets;
pub mod classify;
pub mod definition;
pub mod game;
pub mod obj;
pub mod placement;
pub mod router;
pub mod scene;
pub mod schedule;
pub mod session;
pub mod shell;

pub use assets::AssetCache;
pub use classify::{advanced_targets, classify, ClassifyOutcome, NodeTarget, OrganGroup};
pub use definition::{DefinitionError, GameDefinition, Mode, OrganKeywords, SoundBank};
pub use game::{placement_prompt, GameSession};
pub use obj::{load_obj_file, load_obj_scene, ModelCache};
pub use placement::{judge, Judgement, Plane, PlaneContact, Ray};
pub use router::{active_panel, route, Action};
pub use scene::{Bounds, NodeId, SceneGraph, SceneNode, Transform};
pub use schedule::Scheduler;
pub use session::{Phase, PlayQueue, SessionState, Target};
pub use shell::{
    default_layouts, ControlTag, FrameInput, Haptic, PanelControl, PanelId, PanelLayout,
    ShellCommand,
};
