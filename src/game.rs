use std::collections::HashMap;
use std::time::Duration;

use glam::{Quat, Vec3};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::assets::AssetCache;
use crate::classify::{advanced_targets, classify, OrganGroup};
use crate::definition::{GameDefinition, Mode};
use crate::placement::{judge, Judgement, Ray};
use crate::router::{active_panel, route, Action};
use crate::scene::{Bounds, NodeId, SceneGraph, Transform};
use crate::schedule::Scheduler;
use crate::session::{Phase, PlayQueue, SessionState, Target};
use crate::shell::{
    default_layouts, ControlTag, FrameInput, Haptic, PanelId, PanelLayout, ShellCommand,
};

/// Stock menu placement relative to the anchored model: left of it and above.
const MENU_OFFSET: Vec3 = Vec3::new(-1.0, 1.3, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    ReturnToMenu,
    FlashStep(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct FlashState {
    highlighted: bool,
    steps_done: u32,
}

/// One run of the anatomy trainer, from model placement to victory and back.
///
/// The session owns every piece of game state: the loaded model tree, the
/// classified organ groups, the play queue, the phase machine, the sound
/// cache and the timer queue. The presentation shell drives it through the
/// `on_*` entry points and receives `ShellCommand`s back; the session never
/// calls out, so it stays deterministic and headless-testable.
///
/// All entry points run on the shell's frame/event thread. After
/// `on_session_end` every entry point is inert.
#[derive(Debug)]
pub struct GameSession {
    definition: GameDefinition,
    state: SessionState,
    graph: Option<SceneGraph>,
    model_root: Option<NodeId>,
    groups: Vec<OrganGroup>,
    queue: PlayQueue,
    mode: Option<Mode>,
    panels: HashMap<PanelId, PanelLayout>,
    assets: AssetCache,
    scheduler: Scheduler<TimerEvent>,
    flashes: HashMap<NodeId, FlashState>,
    surface: Option<Transform>,
    prompt: Option<String>,
    running_loops: Vec<String>,
    rng: StdRng,
    now: Duration,
    ended: bool,
}

impl GameSession {
    pub fn new(definition: GameDefinition) -> Self {
        Self::with_rng(definition, StdRng::from_entropy())
    }

    /// A session whose play queues shuffle reproducibly.
    pub fn with_seed(definition: GameDefinition, seed: u64) -> Self {
        Self::with_rng(definition, StdRng::seed_from_u64(seed))
    }

    fn with_rng(definition: GameDefinition, rng: StdRng) -> Self {
        let panels = default_layouts()
            .into_iter()
            .map(|layout| (layout.panel, layout))
            .collect();
        Self {
            definition,
            state: SessionState::new(),
            graph: None,
            model_root: None,
            groups: Vec::new(),
            queue: PlayQueue::default(),
            mode: None,
            panels,
            assets: AssetCache::new(),
            scheduler: Scheduler::new(),
            flashes: HashMap::new(),
            surface: None,
            prompt: None,
            running_loops: Vec::new(),
            rng,
            now: Duration::ZERO,
            ended: false,
        }
    }

    pub fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn played_seconds(&self) -> u64 {
        self.state.played_seconds()
    }

    pub fn graph(&self) -> Option<&SceneGraph> {
        self.graph.as_ref()
    }

    /// Groups found by the most recent classification pass.
    pub fn groups(&self) -> &[OrganGroup] {
        &self.groups
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn current_target(&self) -> Option<&Target> {
        self.queue.current()
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn panel_layout(&self, panel: PanelId) -> Option<&PanelLayout> {
        self.panels.get(&panel)
    }

    /// Installs a panel layout, replacing the stock one.
    pub fn register_panel(&mut self, layout: PanelLayout) {
        self.panels.insert(layout.panel, layout);
    }

    /// Records where the shell actually placed a panel, so control picking
    /// happens in the panel's real pose.
    pub fn set_panel_transform(&mut self, panel: PanelId, transform: Transform) {
        if let Some(layout) = self.panels.get_mut(&panel) {
            layout.transform = transform;
        }
    }

    /// Accepts the loaded model tree, classifies it and hides organs and
    /// obstructions so the bare skeleton shows.
    pub fn on_model_loaded(&mut self, graph: SceneGraph) -> Vec<ShellCommand> {
        if self.ended {
            return Vec::new();
        }
        let Some(&root) = graph.roots().first() else {
            warn!("loaded model has no nodes");
            return Vec::new();
        };
        let outcome = classify(
            &graph,
            root,
            &self.definition.organs,
            &self.definition.obstructions,
        );
        let commands = outcome
            .hidden
            .iter()
            .map(|&node| ShellCommand::SetNodeVisible {
                node,
                visible: false,
            })
            .collect();
        info!("model classified into {} organ groups", outcome.groups.len());
        self.groups = outcome.groups;
        self.model_root = Some(root);
        self.graph = Some(graph);
        commands
    }

    /// The prompt canvas is usable once the font is in; any text queued in
    /// the meantime goes out now.
    pub fn on_font_loaded(&mut self) -> Vec<ShellCommand> {
        if self.ended {
            return Vec::new();
        }
        self.assets.set_font_ready();
        match &self.prompt {
            Some(text) => vec![ShellCommand::SetPrompt(text.clone())],
            None => Vec::new(),
        }
    }

    /// Releases any playback waiting on this sound.
    pub fn on_sound_loaded(&mut self, path: &str) -> Vec<ShellCommand> {
        if self.ended {
            return Vec::new();
        }
        let commands = self.assets.sound_loaded(path);
        for command in &commands {
            if let ShellCommand::StartLoop { path, .. } = command {
                self.note_loop_started(path);
            }
        }
        commands
    }

    /// Records that a sound failed to load so a later request can retry.
    pub fn on_sound_failed(&mut self, path: &str) {
        if self.ended {
            return;
        }
        self.assets.sound_failed(path);
    }

    /// Per-frame tick: advances the play clock, tracks the detected surface
    /// and fires due timers.
    pub fn on_frame(&mut self, input: FrameInput) -> Vec<ShellCommand> {
        if self.ended {
            return Vec::new();
        }
        let dt = input.now.saturating_sub(self.now);
        self.now = input.now;
        self.state.tick(dt);
        self.surface = input.surface;

        let mut commands = Vec::new();
        for event in self.scheduler.fire(self.now) {
            self.handle_timer(event, &mut commands);
        }
        commands
    }

    /// Resolves one confirm press against the current phase.
    pub fn on_confirm(&mut self, controller: Transform) -> Vec<ShellCommand> {
        if self.ended || self.state.is_celebrating() {
            return Vec::new();
        }
        let ray = Ray::from_transform(&controller);
        let phase = self.state.phase();
        let panel = active_panel(phase).and_then(|panel| self.panels.get(&panel));
        match route(phase, self.surface.is_some(), &ray, panel) {
            Action::PlaceModel => self.place_model(),
            Action::InvokeControl(tag) => self.invoke_control(tag),
            Action::AttemptPlacement => self.attempt_placement(&ray),
            Action::NoOp => Vec::new(),
        }
    }

    /// Tears the session down: pending timers die, running music stops and
    /// every later entry point is a no-op.
    pub fn on_session_end(&mut self) -> Vec<ShellCommand> {
        if self.ended {
            return Vec::new();
        }
        info!("session ended");
        self.ended = true;
        self.surface = None;
        self.scheduler.clear();
        self.flashes.clear();
        self.running_loops
            .drain(..)
            .map(|path| ShellCommand::StopLoop { path })
            .collect()
    }

    fn place_model(&mut self) -> Vec<ShellCommand> {
        let Some(surface) = self.surface else {
            return Vec::new();
        };
        let (Some(graph), Some(root)) = (self.graph.clone(), self.model_root) else {
            debug!("placement ignored; the model is still loading");
            return Vec::new();
        };
        if !self.state.place_model() {
            return Vec::new();
        }
        graph.set_transform(root, surface);
        info!("model anchored at the detected surface");
        let mut commands = vec![
            ShellCommand::AnchorModel(surface),
            ShellCommand::ShowPanel(PanelId::Menu),
        ];
        let menu_music = self.definition.sounds.menu_music.clone();
        let position = self.menu_position();
        commands.extend(self.start_loop(&menu_music, position));
        commands
    }

    fn invoke_control(&mut self, tag: ControlTag) -> Vec<ShellCommand> {
        let mut commands = vec![ShellCommand::Haptic(Haptic::Light)];
        match tag {
            ControlTag::Start => {
                if self.state.open_difficulty() {
                    commands.push(ShellCommand::HidePanel(PanelId::Menu));
                    commands.push(ShellCommand::ShowPanel(PanelId::Difficulty));
                }
            }
            ControlTag::Rules => {
                if self.state.open_rules() {
                    commands.push(ShellCommand::HidePanel(PanelId::Menu));
                    commands.push(ShellCommand::ShowPanel(PanelId::Rules));
                }
            }
            ControlTag::Back => {
                if self.state.close_rules() {
                    commands.push(ShellCommand::HidePanel(PanelId::Rules));
                    commands.push(ShellCommand::ShowPanel(PanelId::Menu));
                }
            }
            ControlTag::Settings => {
                info!("settings panel is not implemented; staying on the menu");
            }
            ControlTag::Simple => commands.extend(self.start_round(Mode::Simple)),
            ControlTag::Advanced => commands.extend(self.start_round(Mode::Advanced)),
        }
        commands
    }

    fn start_round(&mut self, mode: Mode) -> Vec<ShellCommand> {
        if !self.state.start_round() {
            return Vec::new();
        }
        self.mode = Some(mode);

        let mut commands = vec![ShellCommand::HidePanel(PanelId::Difficulty)];
        // Restore the material of anything still mid-flash before its timers
        // are dropped.
        for &node in self.flashes.keys() {
            commands.push(ShellCommand::SetNodeHighlight {
                node,
                highlighted: false,
            });
        }
        self.flashes.clear();
        self.scheduler.clear();

        let sounds = self.definition.sounds.clone();
        commands.extend(self.stop_loop(&sounds.menu_music));

        let (Some(graph), Some(root)) = (self.graph.clone(), self.model_root) else {
            warn!("no model is loaded; the round is empty");
            commands.extend(self.complete_round());
            return commands;
        };

        // Targets revealed last round go back into hiding.
        let previous = std::mem::take(&mut self.queue);
        for target in previous.targets() {
            for &node in target.nodes() {
                graph.set_visible(node, false);
                commands.push(ShellCommand::SetNodeVisible {
                    node,
                    visible: false,
                });
            }
        }

        let targets: Vec<Target> = match mode {
            Mode::Simple => {
                let outcome = classify(
                    &graph,
                    root,
                    &self.definition.organs,
                    &self.definition.obstructions,
                );
                for &node in &outcome.hidden {
                    commands.push(ShellCommand::SetNodeVisible {
                        node,
                        visible: false,
                    });
                }
                let targets = outcome
                    .groups
                    .iter()
                    .filter_map(|group| {
                        group.anchor.map(|anchor| Target::Group {
                            name: group.name.clone(),
                            members: group.members.clone(),
                            anchor,
                        })
                    })
                    .collect();
                self.groups = outcome.groups;
                targets
            }
            Mode::Advanced => advanced_targets(&graph, root, &self.definition.advanced_names)
                .into_iter()
                .map(|target| {
                    commands.push(ShellCommand::SetNodeVisible {
                        node: target.node,
                        visible: false,
                    });
                    Target::Node {
                        label: target.label,
                        node: target.node,
                        anchor: target.anchor,
                    }
                })
                .collect(),
        };

        self.queue = PlayQueue::shuffled(targets, &mut self.rng);
        info!("{mode} started with {} targets", self.queue.len());

        let position = self.model_position();
        commands.extend(self.start_loop(&sounds.game_music, position));

        if self.queue.is_complete() {
            warn!("no targets matched the loaded model");
            commands.extend(self.complete_round());
        } else {
            commands.extend(self.update_prompt());
        }
        commands
    }

    fn attempt_placement(&mut self, ray: &Ray) -> Vec<ShellCommand> {
        let (Some(graph), Some(root)) = (self.graph.clone(), self.model_root) else {
            return Vec::new();
        };
        let Some(target) = self.queue.current() else {
            return Vec::new();
        };
        let label = target.label().to_string();
        let anchor = target.anchor();
        let reveal = target.nodes().to_vec();

        let rotation = graph
            .get(root)
            .map(|node| node.transform.rotation)
            .unwrap_or(Quat::IDENTITY);
        let bounds: Vec<Bounds> = graph
            .subtree(root)
            .into_iter()
            .filter_map(|node| graph.world_bounds(node))
            .collect();
        let tolerance = self
            .mode
            .map(|mode| self.definition.tolerance(mode))
            .unwrap_or(self.definition.simple_tolerance);
        let sounds = self.definition.sounds.clone();

        match judge(ray, anchor, rotation, &bounds, tolerance) {
            Judgement::Hit(contact) => {
                debug!("{label:?} placed, {:.3} m off its anchor", contact.distance);
                let mut commands = vec![ShellCommand::Haptic(Haptic::Strong)];
                for &node in &reveal {
                    graph.set_visible(node, true);
                    commands.push(ShellCommand::SetNodeVisible {
                        node,
                        visible: true,
                    });
                }
                for &node in &reveal {
                    commands.extend(self.flash(node));
                }
                commands.extend(self.play(&sounds.success, contact.point));
                self.queue.advance();
                if self.queue.is_complete() {
                    commands.extend(self.complete_round());
                } else {
                    commands.extend(self.update_prompt());
                }
                commands
            }
            Judgement::Miss(contact) => {
                debug!("{label:?} missed");
                let mut commands = vec![ShellCommand::Haptic(Haptic::Light)];
                match contact {
                    Some(contact) => {
                        commands.push(ShellCommand::SpawnMarker {
                            position: contact.point,
                            lifetime: self.definition.marker_lifetime,
                        });
                        commands.extend(self.play(&sounds.failure, contact.point));
                    }
                    None => commands.extend(self.play(&sounds.failure, anchor)),
                }
                commands
            }
            Judgement::OffModel => {
                debug!("confirm ignored; the ray missed the model");
                Vec::new()
            }
        }
    }

    fn complete_round(&mut self) -> Vec<ShellCommand> {
        if !self.state.complete_round() {
            return Vec::new();
        }
        info!("round complete in {}s", self.state.played_seconds());
        let sounds = self.definition.sounds.clone();
        let mut commands = self.stop_loop(&sounds.game_music);
        let position = self.model_position();
        commands.extend(self.play(&sounds.victory, position));
        commands.push(ShellCommand::SpawnParticles {
            position: self.model_center(),
            duration: self.definition.victory_delay,
        });
        let mode = self.mode.unwrap_or(Mode::Simple);
        let text = format!(
            "Congratulations!\n{} completed in {}s!",
            mode.label(),
            self.state.played_seconds()
        );
        commands.extend(self.set_prompt(text));
        self.scheduler.once(
            self.now,
            self.definition.victory_delay,
            TimerEvent::ReturnToMenu,
        );
        commands
    }

    fn handle_timer(&mut self, event: TimerEvent, commands: &mut Vec<ShellCommand>) {
        match event {
            TimerEvent::ReturnToMenu => {
                if self.state.return_to_menu() {
                    debug!("celebration over; menu restored");
                    self.prompt = None;
                    commands.push(ShellCommand::ClearPrompt);
                    commands.push(ShellCommand::ShowPanel(PanelId::Menu));
                    let menu_music = self.definition.sounds.menu_music.clone();
                    let position = self.menu_position();
                    commands.extend(self.start_loop(&menu_music, position));
                }
            }
            TimerEvent::FlashStep(node) => {
                let toggles = self.definition.flash_toggles;
                let Some(flash) = self.flashes.get_mut(&node) else {
                    return;
                };
                flash.steps_done += 1;
                if flash.steps_done >= toggles {
                    self.flashes.remove(&node);
                    commands.push(ShellCommand::SetNodeHighlight {
                        node,
                        highlighted: false,
                    });
                } else {
                    flash.highlighted = !flash.highlighted;
                    commands.push(ShellCommand::SetNodeHighlight {
                        node,
                        highlighted: flash.highlighted,
                    });
                }
            }
        }
    }

    /// Starts the highlight flash on a freshly revealed node.
    fn flash(&mut self, node: NodeId) -> Vec<ShellCommand> {
        let toggles = self.definition.flash_toggles;
        if toggles == 0 {
            return Vec::new();
        }
        self.flashes.insert(
            node,
            FlashState {
                highlighted: true,
                steps_done: 0,
            },
        );
        self.scheduler.repeating(
            self.now,
            self.definition.flash_interval,
            toggles,
            TimerEvent::FlashStep(node),
        );
        vec![ShellCommand::SetNodeHighlight {
            node,
            highlighted: true,
        }]
    }

    fn update_prompt(&mut self) -> Vec<ShellCommand> {
        let Some(target) = self.queue.current() else {
            return Vec::new();
        };
        let text = placement_prompt(target.label());
        self.set_prompt(text)
    }

    /// Remembers the desired prompt; it reaches the shell once the font is in.
    fn set_prompt(&mut self, text: String) -> Vec<ShellCommand> {
        self.prompt = Some(text.clone());
        if self.assets.font_ready() {
            vec![ShellCommand::SetPrompt(text)]
        } else {
            debug!("font not ready; prompt deferred");
            Vec::new()
        }
    }

    fn play(&mut self, path: &str, position: Vec3) -> Vec<ShellCommand> {
        self.assets.play(path, position)
    }

    fn start_loop(&mut self, path: &str, position: Vec3) -> Vec<ShellCommand> {
        let commands = self.assets.start_loop(path, position);
        for command in &commands {
            if let ShellCommand::StartLoop { path, .. } = command {
                self.note_loop_started(path);
            }
        }
        commands
    }

    fn note_loop_started(&mut self, path: &str) {
        if !self.running_loops.iter().any(|running| running == path) {
            self.running_loops.push(path.to_string());
        }
    }

    /// Stops a loop if it is running; a loop still waiting on its load is
    /// cancelled instead so it never starts.
    fn stop_loop(&mut self, path: &str) -> Vec<ShellCommand> {
        self.assets.cancel_deferred(path);
        match self.running_loops.iter().position(|running| running == path) {
            Some(index) => {
                self.running_loops.remove(index);
                vec![ShellCommand::StopLoop {
                    path: path.to_string(),
                }]
            }
            None => Vec::new(),
        }
    }

    /// Translation of the anchored model root, or the origin before anchoring.
    fn model_position(&self) -> Vec3 {
        self.graph
            .as_ref()
            .zip(self.model_root)
            .and_then(|(graph, root)| graph.get(root))
            .map(|node| node.transform.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn menu_position(&self) -> Vec3 {
        self.model_position() + MENU_OFFSET
    }

    /// Centre of everything the model spans, where the celebration bursts.
    fn model_center(&self) -> Vec3 {
        self.graph
            .as_ref()
            .zip(self.model_root)
            .and_then(|(graph, root)| graph.subtree_world_bounds(root))
            .map(|bounds| bounds.center())
            .unwrap_or_else(|| self.model_position())
    }
}

/// The on-screen instruction for a target, split onto two lines when the
/// one-line form runs long.
pub fn placement_prompt(label: &str) -> String {
    let line = format!("Place the {label}");
    if line.len() > 15 {
        format!("Place the\n{label}")
    } else {
        line
    }
}
