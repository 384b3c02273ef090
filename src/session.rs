use std::time::Duration;

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::scene::NodeId;

/// Mutually exclusive interaction phases of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    WaitingForPlacement,
    MenuOpen,
    RulesOpen,
    DifficultyOpen,
    Playing,
    Victory,
}

/// What the player must place next.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A whole organ group revealed at once.
    Group {
        name: String,
        members: Vec<NodeId>,
        anchor: Vec3,
    },
    /// A single node.
    Node {
        label: String,
        node: NodeId,
        anchor: Vec3,
    },
}

impl Target {
    pub fn label(&self) -> &str {
        match self {
            Target::Group { name, .. } => name,
            Target::Node { label, .. } => label,
        }
    }

    pub fn anchor(&self) -> Vec3 {
        match self {
            Target::Group { anchor, .. } | Target::Node { anchor, .. } => *anchor,
        }
    }

    /// The nodes revealed when this target is placed.
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            Target::Group { members, .. } => members,
            Target::Node { node, .. } => std::slice::from_ref(node),
        }
    }
}

/// Shuffled turn order for one round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayQueue {
    targets: Vec<Target>,
    cursor: usize,
}

impl PlayQueue {
    /// Builds a queue over the given targets in shuffled order.
    pub fn shuffled(mut targets: Vec<Target>, rng: &mut impl Rng) -> Self {
        targets.shuffle(rng);
        Self { targets, cursor: 0 }
    }

    pub fn current(&self) -> Option<&Target> {
        self.targets.get(self.cursor)
    }

    /// Moves to the next target; the cursor never runs past the end.
    pub fn advance(&mut self) {
        if self.cursor < self.targets.len() {
            self.cursor += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.targets.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }
}

/// Phase machine plus the gameplay clock for one session.
///
/// Transition methods apply only from their expected phase and report whether
/// they did; a call from any other phase is a harmless no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    phase: Phase,
    played: Duration,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::WaitingForPlacement,
            played: Duration::ZERO,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whole seconds spent placing organs in the current or last round.
    pub fn played_seconds(&self) -> u64 {
        self.played.as_secs()
    }

    /// True while the victory celebration swallows confirm input.
    pub fn is_celebrating(&self) -> bool {
        self.phase == Phase::Victory
    }

    /// Advances the play clock; time passes only during play.
    pub fn tick(&mut self, dt: Duration) {
        if self.phase == Phase::Playing {
            self.played += dt;
        }
    }

    pub fn place_model(&mut self) -> bool {
        self.shift(Phase::WaitingForPlacement, Phase::MenuOpen)
    }

    pub fn open_rules(&mut self) -> bool {
        self.shift(Phase::MenuOpen, Phase::RulesOpen)
    }

    pub fn close_rules(&mut self) -> bool {
        self.shift(Phase::RulesOpen, Phase::MenuOpen)
    }

    pub fn open_difficulty(&mut self) -> bool {
        self.shift(Phase::MenuOpen, Phase::DifficultyOpen)
    }

    pub fn start_round(&mut self) -> bool {
        let started = self.shift(Phase::DifficultyOpen, Phase::Playing);
        if started {
            self.played = Duration::ZERO;
        }
        started
    }

    pub fn complete_round(&mut self) -> bool {
        self.shift(Phase::Playing, Phase::Victory)
    }

    pub fn return_to_menu(&mut self) -> bool {
        self.shift(Phase::Victory, Phase::MenuOpen)
    }

    fn shift(&mut self, from: Phase, to: Phase) -> bool {
        if self.phase == from {
            self.phase = to;
            true
        } else {
            false
        }
    }
}
