use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use roxmltree::Document;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Difficulty selected from the in-game menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Simple,
    Advanced,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Simple => "Simple Mode",
            Mode::Advanced => "Advanced Mode",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Problems encountered while reading a definition override file.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read definition file: {0}")]
    Io(#[from] std::io::Error),
    #[error("definition XML is malformed: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("<organ> element is missing its name attribute")]
    UnnamedOrgan,
    #[error("<{tag}> does not contain a valid number: {value:?}")]
    BadNumber { tag: String, value: String },
}

/// Keywords that map node names onto one teachable organ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganKeywords {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Sound files the session asks the shell to load and play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundBank {
    pub menu_music: String,
    pub game_music: String,
    pub success: String,
    pub failure: String,
    pub victory: String,
}

impl Default for SoundBank {
    fn default() -> Self {
        Self {
            menu_music: "assets/sounds/menu_music.mp3".to_string(),
            game_music: "assets/sounds/game_music.mp3".to_string(),
            success: "assets/sounds/Success 1 Sound Effect.mp3".to_string(),
            failure: "assets/sounds/wrong_sound.mp3".to_string(),
            victory: "assets/sounds/Victory Sound Effect.mp3".to_string(),
        }
    }
}

/// Tunable rules of a session.
///
/// The defaults mirror the shipping game. An XML override file replaces
/// exactly the sections it names and leaves the rest untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDefinition {
    /// Organ keyword tables in match priority order; the first organ whose
    /// keyword appears in a node name claims that node.
    pub organs: Vec<OrganKeywords>,
    /// Name fragments of scenery that occludes organs and must stay hidden.
    pub obstructions: Vec<String>,
    /// Name fragments that qualify individual nodes as advanced-mode targets.
    pub advanced_names: Vec<String>,
    pub simple_tolerance: f32,
    pub advanced_tolerance: f32,
    /// How long the victory celebration runs before the menu returns.
    pub victory_delay: Duration,
    pub flash_interval: Duration,
    pub flash_toggles: u32,
    /// How long the shell keeps a missed-attempt marker alive.
    pub marker_lifetime: Duration,
    pub sounds: SoundBank,
    pub font: String,
}

impl Default for GameDefinition {
    fn default() -> Self {
        Self {
            organs: vec![
                organ("liver", &["liver", "hepatic"]),
                organ("heart", &["heart", "cardiac", "atrium", "ventricle"]),
                organ("lungs", &["lung", "pulmonary"]),
                organ("kidneys", &["kidney", "renal"]),
                organ("stomach", &["stomach", "gastric"]),
                organ("brain", &["brain", "cerebral", "cerebellum"]),
                organ("intestines", &["intestine", "bowel", "colon", "duodenum"]),
                organ("pancreas", &["pancreas", "pancreatic"]),
                organ("spleen", &["spleen", "splenic"]),
                organ("bladder", &["bladder", "urinary"]),
            ],
            obstructions: words(&[
                "taenia",
                "rib",
                "mesocolon",
                "sternum",
                "cartilages",
                "xiphoid",
                "bronchi",
                "mesocolic",
                "thymus",
            ]),
            advanced_names: words(&[
                "heart",
                "liver",
                "lung",
                "kidney",
                "stomach",
                "brain",
                "intestine",
                "pancreas",
                "spleen",
                "bladder",
                "esophagus",
                "trachea",
                "gallbladder",
                "appendix",
                "thyroid",
            ]),
            simple_tolerance: 0.09,
            advanced_tolerance: 0.08,
            victory_delay: Duration::from_millis(4000),
            flash_interval: Duration::from_millis(200),
            flash_toggles: 6,
            marker_lifetime: Duration::from_millis(200),
            sounds: SoundBank::default(),
            font: "assets/fonts/DynaPuff_Regular.json".to_string(),
        }
    }
}

impl GameDefinition {
    /// Parses an XML override on top of the defaults.
    pub fn from_xml(xml: &str) -> Result<Self, DefinitionError> {
        let document = Document::parse(xml)?;
        let mut definition = Self::default();

        let organs = document
            .descendants()
            .filter(|node| node.has_tag_name("organ"))
            .map(|node| {
                let name = node.attribute("name").ok_or(DefinitionError::UnnamedOrgan)?;
                let keywords = node
                    .text()
                    .unwrap_or("")
                    .split_whitespace()
                    .map(str::to_lowercase)
                    .collect();
                Ok(OrganKeywords {
                    name: name.to_string(),
                    keywords,
                })
            })
            .collect::<Result<Vec<_>, DefinitionError>>()?;
        if !organs.is_empty() {
            definition.organs = organs;
        }

        if let Some(list) = word_list(&document, "obstructions") {
            definition.obstructions = list;
        }
        if let Some(list) = word_list(&document, "advanced") {
            definition.advanced_names = list;
        }
        definition.simple_tolerance =
            parse_number(&document, "simple-tolerance", definition.simple_tolerance)?;
        definition.advanced_tolerance =
            parse_number(&document, "advanced-tolerance", definition.advanced_tolerance)?;
        let delay_ms = parse_number(
            &document,
            "victory-delay-ms",
            definition.victory_delay.as_millis() as u64,
        )?;
        definition.victory_delay = Duration::from_millis(delay_ms);
        Ok(definition)
    }

    /// Reads and parses an override file from disk.
    pub fn from_xml_file(path: &Path) -> Result<Self, DefinitionError> {
        let xml = fs::read_to_string(path)?;
        Self::from_xml(&xml)
    }

    pub fn tolerance(&self, mode: Mode) -> f32 {
        match mode {
            Mode::Simple => self.simple_tolerance,
            Mode::Advanced => self.advanced_tolerance,
        }
    }
}

fn organ(name: &str, keywords: &[&str]) -> OrganKeywords {
    OrganKeywords {
        name: name.to_string(),
        keywords: words(keywords),
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|word| word.to_string()).collect()
}

/// Whitespace-separated word list from the named element, `None` when absent.
fn word_list(document: &Document, tag: &str) -> Option<Vec<String>> {
    let node = document.descendants().find(|node| node.has_tag_name(tag))?;
    Some(
        node.text()
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_lowercase)
            .collect(),
    )
}

fn parse_number<T: FromStr>(
    document: &Document,
    tag: &str,
    default: T,
) -> Result<T, DefinitionError> {
    let Some(node) = document.descendants().find(|node| node.has_tag_name(tag)) else {
        return Ok(default);
    };
    let text = node.text().map(str::trim).unwrap_or("");
    text.parse::<T>().map_err(|_| DefinitionError::BadNumber {
        tag: tag.to_string(),
        value: text.to_string(),
    })
}
