use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use glam::Vec3;

use crate::scene::{Bounds, NodeId, SceneGraph, SceneNode};

/// Parses an OBJ file from memory into a named node hierarchy.
///
/// The returned graph has a single root called `model`. Every `o` section
/// becomes a child of the root and every `g` section a child of the object it
/// appears in. A section's bounds cover the vertices its faces reference, so
/// sections without faces carry no geometry.
pub fn load_obj_scene(data: &str) -> Result<SceneGraph> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut section_bounds: HashMap<NodeId, Bounds> = HashMap::new();

    let graph = SceneGraph::new();
    let root = graph.add_node(None, SceneNode::new("model"));
    let mut current_object: Option<NodeId> = None;
    let mut current_group: Option<NodeId> = None;

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        // Section names may contain spaces, so take the untokenized remainder.
        let rest = trimmed[tag.len()..].trim();
        match tag {
            "v" => positions.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            "o" => {
                current_object = Some(graph.add_node(Some(root), SceneNode::new(rest)));
                current_group = None;
            }
            "g" => {
                let parent = current_object.unwrap_or(root);
                current_group = Some(graph.add_node(Some(parent), SceneNode::new(rest)));
            }
            "f" => {
                let face = parse_face(parts, positions.len())
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                let section = current_group.or(current_object).unwrap_or_else(|| {
                    let implicit = graph.add_node(Some(root), SceneNode::new(""));
                    current_object = Some(implicit);
                    implicit
                });
                let bounds = section_bounds
                    .entry(section)
                    .or_insert_with(|| Bounds::from_point(positions[face[0]]));
                for &index in &face {
                    bounds.expand(positions[index]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    for (section, bounds) in section_bounds {
        graph.update(section, |node| node.bounds = Some(bounds));
    }
    Ok(graph)
}

/// Reads and parses an OBJ file from disk.
pub fn load_obj_file(path: &Path) -> Result<SceneGraph> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read model {}", path.display()))?;
    load_obj_scene(&data).with_context(|| format!("failed to parse model {}", path.display()))
}

/// Parsed models keyed by the file they came from.
///
/// Re-entering the experience reuses the first parse: every load hands out a
/// detached copy of the cached graph, so one run's mutations never leak into
/// the next.
#[derive(Debug, Default)]
pub struct ModelCache {
    models: HashMap<PathBuf, SceneGraph>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh graph for `path`, reading the file only on the first
    /// request.
    pub fn load(&mut self, path: &Path) -> Result<SceneGraph> {
        if let Some(pristine) = self.models.get(path) {
            return Ok(pristine.duplicate());
        }
        let pristine = load_obj_file(path)?;
        let graph = pristine.duplicate();
        self.models.insert(path.to_path_buf(), pristine);
        Ok(graph)
    }
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let x = parts
        .next()
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?;
    let y = parts
        .next()
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?;
    let z = parts
        .next()
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?;
    Ok(Vec3::new(x, y, z))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>, len: usize) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for part in parts {
        let raw = part
            .split('/')
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        let index = fix_index(raw, len).ok_or_else(|| anyhow!("invalid vertex index {raw}"))?;
        indices.push(index);
    }
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
}

fn fix_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let abs = (-index) as usize;
        (abs <= len).then_some(len - abs)
    } else {
        None
    }
}
