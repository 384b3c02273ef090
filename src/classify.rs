use glam::Vec3;
use log::debug;

use crate::definition::OrganKeywords;
use crate::scene::{NodeId, SceneGraph};

/// One teachable structure: its member nodes and world-space reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganGroup {
    pub name: String,
    /// Member nodes in traversal order.
    pub members: Vec<NodeId>,
    /// Mean of the members' world-space bounding-box centers, absent when no
    /// member carries geometry.
    pub anchor: Option<Vec3>,
}

/// Result of classifying the model tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifyOutcome {
    pub groups: Vec<OrganGroup>,
    /// Every node the walk hid, in the order it was hidden.
    pub hidden: Vec<NodeId>,
}

/// Walks the tree under `root` once, sorting nodes into organ groups and
/// hiding both organ parts and obstructing scenery.
///
/// Matching is case-insensitive on name fragments. The first organ in table
/// order whose keyword appears in a node name claims the node, and the walk
/// still descends into its children. A node named for an obstruction has its
/// whole subtree hidden and pruned instead, so nothing below it can join a
/// group. Nodes matching neither are left untouched.
pub fn classify(
    graph: &SceneGraph,
    root: NodeId,
    organs: &[OrganKeywords],
    obstructions: &[String],
) -> ClassifyOutcome {
    let mut groups: Vec<OrganGroup> = organs
        .iter()
        .map(|organ| OrganGroup {
            name: organ.name.clone(),
            members: Vec::new(),
            anchor: None,
        })
        .collect();
    let mut hidden = Vec::new();

    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(name) = graph.name(id) else {
            continue;
        };
        let lowered = name.to_lowercase();
        let organ_slot = organs.iter().position(|organ| {
            organ
                .keywords
                .iter()
                .any(|keyword| lowered.contains(keyword))
        });
        if let Some(slot) = organ_slot {
            groups[slot].members.push(id);
            graph.set_visible(id, false);
            hidden.push(id);
            stack.extend(graph.children(id).into_iter().rev());
        } else if obstructions.iter().any(|keyword| lowered.contains(keyword)) {
            hidden.extend(graph.hide_subtree(id));
        } else {
            stack.extend(graph.children(id).into_iter().rev());
        }
    }

    groups.retain(|group| {
        if group.members.is_empty() {
            debug!("organ {:?} matched no nodes", group.name);
        }
        !group.members.is_empty()
    });
    for group in &mut groups {
        group.anchor = compute_anchor(graph, &group.members);
        if group.anchor.is_none() {
            debug!("organ {:?} has no geometry for an anchor", group.name);
        }
    }
    ClassifyOutcome { groups, hidden }
}

/// Mean of the members' world-space bounding-box centers.
pub fn compute_anchor(graph: &SceneGraph, members: &[NodeId]) -> Option<Vec3> {
    let mut sum = Vec3::ZERO;
    let mut count = 0;
    for &member in members {
        let Some(bounds) = graph.world_bounds(member) else {
            continue;
        };
        sum += bounds.center();
        count += 1;
    }
    (count > 0).then(|| sum / count as f32)
}

/// A single node the advanced mode asks the player to place.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTarget {
    pub node: NodeId,
    pub label: String,
    pub anchor: Vec3,
}

/// Collects every geometry-bearing node under `root` whose name contains one
/// of the advanced name fragments, hiding each as it is found. Nodes without
/// geometry are logged and skipped.
pub fn advanced_targets(graph: &SceneGraph, root: NodeId, names: &[String]) -> Vec<NodeTarget> {
    let mut targets = Vec::new();
    for id in graph.subtree(root) {
        let Some(name) = graph.name(id) else {
            continue;
        };
        let lowered = name.to_lowercase();
        if !names.iter().any(|fragment| lowered.contains(fragment)) {
            continue;
        }
        let Some(bounds) = graph.world_bounds(id) else {
            debug!("node {name:?} has no geometry, skipping as a target");
            continue;
        };
        graph.set_visible(id, false);
        targets.push(NodeTarget {
            node: id,
            label: display_name(&name).to_string(),
            anchor: bounds.center(),
        });
    }
    targets
}

/// Trims exporter suffixes like `_generated` or `_mesh` from a node name.
pub fn display_name(name: &str) -> &str {
    let cut = ["_generated", "_grp", "_mesh", "_Mesh"]
        .iter()
        .filter_map(|marker| name.find(marker))
        .min();
    match cut {
        Some(index) => &name[..index],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::GameDefinition;
    use crate::scene::{Bounds, SceneNode, Transform};

    fn body(graph: &SceneGraph, parent: Option<NodeId>, name: &str, center: Vec3) -> NodeId {
        graph.add_node(
            parent,
            SceneNode::new(name)
                .with_bounds(Bounds::new(Vec3::splat(-0.5), Vec3::splat(0.5)))
                .with_transform(Transform::from_translation(center)),
        )
    }

    fn find_group<'a>(outcome: &'a ClassifyOutcome, name: &str) -> Option<&'a OrganGroup> {
        outcome.groups.iter().find(|group| group.name == name)
    }

    #[test]
    fn groups_nodes_by_keyword_and_hides_them() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        let heart = body(&graph, Some(root), "Heart_generated", Vec3::ZERO);
        let liver = body(&graph, Some(root), "Liver_grp", Vec3::X);
        let rib = body(&graph, Some(root), "Rib_1", Vec3::Y);
        let femur = body(&graph, Some(root), "Femur", Vec3::Z);

        let outcome = classify(&graph, root, &definition.organs, &definition.obstructions);
        assert_eq!(outcome.groups.len(), 2);
        assert_eq!(find_group(&outcome, "heart").unwrap().members, vec![heart]);
        assert_eq!(find_group(&outcome, "liver").unwrap().members, vec![liver]);

        assert_eq!(graph.is_visible(heart), Some(false));
        assert_eq!(graph.is_visible(rib), Some(false));
        assert_eq!(graph.is_visible(femur), Some(true));
        assert!(outcome.hidden.contains(&rib));
        assert!(!outcome.hidden.contains(&femur));
    }

    #[test]
    fn obstruction_prunes_its_whole_subtree() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        let cage = graph.add_node(Some(root), SceneNode::new("Rib_cage"));
        let buried = body(&graph, Some(cage), "Heart_piece", Vec3::ZERO);

        let outcome = classify(&graph, root, &definition.organs, &definition.obstructions);
        assert!(find_group(&outcome, "heart").is_none());
        assert_eq!(graph.is_visible(buried), Some(false));
        assert!(outcome.hidden.contains(&cage));
        assert!(outcome.hidden.contains(&buried));
    }

    #[test]
    fn organ_match_takes_priority_over_obstruction() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        let node = body(&graph, Some(root), "Heart_rib_join", Vec3::ZERO);

        let outcome = classify(&graph, root, &definition.organs, &definition.obstructions);
        assert_eq!(find_group(&outcome, "heart").unwrap().members, vec![node]);
    }

    #[test]
    fn first_organ_in_table_order_wins() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        // Matches both heart ("cardiac") and lungs ("lung"); heart is earlier.
        let node = body(&graph, Some(root), "Cardiac_notch_of_left_lung", Vec3::ZERO);

        let outcome = classify(&graph, root, &definition.organs, &definition.obstructions);
        assert_eq!(find_group(&outcome, "heart").unwrap().members, vec![node]);
        assert!(find_group(&outcome, "lungs").is_none());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        body(&graph, Some(root), "LIVER", Vec3::ZERO);

        let outcome = classify(&graph, root, &definition.organs, &definition.obstructions);
        assert!(find_group(&outcome, "liver").is_some());
    }

    #[test]
    fn anchor_is_the_mean_of_member_centers() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        body(&graph, Some(root), "Lung_left", Vec3::new(-1.0, 2.0, 0.0));
        body(&graph, Some(root), "Lung_right", Vec3::new(1.0, 2.0, 0.0));

        let outcome = classify(&graph, root, &definition.organs, &definition.obstructions);
        let lungs = find_group(&outcome, "lungs").unwrap();
        assert_eq!(lungs.anchor, Some(Vec3::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn members_without_geometry_skip_anchor_contribution() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        graph.add_node(Some(root), SceneNode::new("Brain_group"));
        body(&graph, Some(root), "Brain_stem", Vec3::new(0.0, 3.0, 0.0));

        let outcome = classify(&graph, root, &definition.organs, &definition.obstructions);
        let brain = find_group(&outcome, "brain").unwrap();
        assert_eq!(brain.members.len(), 2);
        assert_eq!(brain.anchor, Some(Vec3::new(0.0, 3.0, 0.0)));
    }

    #[test]
    fn group_without_any_geometry_has_no_anchor() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        graph.add_node(Some(root), SceneNode::new("Spleen_group"));

        let outcome = classify(&graph, root, &definition.organs, &definition.obstructions);
        let spleen = find_group(&outcome, "spleen").unwrap();
        assert_eq!(spleen.anchor, None);
    }

    #[test]
    fn anchors_track_the_model_root_transform() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        body(&graph, Some(root), "Kidney_left", Vec3::ZERO);
        graph.set_transform(root, Transform::from_translation(Vec3::new(0.0, 0.0, -2.0)));

        let outcome = classify(&graph, root, &definition.organs, &definition.obstructions);
        let kidneys = find_group(&outcome, "kidneys").unwrap();
        assert_eq!(kidneys.anchor, Some(Vec3::new(0.0, 0.0, -2.0)));
    }

    #[test]
    fn advanced_targets_pick_individual_nodes() {
        let definition = GameDefinition::default();
        let graph = SceneGraph::new();
        let root = graph.add_node(None, SceneNode::new("model"));
        let trachea = body(&graph, Some(root), "Trachea_mesh", Vec3::new(0.0, 1.0, 0.0));
        graph.add_node(Some(root), SceneNode::new("Esophagus_empty"));
        body(&graph, Some(root), "Femur", Vec3::ZERO);

        let targets = advanced_targets(&graph, root, &definition.advanced_names);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].node, trachea);
        assert_eq!(targets[0].label, "Trachea");
        assert_eq!(targets[0].anchor, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(graph.is_visible(trachea), Some(false));
    }

    #[test]
    fn display_name_trims_exporter_suffixes() {
        assert_eq!(display_name("Heart_generated"), "Heart");
        assert_eq!(display_name("Liver_grp"), "Liver");
        assert_eq!(display_name("Stomach_mesh_2"), "Stomach");
        assert_eq!(display_name("Bone_Mesh"), "Bone");
        assert_eq!(display_name("Femur"), "Femur");
        // The earliest marker in the name wins.
        assert_eq!(display_name("Lung_mesh_generated"), "Lung");
    }
}
