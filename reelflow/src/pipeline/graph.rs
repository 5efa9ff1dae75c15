//! The fixed stage dependency graph.

use crate::core::{Stage, ALL_STAGES};
use std::collections::{BTreeMap, BTreeSet};

/// The dependency DAG over the fixed stage set.
///
/// This is the only component that knows stage ordering semantics,
/// including the fan-out after Script (Audio, Metadata) and the
/// reconvergence at ImagePrompts and Video. Nothing elsewhere may infer
/// order from storage names or stage declaration order.
#[derive(Debug, Clone)]
pub struct StageGraph {
    prerequisites: BTreeMap<Stage, Vec<Stage>>,
}

impl StageGraph {
    /// The production graph:
    ///
    /// ```text
    /// Input -> Script -> {Audio, Metadata}
    /// {Script, Audio} -> ImagePrompts -> Images
    /// {Audio, Images} -> Video
    /// ```
    ///
    /// Metadata has no downstream dependents.
    #[must_use]
    pub fn production() -> Self {
        let mut prerequisites = BTreeMap::new();
        prerequisites.insert(Stage::Input, Vec::new());
        prerequisites.insert(Stage::Script, vec![Stage::Input]);
        prerequisites.insert(Stage::Audio, vec![Stage::Script]);
        prerequisites.insert(Stage::Metadata, vec![Stage::Script]);
        prerequisites.insert(Stage::ImagePrompts, vec![Stage::Script, Stage::Audio]);
        prerequisites.insert(Stage::Images, vec![Stage::ImagePrompts]);
        prerequisites.insert(Stage::Video, vec![Stage::Audio, Stage::Images]);
        Self { prerequisites }
    }

    /// All stages in pipeline order.
    #[must_use]
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        ALL_STAGES.into_iter()
    }

    /// Direct prerequisites of a stage.
    #[must_use]
    pub fn prerequisites(&self, stage: Stage) -> &[Stage] {
        self.prerequisites.get(&stage).map_or(&[], Vec::as_slice)
    }

    /// Direct dependents of a stage, in pipeline order.
    #[must_use]
    pub fn dependents(&self, stage: Stage) -> Vec<Stage> {
        self.stages()
            .filter(|candidate| self.prerequisites(*candidate).contains(&stage))
            .collect()
    }

    /// Every stage transitively downstream of `stage` (excluding the
    /// stage itself), in pipeline order.
    #[must_use]
    pub fn downstream(&self, stage: Stage) -> Vec<Stage> {
        let mut reached = BTreeSet::new();
        let mut frontier = vec![stage];
        while let Some(current) = frontier.pop() {
            for dependent in self.dependents(current) {
                if reached.insert(dependent) {
                    frontier.push(dependent);
                }
            }
        }
        self.stages().filter(|s| reached.contains(s)).collect()
    }

    /// The approval set invalidated by regenerating `stage`: the stage
    /// itself plus everything transitively downstream of it.
    ///
    /// Approving a stage is a promise that holds only until something
    /// it depended on changes; this set is the scope of that promise.
    #[must_use]
    pub fn invalidation_set(&self, stage: Stage) -> Vec<Stage> {
        let mut set = vec![stage];
        set.extend(self.downstream(stage));
        set
    }

    /// Topological order of the graph, following prerequisites first.
    /// Returns `None` if a cycle is present.
    #[must_use]
    pub fn topological_order(&self) -> Option<Vec<Stage>> {
        fn visit(
            graph: &StageGraph,
            stage: Stage,
            visited: &mut BTreeSet<Stage>,
            in_progress: &mut BTreeSet<Stage>,
            order: &mut Vec<Stage>,
        ) -> bool {
            if visited.contains(&stage) {
                return true;
            }
            if !in_progress.insert(stage) {
                return false;
            }
            for &dep in graph.prerequisites(stage) {
                if !visit(graph, dep, visited, in_progress, order) {
                    return false;
                }
            }
            in_progress.remove(&stage);
            visited.insert(stage);
            order.push(stage);
            true
        }

        let mut visited = BTreeSet::new();
        let mut in_progress = BTreeSet::new();
        let mut order = Vec::new();
        for stage in self.stages() {
            if !visit(self, stage, &mut visited, &mut in_progress, &mut order) {
                return None;
            }
        }
        Some(order)
    }
}

impl Default for StageGraph {
    fn default() -> Self {
        Self::production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_graph_is_acyclic() {
        let graph = StageGraph::production();
        let order = graph.topological_order().unwrap();
        assert_eq!(order.len(), 7);

        // Every stage appears after all of its prerequisites.
        for (position, &stage) in order.iter().enumerate() {
            for dep in graph.prerequisites(stage) {
                let dep_position = order.iter().position(|s| s == dep).unwrap();
                assert!(dep_position < position, "{dep} must precede {stage}");
            }
        }
    }

    #[test]
    fn test_fan_out_and_reconvergence() {
        let graph = StageGraph::production();
        assert_eq!(graph.dependents(Stage::Script), vec![Stage::Audio, Stage::Metadata, Stage::ImagePrompts]);
        assert_eq!(graph.prerequisites(Stage::ImagePrompts), &[Stage::Script, Stage::Audio]);
        assert_eq!(graph.prerequisites(Stage::Video), &[Stage::Audio, Stage::Images]);
        assert!(graph.dependents(Stage::Metadata).is_empty());
    }

    #[test]
    fn test_downstream_closure_of_script() {
        let graph = StageGraph::production();
        assert_eq!(
            graph.downstream(Stage::Script),
            vec![Stage::Audio, Stage::Metadata, Stage::ImagePrompts, Stage::Images, Stage::Video]
        );
    }

    #[test]
    fn test_downstream_excludes_siblings() {
        let graph = StageGraph::production();
        // Audio's closure reaches the video branch but not Metadata,
        // which only shares an ancestor.
        assert_eq!(
            graph.downstream(Stage::Audio),
            vec![Stage::ImagePrompts, Stage::Images, Stage::Video]
        );
        assert!(graph.downstream(Stage::Metadata).is_empty());
    }

    #[test]
    fn test_invalidation_set_includes_self() {
        let graph = StageGraph::production();
        assert_eq!(
            graph.invalidation_set(Stage::Images),
            vec![Stage::Images, Stage::Video]
        );
        assert_eq!(graph.invalidation_set(Stage::Video), vec![Stage::Video]);
    }
}
