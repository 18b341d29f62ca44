use std::collections::HashSet;

use crate::models::{DiversityFactors, GeneticDiversityScore, PedigreeNode};
use crate::pedigree::{flatten_ancestors, MAX_GENERATIONS};

const UNIQUENESS_WEIGHT: f64 = 40.0;
const DEPTH_WEIGHT: f64 = 30.0;
const COMPLETENESS_WEIGHT: f64 = 30.0;

pub fn calculate_genetic_diversity(tree: &PedigreeNode) -> GeneticDiversityScore {
    let ancestors = flatten_ancestors(tree);

    let unique_ancestors = ancestors
        .iter()
        .map(|node| node.id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let max_generation = ancestors.iter().map(|node| node.generation).max().unwrap_or(0);

    let total_possible = 2_f64.powi(i32::from(max_generation)) - 1.0;
    let completeness = if total_possible > 0.0 {
        ancestors.len() as f64 / total_possible * 100.0
    } else {
        0.0
    };

    let uniqueness = unique_ancestors as f64 / ancestors.len().max(1) as f64;
    let depth = f64::from(max_generation) / f64::from(MAX_GENERATIONS);
    let raw = UNIQUENESS_WEIGHT * uniqueness
        + DEPTH_WEIGHT * depth
        + COMPLETENESS_WEIGHT * (completeness / 100.0);

    GeneticDiversityScore {
        score: raw.round().clamp(0.0, 100.0) as u8,
        completeness: round_to_tenth(completeness.clamp(0.0, 100.0)),
        factors: DiversityFactors {
            unique_ancestors,
            generation_depth: max_generation,
            bloodline_variety: unique_ancestors,
        },
    }
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use proptest::prelude::*;

    fn leaf(id: &str, generation: u8) -> PedigreeNode {
        PedigreeNode {
            id: id.to_string(),
            name: id.to_string(),
            gender: Gender::Unknown,
            generation,
            is_registered: true,
            children: Vec::new(),
        }
    }

    fn with_children(mut node: PedigreeNode, children: Vec<PedigreeNode>) -> PedigreeNode {
        node.children = children;
        node
    }

    #[test]
    fn lone_animal_scores_zero() {
        let score = calculate_genetic_diversity(&leaf("Solo", 1));
        assert_eq!(score.score, 0);
        assert_eq!(score.completeness, 0.0);
        assert_eq!(score.factors.unique_ancestors, 0);
        assert_eq!(score.factors.generation_depth, 0);
    }

    #[test]
    fn two_parents_are_two_thirds_complete() {
        let tree = with_children(leaf("Foal1", 1), vec![leaf("MareA", 2), leaf("StallionB", 2)]);
        let score = calculate_genetic_diversity(&tree);

        assert_eq!(score.completeness, 66.7);
        assert_eq!(score.factors.generation_depth, 2);
        assert_eq!(score.factors.unique_ancestors, 2);
        // 40 * 1.0 + 30 * 0.5 + 30 * 0.667
        assert_eq!(score.score, 75);
    }

    #[test]
    fn repeated_ancestors_reduce_uniqueness() {
        let tree = with_children(
            leaf("Subject", 1),
            vec![
                with_children(leaf("Dam", 2), vec![leaf("X", 3)]),
                with_children(leaf("Sire", 2), vec![leaf("X", 3)]),
            ],
        );
        let score = calculate_genetic_diversity(&tree);
        assert_eq!(score.factors.unique_ancestors, 3);
        assert_eq!(score.factors.bloodline_variety, 3);
        // 4 of 7 possible ancestors
        assert_eq!(score.completeness, 57.1);
        assert_eq!(score.score, 70);
    }

    proptest! {
        #[test]
        fn score_stays_within_bounds(ids in prop::collection::vec(0u8..5, 0..14)) {
            let mut children = Vec::new();
            for (index, id) in ids.iter().enumerate() {
                let generation = 2 + (index % 3) as u8;
                children.push(leaf(&format!("A{id}"), generation));
            }
            let tree = with_children(leaf("root", 1), children);

            let score = calculate_genetic_diversity(&tree);
            prop_assert!(score.score <= 100);
            prop_assert!(score.completeness >= 0.0 && score.completeness <= 100.0);
        }
    }
}
