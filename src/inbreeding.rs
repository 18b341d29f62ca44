//! Inbreeding estimation from pedigree trees.
//!
//! Two estimators live here. [`calculate_inbreeding_coefficient`] weighs each
//! repeated ancestor of a single pedigree by how far back it sits.
//! [`calculate_potential_inbreeding`] scores a prospective mating with a flat
//! contribution per ancestor shared by both parents, since there is no
//! offspring pedigree yet to weigh generations against. The recommendation
//! ranking is calibrated against the flat pair scale.

use std::collections::{HashMap, HashSet};

use crate::models::{InbreedingAnalysis, PedigreeNode, RiskLevel};
use crate::pedigree::flatten_ancestors;

pub const HIGH_RISK_THRESHOLD: f64 = 0.125;
pub const MODERATE_RISK_THRESHOLD: f64 = 0.0625;
pub const SHARED_ANCESTOR_CONTRIBUTION: f64 = 0.0625;

pub fn classify_risk(coefficient: f64) -> RiskLevel {
    if coefficient > HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if coefficient > MODERATE_RISK_THRESHOLD {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

struct Occurrence<'a> {
    name: &'a str,
    count: usize,
    closest_generation: u8,
}

/// Self-inbreeding of the subject at the root of `tree`.
pub fn calculate_inbreeding_coefficient(tree: &PedigreeNode) -> InbreedingAnalysis {
    let ancestors = flatten_ancestors(tree);

    let mut order: Vec<&str> = Vec::new();
    let mut occurrences: HashMap<&str, Occurrence> = HashMap::new();

    for ancestor in &ancestors {
        let entry = occurrences.entry(ancestor.id.as_str()).or_insert_with(|| {
            order.push(ancestor.id.as_str());
            Occurrence {
                name: ancestor.name.as_str(),
                count: 0,
                closest_generation: ancestor.generation,
            }
        });
        entry.count += 1;
        entry.closest_generation = entry.closest_generation.min(ancestor.generation);
    }

    let mut coefficient = 0.0;
    let mut common_ancestors = Vec::new();

    for id in order {
        let occurrence = &occurrences[id];
        if occurrence.count < 2 {
            continue;
        }
        common_ancestors.push(occurrence.name.to_string());
        coefficient += (occurrence.count - 1) as f64
            * 0.5_f64.powi(i32::from(occurrence.closest_generation));
    }

    let risk_level = classify_risk(coefficient);
    let recommendations = self_recommendations(risk_level, &common_ancestors);

    InbreedingAnalysis {
        coefficient,
        risk_level,
        common_ancestors,
        recommendations,
    }
}

/// Expected inbreeding of offspring from `male` × `female`.
pub fn calculate_potential_inbreeding(
    male: &PedigreeNode,
    female: &PedigreeNode,
) -> InbreedingAnalysis {
    let female_ids: HashSet<&str> = flatten_ancestors(female)
        .into_iter()
        .map(|node| node.id.as_str())
        .collect();

    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut seen_names: HashSet<&str> = HashSet::new();
    let mut common_ancestors = Vec::new();

    for node in flatten_ancestors(male) {
        let id = node.id.as_str();
        if !female_ids.contains(id) || !seen_ids.insert(id) {
            continue;
        }
        if seen_names.insert(node.name.as_str()) {
            common_ancestors.push(node.name.clone());
        }
    }

    let coefficient = SHARED_ANCESTOR_CONTRIBUTION * seen_ids.len() as f64;
    let risk_level = classify_risk(coefficient);
    let recommendations = pair_recommendations(risk_level, &common_ancestors);

    InbreedingAnalysis {
        coefficient,
        risk_level,
        common_ancestors,
        recommendations,
    }
}

fn self_recommendations(risk: RiskLevel, common_ancestors: &[String]) -> Vec<String> {
    let mut lines = vec![match risk {
        RiskLevel::High => {
            "High inbreeding level: avoid breeding this animal with close relatives".to_string()
        }
        RiskLevel::Moderate => {
            "Moderate inbreeding level: choose unrelated mates for future breedings".to_string()
        }
        RiskLevel::Low => {
            "Low inbreeding level: pedigree shows healthy genetic variation".to_string()
        }
    }];

    if !common_ancestors.is_empty() {
        lines.push(format!(
            "Repeated ancestors in pedigree: {}",
            common_ancestors.join(", ")
        ));
    }

    if risk == RiskLevel::High {
        lines.push("Monitor offspring for hereditary defects and reduced fertility".to_string());
    }

    lines
}

fn pair_recommendations(risk: RiskLevel, common_ancestors: &[String]) -> Vec<String> {
    let mut lines = vec![match risk {
        RiskLevel::High => "High inbreeding risk: this pairing is not recommended".to_string(),
        RiskLevel::Moderate => {
            "Moderate inbreeding risk: proceed only with careful monitoring".to_string()
        }
        RiskLevel::Low => "Low inbreeding risk: pairing is genetically suitable".to_string(),
    }];

    if common_ancestors.is_empty() {
        lines.push("No common ancestors found between the candidates".to_string());
    } else {
        lines.push(format!("Common ancestors: {}", common_ancestors.join(", ")));
    }

    if risk == RiskLevel::High {
        lines.push("Consider an outcross with an unrelated bloodline".to_string());
    }

    lines
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
            is_registered: false,
            children: Vec::new(),
        }
    }

    fn node(id: &str, generation: u8, children: Vec<PedigreeNode>) -> PedigreeNode {
        PedigreeNode {
            children,
            is_registered: true,
            ..leaf(id, generation)
        }
    }

    #[test]
    fn risk_bands_use_strict_comparisons() {
        assert_eq!(classify_risk(0.0), RiskLevel::Low);
        assert_eq!(classify_risk(0.0625), RiskLevel::Low);
        assert_eq!(classify_risk(0.07), RiskLevel::Moderate);
        assert_eq!(classify_risk(0.125), RiskLevel::Moderate);
        assert_eq!(classify_risk(0.13), RiskLevel::High);
    }

    #[test]
    fn distinct_ancestors_give_zero_coefficient() {
        let tree = node("Foal1", 1, vec![leaf("MareA", 2), leaf("StallionB", 2)]);
        let analysis = calculate_inbreeding_coefficient(&tree);
        assert_eq!(analysis.coefficient, 0.0);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert!(analysis.common_ancestors.is_empty());
        assert_eq!(analysis.recommendations.len(), 1);
    }

    #[test]
    fn repeated_grandsire_is_weighted_by_generation() {
        let tree = node(
            "Subject",
            1,
            vec![
                node("Dam", 2, vec![leaf("GD1", 3), leaf("Sultan", 3)]),
                node("Sire", 2, vec![leaf("GD2", 3), leaf("Sultan", 3)]),
            ],
        );

        let analysis = calculate_inbreeding_coefficient(&tree);
        assert!((analysis.coefficient - 0.125).abs() < 1e-12);
        assert_eq!(analysis.risk_level, RiskLevel::Moderate);
        assert_eq!(analysis.common_ancestors, vec!["Sultan".to_string()]);
        assert!(analysis.recommendations[1].contains("Sultan"));
    }

    #[test]
    fn closest_occurrence_sets_the_weight() {
        let tree = node(
            "Subject",
            1,
            vec![
                node("Dam", 2, vec![node("GD", 3, vec![leaf("Atlas", 4)])]),
                leaf("Atlas", 2),
            ],
        );
        let analysis = calculate_inbreeding_coefficient(&tree);
        assert!((analysis.coefficient - 0.25).abs() < 1e-12);
        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert_eq!(analysis.recommendations.len(), 3);
    }

    #[test]
    fn shared_grandparent_between_candidates_is_low_risk() {
        let male = node("Male", 1, vec![node("MaleDam", 2, vec![leaf("GP-X", 3)])]);
        let female = node("Female", 1, vec![node("FemaleSire", 2, vec![leaf("GP-X", 3)])]);

        let analysis = calculate_potential_inbreeding(&male, &female);
        assert_eq!(analysis.coefficient, 0.0625);
        assert_eq!(analysis.common_ancestors, vec!["GP-X".to_string()]);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
    }

    #[test]
    fn pair_counts_each_shared_id_once() {
        let male = node("M", 1, vec![leaf("A", 2), node("B", 2, vec![leaf("A", 3), leaf("C", 3)])]);
        let female = node("F", 1, vec![leaf("A", 2), leaf("C", 2), leaf("A", 2)]);

        let analysis = calculate_potential_inbreeding(&male, &female);
        assert_eq!(analysis.coefficient, 0.125);
        assert_eq!(analysis.risk_level, RiskLevel::Moderate);
        assert_eq!(analysis.common_ancestors, vec!["A".to_string(), "C".to_string()]);
    }

    fn arb_tree() -> impl Strategy<Value = PedigreeNode> {
        let names = prop::sample::select(vec!["A", "B", "C", "D", "E", "F"]);
        prop::collection::vec(names, 14).prop_map(|ids| {
            // full four-generation tree drawn from a small name pool
            let g4: Vec<PedigreeNode> = ids[6..14].iter().map(|id| leaf(id, 4)).collect();
            let g3: Vec<PedigreeNode> = g4
                .chunks(2)
                .zip(&ids[2..6])
                .map(|(pair, id)| node(id, 3, pair.to_vec()))
                .collect();
            let g2: Vec<PedigreeNode> = g3
                .chunks(2)
                .zip(&ids[0..2])
                .map(|(pair, id)| node(id, 2, pair.to_vec()))
                .collect();
            node("root", 1, g2)
        })
    }

    /// Inserts `copy` under one of the nodes a generation above it.
    fn graft(tree: &mut PedigreeNode, copy: PedigreeNode, host: usize, slot: usize) {
        let mut hosts: Vec<&mut PedigreeNode> = vec![tree];
        while hosts[0].generation + 1 < copy.generation {
            hosts = hosts
                .into_iter()
                .flat_map(|node| node.children.iter_mut())
                .collect();
        }
        let count = hosts.len();
        let parent = hosts.swap_remove(host % count);
        let at = slot % (parent.children.len() + 1);
        parent.children.insert(at, copy);
    }

    proptest! {
        #[test]
        fn adding_a_duplicate_never_lowers_the_coefficient(
            tree in arb_tree(),
            pick in 0usize..14,
            generation in 2u8..=4,
            host in 0usize..8,
            slot in 0usize..3,
        ) {
            let before = calculate_inbreeding_coefficient(&tree).coefficient;

            let id = flatten_ancestors(&tree)[pick].id.clone();
            let mut grown = tree.clone();
            graft(&mut grown, leaf(&id, generation), host, slot);

            let after = calculate_inbreeding_coefficient(&grown).coefficient;
            prop_assert!(after >= before);
        }

        #[test]
        fn pair_analysis_is_symmetric(male in arb_tree(), female in arb_tree()) {
            let forward = calculate_potential_inbreeding(&male, &female);
            let backward = calculate_potential_inbreeding(&female, &male);
            prop_assert_eq!(forward.coefficient, backward.coefficient);

            let forward_set: HashSet<String> = forward.common_ancestors.into_iter().collect();
            let backward_set: HashSet<String> = backward.common_ancestors.into_iter().collect();
            prop_assert_eq!(forward_set, backward_set);
        }
    }
}
