//! Breeding pair ranking.
//!
//! Every eligible male is paired with every eligible female, so scoring is
//! quadratic in population size. Pedigrees are built once per animal and
//! shared across that animal's pairs, which keeps store traffic linear, but
//! the pair loop itself is only meant for farm-scale herds. Each sex is
//! capped by [`RecommendOptions::max_population_per_sex`].
//!
//! Store calls race the [`CancellationToken`]; a cancelled or expired run
//! drops its in-flight fetches instead of waiting for them.

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::diversity::calculate_genetic_diversity;
use crate::error::AnalysisError;
use crate::inbreeding::calculate_potential_inbreeding;
use crate::models::{
    Animal, AnimalFilter, BreedingRecommendation, Gender, PedigreeNode, RecommendationRun,
    RiskLevel,
};
use crate::pedigree::{build_pedigree_with_depth, MAX_GENERATIONS};
use crate::store::HerdStore;

const DIVERSITY_WEIGHT: f64 = 0.4;
const RISK_WEIGHT: f64 = 0.4;
const COMPLETENESS_WEIGHT: f64 = 0.2;
const HEADLINE_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct RecommendOptions {
    pub max_depth: u8,
    pub max_population_per_sex: usize,
    /// Pedigree builds allowed in flight at once.
    pub concurrency: usize,
    pub limit: Option<usize>,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_GENERATIONS,
            max_population_per_sex: 200,
            concurrency: 8,
            limit: None,
        }
    }
}

/// Ranked pairs, best first. Pairs with an unbuildable pedigree are left out.
pub async fn generate_breeding_recommendations<S>(
    store: &S,
    options: &RecommendOptions,
    cancel: &CancellationToken,
) -> Result<Vec<BreedingRecommendation>, AnalysisError>
where
    S: HerdStore + ?Sized,
{
    Ok(run_recommendations(store, options, cancel).await?.recommendations)
}

pub async fn run_recommendations<S>(
    store: &S,
    options: &RecommendOptions,
    cancel: &CancellationToken,
) -> Result<RecommendationRun, AnalysisError>
where
    S: HerdStore + ?Sized,
{
    let candidates = AnimalFilter::breeding_candidates();
    let population = match cancel
        .run_until_cancelled(store.get_animals_by_filter(&candidates))
        .await?
    {
        Ok(animals) => animals,
        Err(err) => {
            warn!(error = %err, "failed to load breeding population");
            return Ok(RecommendationRun::default());
        }
    };

    let (mut males, mut females): (Vec<Animal>, Vec<Animal>) = population
        .into_iter()
        .filter(|animal| animal.gender != Gender::Unknown)
        .partition(|animal| animal.gender == Gender::Male);

    if males.is_empty() || females.is_empty() {
        debug!(males = males.len(), females = females.len(), "no breeding pairs possible");
        return Ok(RecommendationRun::default());
    }

    let mut run = RecommendationRun::default();
    let cap = options.max_population_per_sex.max(1);
    for (sex, group) in [("male", &mut males), ("female", &mut females)] {
        if group.len() > cap {
            warn!(sex, available = group.len(), cap, "breeding population truncated");
            group.truncate(cap);
            run.population_truncated = true;
        }
    }

    let ids = males.iter().chain(females.iter()).map(|animal| animal.id);
    let pedigrees = build_pedigrees(store, ids, options, cancel).await?;

    for male in &males {
        cancel.check()?;
        for female in &females {
            if male.id == female.id {
                continue;
            }
            run.pairs_considered += 1;

            let male_tree = pedigrees.get(&male.id).and_then(Option::as_ref);
            let female_tree = pedigrees.get(&female.id).and_then(Option::as_ref);
            match (male_tree, female_tree) {
                (Some(male_tree), Some(female_tree)) => {
                    run.recommendations
                        .push(score_pair(male, female, male_tree, female_tree));
                }
                _ => run.pairs_skipped += 1,
            }
        }
    }

    run.recommendations
        .sort_by(|a, b| b.compatibility_score.cmp(&a.compatibility_score));
    if let Some(limit) = options.limit {
        run.recommendations.truncate(limit);
    }

    info!(
        males = males.len(),
        females = females.len(),
        pairs = run.pairs_considered,
        skipped = run.pairs_skipped,
        "breeding recommendations ranked"
    );
    Ok(run)
}

async fn build_pedigrees<S>(
    store: &S,
    ids: impl Iterator<Item = Uuid>,
    options: &RecommendOptions,
    cancel: &CancellationToken,
) -> Result<HashMap<Uuid, Option<PedigreeNode>>, AnalysisError>
where
    S: HerdStore + ?Sized,
{
    let mut seen = HashSet::new();
    let unique: Vec<Uuid> = ids.filter(|id| seen.insert(*id)).collect();
    let max_depth = options.max_depth;

    let mut builds = stream::iter(unique)
        .map(move |id| async move { (id, build_pedigree_with_depth(store, id, max_depth).await) })
        .buffer_unordered(options.concurrency.max(1));

    let mut pedigrees = HashMap::new();
    while let Some((id, tree)) = cancel.run_until_cancelled(builds.next()).await? {
        pedigrees.insert(id, tree);
    }
    Ok(pedigrees)
}

fn score_pair(
    male: &Animal,
    female: &Animal,
    male_tree: &PedigreeNode,
    female_tree: &PedigreeNode,
) -> BreedingRecommendation {
    let inbreeding = calculate_potential_inbreeding(male_tree, female_tree);
    let male_diversity = calculate_genetic_diversity(male_tree);
    let female_diversity = calculate_genetic_diversity(female_tree);

    let avg_diversity =
        (f64::from(male_diversity.score) + f64::from(female_diversity.score)) / 2.0;
    let avg_completeness = (male_diversity.completeness + female_diversity.completeness) / 2.0;

    let compatibility = DIVERSITY_WEIGHT * avg_diversity
        + RISK_WEIGHT * inbreeding.risk_level.score()
        + COMPLETENESS_WEIGHT * avg_completeness;

    let mut lines = vec![
        risk_message(inbreeding.risk_level).to_string(),
        diversity_message(avg_diversity).to_string(),
        completeness_message(avg_completeness).to_string(),
        format!("Male genetic diversity: {}%", male_diversity.score),
        format!("Female genetic diversity: {}%", female_diversity.score),
        format!("Inbreeding coefficient: {:.3}", inbreeding.coefficient),
    ];
    let reasoning = lines.split_off(HEADLINE_COUNT);

    BreedingRecommendation {
        male_id: male.id,
        male_name: male.name.clone(),
        female_id: female.id,
        female_name: female.name.clone(),
        compatibility_score: compatibility.round().clamp(0.0, 100.0) as u8,
        genetic_diversity_gain: avg_diversity.round().clamp(0.0, 100.0) as u8,
        inbreeding_risk: inbreeding.risk_level,
        recommendations: lines,
        reasoning,
    }
}

fn risk_message(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "Excellent genetic compatibility with low inbreeding risk",
        RiskLevel::Moderate => "Moderate inbreeding risk: monitor offspring closely",
        RiskLevel::High => "High inbreeding risk: pairing not recommended",
    }
}

fn diversity_message(avg_diversity: f64) -> &'static str {
    if avg_diversity >= 70.0 {
        "High genetic diversity expected in offspring"
    } else if avg_diversity >= 50.0 {
        "Moderate genetic diversity expected in offspring"
    } else {
        "Limited genetic diversity: consider introducing new bloodlines"
    }
}

fn completeness_message(avg_completeness: f64) -> &'static str {
    if avg_completeness >= 70.0 {
        "Well documented pedigrees support this assessment"
    } else if avg_completeness >= 40.0 {
        "Partially documented pedigrees: assessment is indicative"
    } else {
        "Incomplete pedigree records: register more ancestors to improve accuracy"
    }
}
