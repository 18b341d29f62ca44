use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{
    BreedingAnalytics, BreedingRecommendation, GeneticDiversityScore, InbreedingAnalysis,
};

pub fn build_report(
    herd: Option<&str>,
    generated_on: NaiveDate,
    analytics: &BreedingAnalytics,
    recommendations: &[BreedingRecommendation],
) -> String {
    let mut output = String::new();
    let herd_label = herd.unwrap_or("all animals");

    let _ = writeln!(output, "# Breeding Report");
    let _ = writeln!(output, "Generated for {} on {}", herd_label, generated_on);
    let _ = writeln!(output);
    output.push_str(&analytics_sections(analytics));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Pairings");
    if recommendations.is_empty() {
        let _ = writeln!(output, "Not enough eligible animals to suggest pairings.");
    } else {
        for pair in recommendations.iter().take(10) {
            let _ = writeln!(output, "{}", pairing_line(pair));
            for line in &pair.recommendations {
                let _ = writeln!(output, "  - {}", line);
            }
        }
    }

    output
}

pub fn analytics_sections(analytics: &BreedingAnalytics) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Overview");

    if analytics.total_breedings == 0 {
        let _ = writeln!(output, "No breeding records found.");
    } else {
        let _ = writeln!(output, "- Total breedings: {}", analytics.total_breedings);
        let _ = writeln!(output, "- Pregnancy rate: {:.1}%", analytics.pregnancy_rate);
        let _ = writeln!(
            output,
            "- Average gestation: {} days",
            analytics.avg_gestation_length
        );
        let _ = writeln!(
            output,
            "- Births expected in the next 60 days: {}",
            analytics.upcoming_births
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Breedings by Month");
    let active_months: Vec<_> = analytics
        .breedings_by_month
        .iter()
        .filter(|m| m.breedings > 0)
        .collect();
    if active_months.is_empty() {
        let _ = writeln!(output, "No breedings recorded.");
    } else {
        let _ = writeln!(output, "| Month | Breedings | Pregnancies |");
        let _ = writeln!(output, "|---|---|---|");
        for month in active_months {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                month.month, month.breedings, month.pregnancies
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status");
    if analytics.breedings_by_status.is_empty() {
        let _ = writeln!(output, "No breedings recorded.");
    } else {
        for status in &analytics.breedings_by_status {
            let _ = writeln!(output, "- {}: {}", status.status, status.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performing Females");
    if analytics.top_performing_females.is_empty() {
        let _ = writeln!(output, "No confirmed pregnancies yet.");
    } else {
        for female in &analytics.top_performing_females {
            let _ = writeln!(
                output,
                "- {}: {} pregnancies from {} breedings ({:.1}%)",
                female.name, female.pregnancies, female.breedings, female.success_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Seasonal Trends");
    if analytics.seasonal_trends.recommendations.is_empty() {
        let _ = writeln!(output, "Not enough data for seasonal analysis.");
    }
    for line in &analytics.seasonal_trends.recommendations {
        let _ = writeln!(output, "- {}", line);
    }

    output
}

pub fn pairing_line(pair: &BreedingRecommendation) -> String {
    format!(
        "- {} x {}: compatibility {}/100, diversity gain {}, {} inbreeding risk",
        pair.male_name,
        pair.female_name,
        pair.compatibility_score,
        pair.genetic_diversity_gain,
        pair.inbreeding_risk
    )
}

pub fn inbreeding_summary(analysis: &InbreedingAnalysis) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Inbreeding coefficient {:.4} ({} risk)",
        analysis.coefficient, analysis.risk_level
    );
    for line in &analysis.recommendations {
        let _ = writeln!(output, "- {}", line);
    }
    output
}

pub fn diversity_summary(score: &GeneticDiversityScore) -> String {
    format!(
        "Genetic diversity {}/100, pedigree {:.1}% complete, \
         {} unique ancestors across {} generations\n",
        score.score,
        score.completeness,
        score.factors.unique_ancestors,
        score.factors.generation_depth
    )
}
