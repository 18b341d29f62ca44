use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

impl FromStr for Gender {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            _ => Gender::Unknown,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Good,
    Sick,
    Injured,
    Recovering,
    Deceased,
    Other(String),
}

impl HealthStatus {
    pub fn as_str(&self) -> &str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Good => "good",
            HealthStatus::Sick => "sick",
            HealthStatus::Injured => "injured",
            HealthStatus::Recovering => "recovering",
            HealthStatus::Deceased => "deceased",
            HealthStatus::Other(value) => value,
        }
    }
}

impl FromStr for HealthStatus {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Ok(match normalized.as_str() {
            "healthy" => HealthStatus::Healthy,
            "good" => HealthStatus::Good,
            "sick" => HealthStatus::Sick,
            "injured" => HealthStatus::Injured,
            "recovering" => HealthStatus::Recovering,
            "deceased" => HealthStatus::Deceased,
            _ => HealthStatus::Other(normalized),
        })
    }
}

/// A stored parent link: either a registered animal or a free-text name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AncestorRef {
    Registered(Uuid),
    External(String),
}

impl AncestorRef {
    /// Blank text is no link at all.
    pub fn parse(raw: &str) -> Option<AncestorRef> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match registered_id(trimmed) {
            Some(id) => Some(AncestorRef::Registered(id)),
            None => Some(AncestorRef::External(trimmed.to_string())),
        }
    }

    pub fn parse_opt(raw: Option<&str>) -> Option<AncestorRef> {
        raw.and_then(AncestorRef::parse)
    }

    pub fn as_text(&self) -> String {
        match self {
            AncestorRef::Registered(id) => id.to_string(),
            AncestorRef::External(name) => name.clone(),
        }
    }
}

impl fmt::Display for AncestorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

pub fn is_registered_identifier(raw: &str) -> bool {
    registered_id(raw).is_some()
}

/// Only the 36-character hyphenated form names a registered animal. Simple,
/// braced and `urn:` spellings stay free text, so a dangling link keeps the
/// text it was stored with.
fn registered_id(raw: &str) -> Option<Uuid> {
    let trimmed = raw.trim();
    if trimmed.len() != HYPHENATED_LEN {
        return None;
    }
    Uuid::try_parse(trimmed).ok()
}

const HYPHENATED_LEN: usize = 36;

/// Recorded ancestry of an animal. Great-grandparents are ordered
/// maternal grandmother's parents, maternal grandfather's parents,
/// paternal grandmother's parents, paternal grandfather's parents,
/// mother before father within each pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AncestryLinks {
    pub mother: Option<AncestorRef>,
    pub father: Option<AncestorRef>,
    pub maternal_grandmother: Option<AncestorRef>,
    pub maternal_grandfather: Option<AncestorRef>,
    pub paternal_grandmother: Option<AncestorRef>,
    pub paternal_grandfather: Option<AncestorRef>,
    pub great_grandparents: [Option<AncestorRef>; 8],
}

impl AncestryLinks {
    pub fn parents(mother: Option<AncestorRef>, father: Option<AncestorRef>) -> Self {
        Self {
            mother,
            father,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Animal {
    pub id: Uuid,
    pub name: String,
    pub gender: Gender,
    pub species: String,
    pub breed: String,
    pub health_status: HealthStatus,
    pub ancestry: AncestryLinks,
}

#[derive(Debug, Clone, Default)]
pub struct AnimalFilter {
    pub health: Vec<HealthStatus>,
    pub genders: Vec<Gender>,
}

impl AnimalFilter {
    pub fn breeding_candidates() -> Self {
        Self {
            health: vec![HealthStatus::Healthy, HealthStatus::Good],
            genders: vec![Gender::Male, Gender::Female],
        }
    }

    pub fn matches(&self, animal: &Animal) -> bool {
        (self.health.is_empty() || self.health.contains(&animal.health_status))
            && (self.genders.is_empty() || self.genders.contains(&animal.gender))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PedigreeNode {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub generation: u8,
    pub is_registered: bool,
    pub children: Vec<PedigreeNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn score(&self) -> f64 {
        match self {
            RiskLevel::Low => 100.0,
            RiskLevel::Moderate => 60.0,
            RiskLevel::High => 20.0,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InbreedingAnalysis {
    pub coefficient: f64,
    pub risk_level: RiskLevel,
    pub common_ancestors: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiversityFactors {
    pub unique_ancestors: usize,
    pub generation_depth: u8,
    pub bloodline_variety: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneticDiversityScore {
    pub score: u8,
    pub completeness: f64,
    pub factors: DiversityFactors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreedingRecommendation {
    pub male_id: Uuid,
    pub male_name: String,
    pub female_id: Uuid,
    pub female_name: String,
    pub compatibility_score: u8,
    pub genetic_diversity_gain: u8,
    pub inbreeding_risk: RiskLevel,
    pub recommendations: Vec<String>,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationRun {
    pub recommendations: Vec<BreedingRecommendation>,
    pub pairs_considered: usize,
    pub pairs_skipped: usize,
    pub population_truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreedingStatus {
    Planned,
    Bred,
    ConfirmedPregnant,
    Birthed,
    Failed,
    Cancelled,
    Other(String),
}

impl BreedingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BreedingStatus::Planned => "planned",
            BreedingStatus::Bred => "bred",
            BreedingStatus::ConfirmedPregnant => "confirmed_pregnant",
            BreedingStatus::Birthed => "birthed",
            BreedingStatus::Failed => "failed",
            BreedingStatus::Cancelled => "cancelled",
            BreedingStatus::Other(raw) => raw,
        }
    }

    /// Display label; unknown statuses pass through untouched.
    pub fn label(&self) -> String {
        match self {
            BreedingStatus::Planned => "Planned".to_string(),
            BreedingStatus::Bred => "Bred".to_string(),
            BreedingStatus::ConfirmedPregnant => "Confirmed Pregnant".to_string(),
            BreedingStatus::Birthed => "Birthed".to_string(),
            BreedingStatus::Failed => "Failed".to_string(),
            BreedingStatus::Cancelled => "Cancelled".to_string(),
            BreedingStatus::Other(raw) => raw.clone(),
        }
    }
}

impl FromStr for BreedingStatus {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim() {
            "planned" => BreedingStatus::Planned,
            "bred" => BreedingStatus::Bred,
            "confirmed_pregnant" => BreedingStatus::ConfirmedPregnant,
            "birthed" => BreedingStatus::Birthed,
            "failed" => BreedingStatus::Failed,
            "cancelled" => BreedingStatus::Cancelled,
            other => BreedingStatus::Other(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreedingRecord {
    pub id: Uuid,
    pub mother_id: Uuid,
    pub father_id: Option<Uuid>,
    pub breeding_date: NaiveDate,
    pub pregnancy_confirmed: bool,
    pub expected_due_date: Option<NaiveDate>,
    pub actual_birth_date: Option<NaiveDate>,
    pub status: BreedingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBreedings {
    pub month: String,
    pub breedings: usize,
    pub pregnancies: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FemalePerformance {
    pub id: Uuid,
    pub name: String,
    pub breedings: usize,
    pub pregnancies: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeasonalTrends {
    pub best_months: Vec<String>,
    pub worst_months: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BreedingAnalytics {
    pub total_breedings: usize,
    pub pregnancy_rate: f64,
    pub avg_gestation_length: i64,
    pub upcoming_births: usize,
    pub breedings_by_month: Vec<MonthlyBreedings>,
    pub breedings_by_status: Vec<StatusCount>,
    pub top_performing_females: Vec<FemalePerformance>,
    pub seasonal_trends: SeasonalTrends,
}

impl BreedingAnalytics {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestor_ref_distinguishes_uuid_from_free_text() {
        let id = Uuid::new_v4();
        assert_eq!(
            AncestorRef::parse(&id.to_string()),
            Some(AncestorRef::Registered(id))
        );
        assert_eq!(
            AncestorRef::parse("  Old Bess "),
            Some(AncestorRef::External("Old Bess".to_string()))
        );
        assert_eq!(AncestorRef::parse("   "), None);
        assert!(is_registered_identifier(&id.to_string()));
        assert!(!is_registered_identifier("Old Bess"));
    }

    #[test]
    fn non_hyphenated_uuid_spellings_stay_external() {
        let id = Uuid::new_v4();
        for spelling in [
            id.simple().to_string(),
            id.braced().to_string(),
            id.urn().to_string(),
        ] {
            assert!(!is_registered_identifier(&spelling));
            assert_eq!(
                AncestorRef::parse(&spelling),
                Some(AncestorRef::External(spelling.clone()))
            );
        }
        let upper = id.hyphenated().to_string().to_uppercase();
        assert_eq!(AncestorRef::parse(&upper), Some(AncestorRef::Registered(id)));
    }

    #[test]
    fn unknown_breeding_status_keeps_its_text() {
        let status: BreedingStatus = "weaning".parse().unwrap();
        assert_eq!(status.label(), "weaning");
        let known: BreedingStatus = "confirmed_pregnant".parse().unwrap();
        assert_eq!(known.label(), "Confirmed Pregnant");
    }

    #[test]
    fn filter_matches_health_and_gender() {
        let animal = Animal {
            id: Uuid::new_v4(),
            name: "Daisy".to_string(),
            gender: "F".parse().unwrap(),
            species: "cattle".to_string(),
            breed: "Jersey".to_string(),
            health_status: "Good".parse().unwrap(),
            ancestry: AncestryLinks::default(),
        };
        assert!(AnimalFilter::breeding_candidates().matches(&animal));

        let sick = Animal {
            health_status: HealthStatus::Sick,
            ..animal.clone()
        };
        assert!(!AnimalFilter::breeding_candidates().matches(&sick));

        let unknown = Animal {
            gender: Gender::Unknown,
            ..animal
        };
        assert!(!AnimalFilter::breeding_candidates().matches(&unknown));
    }
}
