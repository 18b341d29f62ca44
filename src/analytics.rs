use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::warn;
use uuid::Uuid;

use crate::diversity::round_to_tenth;
use crate::models::{
    BreedingAnalytics, BreedingRecord, FemalePerformance, MonthlyBreedings, SeasonalTrends,
    StatusCount,
};
use crate::store::HerdStore;

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const UPCOMING_WINDOW_DAYS: i64 = 60;
const TOP_FEMALES: usize = 5;
const TREND_MONTHS: usize = 2;

/// Loads the breeding log and aggregates it. A failed or empty fetch gives
/// [`BreedingAnalytics::empty`].
pub async fn get_analytics<S>(store: &S, today: NaiveDate) -> BreedingAnalytics
where
    S: HerdStore + ?Sized,
{
    let records = match store.get_breeding_records().await {
        Ok(records) => records,
        Err(err) => {
            warn!(error = %err, "failed to load breeding records");
            return BreedingAnalytics::empty();
        }
    };
    if records.is_empty() {
        return BreedingAnalytics::empty();
    }

    let mut mother_ids: Vec<Uuid> = records.iter().map(|record| record.mother_id).collect();
    mother_ids.sort();
    mother_ids.dedup();

    let names = match store.get_animal_names(&mother_ids).await {
        Ok(names) => names,
        Err(err) => {
            warn!(error = %err, "failed to load animal names");
            return BreedingAnalytics::empty();
        }
    };

    aggregate(&records, &names, today)
}

pub fn aggregate(
    records: &[BreedingRecord],
    names: &HashMap<Uuid, String>,
    today: NaiveDate,
) -> BreedingAnalytics {
    if records.is_empty() {
        return BreedingAnalytics::empty();
    }

    let total_breedings = records.len();
    let pregnancies = records.iter().filter(|r| r.pregnancy_confirmed).count();
    let breedings_by_month = monthly_breakdown(records);

    BreedingAnalytics {
        total_breedings,
        pregnancy_rate: percentage(pregnancies, total_breedings),
        avg_gestation_length: average_gestation(records),
        upcoming_births: upcoming_births(records, today),
        seasonal_trends: seasonal_trends(&breedings_by_month),
        breedings_by_month,
        breedings_by_status: status_breakdown(records),
        top_performing_females: top_performing_females(records, names),
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_to_tenth(part as f64 / whole as f64 * 100.0)
    }
}

fn average_gestation(records: &[BreedingRecord]) -> i64 {
    let lengths: Vec<i64> = records
        .iter()
        .filter_map(|r| r.actual_birth_date.map(|born| (born - r.breeding_date).num_days()))
        .collect();

    if lengths.is_empty() {
        return 0;
    }
    (lengths.iter().sum::<i64>() as f64 / lengths.len() as f64).round() as i64
}

fn upcoming_births(records: &[BreedingRecord], today: NaiveDate) -> usize {
    let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);
    records
        .iter()
        .filter_map(|r| r.expected_due_date)
        .filter(|due| *due >= today && *due <= horizon)
        .count()
}

fn monthly_breakdown(records: &[BreedingRecord]) -> Vec<MonthlyBreedings> {
    let mut buckets: Vec<MonthlyBreedings> = MONTH_LABELS
        .iter()
        .map(|label| MonthlyBreedings {
            month: label.to_string(),
            breedings: 0,
            pregnancies: 0,
        })
        .collect();

    for record in records {
        let bucket = &mut buckets[record.breeding_date.month0() as usize];
        bucket.breedings += 1;
        if record.pregnancy_confirmed {
            bucket.pregnancies += 1;
        }
    }
    buckets
}

fn status_breakdown(records: &[BreedingRecord]) -> Vec<StatusCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.status.label()).or_insert(0) += 1;
    }

    let mut statuses: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    statuses.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
    statuses
}

fn top_performing_females(
    records: &[BreedingRecord],
    names: &HashMap<Uuid, String>,
) -> Vec<FemalePerformance> {
    let mut tallies: HashMap<Uuid, (usize, usize)> = HashMap::new();
    for record in records {
        let entry = tallies.entry(record.mother_id).or_insert((0, 0));
        entry.0 += 1;
        if record.pregnancy_confirmed {
            entry.1 += 1;
        }
    }

    let mut females: Vec<FemalePerformance> = tallies
        .into_iter()
        .filter(|(_, (_, pregnancies))| *pregnancies > 0)
        .map(|(id, (breedings, pregnancies))| FemalePerformance {
            id,
            name: names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            breedings,
            pregnancies,
            success_rate: percentage(pregnancies, breedings),
        })
        .collect();

    females.sort_by(|a, b| {
        b.pregnancies
            .cmp(&a.pregnancies)
            .then_with(|| a.breedings.cmp(&b.breedings))
            .then_with(|| a.id.cmp(&b.id))
    });
    females.truncate(TOP_FEMALES);
    females
}

fn seasonal_trends(months: &[MonthlyBreedings]) -> SeasonalTrends {
    let mut active: Vec<(&MonthlyBreedings, f64)> = months
        .iter()
        .filter(|m| m.breedings > 0)
        .map(|m| (m, m.pregnancies as f64 / m.breedings as f64))
        .collect();
    active.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let best_months: Vec<String> = active
        .iter()
        .take(TREND_MONTHS)
        .map(|(m, _)| m.month.clone())
        .collect();
    let worst_months: Vec<String> = active
        .iter()
        .skip(active.len().saturating_sub(TREND_MONTHS))
        .map(|(m, _)| m.month.clone())
        .collect();

    let mut recommendations = Vec::new();
    if !best_months.is_empty() {
        recommendations.push(format!(
            "Best months for breeding: {} show the highest pregnancy rates",
            best_months.join(", ")
        ));
    }
    if !worst_months.is_empty() {
        recommendations.push(format!(
            "Avoid breeding in: {} due to lower success rates",
            worst_months.join(", ")
        ));
    }
    recommendations.extend(
        [
            "Plan breedings so births avoid the harshest weather of the year",
            "Check body condition and nutrition of females before the breeding season",
            "Keep recording outcomes to sharpen future seasonal analysis",
        ]
        .map(String::from),
    );

    SeasonalTrends {
        best_months,
        worst_months,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BreedingStatus;
    use crate::store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(mother_id: Uuid, bred: NaiveDate, pregnant: bool) -> BreedingRecord {
        BreedingRecord {
            id: Uuid::new_v4(),
            mother_id,
            father_id: None,
            breeding_date: bred,
            pregnancy_confirmed: pregnant,
            expected_due_date: None,
            actual_birth_date: None,
            status: if pregnant {
                BreedingStatus::ConfirmedPregnant
            } else {
                BreedingStatus::Bred
            },
        }
    }

    #[test]
    fn empty_log_gives_empty_analytics() {
        let analytics = aggregate(&[], &HashMap::new(), date(2026, 1, 1));
        assert_eq!(analytics.total_breedings, 0);
        assert_eq!(analytics.pregnancy_rate, 0.0);
        assert!(analytics.breedings_by_month.is_empty());
        assert!(analytics.breedings_by_status.is_empty());
        assert!(analytics.top_performing_females.is_empty());
        assert!(analytics.seasonal_trends.best_months.is_empty());
    }

    #[test]
    fn march_breedings_fill_one_bucket() {
        let mother = Uuid::new_v4();
        let records: Vec<BreedingRecord> = (0..10)
            .map(|i| record(mother, date(2025 + (i % 2), 3, 1 + i as u32), i < 4))
            .collect();

        let analytics = aggregate(&records, &HashMap::new(), date(2026, 1, 1));
        assert_eq!(analytics.total_breedings, 10);
        assert_eq!(analytics.pregnancy_rate, 40.0);
        assert_eq!(analytics.breedings_by_month.len(), 12);

        for bucket in &analytics.breedings_by_month {
            if bucket.month == "Mar" {
                assert_eq!((bucket.breedings, bucket.pregnancies), (10, 4));
            } else {
                assert_eq!((bucket.breedings, bucket.pregnancies), (0, 0));
            }
        }
        assert_eq!(analytics.seasonal_trends.best_months, vec!["Mar".to_string()]);
        assert_eq!(analytics.seasonal_trends.worst_months, vec!["Mar".to_string()]);
    }

    #[test]
    fn gestation_and_upcoming_births_use_dates() {
        let mother = Uuid::new_v4();
        let today = date(2026, 6, 1);

        let mut born_a = record(mother, date(2025, 1, 1), true);
        born_a.actual_birth_date = Some(date(2025, 5, 31));
        let mut born_b = record(mother, date(2025, 2, 1), true);
        born_b.actual_birth_date = Some(date(2025, 7, 2));
        let mut due_today = record(mother, date(2026, 1, 2), true);
        due_today.expected_due_date = Some(today);
        let mut due_edge = record(mother, date(2026, 2, 1), true);
        due_edge.expected_due_date = Some(today + Duration::days(60));
        let mut due_late = record(mother, date(2026, 3, 1), true);
        due_late.expected_due_date = Some(today + Duration::days(61));
        let mut overdue = record(mother, date(2025, 12, 1), true);
        overdue.expected_due_date = Some(today - Duration::days(1));

        let records = vec![born_a, born_b, due_today, due_edge, due_late, overdue];
        let analytics = aggregate(&records, &HashMap::new(), today);

        // 150 and 151 days
        assert_eq!(analytics.avg_gestation_length, 151);
        assert_eq!(analytics.upcoming_births, 2);
    }

    #[test]
    fn statuses_are_labelled_and_unknowns_pass_through() {
        let mother = Uuid::new_v4();
        let mut weaning = record(mother, date(2026, 1, 1), false);
        weaning.status = BreedingStatus::Other("weaning".to_string());
        let records = vec![
            record(mother, date(2026, 1, 2), true),
            record(mother, date(2026, 1, 3), true),
            record(mother, date(2026, 1, 4), false),
            weaning,
        ];

        let statuses = aggregate(&records, &HashMap::new(), date(2026, 1, 1)).breedings_by_status;
        let pairs: Vec<(&str, usize)> = statuses
            .iter()
            .map(|s| (s.status.as_str(), s.count))
            .collect();
        assert_eq!(pairs, vec![("Confirmed Pregnant", 2), ("Bred", 1), ("weaning", 1)]);
    }

    #[test]
    fn top_females_rank_by_pregnancies() {
        let daisy = Uuid::new_v4();
        let bella = Uuid::new_v4();
        let barren = Uuid::new_v4();
        let mut names = HashMap::new();
        names.insert(daisy, "Daisy".to_string());
        names.insert(barren, "Barren".to_string());

        let mut records = vec![
            record(daisy, date(2026, 1, 1), true),
            record(daisy, date(2026, 2, 1), true),
            record(daisy, date(2026, 3, 1), false),
            record(bella, date(2026, 1, 5), true),
            record(barren, date(2026, 1, 7), false),
        ];
        for extra in 0..6 {
            records.push(record(Uuid::new_v4(), date(2026, 4, 1 + extra), true));
        }

        let top = aggregate(&records, &names, date(2026, 1, 1)).top_performing_females;
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].name, "Daisy");
        assert_eq!(top[0].pregnancies, 2);
        assert_eq!(top[0].success_rate, 66.7);
        assert!(top.iter().all(|f| f.id != barren));
        assert!(top[1..].iter().all(|f| f.name == "Unknown" || f.id == bella));
    }

    #[test]
    fn seasonal_trends_pick_best_and_worst_months() {
        let mother = Uuid::new_v4();
        let records = vec![
            record(mother, date(2026, 1, 1), true),
            record(mother, date(2026, 1, 2), true),
            record(mother, date(2026, 4, 1), true),
            record(mother, date(2026, 4, 2), false),
            record(mother, date(2026, 7, 1), false),
            record(mother, date(2026, 10, 1), true),
            record(mother, date(2026, 10, 2), false),
            record(mother, date(2026, 10, 3), false),
        ];

        let trends = aggregate(&records, &HashMap::new(), date(2026, 1, 1)).seasonal_trends;
        assert_eq!(trends.best_months, vec!["Jan".to_string(), "Apr".to_string()]);
        assert_eq!(trends.worst_months, vec!["Oct".to_string(), "Jul".to_string()]);
        assert!(trends.recommendations[0].contains("Jan, Apr"));
        assert!(trends.recommendations[1].contains("Oct, Jul"));
        assert_eq!(trends.recommendations.len(), 5);
    }

    #[tokio::test]
    async fn fetch_failure_collapses_to_empty_analytics() {
        let mut store = MemoryStore::new();
        store.add_breeding(record(Uuid::new_v4(), date(2026, 3, 1), true));
        store.set_unavailable(true);
        assert_eq!(get_analytics(&store, date(2026, 3, 2)).await, BreedingAnalytics::empty());
    }

    #[tokio::test]
    async fn analytics_resolve_mother_names_from_store() {
        use crate::models::{Animal, AncestryLinks, Gender, HealthStatus};

        let ewe = Animal {
            id: Uuid::new_v4(),
            name: "Dolly".to_string(),
            gender: Gender::Female,
            species: "sheep".to_string(),
            breed: "Finn".to_string(),
            health_status: HealthStatus::Healthy,
            ancestry: AncestryLinks::default(),
        };
        let mut store = MemoryStore::with_animals(vec![ewe.clone()]);
        store.add_breeding(record(ewe.id, date(2026, 3, 1), true));

        let analytics = get_analytics(&store, date(2026, 3, 2)).await;
        assert_eq!(analytics.top_performing_females[0].name, "Dolly");
    }
}
