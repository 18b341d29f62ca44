use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AncestorRef, AncestryLinks, Animal, AnimalFilter, BreedingRecord, BreedingStatus, Gender,
    HealthStatus,
};
use crate::store::HerdStore;

const GREAT_GRANDPARENT_COLUMNS: [&str; 8] = [
    "maternal_grandmother_mother",
    "maternal_grandmother_father",
    "maternal_grandfather_mother",
    "maternal_grandfather_father",
    "paternal_grandmother_mother",
    "paternal_grandmother_father",
    "paternal_grandfather_mother",
    "paternal_grandfather_father",
];

const ANIMAL_COLUMNS: &str = "id, name, gender, species, breed, health_status, \
     mother_id, father_id, maternal_grandmother, maternal_grandfather, \
     paternal_grandmother, paternal_grandfather, \
     maternal_grandmother_mother, maternal_grandmother_father, \
     maternal_grandfather_mother, maternal_grandfather_father, \
     paternal_grandmother_mother, paternal_grandmother_father, \
     paternal_grandfather_mother, paternal_grandfather_father";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub async fn init_db(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn link(row: &PgRow, column: &str) -> Result<Option<AncestorRef>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    Ok(AncestorRef::parse_opt(raw.as_deref()))
}

fn animal_from_row(row: &PgRow) -> Result<Animal, StoreError> {
    let gender: String = row.try_get("gender")?;
    let health_status: String = row.try_get("health_status")?;

    let mut great_grandparents: [Option<AncestorRef>; 8] = Default::default();
    for (slot, column) in great_grandparents.iter_mut().zip(GREAT_GRANDPARENT_COLUMNS) {
        *slot = link(row, column)?;
    }

    Ok(Animal {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        gender: gender.parse().unwrap_or(Gender::Unknown),
        species: row.try_get("species")?,
        breed: row.try_get("breed")?,
        health_status: health_status
            .parse()
            .unwrap_or_else(|_| HealthStatus::Other(health_status.clone())),
        ancestry: AncestryLinks {
            mother: link(row, "mother_id")?,
            father: link(row, "father_id")?,
            maternal_grandmother: link(row, "maternal_grandmother")?,
            maternal_grandfather: link(row, "maternal_grandfather")?,
            paternal_grandmother: link(row, "paternal_grandmother")?,
            paternal_grandfather: link(row, "paternal_grandfather")?,
            great_grandparents,
        },
    })
}

fn breeding_from_row(row: &PgRow) -> Result<BreedingRecord, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(BreedingRecord {
        id: row.try_get("id")?,
        mother_id: row.try_get("mother_id")?,
        father_id: row.try_get("father_id")?,
        breeding_date: row.try_get("breeding_date")?,
        pregnancy_confirmed: row.try_get("pregnancy_confirmed")?,
        expected_due_date: row.try_get("expected_due_date")?,
        actual_birth_date: row.try_get("actual_birth_date")?,
        status: status
            .parse()
            .unwrap_or(BreedingStatus::Other(status.clone())),
    })
}

#[async_trait]
impl HerdStore for PgStore {
    async fn get_animal_by_id(&self, id: Uuid) -> Result<Option<Animal>, StoreError> {
        let query = format!("SELECT {ANIMAL_COLUMNS} FROM herdbook.animals WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(animal_from_row).transpose()
    }

    async fn get_animals_by_filter(&self, filter: &AnimalFilter) -> Result<Vec<Animal>, StoreError> {
        let mut query = format!("SELECT {ANIMAL_COLUMNS} FROM herdbook.animals WHERE TRUE");
        let health: Vec<String> = filter.health.iter().map(|h| h.as_str().to_string()).collect();
        let genders: Vec<String> = filter.genders.iter().map(|g| g.as_str().to_string()).collect();

        let mut position = 0;
        if !health.is_empty() {
            position += 1;
            query.push_str(&format!(" AND lower(health_status) = ANY(${position})"));
        }
        if !genders.is_empty() {
            position += 1;
            query.push_str(&format!(" AND lower(gender) = ANY(${position})"));
        }
        query.push_str(" ORDER BY name");

        let mut rows = sqlx::query(&query);
        if !health.is_empty() {
            rows = rows.bind(health);
        }
        if !genders.is_empty() {
            rows = rows.bind(genders);
        }

        let found = rows.fetch_all(&self.pool).await?;
        found.iter().map(animal_from_row).collect()
    }

    async fn get_breeding_records(&self) -> Result<Vec<BreedingRecord>, StoreError> {
        sqlx::query(
            "SELECT id, mother_id, father_id, breeding_date, pregnancy_confirmed, \
             expected_due_date, actual_birth_date, status \
             FROM herdbook.breeding_records \
             ORDER BY breeding_date DESC",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(breeding_from_row)
        .collect()
    }

    async fn get_animal_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM herdbook.animals WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        let mut names = HashMap::with_capacity(rows.len());
        for row in rows {
            names.insert(row.try_get("id")?, row.try_get("name")?);
        }
        Ok(names)
    }
}

#[derive(Debug, serde::Deserialize)]
struct AnimalRow {
    id: Option<Uuid>,
    name: String,
    gender: String,
    #[serde(default)]
    species: String,
    #[serde(default)]
    breed: String,
    health_status: String,
    #[serde(default)]
    mother: Option<String>,
    #[serde(default)]
    father: Option<String>,
    #[serde(default)]
    maternal_grandmother: Option<String>,
    #[serde(default)]
    maternal_grandfather: Option<String>,
    #[serde(default)]
    paternal_grandmother: Option<String>,
    #[serde(default)]
    paternal_grandfather: Option<String>,
    #[serde(default)]
    maternal_grandmother_mother: Option<String>,
    #[serde(default)]
    maternal_grandmother_father: Option<String>,
    #[serde(default)]
    maternal_grandfather_mother: Option<String>,
    #[serde(default)]
    maternal_grandfather_father: Option<String>,
    #[serde(default)]
    paternal_grandmother_mother: Option<String>,
    #[serde(default)]
    paternal_grandmother_father: Option<String>,
    #[serde(default)]
    paternal_grandfather_mother: Option<String>,
    #[serde(default)]
    paternal_grandfather_father: Option<String>,
}

impl AnimalRow {
    fn into_animal(self) -> Result<Animal, StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::InvalidRecord("animal row without a name".to_string()));
        }
        let parse = |raw: Option<String>| AncestorRef::parse_opt(raw.as_deref());
        Ok(Animal {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            gender: self.gender.parse().unwrap_or(Gender::Unknown),
            health_status: self
                .health_status
                .parse()
                .unwrap_or(HealthStatus::Healthy),
            name: self.name,
            species: self.species,
            breed: self.breed,
            ancestry: AncestryLinks {
                mother: parse(self.mother),
                father: parse(self.father),
                maternal_grandmother: parse(self.maternal_grandmother),
                maternal_grandfather: parse(self.maternal_grandfather),
                paternal_grandmother: parse(self.paternal_grandmother),
                paternal_grandfather: parse(self.paternal_grandfather),
                great_grandparents: [
                    parse(self.maternal_grandmother_mother),
                    parse(self.maternal_grandmother_father),
                    parse(self.maternal_grandfather_mother),
                    parse(self.maternal_grandfather_father),
                    parse(self.paternal_grandmother_mother),
                    parse(self.paternal_grandmother_father),
                    parse(self.paternal_grandfather_mother),
                    parse(self.paternal_grandfather_father),
                ],
            },
        })
    }
}

pub async fn upsert_animal(pool: &PgPool, animal: &Animal) -> anyhow::Result<()> {
    let text = |link: &Option<AncestorRef>| link.as_ref().map(AncestorRef::as_text);
    let ancestry = &animal.ancestry;

    let mut query = sqlx::query(
        r#"
        INSERT INTO herdbook.animals
        (id, name, gender, species, breed, health_status,
         mother_id, father_id, maternal_grandmother, maternal_grandfather,
         paternal_grandmother, paternal_grandfather,
         maternal_grandmother_mother, maternal_grandmother_father,
         maternal_grandfather_mother, maternal_grandfather_father,
         paternal_grandmother_mother, paternal_grandmother_father,
         paternal_grandfather_mother, paternal_grandfather_father)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name, gender = EXCLUDED.gender,
            species = EXCLUDED.species, breed = EXCLUDED.breed,
            health_status = EXCLUDED.health_status,
            mother_id = EXCLUDED.mother_id, father_id = EXCLUDED.father_id,
            maternal_grandmother = EXCLUDED.maternal_grandmother,
            maternal_grandfather = EXCLUDED.maternal_grandfather,
            paternal_grandmother = EXCLUDED.paternal_grandmother,
            paternal_grandfather = EXCLUDED.paternal_grandfather,
            maternal_grandmother_mother = EXCLUDED.maternal_grandmother_mother,
            maternal_grandmother_father = EXCLUDED.maternal_grandmother_father,
            maternal_grandfather_mother = EXCLUDED.maternal_grandfather_mother,
            maternal_grandfather_father = EXCLUDED.maternal_grandfather_father,
            paternal_grandmother_mother = EXCLUDED.paternal_grandmother_mother,
            paternal_grandmother_father = EXCLUDED.paternal_grandmother_father,
            paternal_grandfather_mother = EXCLUDED.paternal_grandfather_mother,
            paternal_grandfather_father = EXCLUDED.paternal_grandfather_father
        "#,
    )
    .bind(animal.id)
    .bind(&animal.name)
    .bind(animal.gender.as_str())
    .bind(&animal.species)
    .bind(&animal.breed)
    .bind(animal.health_status.as_str())
    .bind(text(&ancestry.mother))
    .bind(text(&ancestry.father))
    .bind(text(&ancestry.maternal_grandmother))
    .bind(text(&ancestry.maternal_grandfather))
    .bind(text(&ancestry.paternal_grandmother))
    .bind(text(&ancestry.paternal_grandfather));

    for link in &ancestry.great_grandparents {
        query = query.bind(text(link));
    }

    query
        .execute(pool)
        .await
        .with_context(|| format!("failed to store animal {}", animal.name))?;
    Ok(())
}

pub async fn insert_breeding(
    pool: &PgPool,
    record: &BreedingRecord,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO herdbook.breeding_records
        (id, mother_id, father_id, breeding_date, pregnancy_confirmed,
         expected_due_date, actual_birth_date, status, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(record.id)
    .bind(record.mother_id)
    .bind(record.father_id)
    .bind(record.breeding_date)
    .bind(record.pregnancy_confirmed)
    .bind(record.expected_due_date)
    .bind(record.actual_birth_date)
    .bind(record.status.as_str())
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn import_animals_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut stored = 0usize;

    for result in reader.deserialize::<AnimalRow>() {
        let animal = result?.into_animal()?;
        upsert_animal(pool, &animal).await?;
        stored += 1;
    }

    info!(count = stored, path = %csv_path.display(), "animals imported");
    Ok(stored)
}

pub async fn import_breedings_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        mother_id: Uuid,
        father_id: Option<Uuid>,
        breeding_date: NaiveDate,
        pregnancy_confirmed: bool,
        expected_due_date: Option<NaiveDate>,
        actual_birth_date: Option<NaiveDate>,
        status: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let record = BreedingRecord {
            id: Uuid::new_v4(),
            mother_id: row.mother_id,
            father_id: row.father_id,
            breeding_date: row.breeding_date,
            pregnancy_confirmed: row.pregnancy_confirmed,
            expected_due_date: row.expected_due_date,
            actual_birth_date: row.actual_birth_date,
            status: row
                .status
                .parse()
                .unwrap_or(BreedingStatus::Other(row.status.clone())),
        };
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_breeding(pool, &record, &source_key).await? {
            inserted += 1;
        }
    }

    info!(count = inserted, path = %csv_path.display(), "breeding records imported");
    Ok(inserted)
}

/// Small horse herd with two lines sharing a sire and a few free-text ancestors.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let sultan = Uuid::parse_str("8a1f6c52-3b0e-4d7a-9f21-5c6e0d4b7a01")?;
    let starlight = Uuid::parse_str("8a1f6c52-3b0e-4d7a-9f21-5c6e0d4b7a02")?;
    let breeze = Uuid::parse_str("8a1f6c52-3b0e-4d7a-9f21-5c6e0d4b7a03")?;
    let thunder = Uuid::parse_str("8a1f6c52-3b0e-4d7a-9f21-5c6e0d4b7a04")?;
    let aurora = Uuid::parse_str("8a1f6c52-3b0e-4d7a-9f21-5c6e0d4b7a05")?;
    let comet = Uuid::parse_str("8a1f6c52-3b0e-4d7a-9f21-5c6e0d4b7a06")?;
    let juniper = Uuid::parse_str("8a1f6c52-3b0e-4d7a-9f21-5c6e0d4b7a07")?;

    let registered = AncestorRef::Registered;
    let external = |name: &str| Some(AncestorRef::External(name.to_string()));

    let herd = vec![
        (
            sultan,
            "Sultan",
            Gender::Male,
            HealthStatus::Healthy,
            external("Imperial"),
            external("Bonnie"),
        ),
        (starlight, "Starlight", Gender::Female, HealthStatus::Good, None, None),
        (breeze, "Breeze", Gender::Female, HealthStatus::Healthy, external("Willow"), None),
        (
            thunder,
            "Thunder",
            Gender::Male,
            HealthStatus::Healthy,
            Some(registered(starlight)),
            Some(registered(sultan)),
        ),
        (
            aurora,
            "Aurora",
            Gender::Female,
            HealthStatus::Good,
            Some(registered(breeze)),
            Some(registered(sultan)),
        ),
        (comet, "Comet", Gender::Male, HealthStatus::Healthy, external("Maple"), external("Duke")),
        (
            juniper,
            "Juniper",
            Gender::Female,
            HealthStatus::Recovering,
            Some(registered(aurora)),
            Some(registered(comet)),
        ),
    ];

    for (id, name, gender, health_status, mother, father) in herd {
        let animal = Animal {
            id,
            name: name.to_string(),
            gender,
            species: "horse".to_string(),
            breed: "Quarter Horse".to_string(),
            health_status,
            ancestry: AncestryLinks::parents(mother, father),
        };
        upsert_animal(pool, &animal).await?;
    }

    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).context("invalid date");
    let breedings = vec![
        ("seed-001", starlight, Some(sultan), date(2024, 4, 12)?, true, Some(date(2025, 3, 18)?), Some(date(2025, 3, 21)?), "birthed"),
        ("seed-002", breeze, Some(sultan), date(2024, 5, 3)?, true, Some(date(2025, 4, 8)?), Some(date(2025, 4, 2)?), "birthed"),
        ("seed-003", aurora, Some(comet), date(2025, 4, 20)?, true, Some(date(2026, 3, 26)?), None, "confirmed_pregnant"),
        ("seed-004", starlight, Some(comet), date(2025, 6, 9)?, false, None, None, "failed"),
        ("seed-005", breeze, Some(thunder), date(2026, 5, 14)?, false, None, None, "bred"),
    ];

    for (source_key, mother_id, father_id, breeding_date, pregnant, due, born, status) in breedings {
        let record = BreedingRecord {
            id: Uuid::new_v4(),
            mother_id,
            father_id,
            breeding_date,
            pregnancy_confirmed: pregnant,
            expected_due_date: due,
            actual_birth_date: born,
            status: status.parse().unwrap_or(BreedingStatus::Other(status.to_string())),
        };
        insert_breeding(pool, &record, source_key).await?;
    }

    Ok(())
}
