//! Relational entity store for election processes, candidates and their CVs.
//!
//! Every create-only entity is written through an insert-if-absent primitive
//! that hands back the existing row untouched; there is no update path for
//! reference rows, persons, or CV child records.

use std::collections::BTreeMap;

use async_trait::async_trait;
use declara_core::{
    Candidate, CandidateQuery, CandidateRecord, ChildAggregates, CurriculumVitae, CvEntries,
    CvSection, ElectionProcess, ElectionProcessFields, NewCandidate, NewCurriculumVitae,
    NewCvEntry, NewPerson, Page, Person, Reference, ReferenceKey, ReferenceKind, TotalsOverflow,
    Upserted,
};
use serde::Serialize;
use thiserror::Error;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgStore, StorageConfig};

pub const CRATE_NAME: &str = "declara-storage";

/// Every table the store owns, in dependency order.
pub const TABLES: [&str; 20] = [
    "election_processes",
    "election_types",
    "positions",
    "electoral_districts",
    "political_organizations",
    "election_process_election_types",
    "election_process_election_type_organizations",
    "election_process_positions",
    "election_process_districts",
    "persons",
    "curricula_vitae",
    "candidates",
    "penal_sentences",
    "obligation_sentences",
    "professional_experiences",
    "university_educations",
    "postgraduate_educations",
    "movable_properties",
    "immovable_properties",
    "partisan_positions",
];

pub fn reference_table(kind: ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::ElectionType => "election_types",
        ReferenceKind::Position => "positions",
        ReferenceKind::ElectoralDistrict => "electoral_districts",
        ReferenceKind::PoliticalOrganization => "political_organizations",
    }
}

pub fn section_table(section: CvSection) -> &'static str {
    section.name()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("integrity error: {table} already holds a row keyed {key}")]
    Conflict { table: &'static str, key: String },
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: i64 },
    #[error("reference key {key} does not fit {kind:?}")]
    KeyMismatch { kind: ReferenceKind, key: ReferenceKey },
    #[error("stored value is invalid: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Totals(#[from] TotalsOverflow),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Selects the candidates a CV import run works on. Identifiers are the
/// source's, as an operator types them on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CvImportFilter {
    pub election_source_id: Option<i64>,
    pub election_type_source_id: Option<i64>,
}

/// An on-list candidate plus the source identifiers its CV is fetched by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvImportTarget {
    pub candidate: Candidate,
    pub person: Person,
    pub election_source_id: i64,
    pub political_organization_source_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct TableCounts {
    pub tables: BTreeMap<String, i64>,
}

impl TableCounts {
    pub fn get(&self, table: &str) -> i64 {
        self.tables.get(table).copied().unwrap_or(0)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Creates the process or overwrites name and dates of the existing one.
    async fn upsert_election_process(
        &self,
        source_id: i64,
        fields: &ElectionProcessFields,
    ) -> StoreResult<Upserted<ElectionProcess>>;
    async fn election_processes(&self) -> StoreResult<Vec<ElectionProcess>>;
    async fn election_process(&self, id: i64) -> StoreResult<Option<ElectionProcess>>;

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        key: &ReferenceKey,
    ) -> StoreResult<Option<Reference>>;
    async fn insert_reference_if_absent(
        &self,
        kind: ReferenceKind,
        key: &ReferenceKey,
        name: &str,
    ) -> StoreResult<Upserted<Reference>>;

    async fn link_election_type(&self, election_id: i64, election_type_id: i64) -> StoreResult<()>;
    async fn link_position(&self, election_id: i64, position_id: i64) -> StoreResult<()>;
    async fn link_district(&self, election_id: i64, district_id: i64) -> StoreResult<()>;
    /// Registers an organization under an already linked (process, type) pair.
    async fn link_political_organization(
        &self,
        election_id: i64,
        election_type_id: i64,
        political_organization_id: i64,
    ) -> StoreResult<()>;

    /// Election types, positions or districts associated with a process,
    /// ordered by id. Political organizations are per type; see
    /// [`Store::election_type_organizations`].
    async fn election_references(
        &self,
        election_id: i64,
        kind: ReferenceKind,
    ) -> StoreResult<Vec<Reference>>;
    /// `None` when the type is not associated with the process.
    async fn election_type(
        &self,
        election_id: i64,
        election_type_id: i64,
    ) -> StoreResult<Option<Reference>>;
    async fn election_type_organizations(
        &self,
        election_id: i64,
        election_type_id: i64,
    ) -> StoreResult<Option<Vec<Reference>>>;

    /// Earliest person recorded under a document number.
    async fn find_person_by_dni(&self, dni: &str) -> StoreResult<Option<Person>>;
    async fn insert_person(&self, person: &NewPerson) -> StoreResult<Person>;

    async fn find_candidate(&self, source_id: i64) -> StoreResult<Option<Candidate>>;
    async fn insert_candidate_if_absent(
        &self,
        candidate: &NewCandidate,
    ) -> StoreResult<Upserted<Candidate>>;
    /// Persists the mutable part of a candidate: its CV link and cached name.
    async fn save_candidate(&self, candidate: &Candidate) -> StoreResult<()>;
    async fn cv_import_targets(&self, filter: &CvImportFilter) -> StoreResult<Vec<CvImportTarget>>;

    async fn find_curriculum_vitae(&self, source_id: i64) -> StoreResult<Option<CurriculumVitae>>;
    async fn insert_curriculum_vitae_if_absent(
        &self,
        cv: &NewCurriculumVitae,
    ) -> StoreResult<Upserted<CurriculumVitae>>;
    /// Persists the derived totals of a CV; source-provided fields stay as stored.
    async fn save_curriculum_vitae_totals(&self, cv: &CurriculumVitae) -> StoreResult<()>;

    async fn cv_entry_exists(
        &self,
        cv_id: i64,
        section: CvSection,
        source_id: i64,
    ) -> StoreResult<bool>;
    /// Inserts a child row. A row with the same source id under another CV is
    /// an integrity error.
    async fn insert_cv_entry(&self, cv_id: i64, entry: &NewCvEntry) -> StoreResult<i64>;
    async fn child_aggregates(&self, cv_id: i64) -> StoreResult<ChildAggregates>;
    async fn cv_entries(&self, cv_id: i64) -> StoreResult<CvEntries>;

    /// On-list candidates of one election, filtered, ordered and paginated.
    async fn list_candidates(
        &self,
        election_id: i64,
        query: &CandidateQuery,
    ) -> StoreResult<Page<CandidateRecord>>;
    /// A single on-list candidate of one election.
    async fn candidate_record(
        &self,
        election_id: i64,
        candidate_id: i64,
    ) -> StoreResult<Option<CandidateRecord>>;

    async fn table_counts(&self) -> StoreResult<TableCounts>;
}

/// Returns the row keyed by `key`, creating it with `name` when absent.
pub async fn resolve_or_create(
    store: &dyn Store,
    kind: ReferenceKind,
    key: ReferenceKey,
    name: &str,
) -> StoreResult<Upserted<Reference>> {
    if let Some(existing) = store.find_reference(kind, &key).await? {
        return Ok(Upserted::Existing(existing));
    }
    store.insert_reference_if_absent(kind, &key, name).await
}

/// Returns the person recorded under `person.dni`, creating it when absent.
/// Existing name, birth and gender fields are never overwritten.
pub async fn resolve_person(store: &dyn Store, person: &NewPerson) -> StoreResult<Upserted<Person>> {
    if let Some(existing) = store.find_person_by_dni(&person.dni).await? {
        return Ok(Upserted::Existing(existing));
    }
    Ok(Upserted::Created(store.insert_person(person).await?))
}

/// Inserts a child row unless the CV already owns one with that source id.
pub async fn insert_cv_entry_if_absent(
    store: &dyn Store,
    cv_id: i64,
    entry: &NewCvEntry,
) -> StoreResult<bool> {
    if store
        .cv_entry_exists(cv_id, entry.section(), entry.source_id())
        .await?
    {
        return Ok(false);
    }
    store.insert_cv_entry(cv_id, entry).await?;
    Ok(true)
}

fn check_key(kind: ReferenceKind, key: &ReferenceKey) -> StoreResult<()> {
    let fits = matches!(
        (kind, key),
        (ReferenceKind::ElectoralDistrict, ReferenceKey::Ubigeo(_))
            | (ReferenceKind::ElectionType, ReferenceKey::SourceId(_))
            | (ReferenceKind::Position, ReferenceKey::SourceId(_))
            | (ReferenceKind::PoliticalOrganization, ReferenceKey::SourceId(_))
    );
    if fits {
        Ok(())
    } else {
        Err(StoreError::KeyMismatch {
            kind,
            key: key.clone(),
        })
    }
}
