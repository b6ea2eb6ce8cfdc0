//! In-process store used by tests and offline fixture runs.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use declara_core::{
    Candidate, CandidateQuery, CandidateRecord, ChildAggregates, CurriculumVitae, CvEntries,
    CvSection, ElectionProcess, ElectionProcessFields, NewCandidate, NewCurriculumVitae,
    NewCvEntry, NewPerson, Page, PartisanPositionEntry, Person, Reference, ReferenceKey,
    ReferenceKind, Stored, TotalsOverflow, Upserted,
};
use tokio::sync::Mutex;

use crate::{
    check_key, reference_table, section_table, CvImportFilter, CvImportTarget, Store, StoreError,
    StoreResult, TableCounts, TABLES,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    sequences: HashMap<&'static str, i64>,
    election_processes: Vec<ElectionProcess>,
    references: Vec<Reference>,
    process_types: BTreeSet<(i64, i64)>,
    process_type_organizations: BTreeSet<(i64, i64, i64)>,
    process_positions: BTreeSet<(i64, i64)>,
    process_districts: BTreeSet<(i64, i64)>,
    persons: Vec<Person>,
    candidates: Vec<Candidate>,
    curricula_vitae: Vec<CurriculumVitae>,
    entries: Vec<EntryRow>,
}

#[derive(Debug, Clone)]
struct EntryRow {
    id: i64,
    cv_id: i64,
    entry: NewCvEntry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let counter = self.sequences.entry(table).or_insert(0);
        *counter += 1;
        *counter
    }

    fn reference(&self, kind: ReferenceKind, id: i64) -> StoreResult<Reference> {
        self.references
            .iter()
            .find(|r| r.kind == kind && r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: reference_table(kind),
                id,
            })
    }

    fn record_for(&self, candidate: &Candidate) -> StoreResult<CandidateRecord> {
        let person = self
            .persons
            .iter()
            .find(|p| p.id == candidate.person_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "persons",
                id: candidate.person_id,
            })?;
        let electoral_district = match candidate.electoral_district_id {
            Some(id) => Some(self.reference(ReferenceKind::ElectoralDistrict, id)?),
            None => None,
        };
        let cv = candidate
            .cv_id
            .and_then(|id| self.curricula_vitae.iter().find(|cv| cv.id == id).cloned());
        Ok(CandidateRecord {
            candidate: candidate.clone(),
            person,
            election_type: self.reference(ReferenceKind::ElectionType, candidate.election_type_id)?,
            position: self.reference(ReferenceKind::Position, candidate.position_id)?,
            political_organization: self.reference(
                ReferenceKind::PoliticalOrganization,
                candidate.political_organization_id,
            )?,
            electoral_district,
            cv,
        })
    }

    fn entries_of(&self, cv_id: i64) -> impl Iterator<Item = &EntryRow> {
        self.entries.iter().filter(move |row| row.cv_id == cv_id)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_election_process(
        &self,
        source_id: i64,
        fields: &ElectionProcessFields,
    ) -> StoreResult<Upserted<ElectionProcess>> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .election_processes
            .iter_mut()
            .find(|p| p.source_id == source_id)
        {
            existing.fields = fields.clone();
            return Ok(Upserted::Existing(existing.clone()));
        }
        let process = ElectionProcess {
            id: state.next_id("election_processes"),
            source_id,
            fields: fields.clone(),
        };
        state.election_processes.push(process.clone());
        Ok(Upserted::Created(process))
    }

    async fn election_processes(&self) -> StoreResult<Vec<ElectionProcess>> {
        let state = self.state.lock().await;
        let mut processes = state.election_processes.clone();
        processes.sort_by_key(|p| p.id);
        Ok(processes)
    }

    async fn election_process(&self, id: i64) -> StoreResult<Option<ElectionProcess>> {
        let state = self.state.lock().await;
        Ok(state.election_processes.iter().find(|p| p.id == id).cloned())
    }

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        key: &ReferenceKey,
    ) -> StoreResult<Option<Reference>> {
        check_key(kind, key)?;
        let state = self.state.lock().await;
        Ok(state
            .references
            .iter()
            .find(|r| r.kind == kind && &r.key == key)
            .cloned())
    }

    async fn insert_reference_if_absent(
        &self,
        kind: ReferenceKind,
        key: &ReferenceKey,
        name: &str,
    ) -> StoreResult<Upserted<Reference>> {
        check_key(kind, key)?;
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .references
            .iter()
            .find(|r| r.kind == kind && &r.key == key)
        {
            return Ok(Upserted::Existing(existing.clone()));
        }
        let reference = Reference {
            id: state.next_id(reference_table(kind)),
            kind,
            key: key.clone(),
            name: name.to_string(),
        };
        state.references.push(reference.clone());
        Ok(Upserted::Created(reference))
    }

    async fn link_election_type(&self, election_id: i64, election_type_id: i64) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.process_types.insert((election_id, election_type_id));
        Ok(())
    }

    async fn link_position(&self, election_id: i64, position_id: i64) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.process_positions.insert((election_id, position_id));
        Ok(())
    }

    async fn link_district(&self, election_id: i64, district_id: i64) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.process_districts.insert((election_id, district_id));
        Ok(())
    }

    async fn link_political_organization(
        &self,
        election_id: i64,
        election_type_id: i64,
        political_organization_id: i64,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.process_types.contains(&(election_id, election_type_id)) {
            return Err(StoreError::NotFound {
                entity: "election_process_election_types",
                id: election_type_id,
            });
        }
        state
            .process_type_organizations
            .insert((election_id, election_type_id, political_organization_id));
        Ok(())
    }

    async fn election_references(
        &self,
        election_id: i64,
        kind: ReferenceKind,
    ) -> StoreResult<Vec<Reference>> {
        let state = self.state.lock().await;
        let links = match kind {
            ReferenceKind::ElectionType => &state.process_types,
            ReferenceKind::Position => &state.process_positions,
            ReferenceKind::ElectoralDistrict => &state.process_districts,
            ReferenceKind::PoliticalOrganization => {
                let mut ids: Vec<i64> = state
                    .process_type_organizations
                    .iter()
                    .filter(|(e, _, _)| *e == election_id)
                    .map(|(_, _, org)| *org)
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                return ids
                    .into_iter()
                    .map(|id| state.reference(kind, id))
                    .collect();
            }
        };
        let mut refs = links
            .iter()
            .filter(|(e, _)| *e == election_id)
            .map(|(_, id)| state.reference(kind, *id))
            .collect::<StoreResult<Vec<_>>>()?;
        refs.sort_by_key(|r| r.id);
        Ok(refs)
    }

    async fn election_type(
        &self,
        election_id: i64,
        election_type_id: i64,
    ) -> StoreResult<Option<Reference>> {
        let state = self.state.lock().await;
        if !state.process_types.contains(&(election_id, election_type_id)) {
            return Ok(None);
        }
        state
            .reference(ReferenceKind::ElectionType, election_type_id)
            .map(Some)
    }

    async fn election_type_organizations(
        &self,
        election_id: i64,
        election_type_id: i64,
    ) -> StoreResult<Option<Vec<Reference>>> {
        let state = self.state.lock().await;
        if !state.process_types.contains(&(election_id, election_type_id)) {
            return Ok(None);
        }
        let mut orgs = state
            .process_type_organizations
            .iter()
            .filter(|(e, t, _)| *e == election_id && *t == election_type_id)
            .map(|(_, _, org)| state.reference(ReferenceKind::PoliticalOrganization, *org))
            .collect::<StoreResult<Vec<_>>>()?;
        orgs.sort_by_key(|r| r.id);
        Ok(Some(orgs))
    }

    async fn find_person_by_dni(&self, dni: &str) -> StoreResult<Option<Person>> {
        let state = self.state.lock().await;
        Ok(state
            .persons
            .iter()
            .filter(|p| p.dni == dni)
            .min_by_key(|p| p.id)
            .cloned())
    }

    async fn insert_person(&self, person: &NewPerson) -> StoreResult<Person> {
        let mut state = self.state.lock().await;
        let stored = Person {
            id: state.next_id("persons"),
            dni: person.dni.clone(),
            first_name: person.first_name.clone(),
            surname: person.surname.clone(),
            second_surname: person.second_surname.clone(),
            birth_date: person.birth_date,
            gender: person.gender,
        };
        state.persons.push(stored.clone());
        Ok(stored)
    }

    async fn find_candidate(&self, source_id: i64) -> StoreResult<Option<Candidate>> {
        let state = self.state.lock().await;
        Ok(state
            .candidates
            .iter()
            .find(|c| c.source_id == source_id)
            .cloned())
    }

    async fn insert_candidate_if_absent(
        &self,
        candidate: &NewCandidate,
    ) -> StoreResult<Upserted<Candidate>> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .candidates
            .iter()
            .find(|c| c.source_id == candidate.source_id)
        {
            return Ok(Upserted::Existing(existing.clone()));
        }
        let stored = Candidate {
            id: state.next_id("candidates"),
            source_id: candidate.source_id,
            election_id: candidate.election_id,
            election_type_id: candidate.election_type_id,
            person_id: candidate.person_id,
            position_id: candidate.position_id,
            political_organization_id: candidate.political_organization_id,
            electoral_district_id: candidate.electoral_district_id,
            ballot_position: candidate.ballot_position,
            full_name: candidate.full_name.clone(),
            status_on_list: candidate.status_on_list.clone(),
            cv_source_id: candidate.cv_source_id,
            cv_id: None,
            photo_url_path: candidate.photo_url_path.clone(),
        };
        state.candidates.push(stored.clone());
        Ok(Upserted::Created(stored))
    }

    async fn save_candidate(&self, candidate: &Candidate) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .candidates
            .iter_mut()
            .find(|c| c.id == candidate.id)
            .ok_or(StoreError::NotFound {
                entity: "candidates",
                id: candidate.id,
            })?;
        stored.cv_id = candidate.cv_id;
        stored.full_name = candidate.full_name.clone();
        Ok(())
    }

    async fn cv_import_targets(&self, filter: &CvImportFilter) -> StoreResult<Vec<CvImportTarget>> {
        let state = self.state.lock().await;
        let mut targets = Vec::new();
        let mut candidates: Vec<&Candidate> =
            state.candidates.iter().filter(|c| c.is_on_list()).collect();
        candidates.sort_by_key(|c| c.id);
        for candidate in candidates {
            let election = state
                .election_processes
                .iter()
                .find(|p| p.id == candidate.election_id)
                .ok_or(StoreError::NotFound {
                    entity: "election_processes",
                    id: candidate.election_id,
                })?;
            let election_type =
                state.reference(ReferenceKind::ElectionType, candidate.election_type_id)?;
            if filter
                .election_source_id
                .is_some_and(|id| id != election.source_id)
            {
                continue;
            }
            if filter
                .election_type_source_id
                .is_some_and(|id| Some(id) != election_type.source_id())
            {
                continue;
            }
            let record = state.record_for(candidate)?;
            let political_organization_source_id = record
                .political_organization
                .source_id()
                .ok_or_else(|| StoreError::Corrupt("organization without source id".into()))?;
            targets.push(CvImportTarget {
                candidate: record.candidate,
                person: record.person,
                election_source_id: election.source_id,
                political_organization_source_id,
            });
        }
        Ok(targets)
    }

    async fn find_curriculum_vitae(&self, source_id: i64) -> StoreResult<Option<CurriculumVitae>> {
        let state = self.state.lock().await;
        Ok(state
            .curricula_vitae
            .iter()
            .find(|cv| cv.source_id == source_id)
            .cloned())
    }

    async fn insert_curriculum_vitae_if_absent(
        &self,
        cv: &NewCurriculumVitae,
    ) -> StoreResult<Upserted<CurriculumVitae>> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .curricula_vitae
            .iter()
            .find(|c| c.source_id == cv.source_id)
        {
            return Ok(Upserted::Existing(existing.clone()));
        }
        let stored = CurriculumVitae {
            id: state.next_id("curricula_vitae"),
            source_id: cv.source_id,
            profile: cv.profile.clone(),
            incomes: cv.incomes.clone(),
            totals: cv.initial_totals()?,
        };
        state.curricula_vitae.push(stored.clone());
        Ok(Upserted::Created(stored))
    }

    async fn save_curriculum_vitae_totals(&self, cv: &CurriculumVitae) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .curricula_vitae
            .iter_mut()
            .find(|c| c.id == cv.id)
            .ok_or(StoreError::NotFound {
                entity: "curricula_vitae",
                id: cv.id,
            })?;
        stored.totals = cv.totals;
        Ok(())
    }

    async fn cv_entry_exists(
        &self,
        cv_id: i64,
        section: CvSection,
        source_id: i64,
    ) -> StoreResult<bool> {
        let state = self.state.lock().await;
        let found = state
            .entries_of(cv_id)
            .any(|row| row.entry.section() == section && row.entry.source_id() == source_id);
        Ok(found)
    }

    async fn insert_cv_entry(&self, cv_id: i64, entry: &NewCvEntry) -> StoreResult<i64> {
        let mut state = self.state.lock().await;
        if !state.curricula_vitae.iter().any(|cv| cv.id == cv_id) {
            return Err(StoreError::NotFound {
                entity: "curricula_vitae",
                id: cv_id,
            });
        }
        let section = entry.section();
        let table = section_table(section);
        if state
            .entries
            .iter()
            .any(|row| row.entry.section() == section && row.entry.source_id() == entry.source_id())
        {
            return Err(StoreError::Conflict {
                table,
                key: entry.source_id().to_string(),
            });
        }
        if let NewCvEntry::PartisanPosition(position) = entry {
            state.reference(
                ReferenceKind::PoliticalOrganization,
                position.political_organization_id,
            )?;
        }
        let id = state.next_id(table);
        state.entries.push(EntryRow {
            id,
            cv_id,
            entry: entry.clone(),
        });
        Ok(id)
    }

    async fn child_aggregates(&self, cv_id: i64) -> StoreResult<ChildAggregates> {
        let state = self.state.lock().await;
        let mut aggregates = ChildAggregates::default();
        for row in state.entries_of(cv_id) {
            match &row.entry {
                NewCvEntry::MovableProperty(p) => {
                    aggregates.movable_properties_value = aggregates
                        .movable_properties_value
                        .checked_add(p.value)
                        .ok_or(TotalsOverflow("total_movable_properties_value"))?;
                }
                NewCvEntry::ImmovableProperty(p) => {
                    aggregates.immovable_properties_value = aggregates
                        .immovable_properties_value
                        .checked_add(p.value)
                        .ok_or(TotalsOverflow("total_immovable_properties_value"))?;
                }
                NewCvEntry::PenalSentence(_) => aggregates.penal_sentences += 1,
                NewCvEntry::ObligationSentence(_) => aggregates.obligation_sentences += 1,
                _ => {}
            }
        }
        Ok(aggregates)
    }

    async fn cv_entries(&self, cv_id: i64) -> StoreResult<CvEntries> {
        let state = self.state.lock().await;
        let mut entries = CvEntries::default();
        let mut rows: Vec<&EntryRow> = state.entries_of(cv_id).collect();
        rows.sort_by_key(|row| row.id);
        for row in rows {
            let (id, cv_id) = (row.id, row.cv_id);
            match row.entry.clone() {
                NewCvEntry::PenalSentence(record) => {
                    entries.penal_sentences.push(Stored { id, cv_id, record })
                }
                NewCvEntry::ObligationSentence(record) => {
                    entries.obligation_sentences.push(Stored { id, cv_id, record })
                }
                NewCvEntry::ProfessionalExperience(record) => entries
                    .professional_experiences
                    .push(Stored { id, cv_id, record }),
                NewCvEntry::UniversityEducation(record) => {
                    entries.university_educations.push(Stored { id, cv_id, record })
                }
                NewCvEntry::PostgraduateEducation(record) => entries
                    .postgraduate_educations
                    .push(Stored { id, cv_id, record }),
                NewCvEntry::MovableProperty(record) => {
                    entries.movable_properties.push(Stored { id, cv_id, record })
                }
                NewCvEntry::ImmovableProperty(record) => {
                    entries.immovable_properties.push(Stored { id, cv_id, record })
                }
                NewCvEntry::PartisanPosition(record) => {
                    let political_organization = state.reference(
                        ReferenceKind::PoliticalOrganization,
                        record.political_organization_id,
                    )?;
                    entries.partisan_positions.push(PartisanPositionEntry {
                        entry: Stored { id, cv_id, record },
                        political_organization,
                    });
                }
            }
        }
        Ok(entries)
    }

    async fn list_candidates(
        &self,
        election_id: i64,
        query: &CandidateQuery,
    ) -> StoreResult<Page<CandidateRecord>> {
        let state = self.state.lock().await;
        let mut records = state
            .candidates
            .iter()
            .filter(|c| c.election_id == election_id && c.is_on_list())
            .filter(|c| {
                query
                    .election_type_id
                    .map_or(true, |id| c.election_type_id == id)
            })
            .filter(|c| {
                query
                    .political_organization_id
                    .map_or(true, |id| c.political_organization_id == id)
            })
            .map(|c| state.record_for(c))
            .collect::<StoreResult<Vec<_>>>()?;

        records.sort_by(|a, b| {
            let by_metric = match &query.ordering {
                Some(ordering) => ordering.compare(
                    a.cv.as_ref().map(|cv| &cv.totals),
                    b.cv.as_ref().map(|cv| &cv.totals),
                ),
                None => std::cmp::Ordering::Equal,
            };
            by_metric.then(a.candidate.id.cmp(&b.candidate.id))
        });

        let count = records.len();
        let (page, total_pages, offset) = query.page.resolve(count);
        let results = records
            .into_iter()
            .skip(offset)
            .take(query.page.page_size)
            .collect();
        Ok(Page {
            count,
            page,
            page_size: query.page.page_size,
            total_pages,
            results,
        })
    }

    async fn candidate_record(
        &self,
        election_id: i64,
        candidate_id: i64,
    ) -> StoreResult<Option<CandidateRecord>> {
        let state = self.state.lock().await;
        state
            .candidates
            .iter()
            .find(|c| c.id == candidate_id && c.election_id == election_id && c.is_on_list())
            .map(|c| state.record_for(c))
            .transpose()
    }

    async fn table_counts(&self) -> StoreResult<TableCounts> {
        let state = self.state.lock().await;
        let mut counts = TableCounts::default();
        for table in TABLES {
            counts.tables.insert(table.to_string(), 0);
        }
        let mut set = |table: &str, n: usize| {
            counts.tables.insert(table.to_string(), n as i64);
        };
        set("election_processes", state.election_processes.len());
        for kind in ReferenceKind::ALL {
            set(
                reference_table(kind),
                state.references.iter().filter(|r| r.kind == kind).count(),
            );
        }
        set("election_process_election_types", state.process_types.len());
        set(
            "election_process_election_type_organizations",
            state.process_type_organizations.len(),
        );
        set("election_process_positions", state.process_positions.len());
        set("election_process_districts", state.process_districts.len());
        set("persons", state.persons.len());
        set("curricula_vitae", state.curricula_vitae.len());
        set("candidates", state.candidates.len());
        for section in CvSection::ALL {
            set(
                section_table(section),
                state
                    .entries
                    .iter()
                    .filter(|row| row.entry.section() == section)
                    .count(),
            );
        }
        Ok(counts)
    }
}
