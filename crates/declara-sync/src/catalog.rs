use chrono::Utc;
use declara_adapters::{parse_int, text, CandidateItem, ElectionSource, FileOnListItem, SourceItem};
use declara_core::{
    ElectionProcess, ListStatus, NewCandidate, Reference, ReferenceKey, ReferenceKind, Upserted,
};
use declara_storage::{resolve_or_create, resolve_person, Store};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::mapping::{
    candidate_ballot_position, candidate_cv_source_id, map_election_process, map_person,
};
use crate::{CatalogImportSummary, ImportPolicy, ImportResult};

/// Walks processes → election types → files on list → candidates and
/// mirrors them into the store. Sequential; the first error aborts the run.
pub struct CatalogImport<'a> {
    store: &'a dyn Store,
    source: &'a dyn ElectionSource,
    policy: ImportPolicy,
}

#[derive(Debug, Default)]
struct Counters {
    processes: usize,
    election_types: usize,
    files: usize,
    candidates_seen: usize,
    candidates_created: usize,
    persons_created: usize,
    references_created: usize,
}

impl Counters {
    /// Logs the CREATED / ALREADY_EXIST progress line for a reference row.
    fn reference(&mut self, kind: ReferenceKind, row: &Upserted<Reference>) {
        info!("{}: {}: {}", row.label(), kind.label(), row.get().name);
        if row.was_created() {
            self.references_created += 1;
        }
    }
}

/// Context shared by every candidate of one file on list.
struct FileScope<'r> {
    election: &'r ElectionProcess,
    election_type: &'r Reference,
    political_organization: Reference,
    electoral_district: Option<Reference>,
}

impl<'a> CatalogImport<'a> {
    pub fn new(store: &'a dyn Store, source: &'a dyn ElectionSource, policy: ImportPolicy) -> Self {
        Self {
            store,
            source,
            policy,
        }
    }

    pub async fn run(&self) -> ImportResult<CatalogImportSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("catalog_import", %run_id, source = self.source.name());
        async move {
            let started_at = Utc::now();
            let mut counters = Counters::default();

            for item in self.source.election_processes().await? {
                if item.is_placeholder() {
                    continue;
                }
                let source_id = parse_int("idProcesoElectoral", &item.id)?;
                if !self.policy.allows(source_id) {
                    info!(source_id, "election process not in the allow-list; skipping");
                    continue;
                }
                let fields = map_election_process(&item)?;
                info!(source_id, name = %fields.name, "importing election process");
                let election = self
                    .store
                    .upsert_election_process(source_id, &fields)
                    .await?
                    .into_inner();
                counters.processes += 1;
                self.import_election(&election, &mut counters).await?;
            }

            let finished_at = Utc::now();
            info!(
                processes = counters.processes,
                candidates = counters.candidates_seen,
                created = counters.candidates_created,
                "catalog import finished"
            );
            Ok(CatalogImportSummary {
                run_id,
                started_at,
                finished_at,
                processes: counters.processes,
                election_types: counters.election_types,
                files: counters.files,
                candidates_seen: counters.candidates_seen,
                candidates_created: counters.candidates_created,
                persons_created: counters.persons_created,
                references_created: counters.references_created,
            })
        }
        .instrument(span)
        .await
    }

    async fn import_election(
        &self,
        election: &ElectionProcess,
        counters: &mut Counters,
    ) -> ImportResult<()> {
        for item in self.source.election_types(election.source_id).await? {
            if item.is_placeholder() {
                continue;
            }
            let type_source_id = parse_int("idTipoEleccion", &item.id)?;
            let election_type = resolve_or_create(
                self.store,
                ReferenceKind::ElectionType,
                ReferenceKey::SourceId(type_source_id),
                &text(&item.name),
            )
            .await?;
            counters.reference(ReferenceKind::ElectionType, &election_type);
            let election_type = election_type.into_inner();
            self.store
                .link_election_type(election.id, election_type.id)
                .await?;
            counters.election_types += 1;

            let files = self
                .source
                .files_on_list(election.source_id, type_source_id)
                .await?;
            info!(count = files.len(), "importing files on list");
            for file in files.iter().filter(|file| !file.is_placeholder()) {
                self.import_file(election, &election_type, type_source_id, file, counters)
                    .await?;
            }
        }
        Ok(())
    }

    async fn import_file(
        &self,
        election: &ElectionProcess,
        election_type: &Reference,
        type_source_id: i64,
        file: &FileOnListItem,
        counters: &mut Counters,
    ) -> ImportResult<()> {
        let file_id = parse_int("idExpediente", &file.file_id)?;
        info!(file_id, "importing file on list");
        counters.files += 1;

        let organization = resolve_or_create(
            self.store,
            ReferenceKind::PoliticalOrganization,
            ReferenceKey::SourceId(parse_int("idOrganizacionPolitica", &file.organization_id)?),
            &text(&file.organization_name),
        )
        .await?;
        counters.reference(ReferenceKind::PoliticalOrganization, &organization);
        let political_organization = organization.into_inner();
        self.store
            .link_political_organization(election.id, election_type.id, political_organization.id)
            .await?;

        let ubigeo = text(&file.ubigeo).trim().to_string();
        let electoral_district = if ubigeo.is_empty() {
            None
        } else {
            let district = resolve_or_create(
                self.store,
                ReferenceKind::ElectoralDistrict,
                ReferenceKey::Ubigeo(ubigeo),
                &text(&file.district_name),
            )
            .await?;
            counters.reference(ReferenceKind::ElectoralDistrict, &district);
            let district = district.into_inner();
            self.store.link_district(election.id, district.id).await?;
            Some(district)
        };

        let list_request_id = parse_int("idSolicitudLista", &file.list_request_id)?;
        let candidates = self
            .source
            .candidates(election.source_id, type_source_id, list_request_id, file_id)
            .await?;
        let scope = FileScope {
            election,
            election_type,
            political_organization,
            electoral_district,
        };
        for item in candidates {
            if item.is_placeholder() {
                continue;
            }
            self.import_candidate(&scope, &item, counters).await?;
        }
        Ok(())
    }

    async fn import_candidate(
        &self,
        scope: &FileScope<'_>,
        item: &CandidateItem,
        counters: &mut Counters,
    ) -> ImportResult<()> {
        counters.candidates_seen += 1;
        info!(candidate = %text(&item.display_name), "importing candidate");

        let person = resolve_person(self.store, &map_person(item)?).await?;
        if person.was_created() {
            counters.persons_created += 1;
        }
        let person = person.into_inner();

        let position = resolve_or_create(
            self.store,
            ReferenceKind::Position,
            ReferenceKey::SourceId(parse_int("idCargoEleccion", &item.position_id)?),
            &text(&item.position_name),
        )
        .await?;
        counters.reference(ReferenceKind::Position, &position);
        let position = position.into_inner();
        self.store
            .link_position(scope.election.id, position.id)
            .await?;

        let candidate = NewCandidate {
            source_id: parse_int("idCandidato", &item.id)?,
            election_id: scope.election.id,
            election_type_id: scope.election_type.id,
            person_id: person.id,
            position_id: position.id,
            political_organization_id: scope.political_organization.id,
            electoral_district_id: scope.electoral_district.as_ref().map(|d| d.id),
            ballot_position: candidate_ballot_position(item)?,
            full_name: person.full_name(),
            status_on_list: ListStatus::from(text(&item.status)),
            cv_source_id: candidate_cv_source_id(item)?,
            photo_url_path: text(&item.photo_path),
        };
        let created = self.store.insert_candidate_if_absent(&candidate).await?;
        info!(
            "{}: Candidate: {} ({})",
            created.label(),
            created.get().full_name,
            created.get().source_id
        );
        if created.was_created() {
            counters.candidates_created += 1;
        }
        Ok(())
    }
}
