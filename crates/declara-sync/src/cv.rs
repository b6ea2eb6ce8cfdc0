use chrono::Utc;
use declara_adapters::ElectionSource;
use declara_core::{NewCvEntry, ReferenceKey, ReferenceKind};
use declara_storage::{
    insert_cv_entry_if_absent, resolve_or_create, CvImportFilter, CvImportTarget, Store,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::mapping::{map_curriculum_vitae, map_cv_entries};
use crate::{CvImportSummary, ImportResult};

/// Fetches and stores the CV of every selected on-list candidate, then
/// refreshes the CV's stored totals from its child rows.
pub struct CvImport<'a> {
    store: &'a dyn Store,
    source: &'a dyn ElectionSource,
}

impl<'a> CvImport<'a> {
    pub fn new(store: &'a dyn Store, source: &'a dyn ElectionSource) -> Self {
        Self { store, source }
    }

    pub async fn run(&self, filter: &CvImportFilter) -> ImportResult<CvImportSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "cv_import",
            %run_id,
            election = ?filter.election_source_id,
            election_type = ?filter.election_type_source_id
        );
        async move {
            let started_at = Utc::now();
            let targets = self.store.cv_import_targets(filter).await?;
            info!("Selected {} registered candidates", targets.len());

            let (mut imported, mut skipped, mut child_rows_created) = (0, 0, 0);
            for target in &targets {
                match self.import_candidate(target).await? {
                    Some(created) => {
                        imported += 1;
                        child_rows_created += created;
                    }
                    None => skipped += 1,
                }
            }

            info!(imported, skipped, child_rows_created, "cv import finished");
            Ok(CvImportSummary {
                run_id,
                started_at,
                finished_at: Utc::now(),
                selected: targets.len(),
                imported,
                skipped,
                child_rows_created,
            })
        }
        .instrument(span)
        .await
    }

    /// Imports one candidate's CV. Returns the number of child rows created,
    /// or `None` when the candidate has no CV to fetch.
    pub async fn import_candidate(&self, target: &CvImportTarget) -> ImportResult<Option<usize>> {
        let CvImportTarget {
            candidate,
            person,
            election_source_id,
            political_organization_source_id,
        } = target;
        let Some(cv_source_id) = candidate.cv_source_id else {
            warn!(
                candidate = candidate.source_id,
                "candidate has no CV identifier; skipping"
            );
            return Ok(None);
        };
        info!(
            "CANDIDATE FULLNAME={}; CV_JNE_ID={}",
            candidate.full_name, cv_source_id
        );

        let resume = self
            .source
            .resume(cv_source_id, *election_source_id, *political_organization_source_id)
            .await?;
        // Everything is typed before the first write so a malformed field
        // leaves no partial CV behind.
        let new_cv = map_curriculum_vitae(cv_source_id, &resume)?;
        let mapped = map_cv_entries(&resume)?;

        let mut cv = self
            .store
            .insert_curriculum_vitae_if_absent(&new_cv)
            .await?
            .into_inner();

        let mut candidate = candidate.clone();
        candidate.attach_cv(cv.id, person);
        self.store.save_candidate(&candidate).await?;

        let mut created = 0;
        for entry in &mapped.entries {
            if insert_cv_entry_if_absent(self.store, cv.id, entry).await? {
                created += 1;
            }
        }
        for draft in mapped.partisan_positions {
            let organization = resolve_or_create(
                self.store,
                ReferenceKind::PoliticalOrganization,
                ReferenceKey::SourceId(draft.organization_source_id),
                &draft.organization_name,
            )
            .await?
            .into_inner();
            let entry = NewCvEntry::PartisanPosition(draft.into_entry(organization.id));
            if insert_cv_entry_if_absent(self.store, cv.id, &entry).await? {
                created += 1;
            }
        }

        let aggregates = self.store.child_aggregates(cv.id).await?;
        cv.recompute_totals(&aggregates)?;
        self.store.save_curriculum_vitae_totals(&cv).await?;
        info!(
            cv = cv.source_id,
            child_rows_created = created,
            total_incomes = cv.totals.total_incomes,
            total_sentences = cv.totals.total_sentences,
            "cv imported"
        );
        Ok(Some(created))
    }
}
