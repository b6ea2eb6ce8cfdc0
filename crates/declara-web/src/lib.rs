//! Read-only JSON API over elections, candidates and their CVs.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use declara_core::{
    CandidateOrdering, CandidateQuery, CvEntries, ElectionProcess, Page, PageRequest,
    ReferenceKind,
};
use declara_storage::{PgStore, StorageConfig, Store, StoreError};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod dto;

use dto::{
    CandidateDetailDto, CandidateDto, DistrictDto, ElectionDto, NamedReferenceDto, ReferenceDto,
};

pub const CRATE_NAME: &str = "declara-web";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Store(err) => {
                error!("store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/elections", get(elections_handler))
        .route("/api/elections/{election_id}", get(election_handler))
        .route("/api/elections/{election_id}/positions", get(positions_handler))
        .route(
            "/api/elections/{election_id}/electoral_districts",
            get(districts_handler),
        )
        .route(
            "/api/elections/{election_id}/election_types",
            get(election_types_handler),
        )
        .route(
            "/api/elections/{election_id}/election_types/{type_id}",
            get(election_type_handler),
        )
        .route(
            "/api/elections/{election_id}/election_types/{type_id}/political_organizations",
            get(political_organizations_handler),
        )
        .route(
            "/api/elections/{election_id}/candidates",
            get(candidates_handler),
        )
        .route(
            "/api/elections/{election_id}/candidates/{candidate_id}",
            get(candidate_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let port: u16 = std::env::var("DECLARA_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let store = PgStore::connect(&StorageConfig::from_env())
        .await
        .context("connecting to the database")?;
    let state = AppState::new(Arc::new(store));
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding port {port}"))?;
    info!(port, "serving read api");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Path ids that are not integers name nothing, so they read as not found.
fn path_id(raw: &str, entity: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("{entity} {raw} not found")))
}

fn query_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("invalid value for {name}: {value:?}"))),
    }
}

async fn election_or_404(store: &dyn Store, raw_id: &str) -> Result<ElectionProcess, ApiError> {
    let id = path_id(raw_id, "election")?;
    store
        .election_process(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("election {id} not found")))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn elections_handler(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ElectionDto>> {
    let elections = state.store.election_processes().await?;
    Ok(Json(elections.into_iter().map(ElectionDto::from).collect()))
}

async fn election_handler(
    State(state): State<Arc<AppState>>,
    Path(election_id): Path<String>,
) -> ApiResult<ElectionDto> {
    let election = election_or_404(state.store.as_ref(), &election_id).await?;
    Ok(Json(election.into()))
}

async fn positions_handler(
    State(state): State<Arc<AppState>>,
    Path(election_id): Path<String>,
) -> ApiResult<Vec<NamedReferenceDto>> {
    let election = election_or_404(state.store.as_ref(), &election_id).await?;
    let positions = state
        .store
        .election_references(election.id, ReferenceKind::Position)
        .await?;
    Ok(Json(positions.iter().map(NamedReferenceDto::from).collect()))
}

async fn districts_handler(
    State(state): State<Arc<AppState>>,
    Path(election_id): Path<String>,
) -> ApiResult<Vec<DistrictDto>> {
    let election = election_or_404(state.store.as_ref(), &election_id).await?;
    let districts = state
        .store
        .election_references(election.id, ReferenceKind::ElectoralDistrict)
        .await?;
    Ok(Json(districts.iter().map(DistrictDto::from).collect()))
}

async fn election_types_handler(
    State(state): State<Arc<AppState>>,
    Path(election_id): Path<String>,
) -> ApiResult<Vec<ReferenceDto>> {
    let election = election_or_404(state.store.as_ref(), &election_id).await?;
    let types = state
        .store
        .election_references(election.id, ReferenceKind::ElectionType)
        .await?;
    Ok(Json(types.iter().map(ReferenceDto::from).collect()))
}

async fn election_type_handler(
    State(state): State<Arc<AppState>>,
    Path((election_id, type_id)): Path<(String, String)>,
) -> ApiResult<ReferenceDto> {
    let election = election_or_404(state.store.as_ref(), &election_id).await?;
    let type_id = path_id(&type_id, "election type")?;
    let election_type = state
        .store
        .election_type(election.id, type_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("election type {type_id} not found")))?;
    Ok(Json((&election_type).into()))
}

async fn political_organizations_handler(
    State(state): State<Arc<AppState>>,
    Path((election_id, type_id)): Path<(String, String)>,
) -> ApiResult<Vec<NamedReferenceDto>> {
    let election = election_or_404(state.store.as_ref(), &election_id).await?;
    let type_id = path_id(&type_id, "election type")?;
    let organizations = state
        .store
        .election_type_organizations(election.id, type_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("election type {type_id} not found")))?;
    Ok(Json(organizations.iter().map(NamedReferenceDto::from).collect()))
}

/// Raw list parameters; typed by hand so bad values answer 400 with a JSON body.
#[derive(Debug, Default, Deserialize)]
pub struct CandidateListParams {
    pub et: Option<String>,
    pub po: Option<String>,
    pub o: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl CandidateListParams {
    pub fn to_query(&self) -> Result<CandidateQuery, ApiError> {
        Ok(CandidateQuery {
            election_type_id: query_param("et", self.et.as_deref())?,
            political_organization_id: query_param("po", self.po.as_deref())?,
            ordering: match self.o.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                None => None,
                Some(code) => Some(
                    code.parse::<CandidateOrdering>()
                        .map_err(|err| ApiError::BadRequest(err.to_string()))?,
                ),
            },
            page: PageRequest::new(
                query_param("page", self.page.as_deref())?,
                query_param("page_size", self.page_size.as_deref())?,
            ),
        })
    }
}

async fn candidates_handler(
    State(state): State<Arc<AppState>>,
    Path(election_id): Path<String>,
    Query(params): Query<CandidateListParams>,
) -> ApiResult<Page<CandidateDto>> {
    let election = election_or_404(state.store.as_ref(), &election_id).await?;
    let query = params.to_query()?;
    let page = state.store.list_candidates(election.id, &query).await?;
    Ok(Json(page.map(|record| CandidateDto::from(&record))))
}

async fn candidate_handler(
    State(state): State<Arc<AppState>>,
    Path((election_id, candidate_id)): Path<(String, String)>,
) -> ApiResult<CandidateDetailDto> {
    let election = election_or_404(state.store.as_ref(), &election_id).await?;
    let candidate_id = path_id(&candidate_id, "candidate")?;
    let record = state
        .store
        .candidate_record(election.id, candidate_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("candidate {candidate_id} not found")))?;
    let entries = match &record.cv {
        Some(cv) => state.store.cv_entries(cv.id).await?,
        None => CvEntries::default(),
    };
    Ok(Json(CandidateDetailDto::new(&record, &entries)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use declara_core::{
        ElectionProcessFields, Gender, Incomes, ListStatus, MovableProperty, NewCandidate,
        NewCurriculumVitae, NewCvEntry, NewPerson, PartisanPosition, PenalSentence, ReferenceKey,
    };
    use declara_storage::{resolve_or_create, resolve_person, MemoryStore};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    struct Fixture {
        router: Router,
        election_id: i64,
        president_id: i64,
        congress_id: i64,
        morado_id: i64,
        alianza_id: i64,
        /// Candidate ids keyed by source id.
        candidates: Vec<(i64, i64)>,
    }

    impl Fixture {
        fn candidate(&self, source_id: i64) -> i64 {
            self.candidates
                .iter()
                .find(|(s, _)| *s == source_id)
                .map(|(_, id)| *id)
                .unwrap()
        }
    }

    async fn reference(store: &MemoryStore, kind: ReferenceKind, key: ReferenceKey, name: &str) -> i64 {
        resolve_or_create(store, kind, key, name)
            .await
            .unwrap()
            .into_inner()
            .id
    }

    struct Seat {
        source_id: i64,
        dni: &'static str,
        election_type_id: i64,
        organization_id: i64,
        district_id: Option<i64>,
        status: &'static str,
        income: Option<i64>,
        penal: i64,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let election = store
            .upsert_election_process(
                110,
                &ElectionProcessFields {
                    name: "ELECCIONES GENERALES 2021".into(),
                    ..ElectionProcessFields::default()
                },
            )
            .await
            .unwrap()
            .into_inner();
        let president_id = reference(&store, ReferenceKind::ElectionType, ReferenceKey::SourceId(1), "PRESIDENCIAL").await;
        let congress_id = reference(&store, ReferenceKind::ElectionType, ReferenceKey::SourceId(3), "CONGRESAL").await;
        let morado_id = reference(&store, ReferenceKind::PoliticalOrganization, ReferenceKey::SourceId(1366), "PARTIDO MORADO").await;
        let alianza_id = reference(&store, ReferenceKind::PoliticalOrganization, ReferenceKey::SourceId(1400), "ALIANZA DEMO").await;
        let position_id = reference(&store, ReferenceKind::Position, ReferenceKey::SourceId(4), "CONGRESISTA").await;
        let lima_id = reference(&store, ReferenceKind::ElectoralDistrict, ReferenceKey::Ubigeo("140100".into()), "LIMA").await;

        for type_id in [president_id, congress_id] {
            store.link_election_type(election.id, type_id).await.unwrap();
        }
        store.link_political_organization(election.id, president_id, morado_id).await.unwrap();
        store.link_political_organization(election.id, congress_id, morado_id).await.unwrap();
        store.link_political_organization(election.id, congress_id, alianza_id).await.unwrap();
        store.link_position(election.id, position_id).await.unwrap();
        store.link_district(election.id, lima_id).await.unwrap();

        let seats = [
            Seat { source_id: 9001, dni: "10000001", election_type_id: president_id, organization_id: morado_id, district_id: None, status: "INSCRITO", income: Some(5000), penal: 1 },
            Seat { source_id: 9101, dni: "10000002", election_type_id: congress_id, organization_id: morado_id, district_id: Some(lima_id), status: "INSCRITO", income: Some(90000), penal: 0 },
            Seat { source_id: 9201, dni: "10000003", election_type_id: congress_id, organization_id: alianza_id, district_id: Some(lima_id), status: "INSCRITO", income: None, penal: 0 },
            Seat { source_id: 9301, dni: "10000004", election_type_id: congress_id, organization_id: alianza_id, district_id: Some(lima_id), status: "EXCLUIDO", income: Some(1), penal: 0 },
        ];
        let mut candidates = Vec::new();
        for seat in seats {
            let person = resolve_person(
                &store,
                &NewPerson {
                    dni: seat.dni.into(),
                    first_name: "ANA".into(),
                    surname: "TORRES".into(),
                    second_surname: format!("S{}", seat.source_id),
                    birth_date: chrono::NaiveDate::from_ymd_opt(1975, 2, 14),
                    gender: Gender::Female,
                },
            )
            .await
            .unwrap()
            .into_inner();
            let mut candidate = store
                .insert_candidate_if_absent(&NewCandidate {
                    source_id: seat.source_id,
                    election_id: election.id,
                    election_type_id: seat.election_type_id,
                    person_id: person.id,
                    position_id,
                    political_organization_id: seat.organization_id,
                    electoral_district_id: seat.district_id,
                    ballot_position: 1,
                    full_name: person.full_name(),
                    status_on_list: ListStatus::from(seat.status),
                    cv_source_id: seat.income.map(|_| seat.source_id + 1000),
                    photo_url_path: format!("/Fotos/{}.jpg", seat.dni),
                })
                .await
                .unwrap()
                .into_inner();
            candidates.push((seat.source_id, candidate.id));

            let Some(income) = seat.income else { continue };
            let mut cv = store
                .insert_curriculum_vitae_if_absent(&NewCurriculumVitae {
                    source_id: seat.source_id + 1000,
                    profile: Default::default(),
                    incomes: Incomes {
                        gross_annual_remunerations_public: Some(income),
                        ..Incomes::default()
                    },
                })
                .await
                .unwrap()
                .into_inner();
            for n in 0..seat.penal {
                store
                    .insert_cv_entry(
                        cv.id,
                        &NewCvEntry::PenalSentence(PenalSentence {
                            source_id: seat.source_id * 10 + n,
                            file_number: "EXP-1".into(),
                            criminal_sentence_date: chrono::NaiveDate::from_ymd_opt(2014, 1, 20).unwrap(),
                            judicial_authority: "JUZGADO".into(),
                            criminal_offense: "OMISION".into(),
                            judgment: "SUSPENDIDA".into(),
                            modality: String::new(),
                            other_modality: String::new(),
                        }),
                    )
                    .await
                    .unwrap();
            }
            if seat.source_id == 9001 {
                store
                    .insert_cv_entry(
                        cv.id,
                        &NewCvEntry::MovableProperty(MovableProperty {
                            source_id: 3501,
                            property_type: "AUTOMOVIL".into(),
                            features: "TOYOTA".into(),
                            value: 35000,
                            comment: String::new(),
                        }),
                    )
                    .await
                    .unwrap();
                store
                    .insert_cv_entry(
                        cv.id,
                        &NewCvEntry::PartisanPosition(PartisanPosition {
                            source_id: 3701,
                            political_organization_id: morado_id,
                            starting_year: 2017,
                            ending_year: None,
                            position: "SECRETARIA".into(),
                        }),
                    )
                    .await
                    .unwrap();
            }
            let aggregates = store.child_aggregates(cv.id).await.unwrap();
            cv.recompute_totals(&aggregates).unwrap();
            store.save_curriculum_vitae_totals(&cv).await.unwrap();
            candidate.attach_cv(cv.id, &person);
            store.save_candidate(&candidate).await.unwrap();
        }

        Fixture {
            router: app(AppState::new(Arc::new(store))),
            election_id: election.id,
            president_id,
            congress_id,
            morado_id,
            alianza_id,
            candidates,
        }
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        let resp = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn jne_ids(page: &Value) -> Vec<i64> {
        page["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["jne_id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let fx = fixture().await;
        let (status, body) = get_json(&fx.router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn elections_list_and_detail() {
        let fx = fixture().await;
        let (status, body) = get_json(&fx.router, "/api/elections").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"id": fx.election_id, "name": "ELECCIONES GENERALES 2021", "jne_id": 110}])
        );

        let (status, body) = get_json(&fx.router, &format!("/api/elections/{}", fx.election_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jne_id"], 110);

        let (status, body) = get_json(&fx.router, "/api/elections/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
        let (status, _) = get_json(&fx.router, "/api/elections/abc").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn election_reference_collections() {
        let fx = fixture().await;
        let base = format!("/api/elections/{}", fx.election_id);

        let (_, positions) = get_json(&fx.router, &format!("{base}/positions")).await;
        assert_eq!(positions, json!([{"name": "CONGRESISTA", "jne_id": 4}]));

        let (_, districts) = get_json(&fx.router, &format!("{base}/electoral_districts")).await;
        assert_eq!(districts, json!([{"name": "LIMA", "ubigeo": "140100"}]));

        let (_, types) = get_json(&fx.router, &format!("{base}/election_types")).await;
        assert_eq!(types.as_array().unwrap().len(), 2);
        assert_eq!(types[0]["jne_id"], 1);

        let (status, congress) =
            get_json(&fx.router, &format!("{base}/election_types/{}", fx.congress_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(congress, json!({"id": fx.congress_id, "name": "CONGRESAL", "jne_id": 3}));

        let (_, orgs) = get_json(
            &fx.router,
            &format!("{base}/election_types/{}/political_organizations", fx.congress_id),
        )
        .await;
        assert_eq!(
            orgs,
            json!([
                {"name": "PARTIDO MORADO", "jne_id": 1366},
                {"name": "ALIANZA DEMO", "jne_id": 1400}
            ])
        );
        let (_, orgs) = get_json(
            &fx.router,
            &format!("{base}/election_types/{}/political_organizations", fx.president_id),
        )
        .await;
        assert_eq!(orgs.as_array().unwrap().len(), 1);

        let (status, _) = get_json(&fx.router, &format!("{base}/election_types/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_json(
            &fx.router,
            &format!("{base}/election_types/999/political_organizations"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_json(&fx.router, "/api/elections/999/positions").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn candidate_list_shows_only_on_list_candidates() {
        let fx = fixture().await;
        let (status, page) =
            get_json(&fx.router, &format!("/api/elections/{}/candidates", fx.election_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 3);
        assert_eq!(page["page"], 1);
        assert_eq!(page["page_size"], 50);
        assert_eq!(page["total_pages"], 1);
        assert_eq!(jne_ids(&page), vec![9001, 9101, 9201]);

        let first = &page["results"][0];
        assert_eq!(first["full_name"], "ANA TORRES S9001");
        assert_eq!(first["gender"], "F");
        assert_eq!(first["birth_date"], "1975-02-14");
        assert_eq!(first["photo_url"], "https://declara.jne.gob.pe/Fotos/10000001.jpg");
        assert_eq!(first["status_on_list"], "INSCRITO");
        assert_eq!(first["political_organization"]["jne_id"], 1366);
        assert_eq!(first["election_type"]["id"], fx.president_id);
        assert_eq!(first["electoral_district"], Value::Null);
        assert_eq!(first["total_incomes"], 5000);
        assert_eq!(first["total_sentences"], 1);
        assert_eq!(first["gross_annual_remunerations_private"], Value::Null);
        assert_eq!(page["results"][1]["electoral_district"]["ubigeo"], "140100");
    }

    #[tokio::test]
    async fn candidate_without_cv_has_null_cv_fields() {
        let fx = fixture().await;
        let (_, page) = get_json(
            &fx.router,
            &format!("/api/elections/{}/candidates?po={}", fx.election_id, fx.alianza_id),
        )
        .await;
        assert_eq!(jne_ids(&page), vec![9201]);
        let row = &page["results"][0];
        for field in [
            "residence_ubigeo",
            "primary_school",
            "has_technical_education",
            "additional_information",
            "total_incomes",
            "other_income_public",
            "total_sentences",
            "total_penal_sentences",
            "total_obligation_sentences",
        ] {
            assert_eq!(row[field], Value::Null, "{field}");
        }
    }

    #[tokio::test]
    async fn candidate_list_filters_and_orders() {
        let fx = fixture().await;
        let base = format!("/api/elections/{}/candidates", fx.election_id);

        let (_, page) = get_json(&fx.router, &format!("{base}?et={}", fx.congress_id)).await;
        assert_eq!(jne_ids(&page), vec![9101, 9201]);
        let (_, page) = get_json(
            &fx.router,
            &format!("{base}?et={}&po={}", fx.congress_id, fx.morado_id),
        )
        .await;
        assert_eq!(jne_ids(&page), vec![9101]);

        let (_, page) = get_json(&fx.router, &format!("{base}?o=-ti")).await;
        assert_eq!(jne_ids(&page), vec![9101, 9001, 9201]);
        let (_, page) = get_json(&fx.router, &format!("{base}?o=ti")).await;
        assert_eq!(jne_ids(&page), vec![9001, 9101, 9201]);
        let (_, page) = get_json(&fx.router, &format!("{base}?o=-tps")).await;
        assert_eq!(jne_ids(&page), vec![9001, 9101, 9201]);
    }

    #[tokio::test]
    async fn candidate_list_paginates_and_clamps() {
        let fx = fixture().await;
        let base = format!("/api/elections/{}/candidates", fx.election_id);
        let (_, page) = get_json(&fx.router, &format!("{base}?page_size=2&page=2")).await;
        assert_eq!(page["count"], 3);
        assert_eq!(page["total_pages"], 2);
        assert_eq!(jne_ids(&page), vec![9201]);

        let (_, page) = get_json(&fx.router, &format!("{base}?page_size=2&page=40")).await;
        assert_eq!(page["page"], 2);
        assert_eq!(jne_ids(&page), vec![9201]);
    }

    #[tokio::test]
    async fn candidate_list_rejects_bad_parameters() {
        let fx = fixture().await;
        let base = format!("/api/elections/{}/candidates", fx.election_id);
        for query in ["et=abc", "po=1.5", "o=income", "o=--ti", "page=first", "page_size=x"] {
            let (status, body) = get_json(&fx.router, &format!("{base}?{query}")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
            assert!(body["error"].is_string());
        }
        let (status, _) = get_json(&fx.router, "/api/elections/999/candidates").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn candidate_detail_includes_child_collections() {
        let fx = fixture().await;
        let base = format!("/api/elections/{}/candidates", fx.election_id);
        let (status, detail) =
            get_json(&fx.router, &format!("{base}/{}", fx.candidate(9001))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["jne_id"], 9001);
        assert_eq!(detail["penal_sentences"][0]["jne_id"], 90010);
        assert_eq!(detail["penal_sentences"][0]["criminal_sentence_date"], "2014-01-20");
        assert_eq!(detail["movable_properties"][0]["value"], 35000);
        assert_eq!(
            detail["partisan_positions"][0]["political_organization"],
            json!({"id": fx.morado_id, "name": "PARTIDO MORADO", "jne_id": 1366})
        );
        assert_eq!(detail["partisan_positions"][0]["ending_year"], Value::Null);
        assert_eq!(detail["obligation_sentences"], json!([]));

        let (_, bare) = get_json(&fx.router, &format!("{base}/{}", fx.candidate(9201))).await;
        for section in [
            "penal_sentences",
            "obligation_sentences",
            "professional_experiences",
            "university_educations",
            "postgraduate_educations",
            "movable_properties",
            "immovable_properties",
            "partisan_positions",
        ] {
            assert_eq!(bare[section], json!([]), "{section}");
        }
        assert_eq!(bare["total_incomes"], Value::Null);
    }

    #[tokio::test]
    async fn candidate_detail_not_found_cases() {
        let fx = fixture().await;
        let base = format!("/api/elections/{}/candidates", fx.election_id);
        let (status, _) = get_json(&fx.router, &format!("{base}/{}", fx.candidate(9301))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_json(&fx.router, &format!("{base}/424242")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_json(
            &fx.router,
            &format!("/api/elections/999/candidates/{}", fx.candidate(9001)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
