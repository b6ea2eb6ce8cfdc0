//! Election-authority source contract with an HTTP client and an offline
//! snapshot implementation, plus the typed readers for raw source values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

mod wire;

pub use wire::{
    is_placeholder_id, AdditionalInfo, BasicEducation, CandidateItem, ElectionProcessItem,
    ElectionTypeItem, FileOnListItem, ImmovablePropertyItem, IncomeSection, MovablePropertyItem,
    NonUniversityEducation, ObligationSentenceItem, PartisanPositionItem, PenalSentenceItem,
    PersonalData, PostgraduateItem, Resume, Section, SourceItem, TechnicalEducation,
    UniversityItem, WorkExperienceItem,
};

pub const CRATE_NAME: &str = "declara-adapters";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not read snapshot {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse snapshot {path}: {source}")]
    SnapshotDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot has no resume for cv {0}")]
    MissingResume(i64),
    #[error("http client setup failed: {0}")]
    Client(reqwest::Error),
}

/// A source value that cannot be turned into a stored field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceDataError {
    #[error("required field {field} is missing")]
    MissingField { field: &'static str },
    #[error("field {field} is not a number: {value:?}")]
    BadNumber { field: &'static str, value: String },
    #[error("field {field} is not a date: {value:?}")]
    BadDate { field: &'static str, value: String },
    #[error("field {field} holds a negative amount: {value}")]
    NegativeAmount { field: &'static str, value: String },
    #[error("field {field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

/// The upstream data provider, one call per endpoint.
#[async_trait]
pub trait ElectionSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn election_processes(&self) -> Result<Vec<ElectionProcessItem>, SourceError>;

    async fn election_types(&self, process_id: i64) -> Result<Vec<ElectionTypeItem>, SourceError>;

    async fn files_on_list(
        &self,
        process_id: i64,
        election_type_id: i64,
    ) -> Result<Vec<FileOnListItem>, SourceError>;

    async fn candidates(
        &self,
        process_id: i64,
        election_type_id: i64,
        list_request_id: i64,
        file_id: i64,
    ) -> Result<Vec<CandidateItem>, SourceError>;

    async fn resume(
        &self,
        cv_id: i64,
        process_id: i64,
        political_organization_id: i64,
    ) -> Result<Resume, SourceError>;
}

/// Endpoint path templates relative to the base URL. Placeholders:
/// `{process}`, `{type}`, `{list_request}`, `{file}`, `{cv}`, `{organization}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoints {
    pub election_processes: String,
    pub election_types: String,
    pub files_on_list: String,
    pub candidates: String,
    pub resume: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            election_processes: "/api/v1/proceso/proceso-electoral".to_string(),
            election_types: "/api/v1/proceso/tipo-eleccion/{process}".to_string(),
            files_on_list: "/api/v1/expediente/lista/{process}/{type}".to_string(),
            candidates: "/api/v1/candidato/lista/{process}/{type}/{list_request}/{file}"
                .to_string(),
            resume: "/api/v1/hoja-vida/{cv}/{process}/{organization}".to_string(),
        }
    }
}

fn fill(template: &str, params: &[(&str, i64)]) -> String {
    params.iter().fold(template.to_string(), |path, (name, value)| {
        path.replace(&format!("{{{name}}}"), &value.to_string())
    })
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub endpoints: SourceEndpoints,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apiplataformaelectoral.jne.gob.pe".to_string(),
            user_agent: "declara-bot/0.1".to_string(),
            timeout: Duration::from_secs(30),
            endpoints: SourceEndpoints::default(),
        }
    }
}

impl SourceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("DECLARA_SOURCE_BASE_URL").unwrap_or(defaults.base_url),
            user_agent: std::env::var("DECLARA_USER_AGENT").unwrap_or(defaults.user_agent),
            timeout: std::env::var("DECLARA_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            endpoints: defaults.endpoints,
        }
    }
}

/// Talks to the live API. Failures surface immediately; there is no retry.
#[derive(Debug, Clone)]
pub struct JneHttpSource {
    client: reqwest::Client,
    config: SourceConfig,
}

impl JneHttpSource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(SourceError::Client)?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = self.url(path);
        debug!(%url, "fetching from source");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|source| SourceError::Http {
            url: url.clone(),
            source,
        })?;
        serde_json::from_slice::<wire::Envelope<T>>(&bytes)
            .map(wire::Envelope::into_inner)
            .map_err(|source| SourceError::Decode { url, source })
    }
}

#[async_trait]
impl ElectionSource for JneHttpSource {
    fn name(&self) -> &'static str {
        "jne-http"
    }

    async fn election_processes(&self) -> Result<Vec<ElectionProcessItem>, SourceError> {
        self.get_json(&self.config.endpoints.election_processes).await
    }

    async fn election_types(&self, process_id: i64) -> Result<Vec<ElectionTypeItem>, SourceError> {
        let path = fill(&self.config.endpoints.election_types, &[("process", process_id)]);
        self.get_json(&path).await
    }

    async fn files_on_list(
        &self,
        process_id: i64,
        election_type_id: i64,
    ) -> Result<Vec<FileOnListItem>, SourceError> {
        let path = fill(
            &self.config.endpoints.files_on_list,
            &[("process", process_id), ("type", election_type_id)],
        );
        self.get_json(&path).await
    }

    async fn candidates(
        &self,
        process_id: i64,
        election_type_id: i64,
        list_request_id: i64,
        file_id: i64,
    ) -> Result<Vec<CandidateItem>, SourceError> {
        let path = fill(
            &self.config.endpoints.candidates,
            &[
                ("process", process_id),
                ("type", election_type_id),
                ("list_request", list_request_id),
                ("file", file_id),
            ],
        );
        self.get_json(&path).await
    }

    async fn resume(
        &self,
        cv_id: i64,
        process_id: i64,
        political_organization_id: i64,
    ) -> Result<Resume, SourceError> {
        let path = fill(
            &self.config.endpoints.resume,
            &[
                ("cv", cv_id),
                ("process", process_id),
                ("organization", political_organization_id),
            ],
        );
        self.get_json(&path).await
    }
}

/// Captured API responses in one JSON document, keyed by request arguments
/// joined with `:`. Missing list keys read as empty lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceSnapshot {
    #[serde(default)]
    pub election_processes: Vec<ElectionProcessItem>,
    #[serde(default)]
    pub election_types: HashMap<String, Vec<ElectionTypeItem>>,
    #[serde(default)]
    pub files_on_list: HashMap<String, Vec<FileOnListItem>>,
    #[serde(default)]
    pub candidates: HashMap<String, Vec<CandidateItem>>,
    #[serde(default)]
    pub resumes: HashMap<String, Resume>,
}

fn snapshot_key(parts: &[i64]) -> String {
    parts
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(":")
}

#[derive(Debug, Clone)]
pub struct FixtureSource {
    path: PathBuf,
    snapshot: SourceSnapshot,
}

impl FixtureSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let raw = std::fs::read(&path).map_err(|source| SourceError::SnapshotIo {
            path: path.clone(),
            source,
        })?;
        let snapshot = serde_json::from_slice(&raw).map_err(|source| {
            SourceError::SnapshotDecode {
                path: path.clone(),
                source,
            }
        })?;
        Ok(Self { path, snapshot })
    }

    pub fn from_snapshot(snapshot: SourceSnapshot) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            snapshot,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ElectionSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn election_processes(&self) -> Result<Vec<ElectionProcessItem>, SourceError> {
        Ok(self.snapshot.election_processes.clone())
    }

    async fn election_types(&self, process_id: i64) -> Result<Vec<ElectionTypeItem>, SourceError> {
        Ok(self
            .snapshot
            .election_types
            .get(&snapshot_key(&[process_id]))
            .cloned()
            .unwrap_or_default())
    }

    async fn files_on_list(
        &self,
        process_id: i64,
        election_type_id: i64,
    ) -> Result<Vec<FileOnListItem>, SourceError> {
        Ok(self
            .snapshot
            .files_on_list
            .get(&snapshot_key(&[process_id, election_type_id]))
            .cloned()
            .unwrap_or_default())
    }

    async fn candidates(
        &self,
        process_id: i64,
        election_type_id: i64,
        list_request_id: i64,
        file_id: i64,
    ) -> Result<Vec<CandidateItem>, SourceError> {
        let key = snapshot_key(&[process_id, election_type_id, list_request_id, file_id]);
        Ok(self
            .snapshot
            .candidates
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn resume(
        &self,
        cv_id: i64,
        _process_id: i64,
        _political_organization_id: i64,
    ) -> Result<Resume, SourceError> {
        self.snapshot
            .resumes
            .get(&snapshot_key(&[cv_id]))
            .cloned()
            .ok_or(SourceError::MissingResume(cv_id))
    }
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Verbatim text, empty when absent.
pub fn text(raw: &Option<String>) -> String {
    raw.clone().unwrap_or_default()
}

/// Basic-education flags are the code `"1"`; anything else is false.
pub fn is_code_one(raw: &Option<String>) -> bool {
    present(raw) == Some("1")
}

/// Nullable yes/no flag: absent stays `None`.
pub fn parse_flag(raw: &Option<String>) -> Option<bool> {
    present(raw).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "si" | "sí"))
}

pub fn parse_opt_int(field: &'static str, raw: &Option<String>) -> Result<Option<i64>, SourceDataError> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    if let Ok(n) = value.parse::<i64>() {
        return Ok(Some(n));
    }
    // Integral values sometimes arrive as "3.0".
    match value.parse::<f64>() {
        Ok(n) if n.fract() == 0.0 && n.is_finite() => Ok(Some(n as i64)),
        _ => Err(SourceDataError::BadNumber {
            field,
            value: value.to_string(),
        }),
    }
}

pub fn parse_int(field: &'static str, raw: &Option<String>) -> Result<i64, SourceDataError> {
    parse_opt_int(field, raw)?.ok_or(SourceDataError::MissingField { field })
}

pub fn parse_opt_year(field: &'static str, raw: &Option<String>) -> Result<Option<i32>, SourceDataError> {
    parse_opt_int(field, raw)?
        .map(|n| {
            i32::try_from(n).map_err(|_| SourceDataError::BadNumber {
                field,
                value: n.to_string(),
            })
        })
        .transpose()
}

pub fn parse_year(field: &'static str, raw: &Option<String>) -> Result<i32, SourceDataError> {
    parse_opt_year(field, raw)?.ok_or(SourceDataError::MissingField { field })
}

/// Monetary amount rounded to whole currency units. Negative values are
/// rejected; absent values stay `None`.
pub fn parse_amount(field: &'static str, raw: &Option<String>) -> Result<Option<i64>, SourceDataError> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    let cleaned = value.replace(',', "");
    let amount = cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| SourceDataError::BadNumber {
            field,
            value: value.to_string(),
        })?;
    if amount < 0.0 {
        return Err(SourceDataError::NegativeAmount {
            field,
            value: value.to_string(),
        });
    }
    let rounded = amount.round();
    // i64::MAX is not representable as f64; the cast would saturate at 2^63.
    if rounded >= i64::MAX as f64 {
        return Err(SourceDataError::OutOfRange {
            field,
            value: value.to_string(),
        });
    }
    Ok(Some(rounded as i64))
}

/// Accepts `dd/mm/yyyy`, `yyyy-mm-dd`, and either followed by a time part.
pub fn parse_date(field: &'static str, raw: &Option<String>) -> Result<Option<NaiveDate>, SourceDataError> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };
    let day = value
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()
        .unwrap_or(value);
    NaiveDate::parse_from_str(day, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y-%m-%d"))
        .map(Some)
        .map_err(|_| SourceDataError::BadDate {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn raw(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn config_for(server: &MockServer) -> SourceConfig {
        SourceConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            ..SourceConfig::default()
        }
    }

    #[test]
    fn dates_accept_source_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 10, 1);
        assert_eq!(parse_date("f", &raw("01/10/2020")).unwrap(), expected);
        assert_eq!(parse_date("f", &raw("2020-10-01")).unwrap(), expected);
        assert_eq!(parse_date("f", &raw("2020-10-01T00:00:00")).unwrap(), expected);
        assert_eq!(parse_date("f", &raw("")).unwrap(), None);
        assert_eq!(parse_date("f", &None).unwrap(), None);
        assert!(matches!(
            parse_date("strFechaNacimiento", &raw("31/02/2020")),
            Err(SourceDataError::BadDate { field: "strFechaNacimiento", .. })
        ));
    }

    #[test]
    fn amounts_round_and_reject_negatives() {
        assert_eq!(parse_amount("decValor", &raw("15000.00")).unwrap(), Some(15000));
        assert_eq!(parse_amount("decValor", &raw("1,250.60")).unwrap(), Some(1251));
        assert_eq!(parse_amount("decValor", &raw(" ")).unwrap(), None);
        assert!(matches!(
            parse_amount("decValor", &raw("-3")),
            Err(SourceDataError::NegativeAmount { .. })
        ));
        assert!(matches!(
            parse_amount("decValor", &raw("9300000000000000000")),
            Err(SourceDataError::OutOfRange { field: "decValor", .. })
        ));
        assert_eq!(
            parse_amount("decValor", &raw("9000000000000000000")).unwrap(),
            Some(9_000_000_000_000_000_000)
        );
        assert!(matches!(
            parse_amount("decValor", &raw("mucho")),
            Err(SourceDataError::BadNumber { .. })
        ));
    }

    #[test]
    fn integers_and_flags() {
        assert_eq!(parse_int("intPosicion", &raw("4")).unwrap(), 4);
        assert_eq!(parse_int("intPosicion", &raw("4.0")).unwrap(), 4);
        assert_eq!(
            parse_int("idCandidato", &None),
            Err(SourceDataError::MissingField { field: "idCandidato" })
        );
        assert_eq!(parse_opt_year("anioBachiller", &raw("")).unwrap(), None);
        assert!(parse_year("anioTrabajoDesde", &raw("dos mil")).is_err());
        assert!(is_code_one(&raw("1")));
        assert!(!is_code_one(&raw("2")));
        assert_eq!(parse_flag(&raw("true")), Some(true));
        assert_eq!(parse_flag(&raw("0")), Some(false));
        assert_eq!(parse_flag(&None), None);
    }

    #[test]
    fn endpoint_templates_fill_every_placeholder() {
        let endpoints = SourceEndpoints::default();
        assert_eq!(
            fill(
                &endpoints.candidates,
                &[("process", 110), ("type", 1), ("list_request", 9), ("file", 42)]
            ),
            "/api/v1/candidato/lista/110/1/9/42"
        );
    }

    #[tokio::test]
    async fn http_source_reads_wrapped_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/proceso/tipo-eleccion/110"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"idTipoEleccion": 1, "strTipoEleccion": "PRESIDENCIAL"},
                    {"idTipoEleccion": "2", "strTipoEleccion": "CONGRESAL"}
                ]
            })))
            .mount(&server)
            .await;

        let source = JneHttpSource::new(config_for(&server)).unwrap();
        let types = source.election_types(110).await.unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types[1].id.as_deref(), Some("2"));
        assert_eq!(types[0].name.as_deref(), Some("PRESIDENCIAL"));
    }

    #[tokio::test]
    async fn http_source_reads_bare_resume() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/hoja-vida/900/110/1366"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "oDatosPersonales": {"strUbigeoDomicilio": "150101"},
                "lSentenciaPenal": {"idHVSentenciaPenal": 5, "fechaSentenciaPenal": "02/03/2015"}
            })))
            .mount(&server)
            .await;

        let source = JneHttpSource::new(config_for(&server)).unwrap();
        let resume = source.resume(900, 110, 1366).await.unwrap();
        assert_eq!(
            resume.personal.and_then(|p| p.residence_ubigeo).as_deref(),
            Some("150101")
        );
        assert_eq!(resume.penal_sentences.entries().count(), 1);
    }

    #[tokio::test]
    async fn http_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/proceso/proceso-electoral"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let source = JneHttpSource::new(config_for(&server)).unwrap();
        let err = source.election_processes().await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn fixture_source_serves_snapshot_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(
            &path,
            serde_json::to_vec(&json!({
                "election_processes": [{"idProcesoElectoral": 110}],
                "files_on_list": {"110:1": [{"idExpediente": 7, "idSolicitudLista": 3}]},
                "resumes": {"55": {"oInfoAdicional": {"strInfoAdicional": "NINGUNA"}}}
            }))
            .unwrap(),
        )
        .unwrap();

        let source = FixtureSource::from_path(&path).unwrap();
        assert_eq!(source.election_processes().await.unwrap().len(), 1);
        assert_eq!(source.files_on_list(110, 1).await.unwrap().len(), 1);
        assert!(source.files_on_list(110, 2).await.unwrap().is_empty());
        assert!(source.election_types(110).await.unwrap().is_empty());
        let resume = source.resume(55, 110, 1).await.unwrap();
        assert_eq!(
            resume.additional_info.and_then(|i| i.text).as_deref(),
            Some("NINGUNA")
        );
        assert!(matches!(
            source.resume(56, 110, 1).await,
            Err(SourceError::MissingResume(56))
        ));
    }
}
