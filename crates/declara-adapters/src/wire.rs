//! Payload shapes of the election-authority API.
//!
//! Every scalar is captured as raw text: the source mixes JSON numbers,
//! numeric strings, empty strings and nulls for the same field, so typing
//! happens later through the `parse_*` helpers where a bad value becomes a
//! [`crate::SourceDataError`] naming the field.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

fn lenient<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(text)) => Some(text),
        Some(JsonValue::Number(number)) => Some(number.to_string()),
        Some(JsonValue::Bool(flag)) => Some(flag.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// A raw identifier denotes a placeholder when it is absent, blank or zero.
pub fn is_placeholder_id(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        None | Some("") => true,
        Some(id) => id.parse::<f64>().map(|n| n == 0.0).unwrap_or(false),
    }
}

/// Anything carrying a source identifier that may be a "none" marker.
pub trait SourceItem {
    fn raw_id(&self) -> Option<&str>;

    fn is_placeholder(&self) -> bool {
        is_placeholder_id(self.raw_id())
    }
}

/// Response bodies arrive either bare or wrapped in `{"data": ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } | Envelope::Bare(data) => data,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// A CV section; the source sends a lone object where a list holds one item.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<T>(pub Vec<T>);

impl<T> Default for Section<T> {
    fn default() -> Self {
        Section(Vec::new())
    }
}

impl<'de, T> Deserialize<'de> for Section<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Section(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(OneOrMany::Many(items)) => items,
            Some(OneOrMany::One(item)) => vec![item],
        }))
    }
}

impl<T: SourceItem> Section<T> {
    /// Items that carry real data.
    pub fn entries(&self) -> impl Iterator<Item = &T> {
        self.0.iter().filter(|item| !item.is_placeholder())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElectionProcessItem {
    #[serde(rename = "idProcesoElectoral", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strProcesoElectoral", default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(rename = "strFechaConvocatoria", default, deserialize_with = "lenient")]
    pub call_date: Option<String>,
    #[serde(rename = "strFechaRegistro", default, deserialize_with = "lenient")]
    pub registration_date: Option<String>,
    #[serde(rename = "strFechaAperturaProceso", default, deserialize_with = "lenient")]
    pub opening_date: Option<String>,
    #[serde(rename = "strFechaCierreProceso", default, deserialize_with = "lenient")]
    pub closing_date: Option<String>,
}

impl SourceItem for ElectionProcessItem {
    fn raw_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElectionTypeItem {
    #[serde(rename = "idTipoEleccion", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strTipoEleccion", default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

impl SourceItem for ElectionTypeItem {
    fn raw_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// An electoral list filed by one organization, optionally in one district.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileOnListItem {
    #[serde(rename = "idExpediente", default, deserialize_with = "lenient")]
    pub file_id: Option<String>,
    #[serde(rename = "idOrganizacionPolitica", default, deserialize_with = "lenient")]
    pub organization_id: Option<String>,
    #[serde(rename = "strOrganizacionPolitica", default, deserialize_with = "lenient")]
    pub organization_name: Option<String>,
    #[serde(rename = "strUbigeo", default, deserialize_with = "lenient")]
    pub ubigeo: Option<String>,
    #[serde(rename = "strDistritoElec", default, deserialize_with = "lenient")]
    pub district_name: Option<String>,
    #[serde(rename = "idSolicitudLista", default, deserialize_with = "lenient")]
    pub list_request_id: Option<String>,
}

impl SourceItem for FileOnListItem {
    fn raw_id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CandidateItem {
    #[serde(rename = "idCandidato", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strCandidato", default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(rename = "strDocumentoIdentidad", default, deserialize_with = "lenient")]
    pub dni: Option<String>,
    #[serde(rename = "strNombreCompleto", default, deserialize_with = "lenient")]
    pub first_name: Option<String>,
    #[serde(rename = "strApellidoPaterno", default, deserialize_with = "lenient")]
    pub surname: Option<String>,
    #[serde(rename = "strApellidoMaterno", default, deserialize_with = "lenient")]
    pub second_surname: Option<String>,
    #[serde(rename = "strFechaNacimiento", default, deserialize_with = "lenient")]
    pub birth_date: Option<String>,
    #[serde(rename = "strSexo", default, deserialize_with = "lenient")]
    pub sex: Option<String>,
    #[serde(rename = "idCargoEleccion", default, deserialize_with = "lenient")]
    pub position_id: Option<String>,
    #[serde(rename = "strCargoEleccion", default, deserialize_with = "lenient")]
    pub position_name: Option<String>,
    #[serde(rename = "intPosicion", default, deserialize_with = "lenient")]
    pub ballot_position: Option<String>,
    #[serde(rename = "strEstadoExp", default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(rename = "strRutaArchivo", default, deserialize_with = "lenient")]
    pub photo_path: Option<String>,
    #[serde(rename = "idHojaVida", default, deserialize_with = "lenient")]
    pub cv_id: Option<String>,
}

impl SourceItem for CandidateItem {
    fn raw_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PersonalData {
    #[serde(rename = "strDomicilioDirecc", default, deserialize_with = "lenient")]
    pub residence_address: Option<String>,
    #[serde(rename = "strDomiDepartamento", default, deserialize_with = "lenient")]
    pub residence_department: Option<String>,
    #[serde(rename = "strDomiProvincia", default, deserialize_with = "lenient")]
    pub residence_province: Option<String>,
    #[serde(rename = "strDomiDistrito", default, deserialize_with = "lenient")]
    pub residence_district: Option<String>,
    #[serde(rename = "strUbigeoDomicilio", default, deserialize_with = "lenient")]
    pub residence_ubigeo: Option<String>,
    #[serde(rename = "strPaisNacimiento", default, deserialize_with = "lenient")]
    pub birth_country: Option<String>,
    #[serde(rename = "strNaciDepartamento", default, deserialize_with = "lenient")]
    pub birth_department: Option<String>,
    #[serde(rename = "strNaciProvincia", default, deserialize_with = "lenient")]
    pub birth_province: Option<String>,
    #[serde(rename = "strNaciDistrito", default, deserialize_with = "lenient")]
    pub birth_district: Option<String>,
    #[serde(rename = "strUbigeoNacimiento", default, deserialize_with = "lenient")]
    pub birth_ubigeo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BasicEducation {
    #[serde(rename = "strEduPrimaria", default, deserialize_with = "lenient")]
    pub primary_school: Option<String>,
    #[serde(rename = "strConcluidoEduPrimaria", default, deserialize_with = "lenient")]
    pub concluded_primary_school: Option<String>,
    #[serde(rename = "strEduSecundaria", default, deserialize_with = "lenient")]
    pub high_school: Option<String>,
    #[serde(rename = "strConcluidoEduSecundaria", default, deserialize_with = "lenient")]
    pub concluded_high_school: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TechnicalEducation {
    #[serde(rename = "tengoEduTecnico", default, deserialize_with = "lenient")]
    pub has_any: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NonUniversityEducation {
    #[serde(rename = "tengoNoUniversitaria", default, deserialize_with = "lenient")]
    pub has_any: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdditionalInfo {
    #[serde(rename = "strInfoAdicional", default, deserialize_with = "lenient")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IncomeSection {
    #[serde(rename = "idHVIngresos", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strAnioIngresos", default, deserialize_with = "lenient")]
    pub year: Option<String>,
    #[serde(rename = "decRemuBrutaPublico", default, deserialize_with = "lenient")]
    pub gross_remunerations_public: Option<String>,
    #[serde(rename = "decRemuBrutaPrivado", default, deserialize_with = "lenient")]
    pub gross_remunerations_private: Option<String>,
    #[serde(rename = "decRentaIndividualPublico", default, deserialize_with = "lenient")]
    pub individual_income_public: Option<String>,
    #[serde(rename = "decRentaIndividualPrivado", default, deserialize_with = "lenient")]
    pub individual_income_private: Option<String>,
    #[serde(rename = "decOtroIngresoPublico", default, deserialize_with = "lenient")]
    pub other_income_public: Option<String>,
    #[serde(rename = "decOtroIngresoPrivado", default, deserialize_with = "lenient")]
    pub other_income_private: Option<String>,
}

impl SourceItem for IncomeSection {
    fn raw_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PenalSentenceItem {
    #[serde(rename = "idHVSentenciaPenal", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strExpedientePenal", default, deserialize_with = "lenient")]
    pub file_number: Option<String>,
    #[serde(rename = "fechaSentenciaPenal", default, deserialize_with = "lenient")]
    pub sentence_date: Option<String>,
    #[serde(rename = "strOrganoJudiPenal", default, deserialize_with = "lenient")]
    pub judicial_authority: Option<String>,
    #[serde(rename = "strDelitoPenal", default, deserialize_with = "lenient")]
    pub offense: Option<String>,
    #[serde(rename = "strFalloPenal", default, deserialize_with = "lenient")]
    pub judgment: Option<String>,
    #[serde(rename = "strModalidad", default, deserialize_with = "lenient")]
    pub modality: Option<String>,
    #[serde(rename = "strOtraModalidad", default, deserialize_with = "lenient")]
    pub other_modality: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ObligationSentenceItem {
    #[serde(rename = "idHVSentenciaObliga", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strMateriaSentencia", default, deserialize_with = "lenient")]
    pub matter: Option<String>,
    #[serde(rename = "strExpedienteObliga", default, deserialize_with = "lenient")]
    pub file_number: Option<String>,
    #[serde(rename = "strOrganoJuridicialObliga", default, deserialize_with = "lenient")]
    pub judicial_authority: Option<String>,
    #[serde(rename = "strFalloObliga", default, deserialize_with = "lenient")]
    pub judgment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkExperienceItem {
    #[serde(rename = "idHVExpeLaboral", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strCentroTrabajo", default, deserialize_with = "lenient")]
    pub workplace: Option<String>,
    #[serde(rename = "strOcupacionProfesion", default, deserialize_with = "lenient")]
    pub occupation: Option<String>,
    #[serde(rename = "anioTrabajoDesde", default, deserialize_with = "lenient")]
    pub from_year: Option<String>,
    #[serde(rename = "anioTrabajoHasta", default, deserialize_with = "lenient")]
    pub to_year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UniversityItem {
    #[serde(rename = "idHVEduUniversitaria", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strUniversidad", default, deserialize_with = "lenient")]
    pub university: Option<String>,
    #[serde(rename = "strCarreraUni", default, deserialize_with = "lenient")]
    pub degree: Option<String>,
    #[serde(rename = "anioBachiller", default, deserialize_with = "lenient")]
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostgraduateItem {
    #[serde(rename = "idHVPosgrado", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strCenEstudioPosgrado", default, deserialize_with = "lenient")]
    pub study_center: Option<String>,
    #[serde(rename = "strEspecialidadPosgrado", default, deserialize_with = "lenient")]
    pub specialty: Option<String>,
    #[serde(rename = "anioPosgrado", default, deserialize_with = "lenient")]
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MovablePropertyItem {
    #[serde(rename = "idHVBienMueble", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strVehiculo", default, deserialize_with = "lenient")]
    pub vehicle: Option<String>,
    #[serde(rename = "strCaracteristica", default, deserialize_with = "lenient")]
    pub features: Option<String>,
    #[serde(rename = "decValor", default, deserialize_with = "lenient")]
    pub value: Option<String>,
    #[serde(rename = "strComentario", default, deserialize_with = "lenient")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImmovablePropertyItem {
    #[serde(rename = "idHVBienInmueble", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "strTipoBienInmueble", default, deserialize_with = "lenient")]
    pub property_type: Option<String>,
    #[serde(rename = "decAutovaluo", default, deserialize_with = "lenient")]
    pub value: Option<String>,
    #[serde(rename = "strComentario", default, deserialize_with = "lenient")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartisanPositionItem {
    #[serde(rename = "idHVCargoPartidario", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "idOrgPolCargoPartidario", default, deserialize_with = "lenient")]
    pub organization_id: Option<String>,
    #[serde(rename = "strOrgPolCargoPartidario", default, deserialize_with = "lenient")]
    pub organization_name: Option<String>,
    #[serde(rename = "anioCargoPartiDesde", default, deserialize_with = "lenient")]
    pub from_year: Option<String>,
    #[serde(rename = "anioCargoPartiHasta", default, deserialize_with = "lenient")]
    pub to_year: Option<String>,
    #[serde(rename = "strCargoPartidario", default, deserialize_with = "lenient")]
    pub position: Option<String>,
}

macro_rules! source_items {
    ($($item:ty),+ $(,)?) => {
        $(impl SourceItem for $item {
            fn raw_id(&self) -> Option<&str> {
                self.id.as_deref()
            }
        })+
    };
}

source_items!(
    PenalSentenceItem,
    ObligationSentenceItem,
    WorkExperienceItem,
    UniversityItem,
    PostgraduateItem,
    MovablePropertyItem,
    ImmovablePropertyItem,
    PartisanPositionItem,
);

/// The per-candidate CV document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Resume {
    #[serde(rename = "oDatosPersonales", default)]
    pub personal: Option<PersonalData>,
    #[serde(rename = "oEduBasica", default)]
    pub basic_education: Option<BasicEducation>,
    #[serde(rename = "oEduTecnico", default)]
    pub technical_education: Option<TechnicalEducation>,
    #[serde(rename = "oEduNoUniversitaria", default)]
    pub non_university_education: Option<NonUniversityEducation>,
    #[serde(rename = "oInfoAdicional", default)]
    pub additional_info: Option<AdditionalInfo>,
    #[serde(rename = "oIngresos", default)]
    pub incomes: Option<IncomeSection>,
    #[serde(rename = "lSentenciaPenal", default)]
    pub penal_sentences: Section<PenalSentenceItem>,
    #[serde(rename = "lSentenciaObliga", default)]
    pub obligation_sentences: Section<ObligationSentenceItem>,
    #[serde(rename = "lExperienciaLaboral", default)]
    pub work_experience: Section<WorkExperienceItem>,
    #[serde(rename = "lEduUniversitaria", default)]
    pub university_education: Section<UniversityItem>,
    #[serde(rename = "oEduPosgrago", default)]
    pub postgraduate_education: Section<PostgraduateItem>,
    #[serde(rename = "lBienMueble", default)]
    pub movable_properties: Section<MovablePropertyItem>,
    #[serde(rename = "lBienInmueble", default)]
    pub immovable_properties: Section<ImmovablePropertyItem>,
    #[serde(rename = "lCargoPartidario", default)]
    pub partisan_positions: Section<PartisanPositionItem>,
}

impl Resume {
    /// The income block, unless absent or a placeholder.
    pub fn declared_incomes(&self) -> Option<&IncomeSection> {
        self.incomes.as_ref().filter(|section| !section.is_placeholder())
    }
}
