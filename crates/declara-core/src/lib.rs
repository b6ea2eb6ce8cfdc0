//! Core entity model and derived-field rules for the candidate disclosure service.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "declara-core";

/// Status code the election authority uses for candidates enrolled on a list.
pub const REGISTERED_STATUS: &str = "INSCRITO";

/// Host serving candidate photos; `photo_url_path` values are relative to it.
pub const PHOTO_BASE_URL: &str = "https://declara.jne.gob.pe";

/// Outcome of an insert-if-absent call. Existing rows are returned untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Upserted<T> {
    Created(T),
    Existing(T),
}

impl<T> Upserted<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Upserted::Created(value) | Upserted::Existing(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Upserted::Created(value) | Upserted::Existing(value) => value,
        }
    }

    pub fn label(&self) -> &'static str {
        if self.was_created() {
            "CREATED"
        } else {
            "ALREADY_EXIST"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Gender {
    #[default]
    #[serde(rename = "")]
    Unknown,
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    /// Maps the source's sex code. Only `"1"` means male; the source has no
    /// distinct code for "unknown".
    pub fn from_source_code(code: &str) -> Self {
        if code.trim() == "1" {
            Gender::Male
        } else {
            Gender::Female
        }
    }

    /// Stored column value.
    pub fn as_code(&self) -> &'static str {
        match self {
            Gender::Unknown => "",
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "M" => Gender::Male,
            "F" => Gender::Female,
            _ => Gender::Unknown,
        }
    }
}

/// Candidate status on an electoral list. Only the registered status gates
/// CV import and public listing; every other code is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListStatus {
    Registered,
    Other(String),
}

impl ListStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ListStatus::Registered => REGISTERED_STATUS,
            ListStatus::Other(code) => code,
        }
    }

    pub fn is_on_list(&self) -> bool {
        matches!(self, ListStatus::Registered)
    }
}

impl From<String> for ListStatus {
    fn from(value: String) -> Self {
        if value == REGISTERED_STATUS {
            ListStatus::Registered
        } else {
            ListStatus::Other(value)
        }
    }
}

impl From<&str> for ListStatus {
    fn from(value: &str) -> Self {
        ListStatus::from(value.to_string())
    }
}

impl From<ListStatus> for String {
    fn from(value: ListStatus) -> Self {
        match value {
            ListStatus::Registered => REGISTERED_STATUS.to_string(),
            ListStatus::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ElectionProcessFields {
    pub name: String,
    pub call_date: Option<NaiveDate>,
    pub registration_date: Option<NaiveDate>,
    pub opening_date: Option<NaiveDate>,
    pub closing_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionProcess {
    pub id: i64,
    pub source_id: i64,
    #[serde(flatten)]
    pub fields: ElectionProcessFields,
}

/// Lookup tables created lazily on first sight and never updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    ElectionType,
    Position,
    ElectoralDistrict,
    PoliticalOrganization,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::ElectionType,
        ReferenceKind::Position,
        ReferenceKind::ElectoralDistrict,
        ReferenceKind::PoliticalOrganization,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReferenceKind::ElectionType => "Election Type",
            ReferenceKind::Position => "Position",
            ReferenceKind::ElectoralDistrict => "Electoral District",
            ReferenceKind::PoliticalOrganization => "Political Organization",
        }
    }
}

/// Natural key of a reference row: districts are keyed by their government
/// area code (ubigeo), everything else by the source identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKey {
    SourceId(i64),
    Ubigeo(String),
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKey::SourceId(id) => write!(f, "{id}"),
            ReferenceKey::Ubigeo(code) => write!(f, "ubigeo {code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: i64,
    pub kind: ReferenceKind,
    pub key: ReferenceKey,
    pub name: String,
}

impl Reference {
    pub fn source_id(&self) -> Option<i64> {
        match &self.key {
            ReferenceKey::SourceId(id) => Some(*id),
            ReferenceKey::Ubigeo(_) => None,
        }
    }

    pub fn ubigeo(&self) -> Option<&str> {
        match &self.key {
            ReferenceKey::Ubigeo(code) => Some(code),
            ReferenceKey::SourceId(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
    pub dni: String,
    pub first_name: String,
    pub surname: String,
    pub second_surname: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub dni: String,
    pub first_name: String,
    pub surname: String,
    pub second_surname: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
}

impl Person {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.surname, &self.second_surname)
    }
}

impl NewPerson {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.surname, &self.second_surname)
    }
}

fn join_name(first_name: &str, surname: &str, second_surname: &str) -> String {
    [first_name, surname, second_surname].join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub source_id: i64,
    pub election_id: i64,
    pub election_type_id: i64,
    pub person_id: i64,
    pub position_id: i64,
    pub political_organization_id: i64,
    pub electoral_district_id: Option<i64>,
    pub ballot_position: i32,
    pub full_name: String,
    pub status_on_list: ListStatus,
    pub cv_source_id: Option<i64>,
    pub photo_url_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub source_id: i64,
    pub election_id: i64,
    pub election_type_id: i64,
    pub person_id: i64,
    pub position_id: i64,
    pub political_organization_id: i64,
    pub electoral_district_id: Option<i64>,
    pub ballot_position: i32,
    pub full_name: String,
    pub status_on_list: ListStatus,
    pub cv_source_id: Option<i64>,
    pub cv_id: Option<i64>,
    pub photo_url_path: String,
}

impl Candidate {
    /// Re-derives the cached `full_name` from the referenced person. Must be
    /// called before every candidate save.
    pub fn refresh_full_name(&mut self, person: &Person) {
        self.full_name = person.full_name();
    }

    pub fn attach_cv(&mut self, cv_id: i64, person: &Person) {
        self.cv_id = Some(cv_id);
        self.refresh_full_name(person);
    }

    pub fn is_on_list(&self) -> bool {
        self.status_on_list.is_on_list()
    }

    pub fn photo_url(&self) -> String {
        format!("{PHOTO_BASE_URL}{}", self.photo_url_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CvProfile {
    pub residence_address: String,
    pub residence_department: String,
    pub residence_province: String,
    pub residence_district: String,
    pub residence_ubigeo: String,
    pub birth_country: String,
    pub birth_department: String,
    pub birth_province: String,
    pub birth_district: String,
    pub birth_ubigeo: String,
    pub primary_school: bool,
    pub concluded_primary_school: bool,
    pub high_school: bool,
    pub concluded_high_school: bool,
    pub has_technical_education: Option<bool>,
    pub has_non_university_education: Option<bool>,
    pub additional_information: String,
}

/// Declared yearly incomes. Figures are non-negative; `None` means undeclared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Incomes {
    pub incomes_year: Option<i32>,
    pub gross_annual_remunerations_public: Option<i64>,
    pub gross_annual_remunerations_private: Option<i64>,
    pub gross_annual_income_per_individual_year_public: Option<i64>,
    pub gross_annual_income_per_individual_year_private: Option<i64>,
    pub other_income_public: Option<i64>,
    pub other_income_private: Option<i64>,
}

/// A CV total that does not fit in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} exceeds the supported range")]
pub struct TotalsOverflow(pub &'static str);

fn checked_sum(
    name: &'static str,
    values: impl IntoIterator<Item = i64>,
) -> Result<i64, TotalsOverflow> {
    values
        .into_iter()
        .try_fold(0i64, |acc, v| acc.checked_add(v))
        .ok_or(TotalsOverflow(name))
}

impl Incomes {
    /// Sum of the six figures, undeclared ones counting as zero.
    pub fn total(&self) -> Result<i64, TotalsOverflow> {
        let figures = [
            self.gross_annual_remunerations_public,
            self.gross_annual_remunerations_private,
            self.gross_annual_income_per_individual_year_public,
            self.gross_annual_income_per_individual_year_private,
            self.other_income_public,
            self.other_income_private,
        ];
        checked_sum("total_incomes", figures.into_iter().map(|v| v.unwrap_or(0)))
    }
}

/// Live aggregates over a CV's child tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChildAggregates {
    pub movable_properties_value: i64,
    pub immovable_properties_value: i64,
    pub penal_sentences: i64,
    pub obligation_sentences: i64,
}

/// Stored derived fields of a CV. Valid as of the last recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CvTotals {
    pub total_incomes: i64,
    pub total_movable_properties_value: i64,
    pub total_immovable_properties_value: i64,
    pub total_movable_immovable_properties_value: i64,
    pub total_penal_sentences: i64,
    pub total_obligation_sentences: i64,
    pub total_sentences: i64,
}

impl CvTotals {
    pub fn derive(incomes: &Incomes, aggregates: &ChildAggregates) -> Result<Self, TotalsOverflow> {
        let mut totals = Self {
            total_movable_properties_value: aggregates.movable_properties_value,
            total_immovable_properties_value: aggregates.immovable_properties_value,
            total_penal_sentences: aggregates.penal_sentences,
            total_obligation_sentences: aggregates.obligation_sentences,
            ..Self::default()
        };
        totals.refresh(incomes)?;
        Ok(totals)
    }

    /// Recomputes the income total and both grand totals from their parts.
    pub fn refresh(&mut self, incomes: &Incomes) -> Result<(), TotalsOverflow> {
        self.total_incomes = incomes.total()?;
        self.total_movable_immovable_properties_value = checked_sum(
            "total_movable_immovable_properties_value",
            [self.total_movable_properties_value, self.total_immovable_properties_value],
        )?;
        self.total_sentences = checked_sum(
            "total_sentences",
            [self.total_penal_sentences, self.total_obligation_sentences],
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCurriculumVitae {
    pub source_id: i64,
    pub profile: CvProfile,
    pub incomes: Incomes,
}

impl NewCurriculumVitae {
    /// Totals for a CV that has no child rows yet.
    pub fn initial_totals(&self) -> Result<CvTotals, TotalsOverflow> {
        CvTotals::derive(&self.incomes, &ChildAggregates::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumVitae {
    pub id: i64,
    pub source_id: i64,
    pub profile: CvProfile,
    pub incomes: Incomes,
    pub totals: CvTotals,
}

impl CurriculumVitae {
    /// Replaces the child-derived totals with fresh aggregates and refreshes
    /// every dependent total. Call before saving after child rows changed.
    pub fn recompute_totals(&mut self, aggregates: &ChildAggregates) -> Result<(), TotalsOverflow> {
        self.totals = CvTotals::derive(&self.incomes, aggregates)?;
        Ok(())
    }
}

/// A child row as stored: its own id plus the owning CV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: i64,
    pub cv_id: i64,
    #[serde(flatten)]
    pub record: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenalSentence {
    pub source_id: i64,
    pub file_number: String,
    pub criminal_sentence_date: NaiveDate,
    pub judicial_authority: String,
    pub criminal_offense: String,
    pub judgment: String,
    pub modality: String,
    pub other_modality: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationSentence {
    pub source_id: i64,
    pub demand_matter: String,
    pub file_number: String,
    pub judicial_authority: String,
    pub judgment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionalExperience {
    pub source_id: i64,
    pub workplace: String,
    pub position: String,
    pub starting_year: i32,
    pub ending_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversityEducation {
    pub source_id: i64,
    pub university: String,
    pub degree: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgraduateEducation {
    pub source_id: i64,
    pub study_center: String,
    pub specialty: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovableProperty {
    pub source_id: i64,
    pub property_type: String,
    pub features: String,
    pub value: i64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmovableProperty {
    pub source_id: i64,
    pub property_type: String,
    pub value: i64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartisanPosition {
    pub source_id: i64,
    pub political_organization_id: i64,
    pub starting_year: i32,
    pub ending_year: Option<i32>,
    pub position: String,
}

/// The eight child collections owned by a CV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CvSection {
    PenalSentences,
    ObligationSentences,
    ProfessionalExperiences,
    UniversityEducations,
    PostgraduateEducations,
    MovableProperties,
    ImmovableProperties,
    PartisanPositions,
}

impl CvSection {
    pub const ALL: [CvSection; 8] = [
        CvSection::PenalSentences,
        CvSection::ObligationSentences,
        CvSection::ProfessionalExperiences,
        CvSection::UniversityEducations,
        CvSection::PostgraduateEducations,
        CvSection::MovableProperties,
        CvSection::ImmovableProperties,
        CvSection::PartisanPositions,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CvSection::PenalSentences => "penal_sentences",
            CvSection::ObligationSentences => "obligation_sentences",
            CvSection::ProfessionalExperiences => "professional_experiences",
            CvSection::UniversityEducations => "university_educations",
            CvSection::PostgraduateEducations => "postgraduate_educations",
            CvSection::MovableProperties => "movable_properties",
            CvSection::ImmovableProperties => "immovable_properties",
            CvSection::PartisanPositions => "partisan_positions",
        }
    }
}

/// A child row ready for insertion, tagged by section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewCvEntry {
    PenalSentence(PenalSentence),
    ObligationSentence(ObligationSentence),
    ProfessionalExperience(ProfessionalExperience),
    UniversityEducation(UniversityEducation),
    PostgraduateEducation(PostgraduateEducation),
    MovableProperty(MovableProperty),
    ImmovableProperty(ImmovableProperty),
    PartisanPosition(PartisanPosition),
}

impl NewCvEntry {
    pub fn section(&self) -> CvSection {
        match self {
            NewCvEntry::PenalSentence(_) => CvSection::PenalSentences,
            NewCvEntry::ObligationSentence(_) => CvSection::ObligationSentences,
            NewCvEntry::ProfessionalExperience(_) => CvSection::ProfessionalExperiences,
            NewCvEntry::UniversityEducation(_) => CvSection::UniversityEducations,
            NewCvEntry::PostgraduateEducation(_) => CvSection::PostgraduateEducations,
            NewCvEntry::MovableProperty(_) => CvSection::MovableProperties,
            NewCvEntry::ImmovableProperty(_) => CvSection::ImmovableProperties,
            NewCvEntry::PartisanPosition(_) => CvSection::PartisanPositions,
        }
    }

    pub fn source_id(&self) -> i64 {
        match self {
            NewCvEntry::PenalSentence(r) => r.source_id,
            NewCvEntry::ObligationSentence(r) => r.source_id,
            NewCvEntry::ProfessionalExperience(r) => r.source_id,
            NewCvEntry::UniversityEducation(r) => r.source_id,
            NewCvEntry::PostgraduateEducation(r) => r.source_id,
            NewCvEntry::MovableProperty(r) => r.source_id,
            NewCvEntry::ImmovableProperty(r) => r.source_id,
            NewCvEntry::PartisanPosition(r) => r.source_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartisanPositionEntry {
    pub entry: Stored<PartisanPosition>,
    pub political_organization: Reference,
}

/// Every child row of one CV, grouped by section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CvEntries {
    pub penal_sentences: Vec<Stored<PenalSentence>>,
    pub obligation_sentences: Vec<Stored<ObligationSentence>>,
    pub professional_experiences: Vec<Stored<ProfessionalExperience>>,
    pub university_educations: Vec<Stored<UniversityEducation>>,
    pub postgraduate_educations: Vec<Stored<PostgraduateEducation>>,
    pub movable_properties: Vec<Stored<MovableProperty>>,
    pub immovable_properties: Vec<Stored<ImmovableProperty>>,
    pub partisan_positions: Vec<PartisanPositionEntry>,
}

impl CvEntries {
    pub fn aggregates(&self) -> Result<ChildAggregates, TotalsOverflow> {
        Ok(ChildAggregates {
            movable_properties_value: checked_sum(
                "total_movable_properties_value",
                self.movable_properties.iter().map(|p| p.record.value),
            )?,
            immovable_properties_value: checked_sum(
                "total_immovable_properties_value",
                self.immovable_properties.iter().map(|p| p.record.value),
            )?,
            penal_sentences: self.penal_sentences.len() as i64,
            obligation_sentences: self.obligation_sentences.len() as i64,
        })
    }
}

/// A candidate joined with everything the read API renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub candidate: Candidate,
    pub person: Person,
    pub election_type: Reference,
    pub position: Reference,
    pub political_organization: Reference,
    pub electoral_district: Option<Reference>,
    pub cv: Option<CurriculumVitae>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortMetric {
    TotalSentences,
    TotalPenalSentences,
    TotalObligationSentences,
    TotalIncomes,
}

impl SortMetric {
    pub fn code(&self) -> &'static str {
        match self {
            SortMetric::TotalSentences => "ts",
            SortMetric::TotalPenalSentences => "tps",
            SortMetric::TotalObligationSentences => "tos",
            SortMetric::TotalIncomes => "ti",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ts" => Some(SortMetric::TotalSentences),
            "tps" => Some(SortMetric::TotalPenalSentences),
            "tos" => Some(SortMetric::TotalObligationSentences),
            "ti" => Some(SortMetric::TotalIncomes),
            _ => None,
        }
    }

    pub fn value(&self, totals: &CvTotals) -> i64 {
        match self {
            SortMetric::TotalSentences => totals.total_sentences,
            SortMetric::TotalPenalSentences => totals.total_penal_sentences,
            SortMetric::TotalObligationSentences => totals.total_obligation_sentences,
            SortMetric::TotalIncomes => totals.total_incomes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Candidate list ordering: a CV metric plus a direction. Candidates without
/// a CV always sort after the ones that have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateOrdering {
    pub metric: SortMetric,
    pub direction: SortDirection,
}

impl CandidateOrdering {
    pub fn code(&self) -> String {
        match self.direction {
            SortDirection::Ascending => self.metric.code().to_string(),
            SortDirection::Descending => format!("-{}", self.metric.code()),
        }
    }

    /// Compares two candidates by their CV totals; a missing CV sorts last
    /// regardless of direction.
    pub fn compare(&self, a: Option<&CvTotals>, b: Option<&CvTotals>) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        let a = a.map(|totals| self.metric.value(totals));
        let b = b.map(|totals| self.metric.value(totals));
        match (a, b) {
            (Some(x), Some(y)) => match self.direction {
                SortDirection::Ascending => x.cmp(&y),
                SortDirection::Descending => y.cmp(&x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ordering '{0}': expected one of ts, tps, tos, ti with an optional leading '-'")]
pub struct UnknownOrdering(pub String);

impl FromStr for CandidateOrdering {
    type Err = UnknownOrdering;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (direction, code) = match trimmed.strip_prefix('-') {
            Some(rest) => (SortDirection::Descending, rest),
            None => (SortDirection::Ascending, trimmed),
        };
        SortMetric::from_code(code)
            .map(|metric| CandidateOrdering { metric, direction })
            .ok_or_else(|| UnknownOrdering(s.to_string()))
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<usize>, page_size: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Clamps the requested page against `total` rows and returns
    /// `(page, total_pages, offset)`.
    pub fn resolve(&self, total: usize) -> (usize, usize, usize) {
        let page_size = self.page_size.max(1);
        let total_pages = total.max(1).div_ceil(page_size);
        let page = self.page.clamp(1, total_pages);
        (page, total_pages, (page - 1) * page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Filters accepted by the candidate listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CandidateQuery {
    pub election_type_id: Option<i64>,
    pub political_organization_id: Option<i64>,
    pub ordering: Option<CandidateOrdering>,
    pub page: PageRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(first: &str, surname: &str, second: &str) -> Person {
        Person {
            id: 1,
            dni: "12345678".into(),
            first_name: first.into(),
            surname: surname.into(),
            second_surname: second.into(),
            birth_date: None,
            gender: Gender::Unknown,
        }
    }

    #[test]
    fn full_name_is_single_space_joined() {
        let p = person("ANA MARIA", "QUISPE", "ROJAS");
        assert_eq!(p.full_name(), "ANA MARIA QUISPE ROJAS");
    }

    #[test]
    fn candidate_full_name_tracks_person_on_refresh() {
        let p = person("LUIS", "PEREZ", "DIAZ");
        let mut candidate = Candidate {
            id: 7,
            source_id: 99,
            election_id: 1,
            election_type_id: 1,
            person_id: p.id,
            position_id: 1,
            political_organization_id: 1,
            electoral_district_id: None,
            ballot_position: 1,
            full_name: "stale".into(),
            status_on_list: ListStatus::Registered,
            cv_source_id: Some(5),
            cv_id: None,
            photo_url_path: "/fotos/1.jpg".into(),
        };
        candidate.attach_cv(3, &p);
        assert_eq!(candidate.cv_id, Some(3));
        assert_eq!(candidate.full_name, "LUIS PEREZ DIAZ");
        assert_eq!(candidate.photo_url(), "https://declara.jne.gob.pe/fotos/1.jpg");
    }

    #[test]
    fn gender_maps_only_code_one_to_male() {
        assert_eq!(Gender::from_source_code("1"), Gender::Male);
        assert_eq!(Gender::from_source_code("2"), Gender::Female);
        assert_eq!(Gender::from_source_code(""), Gender::Female);
        assert_eq!(Gender::from_code(Gender::Male.as_code()), Gender::Male);
        assert_eq!(Gender::from_code(""), Gender::Unknown);
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"F\"");
    }

    #[test]
    fn list_status_only_registered_is_on_list() {
        assert!(ListStatus::from("INSCRITO").is_on_list());
        assert!(!ListStatus::from("EXCLUIDO").is_on_list());
        assert_eq!(ListStatus::from("IMPROCEDENTE").as_str(), "IMPROCEDENTE");
        let json = serde_json::to_string(&ListStatus::Registered).unwrap();
        assert_eq!(json, "\"INSCRITO\"");
    }

    #[test]
    fn income_total_treats_missing_figures_as_zero() {
        let incomes = Incomes {
            incomes_year: Some(2020),
            gross_annual_remunerations_public: Some(1000),
            other_income_private: Some(250),
            ..Incomes::default()
        };
        assert_eq!(incomes.total(), Ok(1250));
        assert_eq!(Incomes::default().total(), Ok(0));
    }

    #[test]
    fn totals_that_overflow_are_errors() {
        let incomes = Incomes {
            gross_annual_remunerations_public: Some(9_000_000_000_000_000_000),
            gross_annual_remunerations_private: Some(9_000_000_000_000_000_000),
            ..Incomes::default()
        };
        assert_eq!(incomes.total(), Err(TotalsOverflow("total_incomes")));

        let mut cv = CurriculumVitae {
            id: 1,
            source_id: 10,
            profile: CvProfile::default(),
            incomes: Incomes::default(),
            totals: CvTotals::default(),
        };
        let err = cv
            .recompute_totals(&ChildAggregates {
                movable_properties_value: i64::MAX,
                immovable_properties_value: 1,
                ..ChildAggregates::default()
            })
            .unwrap_err();
        assert_eq!(err, TotalsOverflow("total_movable_immovable_properties_value"));
        assert_eq!(cv.totals, CvTotals::default());
    }

    #[test]
    fn recompute_totals_keeps_grand_totals_consistent() {
        let mut cv = CurriculumVitae {
            id: 1,
            source_id: 10,
            profile: CvProfile::default(),
            incomes: Incomes {
                gross_annual_remunerations_private: Some(500),
                ..Incomes::default()
            },
            totals: CvTotals::default(),
        };
        cv.recompute_totals(&ChildAggregates {
            movable_properties_value: 30,
            immovable_properties_value: 70,
            penal_sentences: 2,
            obligation_sentences: 1,
        })
        .unwrap();
        assert_eq!(cv.totals.total_incomes, 500);
        assert_eq!(cv.totals.total_movable_immovable_properties_value, 100);
        assert_eq!(cv.totals.total_sentences, 3);
        assert_eq!(
            cv.totals.total_sentences,
            cv.totals.total_penal_sentences + cv.totals.total_obligation_sentences
        );
    }

    #[test]
    fn unknown_ordering_names_the_accepted_codes() {
        let err = "total".parse::<CandidateOrdering>().unwrap_err();
        assert_eq!(err, UnknownOrdering("total".into()));
        let source: &dyn std::error::Error = &err;
        assert_eq!(
            source.to_string(),
            "unknown ordering 'total': expected one of ts, tps, tos, ti with an optional leading '-'"
        );
    }

    #[test]
    fn ordering_codes_parse_with_optional_sign() {
        let desc: CandidateOrdering = "-ti".parse().unwrap();
        assert_eq!(desc.metric, SortMetric::TotalIncomes);
        assert_eq!(desc.direction, SortDirection::Descending);
        let asc: CandidateOrdering = "tps".parse().unwrap();
        assert_eq!(asc.direction, SortDirection::Ascending);
        assert_eq!(asc.code(), "tps");
        assert!("total".parse::<CandidateOrdering>().is_err());
        assert!("--ts".parse::<CandidateOrdering>().is_err());
    }

    #[test]
    fn missing_cv_sorts_last_in_both_directions() {
        use std::cmp::Ordering;

        let low = CvTotals {
            total_incomes: 10,
            ..CvTotals::default()
        };
        let high = CvTotals {
            total_incomes: 90,
            ..CvTotals::default()
        };
        let desc: CandidateOrdering = "-ti".parse().unwrap();
        let asc: CandidateOrdering = "ti".parse().unwrap();

        assert_eq!(desc.compare(Some(&high), Some(&low)), Ordering::Less);
        assert_eq!(asc.compare(Some(&high), Some(&low)), Ordering::Greater);
        assert_eq!(desc.compare(None, Some(&low)), Ordering::Greater);
        assert_eq!(asc.compare(None, Some(&low)), Ordering::Greater);
        assert_eq!(asc.compare(None, None), Ordering::Equal);
    }

    #[test]
    fn page_request_clamps_to_last_page() {
        let req = PageRequest::new(Some(9), Some(10));
        assert_eq!(req.resolve(25), (3, 3, 20));
        assert_eq!(req.resolve(0), (1, 1, 0));
        assert_eq!(PageRequest::new(Some(0), Some(100_000)).page_size, MAX_PAGE_SIZE);
    }
}
