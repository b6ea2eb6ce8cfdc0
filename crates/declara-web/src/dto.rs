//! JSON shapes served by the read API.

use chrono::NaiveDate;
use declara_core::{
    CandidateRecord, CvEntries, ElectionProcess, Gender, ImmovableProperty, ListStatus,
    MovableProperty, ObligationSentence, PartisanPositionEntry, PenalSentence,
    PostgraduateEducation, ProfessionalExperience, Reference, Stored, UniversityEducation,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ElectionDto {
    pub id: i64,
    pub name: String,
    pub jne_id: i64,
}

impl From<ElectionProcess> for ElectionDto {
    fn from(process: ElectionProcess) -> Self {
        Self {
            id: process.id,
            name: process.fields.name,
            jne_id: process.source_id,
        }
    }
}

/// A reference row with its local id: election types and nested objects.
#[derive(Debug, Serialize)]
pub struct ReferenceDto {
    pub id: i64,
    pub name: String,
    pub jne_id: Option<i64>,
}

impl From<&Reference> for ReferenceDto {
    fn from(reference: &Reference) -> Self {
        Self {
            id: reference.id,
            name: reference.name.clone(),
            jne_id: reference.source_id(),
        }
    }
}

/// Positions and political organizations as listed under an election.
#[derive(Debug, Serialize)]
pub struct NamedReferenceDto {
    pub name: String,
    pub jne_id: Option<i64>,
}

impl From<&Reference> for NamedReferenceDto {
    fn from(reference: &Reference) -> Self {
        Self {
            name: reference.name.clone(),
            jne_id: reference.source_id(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DistrictDto {
    pub name: String,
    pub ubigeo: String,
}

impl From<&Reference> for DistrictDto {
    fn from(reference: &Reference) -> Self {
        Self {
            name: reference.name.clone(),
            ubigeo: reference.ubigeo().unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DistrictRefDto {
    pub id: i64,
    pub name: String,
    pub ubigeo: String,
}

impl From<&Reference> for DistrictRefDto {
    fn from(reference: &Reference) -> Self {
        Self {
            id: reference.id,
            name: reference.name.clone(),
            ubigeo: reference.ubigeo().unwrap_or_default().to_string(),
        }
    }
}

/// One candidate row. Every CV-derived field is `null` when no CV is attached.
#[derive(Debug, Serialize)]
pub struct CandidateDto {
    pub id: i64,
    pub dni: String,
    pub first_name: String,
    pub surname: String,
    pub second_surname: String,
    pub full_name: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub residence_ubigeo: Option<String>,
    pub birth_ubigeo: Option<String>,
    pub primary_school: Option<bool>,
    pub concluded_primary_school: Option<bool>,
    pub high_school: Option<bool>,
    pub concluded_high_school: Option<bool>,
    pub has_technical_education: Option<bool>,
    pub has_non_university_education: Option<bool>,
    pub additional_information: Option<String>,
    pub photo_url: String,
    pub jne_id: i64,
    pub position: ReferenceDto,
    pub ballot_position: i32,
    pub political_organization: ReferenceDto,
    pub electoral_district: Option<DistrictRefDto>,
    pub election_type: ReferenceDto,
    pub status_on_list: ListStatus,
    pub total_incomes: Option<i64>,
    pub gross_annual_remunerations_public: Option<i64>,
    pub gross_annual_remunerations_private: Option<i64>,
    pub gross_annual_income_per_individual_year_public: Option<i64>,
    pub gross_annual_income_per_individual_year_private: Option<i64>,
    pub other_income_public: Option<i64>,
    pub other_income_private: Option<i64>,
    pub total_sentences: Option<i64>,
    pub total_penal_sentences: Option<i64>,
    pub total_obligation_sentences: Option<i64>,
}

impl From<&CandidateRecord> for CandidateDto {
    fn from(record: &CandidateRecord) -> Self {
        let CandidateRecord {
            candidate,
            person,
            election_type,
            position,
            political_organization,
            electoral_district,
            cv,
        } = record;
        let cv = cv.as_ref();
        let profile = cv.map(|cv| &cv.profile);
        let incomes = cv.map(|cv| &cv.incomes);
        let totals = cv.map(|cv| &cv.totals);
        Self {
            id: candidate.id,
            dni: person.dni.clone(),
            first_name: person.first_name.clone(),
            surname: person.surname.clone(),
            second_surname: person.second_surname.clone(),
            full_name: candidate.full_name.clone(),
            gender: person.gender,
            birth_date: person.birth_date,
            residence_ubigeo: profile.map(|p| p.residence_ubigeo.clone()),
            birth_ubigeo: profile.map(|p| p.birth_ubigeo.clone()),
            primary_school: profile.map(|p| p.primary_school),
            concluded_primary_school: profile.map(|p| p.concluded_primary_school),
            high_school: profile.map(|p| p.high_school),
            concluded_high_school: profile.map(|p| p.concluded_high_school),
            has_technical_education: profile.and_then(|p| p.has_technical_education),
            has_non_university_education: profile.and_then(|p| p.has_non_university_education),
            additional_information: profile.map(|p| p.additional_information.clone()),
            photo_url: candidate.photo_url(),
            jne_id: candidate.source_id,
            position: position.into(),
            ballot_position: candidate.ballot_position,
            political_organization: political_organization.into(),
            electoral_district: electoral_district.as_ref().map(DistrictRefDto::from),
            election_type: election_type.into(),
            status_on_list: candidate.status_on_list.clone(),
            total_incomes: totals.map(|t| t.total_incomes),
            gross_annual_remunerations_public: incomes
                .and_then(|i| i.gross_annual_remunerations_public),
            gross_annual_remunerations_private: incomes
                .and_then(|i| i.gross_annual_remunerations_private),
            gross_annual_income_per_individual_year_public: incomes
                .and_then(|i| i.gross_annual_income_per_individual_year_public),
            gross_annual_income_per_individual_year_private: incomes
                .and_then(|i| i.gross_annual_income_per_individual_year_private),
            other_income_public: incomes.and_then(|i| i.other_income_public),
            other_income_private: incomes.and_then(|i| i.other_income_private),
            total_sentences: totals.map(|t| t.total_sentences),
            total_penal_sentences: totals.map(|t| t.total_penal_sentences),
            total_obligation_sentences: totals.map(|t| t.total_obligation_sentences),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PenalSentenceDto {
    pub file_number: String,
    pub criminal_sentence_date: NaiveDate,
    pub judicial_authority: String,
    pub criminal_offense: String,
    pub judgment: String,
    pub modality: String,
    pub other_modality: String,
    pub jne_id: i64,
}

impl From<&Stored<PenalSentence>> for PenalSentenceDto {
    fn from(row: &Stored<PenalSentence>) -> Self {
        let r = &row.record;
        Self {
            file_number: r.file_number.clone(),
            criminal_sentence_date: r.criminal_sentence_date,
            judicial_authority: r.judicial_authority.clone(),
            criminal_offense: r.criminal_offense.clone(),
            judgment: r.judgment.clone(),
            modality: r.modality.clone(),
            other_modality: r.other_modality.clone(),
            jne_id: r.source_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ObligationSentenceDto {
    pub demand_matter: String,
    pub file_number: String,
    pub judicial_authority: String,
    pub judgment: String,
    pub jne_id: i64,
}

impl From<&Stored<ObligationSentence>> for ObligationSentenceDto {
    fn from(row: &Stored<ObligationSentence>) -> Self {
        let r = &row.record;
        Self {
            demand_matter: r.demand_matter.clone(),
            file_number: r.file_number.clone(),
            judicial_authority: r.judicial_authority.clone(),
            judgment: r.judgment.clone(),
            jne_id: r.source_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfessionalExperienceDto {
    pub workplace: String,
    pub position: String,
    pub starting_year: i32,
    pub ending_year: Option<i32>,
    pub jne_id: i64,
}

impl From<&Stored<ProfessionalExperience>> for ProfessionalExperienceDto {
    fn from(row: &Stored<ProfessionalExperience>) -> Self {
        let r = &row.record;
        Self {
            workplace: r.workplace.clone(),
            position: r.position.clone(),
            starting_year: r.starting_year,
            ending_year: r.ending_year,
            jne_id: r.source_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UniversityEducationDto {
    pub university: String,
    pub degree: String,
    pub year: Option<i32>,
    pub jne_id: i64,
}

impl From<&Stored<UniversityEducation>> for UniversityEducationDto {
    fn from(row: &Stored<UniversityEducation>) -> Self {
        let r = &row.record;
        Self {
            university: r.university.clone(),
            degree: r.degree.clone(),
            year: r.year,
            jne_id: r.source_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostgraduateEducationDto {
    pub study_center: String,
    pub specialty: String,
    pub year: Option<i32>,
    pub jne_id: i64,
}

impl From<&Stored<PostgraduateEducation>> for PostgraduateEducationDto {
    fn from(row: &Stored<PostgraduateEducation>) -> Self {
        let r = &row.record;
        Self {
            study_center: r.study_center.clone(),
            specialty: r.specialty.clone(),
            year: r.year,
            jne_id: r.source_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovablePropertyDto {
    pub property_type: String,
    pub features: String,
    pub value: i64,
    pub comment: String,
    pub jne_id: i64,
}

impl From<&Stored<MovableProperty>> for MovablePropertyDto {
    fn from(row: &Stored<MovableProperty>) -> Self {
        let r = &row.record;
        Self {
            property_type: r.property_type.clone(),
            features: r.features.clone(),
            value: r.value,
            comment: r.comment.clone(),
            jne_id: r.source_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImmovablePropertyDto {
    pub property_type: String,
    pub value: i64,
    pub comment: String,
    pub jne_id: i64,
}

impl From<&Stored<ImmovableProperty>> for ImmovablePropertyDto {
    fn from(row: &Stored<ImmovableProperty>) -> Self {
        let r = &row.record;
        Self {
            property_type: r.property_type.clone(),
            value: r.value,
            comment: r.comment.clone(),
            jne_id: r.source_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PartisanPositionDto {
    pub political_organization: ReferenceDto,
    pub starting_year: i32,
    pub ending_year: Option<i32>,
    pub position: String,
    pub jne_id: i64,
}

impl From<&PartisanPositionEntry> for PartisanPositionDto {
    fn from(row: &PartisanPositionEntry) -> Self {
        let r = &row.entry.record;
        Self {
            political_organization: (&row.political_organization).into(),
            starting_year: r.starting_year,
            ending_year: r.ending_year,
            position: r.position.clone(),
            jne_id: r.source_id,
        }
    }
}

/// The list row plus the eight child collections, empty without a CV.
#[derive(Debug, Serialize)]
pub struct CandidateDetailDto {
    #[serde(flatten)]
    pub candidate: CandidateDto,
    pub penal_sentences: Vec<PenalSentenceDto>,
    pub obligation_sentences: Vec<ObligationSentenceDto>,
    pub professional_experiences: Vec<ProfessionalExperienceDto>,
    pub university_educations: Vec<UniversityEducationDto>,
    pub postgraduate_educations: Vec<PostgraduateEducationDto>,
    pub movable_properties: Vec<MovablePropertyDto>,
    pub immovable_properties: Vec<ImmovablePropertyDto>,
    pub partisan_positions: Vec<PartisanPositionDto>,
}

fn rows<'a, T: 'a, D: From<&'a T>>(items: &'a [T]) -> Vec<D> {
    items.iter().map(D::from).collect()
}

impl CandidateDetailDto {
    pub fn new(record: &CandidateRecord, entries: &CvEntries) -> Self {
        Self {
            candidate: record.into(),
            penal_sentences: rows(&entries.penal_sentences),
            obligation_sentences: rows(&entries.obligation_sentences),
            professional_experiences: rows(&entries.professional_experiences),
            university_educations: rows(&entries.university_educations),
            postgraduate_educations: rows(&entries.postgraduate_educations),
            movable_properties: rows(&entries.movable_properties),
            immovable_properties: rows(&entries.immovable_properties),
            partisan_positions: rows(&entries.partisan_positions),
        }
    }
}
