//! Source payload → entity field mappings, one function per record kind.

use declara_adapters::{
    is_code_one, parse_amount, parse_date, parse_flag, parse_int, parse_opt_int, parse_opt_year,
    parse_year, text, CandidateItem, ElectionProcessItem, ImmovablePropertyItem, IncomeSection,
    MovablePropertyItem, ObligationSentenceItem, PartisanPositionItem, PenalSentenceItem,
    PostgraduateItem, Resume, SourceDataError, SourceItem, UniversityItem, WorkExperienceItem,
};
use declara_core::{
    CvProfile, ElectionProcessFields, Gender, ImmovableProperty, Incomes, MovableProperty,
    NewCurriculumVitae, NewCvEntry, NewPerson, ObligationSentence, PartisanPosition,
    PostgraduateEducation, ProfessionalExperience, PenalSentence, UniversityEducation,
};

/// Name and dates of a process. The id is read separately so processes outside
/// the allow-list are skipped before their dates are parsed.
pub fn map_election_process(
    item: &ElectionProcessItem,
) -> Result<ElectionProcessFields, SourceDataError> {
    Ok(ElectionProcessFields {
        name: text(&item.name),
        call_date: parse_date("strFechaConvocatoria", &item.call_date)?,
        registration_date: parse_date("strFechaRegistro", &item.registration_date)?,
        opening_date: parse_date("strFechaAperturaProceso", &item.opening_date)?,
        closing_date: parse_date("strFechaCierreProceso", &item.closing_date)?,
    })
}

pub fn map_person(item: &CandidateItem) -> Result<NewPerson, SourceDataError> {
    let dni = text(&item.dni).trim().to_string();
    if dni.is_empty() {
        return Err(SourceDataError::MissingField {
            field: "strDocumentoIdentidad",
        });
    }
    Ok(NewPerson {
        dni,
        first_name: text(&item.first_name),
        surname: text(&item.surname),
        second_surname: text(&item.second_surname),
        birth_date: parse_date("strFechaNacimiento", &item.birth_date)?,
        gender: Gender::from_source_code(&text(&item.sex)),
    })
}

/// The candidate's CV id, when the source provides a real one.
pub fn candidate_cv_source_id(item: &CandidateItem) -> Result<Option<i64>, SourceDataError> {
    Ok(parse_opt_int("idHojaVida", &item.cv_id)?.filter(|id| *id != 0))
}

pub fn candidate_ballot_position(item: &CandidateItem) -> Result<i32, SourceDataError> {
    let position = parse_int("intPosicion", &item.ballot_position)?;
    i32::try_from(position)
        .ok()
        .filter(|p| *p >= 0)
        .ok_or(SourceDataError::BadNumber {
            field: "intPosicion",
            value: position.to_string(),
        })
}

/// The six figures must also sum within range, since the CV stores their total.
pub fn map_incomes(section: &IncomeSection) -> Result<Incomes, SourceDataError> {
    let incomes = Incomes {
        incomes_year: parse_opt_year("strAnioIngresos", &section.year)?,
        gross_annual_remunerations_public: parse_amount(
            "decRemuBrutaPublico",
            &section.gross_remunerations_public,
        )?,
        gross_annual_remunerations_private: parse_amount(
            "decRemuBrutaPrivado",
            &section.gross_remunerations_private,
        )?,
        gross_annual_income_per_individual_year_public: parse_amount(
            "decRentaIndividualPublico",
            &section.individual_income_public,
        )?,
        gross_annual_income_per_individual_year_private: parse_amount(
            "decRentaIndividualPrivado",
            &section.individual_income_private,
        )?,
        other_income_public: parse_amount("decOtroIngresoPublico", &section.other_income_public)?,
        other_income_private: parse_amount("decOtroIngresoPrivado", &section.other_income_private)?,
    };
    if let Err(overflow) = incomes.total() {
        return Err(SourceDataError::OutOfRange {
            field: "oIngresos",
            value: overflow.to_string(),
        });
    }
    Ok(incomes)
}

/// CV defaults from the personal, education and income sections. Missing
/// sections read as empty; an undeclared income block leaves every figure
/// `None`.
pub fn map_curriculum_vitae(
    source_id: i64,
    resume: &Resume,
) -> Result<NewCurriculumVitae, SourceDataError> {
    let personal = resume.personal.clone().unwrap_or_default();
    let basic = resume.basic_education.clone().unwrap_or_default();
    let profile = CvProfile {
        residence_address: text(&personal.residence_address),
        residence_department: text(&personal.residence_department),
        residence_province: text(&personal.residence_province),
        residence_district: text(&personal.residence_district),
        residence_ubigeo: text(&personal.residence_ubigeo),
        birth_country: text(&personal.birth_country),
        birth_department: text(&personal.birth_department),
        birth_province: text(&personal.birth_province),
        birth_district: text(&personal.birth_district),
        birth_ubigeo: text(&personal.birth_ubigeo),
        primary_school: is_code_one(&basic.primary_school),
        concluded_primary_school: is_code_one(&basic.concluded_primary_school),
        high_school: is_code_one(&basic.high_school),
        concluded_high_school: is_code_one(&basic.concluded_high_school),
        has_technical_education: resume
            .technical_education
            .as_ref()
            .and_then(|s| parse_flag(&s.has_any)),
        has_non_university_education: resume
            .non_university_education
            .as_ref()
            .and_then(|s| parse_flag(&s.has_any)),
        additional_information: resume
            .additional_info
            .as_ref()
            .map(|info| text(&info.text))
            .unwrap_or_default(),
    };
    let incomes = match resume.declared_incomes() {
        Some(section) => map_incomes(section)?,
        None => Incomes::default(),
    };
    Ok(NewCurriculumVitae {
        source_id,
        profile,
        incomes,
    })
}

fn item_id(field: &'static str, item: &impl SourceItem) -> Result<i64, SourceDataError> {
    parse_int(field, &item.raw_id().map(str::to_string))
}

fn required_amount(field: &'static str, raw: &Option<String>) -> Result<i64, SourceDataError> {
    parse_amount(field, raw)?.ok_or(SourceDataError::MissingField { field })
}

pub fn map_penal_sentence(item: &PenalSentenceItem) -> Result<PenalSentence, SourceDataError> {
    Ok(PenalSentence {
        source_id: item_id("idHVSentenciaPenal", item)?,
        file_number: text(&item.file_number),
        criminal_sentence_date: parse_date("fechaSentenciaPenal", &item.sentence_date)?.ok_or(
            SourceDataError::MissingField {
                field: "fechaSentenciaPenal",
            },
        )?,
        judicial_authority: text(&item.judicial_authority),
        criminal_offense: text(&item.offense),
        judgment: text(&item.judgment),
        modality: text(&item.modality),
        other_modality: text(&item.other_modality),
    })
}

pub fn map_obligation_sentence(
    item: &ObligationSentenceItem,
) -> Result<ObligationSentence, SourceDataError> {
    Ok(ObligationSentence {
        source_id: item_id("idHVSentenciaObliga", item)?,
        demand_matter: text(&item.matter),
        file_number: text(&item.file_number),
        judicial_authority: text(&item.judicial_authority),
        judgment: text(&item.judgment),
    })
}

pub fn map_professional_experience(
    item: &WorkExperienceItem,
) -> Result<ProfessionalExperience, SourceDataError> {
    Ok(ProfessionalExperience {
        source_id: item_id("idHVExpeLaboral", item)?,
        workplace: text(&item.workplace),
        position: text(&item.occupation),
        starting_year: parse_year("anioTrabajoDesde", &item.from_year)?,
        ending_year: parse_opt_year("anioTrabajoHasta", &item.to_year)?,
    })
}

pub fn map_university_education(
    item: &UniversityItem,
) -> Result<UniversityEducation, SourceDataError> {
    Ok(UniversityEducation {
        source_id: item_id("idHVEduUniversitaria", item)?,
        university: text(&item.university),
        degree: text(&item.degree),
        year: parse_opt_year("anioBachiller", &item.year)?,
    })
}

pub fn map_postgraduate_education(
    item: &PostgraduateItem,
) -> Result<PostgraduateEducation, SourceDataError> {
    Ok(PostgraduateEducation {
        source_id: item_id("idHVPosgrado", item)?,
        study_center: text(&item.study_center),
        specialty: text(&item.specialty),
        year: parse_opt_year("anioPosgrado", &item.year)?,
    })
}

pub fn map_movable_property(item: &MovablePropertyItem) -> Result<MovableProperty, SourceDataError> {
    Ok(MovableProperty {
        source_id: item_id("idHVBienMueble", item)?,
        property_type: text(&item.vehicle),
        features: text(&item.features),
        value: required_amount("decValor", &item.value)?,
        comment: text(&item.comment),
    })
}

pub fn map_immovable_property(
    item: &ImmovablePropertyItem,
) -> Result<ImmovableProperty, SourceDataError> {
    Ok(ImmovableProperty {
        source_id: item_id("idHVBienInmueble", item)?,
        property_type: text(&item.property_type),
        value: required_amount("decAutovaluo", &item.value)?,
        comment: text(&item.comment),
    })
}

/// A partisan position whose organization is not resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartisanPositionDraft {
    pub source_id: i64,
    pub organization_source_id: i64,
    pub organization_name: String,
    pub starting_year: i32,
    pub ending_year: Option<i32>,
    pub position: String,
}

impl PartisanPositionDraft {
    pub fn into_entry(self, political_organization_id: i64) -> PartisanPosition {
        PartisanPosition {
            source_id: self.source_id,
            political_organization_id,
            starting_year: self.starting_year,
            ending_year: self.ending_year,
            position: self.position,
        }
    }
}

pub fn map_partisan_position(
    item: &PartisanPositionItem,
) -> Result<PartisanPositionDraft, SourceDataError> {
    Ok(PartisanPositionDraft {
        source_id: item_id("idHVCargoPartidario", item)?,
        organization_source_id: parse_int("idOrgPolCargoPartidario", &item.organization_id)?,
        organization_name: text(&item.organization_name),
        starting_year: parse_year("anioCargoPartiDesde", &item.from_year)?,
        ending_year: parse_opt_year("anioCargoPartiHasta", &item.to_year)?,
        position: text(&item.position),
    })
}

/// Every non-placeholder child item of a CV, already typed. Partisan
/// positions still need their organization resolved against the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedCvEntries {
    pub entries: Vec<NewCvEntry>,
    pub partisan_positions: Vec<PartisanPositionDraft>,
}

impl MappedCvEntries {
    pub fn len(&self) -> usize {
        self.entries.len() + self.partisan_positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maps all eight child sections, failing on the first malformed item.
pub fn map_cv_entries(resume: &Resume) -> Result<MappedCvEntries, SourceDataError> {
    let mut entries = Vec::new();
    for item in resume.penal_sentences.entries() {
        entries.push(NewCvEntry::PenalSentence(map_penal_sentence(item)?));
    }
    for item in resume.obligation_sentences.entries() {
        entries.push(NewCvEntry::ObligationSentence(map_obligation_sentence(item)?));
    }
    for item in resume.work_experience.entries() {
        entries.push(NewCvEntry::ProfessionalExperience(
            map_professional_experience(item)?,
        ));
    }
    for item in resume.university_education.entries() {
        entries.push(NewCvEntry::UniversityEducation(map_university_education(item)?));
    }
    for item in resume.postgraduate_education.entries() {
        entries.push(NewCvEntry::PostgraduateEducation(
            map_postgraduate_education(item)?,
        ));
    }
    for item in resume.movable_properties.entries() {
        entries.push(NewCvEntry::MovableProperty(map_movable_property(item)?));
    }
    for item in resume.immovable_properties.entries() {
        entries.push(NewCvEntry::ImmovableProperty(map_immovable_property(item)?));
    }
    let partisan_positions = resume
        .partisan_positions
        .entries()
        .map(map_partisan_position)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MappedCvEntries {
        entries,
        partisan_positions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn resume(value: serde_json::Value) -> Resume {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn person_gender_and_birth_date() {
        let item: CandidateItem = serde_json::from_value(json!({
            "strDocumentoIdentidad": " 40123456 ",
            "strNombreCompleto": "ROSA",
            "strApellidoPaterno": "MAMANI",
            "strApellidoMaterno": "CCAMA",
            "strFechaNacimiento": "05/11/1968",
            "strSexo": "2"
        }))
        .unwrap();
        let person = map_person(&item).unwrap();
        assert_eq!(person.dni, "40123456");
        assert_eq!(person.gender, Gender::Female);
        assert_eq!(person.birth_date, NaiveDate::from_ymd_opt(1968, 11, 5));
        assert_eq!(person.full_name(), "ROSA MAMANI CCAMA");
    }

    #[test]
    fn person_without_document_is_rejected() {
        let item = CandidateItem::default();
        assert_eq!(
            map_person(&item),
            Err(SourceDataError::MissingField {
                field: "strDocumentoIdentidad"
            })
        );
    }

    #[test]
    fn zero_cv_id_means_no_cv() {
        let item: CandidateItem = serde_json::from_value(json!({"idHojaVida": 0})).unwrap();
        assert_eq!(candidate_cv_source_id(&item).unwrap(), None);
        let item: CandidateItem = serde_json::from_value(json!({"idHojaVida": "812"})).unwrap();
        assert_eq!(candidate_cv_source_id(&item).unwrap(), Some(812));
    }

    #[test]
    fn empty_income_block_leaves_figures_unset() {
        let cv = map_curriculum_vitae(
            5,
            &resume(json!({
                "oIngresos": {"idHVIngresos": 0, "decRemuBrutaPublico": "999"},
                "oEduBasica": {"strEduPrimaria": "1", "strConcluidoEduPrimaria": "2"}
            })),
        )
        .unwrap();
        assert_eq!(cv.incomes, Incomes::default());
        assert_eq!(cv.initial_totals().unwrap().total_incomes, 0);
        assert!(cv.profile.primary_school);
        assert!(!cv.profile.concluded_primary_school);
        assert_eq!(cv.profile.has_technical_education, None);
    }

    #[test]
    fn declared_incomes_are_summed() {
        let cv = map_curriculum_vitae(
            6,
            &resume(json!({
                "oIngresos": {
                    "idHVIngresos": 12,
                    "strAnioIngresos": "2020",
                    "decRemuBrutaPublico": "1000.00",
                    "decOtroIngresoPrivado": 250
                },
                "oEduTecnico": {"tengoEduTecnico": true}
            })),
        )
        .unwrap();
        assert_eq!(cv.incomes.incomes_year, Some(2020));
        assert_eq!(cv.incomes.gross_annual_remunerations_private, None);
        assert_eq!(cv.initial_totals().unwrap().total_incomes, 1250);
        assert_eq!(cv.profile.has_technical_education, Some(true));
    }

    #[test]
    fn income_sum_out_of_range_is_a_data_error() {
        let err = map_curriculum_vitae(
            8,
            &resume(json!({"oIngresos": {
                "idHVIngresos": 3,
                "decRemuBrutaPublico": "9000000000000000000",
                "decRemuBrutaPrivado": "9000000000000000000"
            }})),
        )
        .unwrap_err();
        assert!(matches!(err, SourceDataError::OutOfRange { field: "oIngresos", .. }));
    }

    #[test]
    fn negative_income_is_a_data_error() {
        let err = map_curriculum_vitae(
            7,
            &resume(json!({"oIngresos": {"idHVIngresos": 1, "decOtroIngresoPublico": "-10"}})),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SourceDataError::NegativeAmount {
                field: "decOtroIngresoPublico",
                ..
            }
        ));
    }

    #[test]
    fn child_sections_drop_placeholders_and_keep_order() {
        let mapped = map_cv_entries(&resume(json!({
            "lSentenciaPenal": [
                {"idHVSentenciaPenal": 0},
                {"idHVSentenciaPenal": 41, "fechaSentenciaPenal": "2014-01-20", "strDelitoPenal": "OMISION"}
            ],
            "lBienMueble": {"idHVBienMueble": 9, "strVehiculo": "MOTO", "decValor": "4500"},
            "lCargoPartidario": [{
                "idHVCargoPartidario": 3,
                "idOrgPolCargoPartidario": 1366,
                "strOrgPolCargoPartidario": "PARTIDO UNO",
                "anioCargoPartiDesde": "2011",
                "anioCargoPartiHasta": "",
                "strCargoPartidario": "DELEGADO"
            }]
        })))
        .unwrap();
        assert_eq!(mapped.entries.len(), 2);
        assert_eq!(mapped.len(), 3);
        assert!(matches!(&mapped.entries[0], NewCvEntry::PenalSentence(s) if s.source_id == 41));
        assert!(matches!(&mapped.entries[1], NewCvEntry::MovableProperty(p) if p.value == 4500));
        let draft = &mapped.partisan_positions[0];
        assert_eq!(draft.organization_source_id, 1366);
        assert_eq!(draft.ending_year, None);
        assert_eq!(draft.clone().into_entry(77).political_organization_id, 77);
    }

    #[test]
    fn penal_sentence_needs_a_date() {
        let err = map_cv_entries(&resume(json!({
            "lSentenciaPenal": [{"idHVSentenciaPenal": 5, "fechaSentenciaPenal": ""}]
        })))
        .unwrap_err();
        assert_eq!(
            err,
            SourceDataError::MissingField {
                field: "fechaSentenciaPenal"
            }
        );
    }

    #[test]
    fn property_value_must_be_present() {
        let err = map_immovable_property(&ImmovablePropertyItem {
            id: Some("4".into()),
            ..ImmovablePropertyItem::default()
        })
        .unwrap_err();
        assert_eq!(err, SourceDataError::MissingField { field: "decAutovaluo" });
    }
}
