//! Wire shapes of the submission form and their per-entity validators.
//!
//! Inputs keep raw strings for select fields and raw JSON values for years,
//! so an unknown or non-numeric value becomes a field error rather than a
//! body rejection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::choices::{AgeBracket, ComputerProficiency, LanguageProficiency, MembershipType};
use crate::models::sections::{
    NewAward, NewComputerSkill, NewEducation, NewGrant, NewLanguageSkill, NewMembership,
    NewOtherInstitution, NewPatent, NewProject, NewResearchArea, NewTraining,
};
use crate::submission::validation::{
    choice, optional_text, optional_year, push, required_text, year, FieldErrors,
    END_BEFORE_START,
};

/// One row of a repeatable section.
pub trait RowForm {
    type Valid;

    /// Rows flagged for deletion are skipped entirely.
    fn marked_for_deletion(&self) -> bool;

    fn validate(&self) -> Result<Self::Valid, FieldErrors>;
}

fn finish<T>(errors: FieldErrors, valid: impl FnOnce() -> Option<T>) -> Result<T, FieldErrors> {
    if !errors.is_empty() {
        return Err(errors);
    }
    // All required parts are present when no error was recorded.
    valid().ok_or(errors)
}

/// Root profile fields. The email of record never comes from here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub unit: Option<Uuid>,
    #[serde(default)]
    pub age_bracket: String,
}

/// Validated root fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidProfile {
    pub name: String,
    pub phone: String,
    pub unit_id: Option<Uuid>,
    pub age_bracket: AgeBracket,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<ValidProfile, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", &self.name, 100);
        let phone = required_text(&mut errors, "phone", &self.phone, 20);
        let age_bracket = choice(
            &mut errors,
            "age_bracket",
            &self.age_bracket,
            AgeBracket::parse,
        );
        finish(errors, || {
            Some(ValidProfile {
                name,
                phone,
                unit_id: self.unit,
                age_bracket: age_bracket?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageInput {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub proficiency: String,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for LanguageInput {
    type Valid = NewLanguageSkill;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewLanguageSkill, FieldErrors> {
        let mut errors = FieldErrors::new();
        let language = required_text(&mut errors, "language", &self.language, 50);
        let proficiency = choice(
            &mut errors,
            "proficiency",
            &self.proficiency,
            LanguageProficiency::parse,
        );
        finish(errors, || {
            Some(NewLanguageSkill {
                language,
                proficiency: proficiency?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputerSkillInput {
    #[serde(default)]
    pub skill: String,
    #[serde(default)]
    pub proficiency: String,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for ComputerSkillInput {
    type Valid = NewComputerSkill;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewComputerSkill, FieldErrors> {
        let mut errors = FieldErrors::new();
        let skill = required_text(&mut errors, "skill", &self.skill, 100);
        let proficiency = choice(
            &mut errors,
            "proficiency",
            &self.proficiency,
            ComputerProficiency::parse,
        );
        finish(errors, || {
            Some(NewComputerSkill {
                skill,
                proficiency: proficiency?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EducationInput {
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for EducationInput {
    type Valid = NewEducation;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewEducation, FieldErrors> {
        let mut errors = FieldErrors::new();
        let institution = required_text(&mut errors, "institution", &self.institution, 200);
        let degree = required_text(&mut errors, "degree", &self.degree, 100);
        let year = year(&mut errors, "year", self.year.as_ref());
        finish(errors, || {
            Some(NewEducation {
                institution,
                degree,
                year: year?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipInput {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub membership_type: String,
    #[serde(default)]
    pub year_joined: Option<Value>,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for MembershipInput {
    type Valid = NewMembership;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewMembership, FieldErrors> {
        let mut errors = FieldErrors::new();
        let organization = required_text(&mut errors, "organization", &self.organization, 150);
        let membership_type = choice(
            &mut errors,
            "membership_type",
            &self.membership_type,
            MembershipType::parse,
        );
        let year_joined = year(&mut errors, "year_joined", self.year_joined.as_ref());
        finish(errors, || {
            Some(NewMembership {
                organization,
                membership_type: membership_type?,
                year_joined: year_joined?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchAreaInput {
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for ResearchAreaInput {
    type Valid = NewResearchArea;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewResearchArea, FieldErrors> {
        let mut errors = FieldErrors::new();
        let area = required_text(&mut errors, "area", &self.area, 200);
        finish(errors, || Some(NewResearchArea { area }))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for TrainingInput {
    type Valid = NewTraining;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewTraining, FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = required_text(&mut errors, "title", &self.title, 200);
        let institution = required_text(&mut errors, "institution", &self.institution, 150);
        let year = year(&mut errors, "year", self.year.as_ref());
        finish(errors, || {
            Some(NewTraining {
                title,
                institution,
                year: year?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_year: Option<Value>,
    #[serde(default)]
    pub end_year: Option<Value>,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for ProjectInput {
    type Valid = NewProject;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewProject, FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = required_text(&mut errors, "title", &self.title, 200);
        let role = optional_text(&mut errors, "role", self.role.as_deref(), Some(200));
        let description = required_text(&mut errors, "description", &self.description, usize::MAX);
        let start_year = year(&mut errors, "start_year", self.start_year.as_ref());
        let end_year = optional_year(&mut errors, "end_year", self.end_year.as_ref());
        if let (Some(start), Some(end)) = (start_year, end_year) {
            if end < start {
                push(&mut errors, "end_year", END_BEFORE_START);
            }
        }
        finish(errors, || {
            Some(NewProject {
                title,
                role,
                description,
                start_year: start_year?,
                end_year,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwardInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for AwardInput {
    type Valid = NewAward;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewAward, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", &self.name, 200);
        let organization = required_text(&mut errors, "organization", &self.organization, 150);
        let year = year(&mut errors, "year", self.year.as_ref());
        finish(errors, || {
            Some(NewAward {
                name,
                organization,
                year: year?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatentInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub patent_number: Option<String>,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for PatentInput {
    type Valid = NewPatent;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewPatent, FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = required_text(&mut errors, "title", &self.title, 200);
        let patent_number = optional_text(
            &mut errors,
            "patent_number",
            self.patent_number.as_deref(),
            Some(50),
        );
        let year = year(&mut errors, "year", self.year.as_ref());
        finish(errors, || {
            Some(NewPatent {
                title,
                patent_number,
                year: year?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for GrantInput {
    type Valid = NewGrant;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewGrant, FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = required_text(&mut errors, "title", &self.title, 200);
        let amount = optional_text(&mut errors, "amount", self.amount.as_deref(), Some(50));
        let year = year(&mut errors, "year", self.year.as_ref());
        finish(errors, || {
            Some(NewGrant {
                title,
                amount,
                year: year?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtherInstitutionInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub delete: bool,
}

impl RowForm for OtherInstitutionInput {
    type Valid = NewOtherInstitution;

    fn marked_for_deletion(&self) -> bool {
        self.delete
    }

    fn validate(&self) -> Result<NewOtherInstitution, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", &self.name, 150);
        let purpose = required_text(&mut errors, "purpose", &self.purpose, 200);
        finish(errors, || Some(NewOtherInstitution { name, purpose }))
    }
}

/// Full submission body: the profile plus one list per section, keyed by
/// section key (`language`, `education`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(flatten)]
    pub profile: ProfileInput,
    #[serde(default)]
    pub language: Vec<LanguageInput>,
    #[serde(default)]
    pub education: Vec<EducationInput>,
    #[serde(default)]
    pub training: Vec<TrainingInput>,
    #[serde(default)]
    pub computer: Vec<ComputerSkillInput>,
    #[serde(default)]
    pub research: Vec<ResearchAreaInput>,
    #[serde(default)]
    pub patent: Vec<PatentInput>,
    #[serde(default)]
    pub grant: Vec<GrantInput>,
    #[serde(default)]
    pub award: Vec<AwardInput>,
    #[serde(default)]
    pub membership: Vec<MembershipInput>,
    #[serde(default)]
    pub project: Vec<ProjectInput>,
    #[serde(default)]
    pub institution: Vec<OtherInstitutionInput>,
}
