//! The eleven repeatable CV sections attached to a submission.
//!
//! Each section has a validated insert shape (`New*`, domain enums) and a
//! stored row shape (`*Row`, wire strings). `position` keeps the order the
//! applicant entered rows in.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::choices::{ComputerProficiency, LanguageProficiency, MembershipType};

/// Identifies one child collection of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Language,
    Education,
    Training,
    Computer,
    Research,
    Patent,
    Grant,
    Award,
    Membership,
    Project,
    Institution,
}

/// Upper bound on research areas per submission.
pub const MAX_RESEARCH_AREAS: usize = 10;

impl SectionKind {
    /// All sections, in the order the submission form presents them.
    pub const ALL: [SectionKind; 11] = [
        SectionKind::Language,
        SectionKind::Education,
        SectionKind::Training,
        SectionKind::Computer,
        SectionKind::Research,
        SectionKind::Patent,
        SectionKind::Grant,
        SectionKind::Award,
        SectionKind::Membership,
        SectionKind::Project,
        SectionKind::Institution,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SectionKind::Language => "language",
            SectionKind::Education => "education",
            SectionKind::Training => "training",
            SectionKind::Computer => "computer",
            SectionKind::Research => "research",
            SectionKind::Patent => "patent",
            SectionKind::Grant => "grant",
            SectionKind::Award => "award",
            SectionKind::Membership => "membership",
            SectionKind::Project => "project",
            SectionKind::Institution => "institution",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.key() == key)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SectionKind::Language => "Language Competency",
            SectionKind::Education => "Tertiary Education",
            SectionKind::Training => "Additional Qualifications/Trainings with Certificate",
            SectionKind::Computer => "ICT Skills",
            SectionKind::Research => "Core Research Areas",
            SectionKind::Patent => "Patents",
            SectionKind::Grant => "Grants",
            SectionKind::Award => "Awards/Recognitions",
            SectionKind::Membership => "Professional Memberships",
            SectionKind::Project => "Professional Projects",
            SectionKind::Institution => "Other Institutions",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            SectionKind::Language => "language_skills",
            SectionKind::Education => "educations",
            SectionKind::Training => "trainings",
            SectionKind::Computer => "computer_skills",
            SectionKind::Research => "research_areas",
            SectionKind::Patent => "patents",
            SectionKind::Grant => "grants",
            SectionKind::Award => "awards",
            SectionKind::Membership => "professional_memberships",
            SectionKind::Project => "professional_projects",
            SectionKind::Institution => "other_institutions",
        }
    }

    pub fn max_rows(&self) -> Option<usize> {
        match self {
            SectionKind::Research => Some(MAX_RESEARCH_AREAS),
            _ => None,
        }
    }

    /// Sections listed newest-first by their `year` column.
    pub fn ordered_by_year(&self) -> bool {
        matches!(
            self,
            SectionKind::Education
                | SectionKind::Training
                | SectionKind::Award
                | SectionKind::Patent
                | SectionKind::Grant
        )
    }
}

// ── Validated insert shapes ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NewLanguageSkill {
    pub language: String,
    pub proficiency: LanguageProficiency,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComputerSkill {
    pub skill: String,
    pub proficiency: ComputerProficiency,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEducation {
    pub institution: String,
    pub degree: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMembership {
    pub organization: String,
    pub membership_type: MembershipType,
    pub year_joined: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewResearchArea {
    pub area: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTraining {
    pub title: String,
    pub institution: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub title: String,
    pub role: Option<String>,
    pub description: String,
    pub start_year: i32,
    pub end_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAward {
    pub name: String,
    pub organization: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPatent {
    pub title: String,
    pub patent_number: Option<String>,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGrant {
    pub title: String,
    pub amount: Option<String>,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOtherInstitution {
    pub name: String,
    pub purpose: String,
}

/// All eleven validated collections of one submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSections {
    pub languages: Vec<NewLanguageSkill>,
    pub computer_skills: Vec<NewComputerSkill>,
    pub educations: Vec<NewEducation>,
    pub memberships: Vec<NewMembership>,
    pub research_areas: Vec<NewResearchArea>,
    pub trainings: Vec<NewTraining>,
    pub projects: Vec<NewProject>,
    pub awards: Vec<NewAward>,
    pub patents: Vec<NewPatent>,
    pub grants: Vec<NewGrant>,
    pub other_institutions: Vec<NewOtherInstitution>,
}

impl NewSections {
    pub fn len_of(&self, kind: SectionKind) -> usize {
        match kind {
            SectionKind::Language => self.languages.len(),
            SectionKind::Education => self.educations.len(),
            SectionKind::Training => self.trainings.len(),
            SectionKind::Computer => self.computer_skills.len(),
            SectionKind::Research => self.research_areas.len(),
            SectionKind::Patent => self.patents.len(),
            SectionKind::Grant => self.grants.len(),
            SectionKind::Award => self.awards.len(),
            SectionKind::Membership => self.memberships.len(),
            SectionKind::Project => self.projects.len(),
            SectionKind::Institution => self.other_institutions.len(),
        }
    }
}

// ── Stored rows ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct LanguageSkillRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub language: String,
    pub proficiency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ComputerSkillRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub skill: String,
    pub proficiency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct EducationRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub institution: String,
    pub degree: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MembershipRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub organization: String,
    pub membership_type: String,
    pub year_joined: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ResearchAreaRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub area: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TrainingRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub title: String,
    pub institution: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ProjectRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub title: String,
    pub role: Option<String>,
    pub description: String,
    pub start_year: i32,
    pub end_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AwardRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub name: String,
    pub organization: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PatentRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub title: String,
    pub patent_number: Option<String>,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct GrantRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub title: String,
    pub amount: Option<String>,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct OtherInstitutionRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub name: String,
    pub purpose: String,
}

/// All eleven stored collections of one submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SectionRows {
    pub languages: Vec<LanguageSkillRow>,
    pub computer_skills: Vec<ComputerSkillRow>,
    pub educations: Vec<EducationRow>,
    pub memberships: Vec<MembershipRow>,
    pub research_areas: Vec<ResearchAreaRow>,
    pub trainings: Vec<TrainingRow>,
    pub projects: Vec<ProjectRow>,
    pub awards: Vec<AwardRow>,
    pub patents: Vec<PatentRow>,
    pub grants: Vec<GrantRow>,
    pub other_institutions: Vec<OtherInstitutionRow>,
}

impl SectionRows {
    #[cfg(test)]
    pub fn len_of(&self, kind: SectionKind) -> usize {
        match kind {
            SectionKind::Language => self.languages.len(),
            SectionKind::Education => self.educations.len(),
            SectionKind::Training => self.trainings.len(),
            SectionKind::Computer => self.computer_skills.len(),
            SectionKind::Research => self.research_areas.len(),
            SectionKind::Patent => self.patents.len(),
            SectionKind::Grant => self.grants.len(),
            SectionKind::Award => self.awards.len(),
            SectionKind::Membership => self.memberships.len(),
            SectionKind::Project => self.projects.len(),
            SectionKind::Institution => self.other_institutions.len(),
        }
    }

    /// Materializes validated sections as rows linked to `submission_id`.
    pub fn from_new(submission_id: Uuid, sections: &NewSections) -> Self {
        fn pos(index: usize) -> i32 {
            index as i32
        }

        SectionRows {
            languages: sections
                .languages
                .iter()
                .enumerate()
                .map(|(i, s)| LanguageSkillRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    language: s.language.clone(),
                    proficiency: s.proficiency.as_str().to_string(),
                })
                .collect(),
            computer_skills: sections
                .computer_skills
                .iter()
                .enumerate()
                .map(|(i, s)| ComputerSkillRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    skill: s.skill.clone(),
                    proficiency: s.proficiency.as_str().to_string(),
                })
                .collect(),
            educations: sections
                .educations
                .iter()
                .enumerate()
                .map(|(i, e)| EducationRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    institution: e.institution.clone(),
                    degree: e.degree.clone(),
                    year: e.year,
                })
                .collect(),
            memberships: sections
                .memberships
                .iter()
                .enumerate()
                .map(|(i, m)| MembershipRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    organization: m.organization.clone(),
                    membership_type: m.membership_type.as_str().to_string(),
                    year_joined: m.year_joined,
                })
                .collect(),
            research_areas: sections
                .research_areas
                .iter()
                .enumerate()
                .map(|(i, r)| ResearchAreaRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    area: r.area.clone(),
                })
                .collect(),
            trainings: sections
                .trainings
                .iter()
                .enumerate()
                .map(|(i, t)| TrainingRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    title: t.title.clone(),
                    institution: t.institution.clone(),
                    year: t.year,
                })
                .collect(),
            projects: sections
                .projects
                .iter()
                .enumerate()
                .map(|(i, p)| ProjectRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    title: p.title.clone(),
                    role: p.role.clone(),
                    description: p.description.clone(),
                    start_year: p.start_year,
                    end_year: p.end_year,
                })
                .collect(),
            awards: sections
                .awards
                .iter()
                .enumerate()
                .map(|(i, a)| AwardRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    name: a.name.clone(),
                    organization: a.organization.clone(),
                    year: a.year,
                })
                .collect(),
            patents: sections
                .patents
                .iter()
                .enumerate()
                .map(|(i, p)| PatentRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    title: p.title.clone(),
                    patent_number: p.patent_number.clone(),
                    year: p.year,
                })
                .collect(),
            grants: sections
                .grants
                .iter()
                .enumerate()
                .map(|(i, g)| GrantRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    title: g.title.clone(),
                    amount: g.amount.clone(),
                    year: g.year,
                })
                .collect(),
            other_institutions: sections
                .other_institutions
                .iter()
                .enumerate()
                .map(|(i, o)| OtherInstitutionRow {
                    id: Uuid::new_v4(),
                    submission_id,
                    position: pos(i),
                    name: o.name.clone(),
                    purpose: o.purpose.clone(),
                })
                .collect(),
        }
    }

    /// Applies display ordering: dated sections newest-first, the rest in
    /// entry order. Ties keep entry order.
    #[cfg(test)]
    pub fn sort_for_display(&mut self) {
        self.languages.sort_by_key(|r| r.position);
        self.computer_skills.sort_by_key(|r| r.position);
        self.memberships.sort_by_key(|r| r.position);
        self.research_areas.sort_by_key(|r| r.position);
        self.projects.sort_by_key(|r| r.position);
        self.other_institutions.sort_by_key(|r| r.position);
        self.educations
            .sort_by_key(|r| (std::cmp::Reverse(r.year), r.position));
        self.trainings
            .sort_by_key(|r| (std::cmp::Reverse(r.year), r.position));
        self.awards
            .sort_by_key(|r| (std::cmp::Reverse(r.year), r.position));
        self.patents
            .sort_by_key(|r| (std::cmp::Reverse(r.year), r.position));
        self.grants
            .sort_by_key(|r| (std::cmp::Reverse(r.year), r.position));
    }
}
