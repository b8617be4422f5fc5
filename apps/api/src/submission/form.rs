//! JSON form descriptors for the submission page: field shapes, select
//! choices and the eleven sections in display order.

use serde::Serialize;

use crate::models::choices::{
    AgeBracket, Choice, ComputerProficiency, LanguageProficiency, MembershipType,
};
use crate::models::sections::SectionKind;
use crate::models::unit::UnitRow;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
}

fn text(name: &'static str, max_length: usize) -> FieldSpec {
    FieldSpec {
        name,
        kind: "text",
        required: true,
        max_length: Some(max_length),
        choices: None,
    }
}

fn optional(field: FieldSpec) -> FieldSpec {
    FieldSpec {
        required: false,
        ..field
    }
}

fn textarea(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: "textarea",
        required: true,
        max_length: None,
        choices: None,
    }
}

fn year(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: "year",
        required: true,
        max_length: None,
        choices: None,
    }
}

fn select(name: &'static str, choices: Vec<Choice>) -> FieldSpec {
    FieldSpec {
        name,
        kind: "select",
        required: true,
        max_length: None,
        choices: Some(choices),
    }
}

pub fn section_fields(kind: SectionKind) -> Vec<FieldSpec> {
    match kind {
        SectionKind::Language => vec![
            text("language", 50),
            select("proficiency", LanguageProficiency::choices()),
        ],
        SectionKind::Computer => vec![
            text("skill", 100),
            select("proficiency", ComputerProficiency::choices()),
        ],
        SectionKind::Education => vec![
            text("institution", 200),
            text("degree", 100),
            year("year"),
        ],
        SectionKind::Membership => vec![
            text("organization", 150),
            select("membership_type", MembershipType::choices()),
            year("year_joined"),
        ],
        SectionKind::Research => vec![text("area", 200)],
        SectionKind::Training => vec![
            text("title", 200),
            text("institution", 150),
            year("year"),
        ],
        SectionKind::Project => vec![
            text("title", 200),
            optional(text("role", 200)),
            textarea("description"),
            year("start_year"),
            optional(year("end_year")),
        ],
        SectionKind::Award => vec![
            text("name", 200),
            text("organization", 150),
            year("year"),
        ],
        SectionKind::Patent => vec![
            text("title", 200),
            optional(text("patent_number", 50)),
            year("year"),
        ],
        SectionKind::Grant => vec![
            text("title", 200),
            optional(text("amount", 50)),
            year("year"),
        ],
        SectionKind::Institution => vec![text("name", 150), text("purpose", 200)],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionDescriptor {
    pub key: &'static str,
    pub display_name: &'static str,
    pub max_rows: Option<usize>,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionForm {
    pub form: &'static str,
    pub action: &'static str,
    pub method: &'static str,
    /// Verified address that becomes the email of record.
    pub email: String,
    pub units: Vec<UnitRow>,
    pub fields: Vec<FieldSpec>,
    pub sections: Vec<SectionDescriptor>,
}

pub fn submission_form(email: &str, units: Vec<UnitRow>) -> SubmissionForm {
    let unit_field = FieldSpec {
        name: "unit",
        kind: "unit",
        required: false,
        max_length: None,
        choices: None,
    };

    SubmissionForm {
        form: "cv_submission",
        action: "/cv_submission/",
        method: "POST",
        email: email.to_string(),
        units,
        fields: vec![
            text("name", 100),
            text("phone", 20),
            unit_field,
            select("age_bracket", AgeBracket::choices()),
        ],
        sections: SectionKind::ALL
            .iter()
            .map(|kind| SectionDescriptor {
                key: kind.key(),
                display_name: kind.display_name(),
                max_rows: kind.max_rows(),
                fields: section_fields(*kind),
            })
            .collect(),
    }
}
