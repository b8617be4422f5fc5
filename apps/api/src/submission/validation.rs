//! Field-level validation primitives and the structured error set returned
//! when a submission is rejected.
//!
//! Each primitive records its message into a [`FieldErrors`] map and returns
//! the cleaned value, so a form validator can check every field in one pass
//! and report all failures together.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

pub const YEAR_MIN: i64 = 1000;
pub const YEAR_MAX: i64 = 9999;
pub const EMAIL_MAX_LEN: usize = 254;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const END_BEFORE_START: &str = "End year cannot be before start year";
pub const NOT_A_NUMBER: &str = "Enter a whole number.";

/// Messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors for one child collection: collection-wide messages plus per-row
/// field errors keyed by the row's index in the submitted list.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SectionErrors {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub non_row: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rows: BTreeMap<usize, FieldErrors>,
}

impl SectionErrors {
    pub fn is_empty(&self) -> bool {
        self.non_row.is_empty() && self.rows.is_empty()
    }
}

/// Every failure found in a submission: root form fields plus each section.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ValidationErrors {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub root: FieldErrors,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sections: BTreeMap<&'static str, SectionErrors>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.sections.values().all(SectionErrors::is_empty)
    }

    pub fn add_root(&mut self, field: &str, message: impl Into<String>) {
        push(&mut self.root, field, message);
    }

    pub fn add_section(&mut self, key: &'static str, errors: SectionErrors) {
        if !errors.is_empty() {
            self.sections.insert(key, errors);
        }
    }

    #[cfg(test)]
    pub fn section(&self, key: &str) -> Option<&SectionErrors> {
        self.sections.get(key)
    }
}

pub fn push(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

fn too_long(max_len: usize, actual: usize) -> String {
    format!("Ensure this value has at most {max_len} characters (it has {actual}).")
}

/// Trims and checks a mandatory text field.
pub fn required_text(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        push(errors, field, REQUIRED);
    } else {
        check_len(errors, field, value, max_len);
    }
    value.to_string()
}

/// Trims an optional text field; blank input becomes `None`.
pub fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: Option<usize>,
) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    if let Some(max_len) = max_len {
        check_len(errors, field, value, max_len);
    }
    Some(value.to_string())
}

fn check_len(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    let len = value.chars().count();
    if len > max_len {
        push(errors, field, too_long(max_len, len));
    }
}

/// Checks a four-digit year in `[YEAR_MIN, YEAR_MAX]`. The raw JSON value is
/// accepted so a non-numeric entry becomes a field error.
pub fn year(errors: &mut FieldErrors, field: &str, value: Option<&Value>) -> Option<i32> {
    match whole_number(errors, field, value)? {
        None => {
            push(errors, field, REQUIRED);
            None
        }
        Some(v) => check_year(errors, field, v),
    }
}

pub fn optional_year(errors: &mut FieldErrors, field: &str, value: Option<&Value>) -> Option<i32> {
    let v = whole_number(errors, field, value)??;
    check_year(errors, field, v)
}

/// `None` on a type error, `Some(None)` when blank.
fn whole_number(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&Value>,
) -> Option<Option<i64>> {
    let parsed = match value {
        None | Some(Value::Null) => return Some(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Some(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            // Saturates, so huge integral floats fail the range check.
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Some(_) => None,
    };
    if parsed.is_none() {
        push(errors, field, NOT_A_NUMBER);
        return None;
    }
    Some(parsed)
}

fn check_year(errors: &mut FieldErrors, field: &str, v: i64) -> Option<i32> {
    if v < YEAR_MIN {
        push(
            errors,
            field,
            format!("Ensure this value is greater than or equal to {YEAR_MIN}."),
        );
        None
    } else if v > YEAR_MAX {
        push(
            errors,
            field,
            format!("Ensure this value is less than or equal to {YEAR_MAX}."),
        );
        None
    } else {
        Some(v as i32)
    }
}

/// Resolves a select value against a closed choice set.
pub fn choice<T>(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    let value = value.trim();
    if value.is_empty() {
        push(errors, field, REQUIRED);
        return None;
    }
    let parsed = parse(value);
    if parsed.is_none() {
        push(
            errors,
            field,
            format!("Select a valid choice. {value} is not one of the available choices."),
        );
    }
    parsed
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
    )
    .expect("email pattern compiles")
});

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= EMAIL_MAX_LEN && EMAIL_RE.is_match(value)
}

/// Trims and checks an email address field.
pub fn email(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        push(errors, field, REQUIRED);
    } else if !is_valid_email(value) {
        push(errors, field, INVALID_EMAIL);
    }
    value.to_string()
}
