//! Closed value sets used by the CV record graph.
//!
//! Every choice is stored as its wire value (`TEXT` column, guarded by a
//! `CHECK` constraint). Enums declared `select` also carry the human labels
//! shown by form renderers.

use serde::{Deserialize, Serialize};

/// A `(value, label)` pair as rendered in a select widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
}

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        select $name:ident {
            $($variant:ident => ($value:literal, $label:literal)),+ $(,)?
        }
    ) => {
        choice_enum! {
            $(#[$meta])*
            $name { $($variant => $value),+ }
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn choices() -> Vec<Choice> {
                Self::ALL
                    .iter()
                    .map(|c| Choice {
                        value: c.as_str(),
                        label: c.label(),
                    })
                    .collect()
            }
        }
    };
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum! {
    /// Kind of node in the organizational hierarchy.
    UnitType {
        Faculty => "faculty",
        Department => "department",
        Institute => "institute",
        Center => "center",
    }
}

choice_enum! {
    select AgeBracket {
        From20To30 => ("20-30", "20-30 years"),
        From31To40 => ("31-40", "31-40 years"),
        From41To50 => ("41-50", "41-50 years"),
        From51To60 => ("51-60", "51-60 years"),
        Over60 => ("61+", "61+ years"),
    }
}

choice_enum! {
    /// Back-office lifecycle of a submission. Applicants always create
    /// `Submitted` records; the other states are set administratively.
    SubmissionStatus {
        Draft => "draft",
        Submitted => "submitted",
        Reviewed => "reviewed",
        Approved => "approved",
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        SubmissionStatus::Submitted
    }
}

choice_enum! {
    select LanguageProficiency {
        Basic => ("basic", "Basic"),
        Intermediate => ("intermediate", "Intermediate"),
        Fluent => ("fluent", "Fluent"),
    }
}

choice_enum! {
    select ComputerProficiency {
        Basic => ("basic", "Basic"),
        Good => ("good", "Good"),
        Excellent => ("excellent", "Excellent"),
    }
}

choice_enum! {
    select MembershipType {
        Graduate => ("graduate", "Graduate Member"),
        Associate => ("associate", "Associate Member"),
        Full => ("full", "Full Member"),
        Fellow => ("fellow", "Fellow"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_wire_values_only() {
        assert_eq!(AgeBracket::parse("61+"), Some(AgeBracket::Over60));
        assert_eq!(AgeBracket::parse("61+ years"), None);
        assert_eq!(UnitType::parse("center"), Some(UnitType::Center));
        assert_eq!(UnitType::parse("Center"), None);
    }

    #[test]
    fn test_serde_uses_wire_values() {
        let json = serde_json::to_string(&AgeBracket::From31To40).unwrap();
        assert_eq!(json, "\"31-40\"");
        let parsed: MembershipType = serde_json::from_str("\"fellow\"").unwrap();
        assert_eq!(parsed, MembershipType::Fellow);
    }

    #[test]
    fn test_default_status_is_submitted() {
        assert_eq!(SubmissionStatus::default(), SubmissionStatus::Submitted);
    }

    #[test]
    fn test_choices_preserve_declaration_order() {
        let values: Vec<_> = LanguageProficiency::choices()
            .into_iter()
            .map(|c| c.value)
            .collect();
        assert_eq!(values, vec!["basic", "intermediate", "fluent"]);
        assert_eq!(MembershipType::Graduate.label(), "Graduate Member");
    }
}
