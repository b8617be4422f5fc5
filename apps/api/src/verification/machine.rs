//! Per-session verification state: `Unverified -> CodeIssued -> Verified`.
//!
//! The state is derived from [`SessionData`] rather than stored separately,
//! so a session can never hold a flag that disagrees with its fields.

use crate::session::SessionData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState<'a> {
    Unverified,
    CodeIssued { email: &'a str },
    Verified { email: &'a str },
}

pub fn state(data: &SessionData) -> VerificationState<'_> {
    match (data.verification_email.as_deref(), data.verification_code.as_deref()) {
        (Some(email), Some(_)) if data.verified => VerificationState::Verified { email },
        (Some(email), Some(_)) => VerificationState::CodeIssued { email },
        _ => VerificationState::Unverified,
    }
}

/// Records a freshly issued code. Any earlier verification is revoked so the
/// email of record always matches the last address that proved ownership.
pub fn issue_code(data: &mut SessionData, email: String, code: String) {
    data.verification_email = Some(email);
    data.verification_code = Some(code);
    data.verified = false;
}

/// Exact, case-sensitive comparison against the stored code. Without an
/// issued code nothing matches.
pub fn submit_code(data: &mut SessionData, candidate: &str) -> bool {
    let matches = data
        .verification_code
        .as_deref()
        .is_some_and(|code| code == candidate);
    if matches {
        data.verified = true;
    }
    matches
}

pub fn verified_email(data: &SessionData) -> Option<&str> {
    match state(data) {
        VerificationState::Verified { email } => Some(email),
        _ => None,
    }
}
