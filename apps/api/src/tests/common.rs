use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::{Config, MailBackend, SessionBackend};
use crate::models::choices::{
    AgeBracket, ComputerProficiency, LanguageProficiency, MembershipType, SubmissionStatus,
    UnitType,
};
use crate::models::sections::{
    NewAward, NewComputerSkill, NewEducation, NewGrant, NewLanguageSkill, NewMembership,
    NewOtherInstitution, NewPatent, NewProject, NewResearchArea, NewSections, NewTraining,
    SectionKind,
};
use crate::models::submission::{NewSubmission, SubmissionDetail, SubmissionRow};
use crate::models::unit::{NewUnit, UnitRow};
use crate::repository::listing::SectionQuery;
use crate::repository::memory::MemoryCvRepository;
use crate::repository::{CvRepository, RepositoryError, SubmissionFilter, UnitFilter};
use crate::routes::build_router;
use crate::session::store::MemorySessionStore;
use crate::state::AppState;
use crate::verification::mailer::{DeliveryError, Mailer};

pub const EMAIL: &str = "user@abu.edu.ng";
pub const ADMIN_TOKEN: &str = "s3cret-admin";

pub fn unit(name: &str, unit_type: UnitType, parent: Option<Uuid>) -> NewUnit {
    NewUnit {
        name: name.to_string(),
        unit_type,
        parent_id: parent,
    }
}

/// A validated submission with every section populated. Two educations,
/// one of them from 2001.
pub fn sample_submission(unit_id: Option<Uuid>) -> NewSubmission {
    NewSubmission {
        name: "Amina Bello".to_string(),
        phone: "08030000000".to_string(),
        unit_id,
        age_bracket: AgeBracket::From31To40,
        sections: NewSections {
            languages: vec![
                NewLanguageSkill {
                    language: "Hausa".to_string(),
                    proficiency: LanguageProficiency::Fluent,
                },
                NewLanguageSkill {
                    language: "English".to_string(),
                    proficiency: LanguageProficiency::Fluent,
                },
            ],
            computer_skills: vec![NewComputerSkill {
                skill: "AutoCAD".to_string(),
                proficiency: ComputerProficiency::Excellent,
            }],
            educations: vec![
                NewEducation {
                    institution: "Ahmadu Bello University".to_string(),
                    degree: "PhD Civil Engineering".to_string(),
                    year: 2001,
                },
                NewEducation {
                    institution: "University of Lagos".to_string(),
                    degree: "BSc Civil Engineering".to_string(),
                    year: 1995,
                },
            ],
            memberships: vec![NewMembership {
                organization: "Nigerian Society of Engineers".to_string(),
                membership_type: MembershipType::Fellow,
                year_joined: 2010,
            }],
            research_areas: vec![
                NewResearchArea {
                    area: "Hydrology".to_string(),
                },
                NewResearchArea {
                    area: "Water resources".to_string(),
                },
            ],
            trainings: vec![NewTraining {
                title: "Project Management Professional".to_string(),
                institution: "PMI".to_string(),
                year: 2015,
            }],
            projects: vec![NewProject {
                title: "Kaduna groundwater survey".to_string(),
                role: Some("Lead".to_string()),
                description: "Mapped aquifers across Kaduna State".to_string(),
                start_year: 2016,
                end_year: Some(2018),
            }],
            awards: vec![NewAward {
                name: "Best Researcher".to_string(),
                organization: "Ahmadu Bello University".to_string(),
                year: 2020,
            }],
            patents: vec![NewPatent {
                title: "Low-cost slow sand filter".to_string(),
                patent_number: Some("NG/P/2018/123".to_string()),
                year: 2018,
            }],
            grants: vec![NewGrant {
                title: "TETFund institutional research grant".to_string(),
                amount: Some("NGN 5,000,000".to_string()),
                year: 2019,
            }],
            other_institutions: vec![NewOtherInstitution {
                name: "Kaduna Polytechnic".to_string(),
                purpose: "Visiting lecturer".to_string(),
            }],
        },
    }
}

/// The submission form body matching [`sample_submission`].
pub fn sample_payload(unit: Option<Uuid>) -> Value {
    json!({
        "name": "Amina Bello",
        "phone": "08030000000",
        "unit": unit,
        "age_bracket": "31-40",
        "language": [
            { "language": "Hausa", "proficiency": "fluent" },
            { "language": "English", "proficiency": "fluent" }
        ],
        "education": [
            { "institution": "Ahmadu Bello University", "degree": "PhD Civil Engineering", "year": 2001 },
            { "institution": "University of Lagos", "degree": "BSc Civil Engineering", "year": 1995 }
        ],
        "training": [
            { "title": "Project Management Professional", "institution": "PMI", "year": 2015 }
        ],
        "computer": [{ "skill": "AutoCAD", "proficiency": "excellent" }],
        "research": [{ "area": "Hydrology" }, { "area": "Water resources" }],
        "patent": [
            { "title": "Low-cost slow sand filter", "patent_number": "NG/P/2018/123", "year": 2018 }
        ],
        "grant": [
            { "title": "TETFund institutional research grant", "amount": "NGN 5,000,000", "year": 2019 }
        ],
        "award": [
            { "name": "Best Researcher", "organization": "Ahmadu Bello University", "year": 2020 }
        ],
        "membership": [
            { "organization": "Nigerian Society of Engineers", "membership_type": "fellow", "year_joined": 2010 }
        ],
        "project": [{
            "title": "Kaduna groundwater survey",
            "role": "Lead",
            "description": "Mapped aquifers across Kaduna State",
            "start_year": 2016,
            "end_year": 2018
        }],
        "institution": [{ "name": "Kaduna Polytechnic", "purpose": "Visiting lecturer" }]
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// The code from the most recent verification mail.
    pub fn last_code(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let body = &sent.last().expect("a mail was sent").body;
        body.rsplit(' ').next().unwrap().to_string()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Rejected {
            status: 503,
            message: "relay unavailable".to_string(),
        })
    }
}

/// Reports every unit as present, so writes that reference a missing unit
/// reach the store as they would when the unit is deleted mid-request.
pub struct StaleUnitCheck(pub Arc<MemoryCvRepository>);

#[async_trait]
impl CvRepository for StaleUnitCheck {
    async fn list_units(&self, filter: &UnitFilter) -> Result<Vec<UnitRow>, RepositoryError> {
        self.0.list_units(filter).await
    }

    async fn unit_exists(&self, _id: Uuid) -> Result<bool, RepositoryError> {
        Ok(true)
    }

    async fn create_unit(&self, unit: &NewUnit) -> Result<UnitRow, RepositoryError> {
        self.0.create_unit(unit).await
    }

    async fn delete_unit(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.0.delete_unit(id).await
    }

    async fn insert_submission(
        &self,
        email: &str,
        submission: &NewSubmission,
    ) -> Result<SubmissionRow, RepositoryError> {
        self.0.insert_submission(email, submission).await
    }

    async fn fetch_submission(
        &self,
        id: Uuid,
    ) -> Result<Option<SubmissionDetail>, RepositoryError> {
        self.0.fetch_submission(id).await
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRow>, RepositoryError> {
        self.0.list_submissions(filter).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<Option<SubmissionRow>, RepositoryError> {
        self.0.update_status(id, status).await
    }

    async fn delete_submission(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.0.delete_submission(id).await
    }

    async fn list_section(
        &self,
        kind: SectionKind,
        query: &SectionQuery,
    ) -> Result<Vec<Value>, RepositoryError> {
        self.0.list_section(kind, query).await
    }
}

pub fn test_config(admin_token: Option<&str>) -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        redis_url: None,
        session_backend: SessionBackend::Memory,
        session_ttl_secs: 3600,
        session_cookie_secure: false,
        mail_backend: MailBackend::Log,
        mail_from: "noreply@abu.edu.ng".to_string(),
        admin_token: admin_token.map(str::to_string),
        port: 0,
        rust_log: "info".to_string(),
    }
}

/// The real router over in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryCvRepository>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_admin() -> Self {
        Self::build(Some(ADMIN_TOKEN))
    }

    fn build(admin_token: Option<&str>) -> Self {
        let repo = Arc::new(MemoryCvRepository::new());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState {
            repo: repo.clone(),
            sessions: Arc::new(MemorySessionStore::new()),
            mailer: mailer.clone(),
            config: test_config(admin_token),
        };
        Self {
            router: build_router(state),
            repo,
            mailer,
        }
    }

    /// Same collaborators as [`TestApp::new`] but mail delivery always fails.
    pub fn with_failing_mailer() -> Self {
        let mut app = Self::new();
        let state = AppState {
            repo: app.repo.clone(),
            sessions: Arc::new(MemorySessionStore::new()),
            mailer: Arc::new(FailingMailer),
            config: test_config(None),
        };
        app.router = build_router(state);
        app
    }

    /// Admin-enabled app whose unit existence checks always pass.
    pub fn with_stale_unit_checks() -> Self {
        let mut app = Self::with_admin();
        let state = AppState {
            repo: Arc::new(StaleUnitCheck(app.repo.clone())),
            sessions: Arc::new(MemorySessionStore::new()),
            mailer: app.mailer.clone(),
            config: test_config(Some(ADMIN_TOKEN)),
        };
        app.router = build_router(state);
        app
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::get(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, path: &str, cookie: Option<&str>, body: &Value) -> Response {
        let mut builder =
            Request::post(path).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(
            builder
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
        )
        .await
    }

    /// Runs the request/confirm steps and returns the verified session cookie.
    pub async fn verified_cookie(&self, email: &str) -> String {
        let response = self.post_json("/", None, &json!({ "email": email })).await;
        let cookie = session_cookie(&response).expect("session cookie issued");

        let code = self.mailer.last_code();
        let response = self
            .post_json(
                "/verify-code/",
                Some(&cookie),
                &json!({ "verification_code": code }),
            )
            .await;
        assert_eq!(location(&response), "/cv_submission/");
        cookie
    }

    pub fn admin_request(&self, method: &str, path: &str, body: Option<&Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(path)
            .header("x-admin-token", ADMIN_TOKEN)
            .header(header::CONTENT_TYPE, "application/json");
        let body = match body {
            Some(value) => Body::from(serde_json::to_vec(value).unwrap()),
            None => Body::empty(),
        };
        builder.body(body).unwrap()
    }
}

/// `cv_session=<token>` from the response's `Set-Cookie`, ready to send back.
pub fn session_cookie(response: &Response) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(str::to_string)
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json payload")
}
