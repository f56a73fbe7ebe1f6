use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Status filter value that matches every row.
pub const STATUS_ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityFamily {
    Agents,
    Students,
    Universities,
    Courses,
    Intakes,
    CourseAssociations,
}

impl EntityFamily {
    pub const ALL: [EntityFamily; 6] = [
        EntityFamily::Agents,
        EntityFamily::Students,
        EntityFamily::Universities,
        EntityFamily::Courses,
        EntityFamily::Intakes,
        EntityFamily::CourseAssociations,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.path() == s)
    }

    /// REST path segment, also the wire name of the family.
    pub fn path(&self) -> &'static str {
        match self {
            EntityFamily::Agents => "agents",
            EntityFamily::Students => "students",
            EntityFamily::Universities => "universities",
            EntityFamily::Courses => "courses",
            EntityFamily::Intakes => "intakes",
            EntityFamily::CourseAssociations => "course-associations",
        }
    }

    /// Key holding the row array in a list response.
    pub fn list_key(&self) -> &'static str {
        match self {
            EntityFamily::CourseAssociations => "courseAssociations",
            other => other.path(),
        }
    }

    pub fn statuses(&self) -> &'static [&'static str] {
        match self {
            EntityFamily::Students => &["Enrolled", "Withdrawn", "Deferred", "UnEnrolled"],
            _ => &["active", "inactive"],
        }
    }

    pub fn scope_keys(&self) -> &'static [&'static str] {
        match self {
            EntityFamily::Agents | EntityFamily::Universities => &["countryCode", "cityId"],
            EntityFamily::Students => &["agentId", "universityId", "intakeId"],
            EntityFamily::Courses => &["universityId"],
            EntityFamily::Intakes => &[],
            EntityFamily::CourseAssociations => &["universityId", "courseId", "intakeId"],
        }
    }

    pub fn default_order_by(&self) -> &'static str {
        match self {
            EntityFamily::Students => "firstName",
            EntityFamily::Intakes => "startDate",
            EntityFamily::CourseAssociations => "courseName",
            _ => "name",
        }
    }

    /// `all` or one of the family's statuses, case-sensitive.
    pub fn accepts_status_filter(&self, status: &str) -> bool {
        status == STATUS_ALL || self.statuses().contains(&status)
    }
}

/// A status vocabulary. Wire values are case-sensitive.
pub trait StatusValue: 'static + Copy + Eq + std::fmt::Debug + Serialize + DeserializeOwned {
    const VALUES: &'static [Self];

    fn as_str(&self) -> &'static str;

    /// The value a single "toggle" click moves to.
    fn toggled(&self) -> Self;

    fn parse(s: &str) -> Option<Self> {
        Self::VALUES.iter().copied().find(|v| v.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveStatus {
    #[default]
    Active,
    Inactive,
}

impl StatusValue for ActiveStatus {
    const VALUES: &'static [Self] = &[ActiveStatus::Active, ActiveStatus::Inactive];

    fn as_str(&self) -> &'static str {
        match self {
            ActiveStatus::Active => "active",
            ActiveStatus::Inactive => "inactive",
        }
    }

    fn toggled(&self) -> Self {
        match self {
            ActiveStatus::Active => ActiveStatus::Inactive,
            ActiveStatus::Inactive => ActiveStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    Enrolled,
    Withdrawn,
    Deferred,
    UnEnrolled,
}

impl StatusValue for StudentStatus {
    const VALUES: &'static [Self] = &[
        StudentStatus::Enrolled,
        StudentStatus::Withdrawn,
        StudentStatus::Deferred,
        StudentStatus::UnEnrolled,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Enrolled => "Enrolled",
            StudentStatus::Withdrawn => "Withdrawn",
            StudentStatus::Deferred => "Deferred",
            StudentStatus::UnEnrolled => "UnEnrolled",
        }
    }

    // Enrolled is the only "on" state; anything else toggles back to it.
    fn toggled(&self) -> Self {
        match self {
            StudentStatus::Enrolled => StudentStatus::UnEnrolled,
            _ => StudentStatus::Enrolled,
        }
    }
}

/// Value a row exposes for one sortable column.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Missing,
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Number(_) => 1,
            SortKey::Date(_) => 2,
            SortKey::Text(_) => 3,
        }
    }

    pub fn text(v: Option<&str>) -> SortKey {
        match v.map(str::trim) {
            Some(t) if !t.is_empty() => SortKey::Text(t.to_string()),
            _ => SortKey::Missing,
        }
    }

    pub fn number(v: Option<f64>) -> SortKey {
        v.map(SortKey::Number).unwrap_or(SortKey::Missing)
    }

    /// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
    pub fn date(v: Option<&str>) -> SortKey {
        let Some(raw) = v.map(str::trim).filter(|t| !t.is_empty()) else {
            return SortKey::Missing;
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return SortKey::Date(dt.naive_utc());
        }
        if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return SortKey::Date(dt);
            }
        }
        SortKey::Text(raw.to_string())
    }

    fn from_json(v: Option<&serde_json::Value>) -> SortKey {
        match v {
            Some(serde_json::Value::Number(n)) => SortKey::number(n.as_f64()),
            Some(serde_json::Value::String(s)) => SortKey::text(Some(s.as_str())),
            Some(serde_json::Value::Bool(b)) => SortKey::Number(if *b { 1.0 } else { 0.0 }),
            _ => SortKey::Missing,
        }
    }

    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Capability shared by every row type the list views handle.
pub trait Entity: Clone + std::fmt::Debug + Serialize + DeserializeOwned {
    type Status: StatusValue;

    const FAMILY: EntityFamily;

    fn id(&self) -> &str;
    fn status(&self) -> Self::Status;

    /// Display fields the free-text name filter searches.
    fn search_fields(&self) -> Vec<String>;

    /// Short human label, used by lookup selects.
    fn label(&self) -> String;

    fn sort_key(&self, column: &str) -> SortKey;

    fn role(&self) -> Option<&str> {
        None
    }
}

type Extra = serde_json::Map<String, serde_json::Value>;

fn full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let joined = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
    let t = joined.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

fn present(fields: impl IntoIterator<Item = Option<String>>) -> Vec<String> {
    fields.into_iter().flatten().collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub city_id: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub pending_amount: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Entity for Agent {
    type Status = ActiveStatus;
    const FAMILY: EntityFamily = EntityFamily::Agents;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ActiveStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<String> {
        present([
            self.name.clone(),
            full_name(self.first_name.as_deref(), self.last_name.as_deref()),
            self.email.clone(),
        ])
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| full_name(self.first_name.as_deref(), self.last_name.as_deref()))
            .unwrap_or_else(|| self.id.clone())
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::text(Some(self.label().as_str())),
            "firstName" => SortKey::text(self.first_name.as_deref()),
            "lastName" => SortKey::text(self.last_name.as_deref()),
            "email" => SortKey::text(self.email.as_deref()),
            "phone" => SortKey::text(self.phone.as_deref()),
            "role" => SortKey::text(self.role.as_deref()),
            "countryCode" => SortKey::text(self.country_code.as_deref()),
            "status" => SortKey::text(Some(self.status.as_str())),
            "totalAmount" => SortKey::number(self.total_amount),
            "paidAmount" => SortKey::number(self.paid_amount),
            "pendingAmount" => SortKey::number(self.pending_amount),
            "createdAt" => SortKey::date(self.created_at.as_deref()),
            other => SortKey::from_json(self.extra.get(other)),
        }
    }

    fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub intake_id: Option<String>,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub pending_amount: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Entity for Student {
    type Status = StudentStatus;
    const FAMILY: EntityFamily = EntityFamily::Students;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> StudentStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<String> {
        present([
            full_name(self.first_name.as_deref(), self.last_name.as_deref()),
            self.email.clone(),
        ])
    }

    fn label(&self) -> String {
        full_name(self.first_name.as_deref(), self.last_name.as_deref())
            .unwrap_or_else(|| self.id.clone())
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::text(Some(self.label().as_str())),
            "firstName" => SortKey::text(self.first_name.as_deref()),
            "lastName" => SortKey::text(self.last_name.as_deref()),
            "email" => SortKey::text(self.email.as_deref()),
            "phone" => SortKey::text(self.phone.as_deref()),
            "status" => SortKey::text(Some(self.status.as_str())),
            "totalAmount" => SortKey::number(self.total_amount),
            "paidAmount" => SortKey::number(self.paid_amount),
            "pendingAmount" => SortKey::number(self.pending_amount),
            "createdAt" => SortKey::date(self.created_at.as_deref()),
            other => SortKey::from_json(self.extra.get(other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct University {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub city_id: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Entity for University {
    type Status = ActiveStatus;
    const FAMILY: EntityFamily = EntityFamily::Universities;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ActiveStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<String> {
        present([self.name.clone()])
    }

    fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.clone())
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::text(self.name.as_deref()),
            "countryCode" => SortKey::text(self.country_code.as_deref()),
            "website" => SortKey::text(self.website.as_deref()),
            "status" => SortKey::text(Some(self.status.as_str())),
            "createdAt" => SortKey::date(self.created_at.as_deref()),
            other => SortKey::from_json(self.extra.get(other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Entity for Course {
    type Status = ActiveStatus;
    const FAMILY: EntityFamily = EntityFamily::Courses;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ActiveStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<String> {
        present([self.name.clone(), self.code.clone()])
    }

    fn label(&self) -> String {
        match (&self.name, &self.code) {
            (Some(n), Some(c)) => format!("{} ({})", n, c),
            (Some(n), None) => n.clone(),
            (None, Some(c)) => c.clone(),
            (None, None) => self.id.clone(),
        }
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::text(self.name.as_deref()),
            "code" => SortKey::text(self.code.as_deref()),
            "level" => SortKey::text(self.level.as_deref()),
            "status" => SortKey::text(Some(self.status.as_str())),
            "createdAt" => SortKey::date(self.created_at.as_deref()),
            other => SortKey::from_json(self.extra.get(other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intake {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Entity for Intake {
    type Status = ActiveStatus;
    const FAMILY: EntityFamily = EntityFamily::Intakes;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ActiveStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<String> {
        present([self.name.clone()])
    }

    fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.clone())
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "name" => SortKey::text(self.name.as_deref()),
            "startDate" => SortKey::date(self.start_date.as_deref()),
            "endDate" => SortKey::date(self.end_date.as_deref()),
            "status" => SortKey::text(Some(self.status.as_str())),
            other => SortKey::from_json(self.extra.get(other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAssociation {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub university_name: Option<String>,
    #[serde(default)]
    pub intake_id: Option<String>,
    #[serde(default)]
    pub tuition_fee: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Entity for CourseAssociation {
    type Status = ActiveStatus;
    const FAMILY: EntityFamily = EntityFamily::CourseAssociations;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ActiveStatus {
        self.status
    }

    fn search_fields(&self) -> Vec<String> {
        present([self.course_name.clone(), self.university_name.clone()])
    }

    fn label(&self) -> String {
        match (&self.course_name, &self.university_name) {
            (Some(c), Some(u)) => format!("{} @ {}", c, u),
            (Some(c), None) => c.clone(),
            (None, Some(u)) => u.clone(),
            (None, None) => self.id.clone(),
        }
    }

    fn sort_key(&self, column: &str) -> SortKey {
        match column {
            "courseName" => SortKey::text(self.course_name.as_deref()),
            "universityName" => SortKey::text(self.university_name.as_deref()),
            "tuitionFee" => SortKey::number(self.tuition_fee),
            "status" => SortKey::text(Some(self.status.as_str())),
            other => SortKey::from_json(self.extra.get(other)),
        }
    }
}

/// Runs `$body` with `$E` bound to the row type of `$family`.
macro_rules! with_entity {
    ($family:expr, $E:ident => $body:expr) => {
        match $family {
            $crate::entity::EntityFamily::Agents => {
                type $E = $crate::entity::Agent;
                $body
            }
            $crate::entity::EntityFamily::Students => {
                type $E = $crate::entity::Student;
                $body
            }
            $crate::entity::EntityFamily::Universities => {
                type $E = $crate::entity::University;
                $body
            }
            $crate::entity::EntityFamily::Courses => {
                type $E = $crate::entity::Course;
                $body
            }
            $crate::entity::EntityFamily::Intakes => {
                type $E = $crate::entity::Intake;
                $body
            }
            $crate::entity::EntityFamily::CourseAssociations => {
                type $E = $crate::entity::CourseAssociation;
                $body
            }
        }
    };
}
pub(crate) use with_entity;
