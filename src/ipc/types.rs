use crate::api::{ApiError, AuthSession, HttpTransport, Transport};
use crate::config::Config;
use crate::entity::{Agent, Course, CourseAssociation, EntityFamily, Intake, Student, University};
use crate::view::ListView;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// An open list view of any family.
pub enum AnyView {
    Agents(ListView<Agent>),
    Students(ListView<Student>),
    Universities(ListView<University>),
    Courses(ListView<Course>),
    Intakes(ListView<Intake>),
    CourseAssociations(ListView<CourseAssociation>),
}

/// Runs `$body` with `$v` bound to the typed `ListView` inside an `AnyView`.
macro_rules! with_view {
    ($view:expr, $v:ident => $body:expr) => {
        match $view {
            $crate::ipc::types::AnyView::Agents($v) => $body,
            $crate::ipc::types::AnyView::Students($v) => $body,
            $crate::ipc::types::AnyView::Universities($v) => $body,
            $crate::ipc::types::AnyView::Courses($v) => $body,
            $crate::ipc::types::AnyView::Intakes($v) => $body,
            $crate::ipc::types::AnyView::CourseAssociations($v) => $body,
        }
    };
}
pub(crate) use with_view;

impl AnyView {
    pub fn open(family: EntityFamily, rows_per_page: NonZeroUsize) -> Self {
        match family {
            EntityFamily::Agents => AnyView::Agents(ListView::new(rows_per_page)),
            EntityFamily::Students => AnyView::Students(ListView::new(rows_per_page)),
            EntityFamily::Universities => AnyView::Universities(ListView::new(rows_per_page)),
            EntityFamily::Courses => AnyView::Courses(ListView::new(rows_per_page)),
            EntityFamily::Intakes => AnyView::Intakes(ListView::new(rows_per_page)),
            EntityFamily::CourseAssociations => {
                AnyView::CourseAssociations(ListView::new(rows_per_page))
            }
        }
    }

    pub fn family(&self) -> EntityFamily {
        match self {
            AnyView::Agents(_) => EntityFamily::Agents,
            AnyView::Students(_) => EntityFamily::Students,
            AnyView::Universities(_) => EntityFamily::Universities,
            AnyView::Courses(_) => EntityFamily::Courses,
            AnyView::Intakes(_) => EntityFamily::Intakes,
            AnyView::CourseAssociations(_) => EntityFamily::CourseAssociations,
        }
    }

    pub fn load(&mut self, transport: &dyn Transport) -> Result<(), ApiError> {
        with_view!(self, v => v.load(transport))
    }

    pub fn snapshot(&self) -> serde_json::Value {
        with_view!(self, v => serde_json::json!(v.snapshot()))
    }
}

pub struct AppState {
    pub config: Config,
    pub transport: HttpTransport,
    unauthorized: Arc<AtomicBool>,
    pub views: BTreeMap<String, AnyView>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let unauthorized = Arc::new(AtomicBool::new(false));
        let transport = build_transport(
            &config,
            &config.api_base_url,
            config.api_token.clone(),
            &unauthorized,
        )?;
        Ok(Self {
            config,
            transport,
            unauthorized,
            views: BTreeMap::new(),
        })
    }

    pub fn session(&self) -> &AuthSession {
        self.transport.session()
    }

    pub fn set_session(&mut self, base_url: &str, token: Option<String>) -> Result<(), ApiError> {
        self.transport = build_transport(&self.config, base_url, token, &self.unauthorized)?;
        self.unauthorized.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Forgets the token and every open view.
    pub fn sign_out(&mut self) {
        let base_url = self.session().base_url().to_string();
        if let Ok(t) = build_transport(&self.config, &base_url, None, &self.unauthorized) {
            self.transport = t;
        }
        self.views.clear();
        self.unauthorized.store(false, Ordering::SeqCst);
    }

    /// True once per 401 seen by the transport.
    pub fn take_unauthorized(&self) -> bool {
        self.unauthorized.swap(false, Ordering::SeqCst)
    }
}

fn build_transport(
    config: &Config,
    base_url: &str,
    token: Option<String>,
    flag: &Arc<AtomicBool>,
) -> Result<HttpTransport, ApiError> {
    let flag = Arc::clone(flag);
    let session = AuthSession::new(base_url, token)?.with_unauthorized_hook(Arc::new(move || {
        flag.store(true, Ordering::SeqCst);
    }));
    HttpTransport::new(session, config.request_timeout())
}
