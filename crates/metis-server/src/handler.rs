//! Request handler that routes HTTP requests to the store and the evaluator.

use std::sync::Arc;

use metis_directory::ResourceStore;
use metis_rbac::{Action, Identity, authorize_creation, evaluate};
use metis_types::{Container, ContainerId, Item, ItemId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{Span, debug, error, info, instrument, warn};

use crate::auth::AuthService;
use crate::error::{ServerError, ServerResult};
use crate::http::{HttpRequest, HttpResponse};

/// Handles requests by dispatching them on method and path.
pub struct RequestHandler {
    store: Arc<dyn ResourceStore>,
    auth_service: AuthService,
}

impl RequestHandler {
    pub fn new(store: Arc<dyn ResourceStore>, auth_service: AuthService) -> Self {
        Self {
            store,
            auth_service,
        }
    }

    pub fn store(&self) -> &dyn ResourceStore {
        self.store.as_ref()
    }

    pub fn auth_service(&self) -> &AuthService {
        &self.auth_service
    }

    /// Handles a request and returns a response. Never fails: errors become
    /// `{"error": ...}` bodies with the matching status.
    #[instrument(skip_all, fields(method = %request.method, path = %request.path, status))]
    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let response = self.route(request).unwrap_or_else(|e| {
            if e.status() == 500 {
                error!(error = %e, "request failed");
            } else {
                debug!(error = %e, "request rejected");
            }
            e.to_response()
        });

        Span::current().record("status", response.status);
        response
    }

    fn route(&self, request: &HttpRequest) -> ServerResult<HttpResponse> {
        let segments: Vec<&str> = request
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", []) => Ok(HttpResponse::json(200, &index())),
            ("GET", ["health"]) => Ok(HttpResponse::json(200, &json!({ "status": "ok" }))),
            ("POST", ["auth", "login"]) => self.login(request),
            ("POST", ["auth", "logout"]) => Ok(self.logout()),
            (_, ["protected", rest @ ..]) => {
                let identity = self.auth_service.authenticate_request(request)?;
                self.route_protected(request, &identity, rest)
            }
            _ => Err(ServerError::NotFound),
        }
    }

    fn route_protected(
        &self,
        request: &HttpRequest,
        identity: &Identity,
        segments: &[&str],
    ) -> ServerResult<HttpResponse> {
        let action = Action::for_http_method(&request.method).ok_or(ServerError::NotFound)?;

        match (action, segments) {
            (Action::Read, ["projects"]) => self.list_projects(),
            (Action::Write, ["projects"]) => self.create_project(request, identity),
            (Action::Read, ["projects", id]) => {
                let container_id = ContainerId::new(*id);
                self.authorize(identity, &container_id, action)?;
                self.get_project(&container_id)
            }
            (Action::Read, ["projects", id, "analyses" | "analysis"]) => {
                let container_id = ContainerId::new(*id);
                self.authorize(identity, &container_id, action)?;
                self.list_analyses(&container_id)
            }
            (Action::Read, ["projects", id, "analyses", item_id]) => {
                let container_id = ContainerId::new(*id);
                self.authorize(identity, &container_id, action)?;
                self.get_analysis(&container_id, &ItemId::new(*item_id))
            }
            (Action::Write, ["projects", id, "analyses"]) => {
                let container_id = ContainerId::new(*id);
                self.authorize(identity, &container_id, action)?;
                self.create_analysis(request, identity, container_id)
            }
            _ => Err(ServerError::NotFound),
        }
    }

    /// Runs the evaluator. Happens before any existence check, so a denied
    /// caller cannot tell a missing container from a forbidden one.
    fn authorize(
        &self,
        identity: &Identity,
        container_id: &ContainerId,
        action: Action,
    ) -> ServerResult<()> {
        let decision = evaluate(self.store(), identity, container_id, action);

        if let Some(err) = &decision.lookup_error {
            warn!(
                identity = %identity.id,
                container = %container_id,
                error = %err,
                "access lookup failed, denying"
            );
        }

        if decision.allow {
            Ok(())
        } else {
            Err(ServerError::Forbidden)
        }
    }

    // ========================================================================
    // Auth routes
    // ========================================================================

    fn login(&self, request: &HttpRequest) -> ServerResult<HttpResponse> {
        let body: LoginBody = parse_body(request)?;
        let name = required_text(body.name, "name")?;

        let identity = self
            .store
            .find_identity_by_name(&name)?
            .ok_or(ServerError::Unauthorized("User not found"))?;

        let token = self.auth_service.issue_token(&identity)?;
        info!(identity = %identity.id, role = %identity.role, "login");

        Ok(HttpResponse::json(
            200,
            &json!({ "success": true, "message": "Logged in" }),
        )
        .with_header("Set-Cookie", self.auth_service.session_cookie(&token)))
    }

    fn logout(&self) -> HttpResponse {
        HttpResponse::json(200, &json!({ "success": true, "message": "Logged out" }))
            .with_header("Set-Cookie", self.auth_service.clear_cookie())
    }

    // ========================================================================
    // Projects
    // ========================================================================

    fn list_projects(&self) -> ServerResult<HttpResponse> {
        let containers = self.store.list_containers()?;
        Ok(HttpResponse::json(200, &containers))
    }

    fn get_project(&self, id: &ContainerId) -> ServerResult<HttpResponse> {
        let container = self.store.get_container(id)?.ok_or(ServerError::NotFound)?;
        Ok(HttpResponse::json(200, &container))
    }

    fn create_project(
        &self,
        request: &HttpRequest,
        identity: &Identity,
    ) -> ServerResult<HttpResponse> {
        if !authorize_creation(identity).allow {
            return Err(ServerError::Forbidden);
        }

        let body: NewProject = parse_body(request)?;
        let container = Container::new(
            required_id(body.id, "id")?,
            required_text(body.name, "name")?,
            identity.id.clone(),
        );

        self.store.create_container(&container)?;
        info!(container = %container.id, owner = %identity.id, "project created");

        Ok(success())
    }

    // ========================================================================
    // Analyses
    // ========================================================================

    fn list_analyses(&self, container_id: &ContainerId) -> ServerResult<HttpResponse> {
        self.require_container(container_id)?;
        let items = self.store.list_items(container_id)?;
        Ok(HttpResponse::json(200, &items))
    }

    fn get_analysis(
        &self,
        container_id: &ContainerId,
        item_id: &ItemId,
    ) -> ServerResult<HttpResponse> {
        let item = self
            .store
            .get_item(container_id, item_id)?
            .ok_or(ServerError::NotFound)?;
        Ok(HttpResponse::json(200, &item))
    }

    fn create_analysis(
        &self,
        request: &HttpRequest,
        identity: &Identity,
        container_id: ContainerId,
    ) -> ServerResult<HttpResponse> {
        self.require_container(&container_id)?;

        let body: NewAnalysis = parse_body(request)?;
        let item = Item::new(
            required_id(body.id, "id")?,
            required_text(body.name, "name")?,
            body.content.unwrap_or_default(),
            container_id,
            identity.id.clone(),
        );

        self.store.create_item(&item)?;
        info!(
            item = %item.id,
            container = %item.container_id,
            created_by = %identity.id,
            "analysis created"
        );

        Ok(success())
    }

    fn require_container(&self, id: &ContainerId) -> ServerResult<()> {
        match self.store.get_container(id)? {
            Some(_) => Ok(()),
            None => Err(ServerError::NotFound),
        }
    }
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body ids arrive either as JSON strings or as integers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BodyId {
    Text(String),
    Number(i64),
}

impl BodyId {
    fn into_string(self) -> String {
        match self {
            BodyId::Text(text) => text,
            BodyId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewProject {
    id: Option<BodyId>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewAnalysis {
    id: Option<BodyId>,
    name: Option<String>,
    content: Option<String>,
}

fn parse_body<T: DeserializeOwned>(request: &HttpRequest) -> ServerResult<T> {
    serde_json::from_slice(&request.body)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}

fn required_id(value: Option<BodyId>, field: &str) -> ServerResult<String> {
    required_text(value.map(BodyId::into_string), field)
}

fn required_text(value: Option<String>, field: &str) -> ServerResult<String> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest(format!("missing field: {field}")))
}

fn success() -> HttpResponse {
    HttpResponse::json(200, &json!({ "success": true }))
}

fn index() -> Value {
    json!({
        "message": "Metis access control API",
        "description": "Projects and their analyses, guarded by roles (admin, manager, reader), ownership and per-project grants.",
        "endpoints": [
            { "method": "POST", "path": "/auth/login", "description": "Log in by name" },
            { "method": "POST", "path": "/auth/logout", "description": "Log out" },
            { "method": "GET", "path": "/protected/projects", "description": "List projects" },
            { "method": "POST", "path": "/protected/projects", "description": "Create a project (admin and manager)" },
            { "method": "GET", "path": "/protected/projects/:id", "description": "Get a project" },
            { "method": "GET", "path": "/protected/projects/:id/analyses", "description": "List a project's analyses" },
            { "method": "POST", "path": "/protected/projects/:id/analyses", "description": "Create an analysis (admin and manager)" },
            { "method": "GET", "path": "/protected/projects/:id/analyses/:analysisId", "description": "Get an analysis" },
        ],
        "accessRules": {
            "admin": [
                "Can create projects",
                "Can read every project and its analyses",
                "Can create analyses in any project",
            ],
            "manager": [
                "Can create projects",
                "Can create analyses in any project",
                "Can read analyses of owned or shared projects",
            ],
            "reader": [
                "Cannot create projects or analyses",
                "Can read analyses of projects shared with them",
            ],
        },
        "note": "Protected routes need a valid session_token cookie or bearer token. Use /auth/login to get one.",
    })
}
