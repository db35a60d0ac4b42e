//! JSON API server with content watching.

use super::load_config;
use anyhow::{Context, Result};
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use docsite_core::{
    build_tree, check_access, is_public_path, AccessDecision, AppRole, Config, DocResolver,
    TagIndex, TreeNode, Viewer,
};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Role header set by the authenticating proxy in front of the server
pub const ROLE_HEADER: &str = "x-docsite-role";
/// Set to `true` or `1` for viewers on the privileged list
pub const PRIVILEGED_HEADER: &str = "x-docsite-privileged";

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    resolver: Arc<DocResolver>,
    data: Arc<RwLock<SiteData>>,
}

/// Snapshots recomputed when content changes
struct SiteData {
    tree: Vec<TreeNode>,
    tags: TagIndex,
}

fn load_site_data(config: &Config) -> Result<SiteData> {
    let tree = build_tree(config).context("Failed to build navigation tree")?;
    let tags = TagIndex::scan(&config.content_dir()).context("Failed to scan tags")?;
    Ok(SiteData { tree, tags })
}

impl AppState {
    fn new(config: Config) -> Result<Self> {
        let data = load_site_data(&config)?;
        Ok(Self {
            resolver: Arc::new(DocResolver::from_config(&config)),
            config: Arc::new(config),
            data: Arc::new(RwLock::new(data)),
        })
    }

    /// Recompute snapshots and drop cached glossary terms
    async fn reload(&self) {
        let res = tokio::task::spawn_blocking({
            let config = Arc::clone(&self.config);
            move || load_site_data(&config)
        })
        .await;

        match res {
            Ok(Ok(site)) => {
                *self.data.write().await = site;
                if let Some(glossary) = self.resolver.glossary() {
                    glossary.invalidate();
                }
                tracing::info!("Reload complete");
            }
            Ok(Err(e)) => tracing::error!("Reload failed: {:?}", e),
            Err(e) => tracing::error!("Reload task panicked: {}", e),
        }
    }
}

/// Start the API server and watch the content directory
pub async fn serve(config_path: &Path, port: Option<u16>) -> Result<()> {
    let config = load_config(config_path)?;
    let port = port.unwrap_or(config.server.port);
    let content_dir = config.content_dir();
    let state = AppState::new(config).context("Failed to load content")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .context("Failed to initialize file watcher")?;

    if content_dir.is_dir() {
        watcher
            .watch(&content_dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {:?}", content_dir))?;
    } else {
        tracing::warn!("Content directory {:?} does not exist, not watching", content_dir);
    }

    tokio::spawn({
        let state = state.clone();
        async move {
            while let Some(event) = rx.recv().await {
                match event {
                    Ok(ev) if matches!(ev.kind, EventKind::Access(_)) => {}
                    Ok(_) => {
                        // Debounce by draining pending events
                        while rx.try_recv().is_ok() {}
                        tracing::info!("Content changed, reloading...");
                        state.reload().await;
                    }
                    Err(err) => tracing::warn!("Watcher error: {}", err),
                }
            }
        }
    });

    let app = router(state);
    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Serving API on http://{}", addr);
    println!("\nServing at http://{}", addr);
    println!("   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    drop(watcher);
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tree", get(api_tree))
        .route("/api/docs/{*route}", get(api_doc))
        .route("/api/tags", get(api_tags))
        .route("/api/tags/docs", get(api_tag_docs))
        .route("/api/glossary", get(api_glossary))
        .route("/api/session", get(api_session))
        .fallback(|| async { error_response(StatusCode::NOT_FOUND, "Not found") })
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// ---- access ----

fn viewer_from_headers(headers: &HeaderMap) -> Option<Viewer> {
    let role = headers.get(ROLE_HEADER)?.to_str().ok()?;
    let role = match role.parse::<AppRole>() {
        Ok(role) => role,
        Err(e) => {
            tracing::debug!("Ignoring role header: {}", e);
            AppRole::Guest
        }
    };
    let privileged = headers
        .get(PRIVILEGED_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
        .unwrap_or(false);
    Some(Viewer::new(role, privileged))
}

/// Admit the request for `page_path` or produce the rejection
fn authorize(state: &AppState, headers: &HeaderMap, page_path: &str) -> Result<(), Response> {
    let access = &state.config.access;
    if is_public_path(page_path, &access.public_paths) {
        return Ok(());
    }

    match check_access(viewer_from_headers(headers).as_ref(), access.docs) {
        AccessDecision::Granted => Ok(()),
        AccessDecision::SignInRequired => {
            Err(error_response(StatusCode::UNAUTHORIZED, "Sign in required"))
        }
        AccessDecision::Forbidden => Err(error_response(
            StatusCode::FORBIDDEN,
            "Your role does not grant access to this page",
        )),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn docs_page(state: &AppState, route: &str) -> String {
    let prefix = state.config.normalized_docs_prefix();
    if route.is_empty() {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix
        }
    } else {
        format!("{}/{}", prefix, route.trim_matches('/'))
    }
}

// ---- API handlers ----

async fn api_tree(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers, &docs_page(&state, "")) {
        return rejection;
    }
    let data = state.data.read().await;
    Json(&data.tree).into_response()
}

async fn api_doc(
    State(state): State<AppState>,
    AxumPath(route): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers, &docs_page(&state, &route)) {
        return rejection;
    }

    let resolver = Arc::clone(&state.resolver);
    let res = tokio::task::spawn_blocking(move || resolver.resolve(&route)).await;
    match res {
        Ok(Ok(doc)) => Json(doc).into_response(),
        Ok(Err(e)) if e.is_not_found() => error_response(StatusCode::NOT_FOUND, &e.to_string()),
        Ok(Err(e)) => {
            tracing::error!("Failed to resolve document: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render document")
        }
        Err(e) => {
            tracing::error!("Render task panicked: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render document")
        }
    }
}

async fn api_tags(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers, "/tags") {
        return rejection;
    }
    let data = state.data.read().await;
    Json(&data.tags.tags).into_response()
}

#[derive(Deserialize)]
struct TagDocsParams {
    tag: Option<String>,
}

async fn api_tag_docs(
    State(state): State<AppState>,
    Query(params): Query<TagDocsParams>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers, "/tags") {
        return rejection;
    }
    let data = state.data.read().await;
    match params.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(tag) => Json(json!({
            "tag": tag.to_lowercase(),
            "docs": data.tags.docs_with_tag(tag),
            "related": data.tags.related_tags(tag),
        }))
        .into_response(),
        None => Json(&data.tags.docs).into_response(),
    }
}

async fn api_glossary(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let page = docs_page(&state, &state.config.glossary.dir);
    if let Err(rejection) = authorize(&state, &headers, &page) {
        return rejection;
    }
    let Some(cache) = state.resolver.glossary().cloned() else {
        return Json(json!([])).into_response();
    };

    match tokio::task::spawn_blocking(move || cache.terms()).await {
        Ok(Ok(terms)) => Json(terms).into_response(),
        Ok(Err(e)) => {
            tracing::warn!("Glossary scan failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Glossary unavailable")
        }
        Err(e) => {
            tracing::error!("Glossary task panicked: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Glossary unavailable")
        }
    }
}

async fn api_session(headers: HeaderMap) -> Response {
    let body = match viewer_from_headers(&headers) {
        Some(viewer) => json!({
            "authenticated": true,
            "role": viewer.role,
            "privileged": viewer.privileged,
        }),
        None => json!({ "authenticated": false }),
    };
    Json(body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn fixture() -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(content.join("guides")).unwrap();
        fs::create_dir_all(content.join("glossary")).unwrap();
        fs::write(
            content.join("guides/setup.md"),
            "---\ntitle: Setup\ntags: [Rust]\n---\n# Setup\n\nInstall Docker first.\n",
        )
        .unwrap();
        fs::write(
            content.join("glossary/docker.md"),
            "---\ntitle: Docker\nglossary: true\ndefinition: Container runtime\n---\n",
        )
        .unwrap();

        let state = AppState::new(Config::for_content_dir(&content)).unwrap();
        (dir, state)
    }

    async fn get_json(state: &AppState, uri: &str, role: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(role) = role {
            request = request.header(ROLE_HEADER, role);
        }
        let response = router(state.clone())
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_anonymous_is_asked_to_sign_in() {
        let (_dir, state) = fixture();
        let (status, body) = get_json(&state, "/api/tree", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Sign in required");
    }

    #[tokio::test]
    async fn test_guest_is_forbidden() {
        let (_dir, state) = fixture();
        let (status, _) = get_json(&state, "/api/docs/guides/setup", Some("guest")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_member_reads_documents() {
        let (_dir, state) = fixture();
        let (status, body) = get_json(&state, "/api/docs/guides/setup", Some("member")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Setup");
        assert_eq!(body["readingTime"], 1);
        assert!(body["content"]
            .as_str()
            .unwrap()
            .contains("class=\"glossary-term\""));

        let (status, tree) = get_json(&state, "/api/tree", Some("member")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tree[0]["path"], "guides");
    }

    #[tokio::test]
    async fn test_missing_document_is_404() {
        let (_dir, state) = fixture();
        let (status, _) = get_json(&state, "/api/docs/nope", Some("admin")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tags_are_public() {
        let (_dir, state) = fixture();
        let (status, tags) = get_json(&state, "/api/tags", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tags[0]["name"], "rust");

        let (status, docs) = get_json(&state, "/api/tags/docs?tag=RUST", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(docs["docs"][0]["path"], "guides/setup");
    }

    #[tokio::test]
    async fn test_glossary_endpoint() {
        let (_dir, state) = fixture();
        let (status, terms) = get_json(&state, "/api/glossary", Some("admin")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(terms[0]["term"], "Docker");
    }

    #[tokio::test]
    async fn test_session() {
        let (_dir, state) = fixture();
        let (_, anonymous) = get_json(&state, "/api/session", None).await;
        assert_eq!(anonymous["authenticated"], false);

        let (_, member) = get_json(&state, "/api/session", Some("member")).await;
        assert_eq!(member["authenticated"], true);
        assert_eq!(member["role"], "member");
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_content() {
        let (dir, state) = fixture();
        fs::write(dir.path().join("content/faq.md"), "---\ntags: [help]\n---\nFAQ").unwrap();
        state.reload().await;

        let data = state.data.read().await;
        assert!(data.tree.iter().any(|n| n.path == "faq"));
        assert_eq!(data.tags.tags.len(), 2);
    }
}
