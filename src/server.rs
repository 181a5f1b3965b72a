//! A minimal HTTP surface over a [`Citator`], behind the `server` feature.

use crate::citator::Citator;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared server state: just the loaded citator.
struct ServerState {
    /// The citator every route scans against.
    citator: Citator,
}

#[derive(Deserialize)]
struct CiteQuery {
    q: String,
    #[serde(default)]
    broad: bool,
}

#[derive(Serialize)]
struct CiteResponse {
    text: String,
    template: String,
    url: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct ListQuery {
    text: String,
}

/// Builds the router for `citator`. Exposed separately from [`serve`] so
/// tests (or an embedding application) can mount it under their own router.
fn router(citator: Citator) -> Router {
    let state = Arc::new(ServerState { citator });
    Router::new()
        .route("/cite", get(cite_handler))
        .route("/list-cites", get(list_cites_handler))
        .with_state(state)
}

async fn cite_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<CiteQuery>,
) -> Result<Json<CiteResponse>, StatusCode> {
    let citation = state
        .citator
        .cite(&query.q, query.broad)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(CiteResponse {
        text: citation.text.clone(),
        template: citation.template.name.clone(),
        url: citation.url.clone(),
        name: citation.name.clone(),
    }))
}

async fn list_cites_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<CiteResponse>> {
    let citations = state.citator.list_cites(&query.text, None);
    Json(
        citations
            .into_iter()
            .map(|c| CiteResponse {
                text: c.text.clone(),
                template: c.template.name.clone(),
                url: c.url.clone(),
                name: c.name.clone(),
            })
            .collect(),
    )
}

/// Serves `citator` over HTTP at `bind`.
pub async fn serve(citator: Citator, bind: &str) -> std::io::Result<()> {
    let app = router(citator);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Listening at {bind}");
    axum::serve(listener, app).await
}
