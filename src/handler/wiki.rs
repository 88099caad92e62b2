//! Page operation handlers
//!
//! Each handler turns one store outcome into exactly one response.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::config::AppState;
use crate::http;
use crate::logger;
use crate::page::{LoadError, Page};
use crate::render::TemplateName;
use crate::routing::Operation;

/// Render an existing page, or send the client to the editor when it is absent
pub async fn view(state: &AppState, title: &str, is_head: bool) -> Response<Full<Bytes>> {
    match state.store.load(title).await {
        Ok(page) => render(state, TemplateName::View, &page, is_head),
        Err(e) => {
            log_load_failure(title, &e);
            http::build_redirect_response(&Operation::Edit.path_for(title))
        }
    }
}

/// Render the edit form, blank when the page does not exist yet
pub async fn edit(state: &AppState, title: &str, is_head: bool) -> Response<Full<Bytes>> {
    let page = match state.store.load(title).await {
        Ok(page) => page,
        Err(e) => {
            log_load_failure(title, &e);
            Page::blank(title)
        }
    };
    render(state, TemplateName::Edit, &page, is_head)
}

/// Persist a page body and redirect to its view
pub async fn save(state: &AppState, title: &str, body: Vec<u8>) -> Response<Full<Bytes>> {
    let page = Page::new(title, body);
    match state.store.save(&page).await {
        Ok(()) => http::build_redirect_response(&Operation::View.path_for(title)),
        Err(e) => {
            logger::log_error(&format!("Failed to save page '{title}': {e}"));
            http::build_500_response(&e.to_string())
        }
    }
}

fn render(
    state: &AppState,
    template: TemplateName,
    page: &Page,
    is_head: bool,
) -> Response<Full<Bytes>> {
    logger::log_info(&format!("[Render] {template} for '{}'", page.title));
    match state.templates.render(template, page) {
        Ok(html) => http::build_html_response(html, is_head),
        Err(e) => {
            logger::log_error(&format!("Failed to render {template}: {e}"));
            http::build_500_response(&e.to_string())
        }
    }
}

/// Every load failure reads as "absent" to the client; only the log says why
fn log_load_failure(title: &str, err: &LoadError) {
    match err {
        LoadError::Missing(_) => {
            logger::log_info(&format!("[Store] Page '{title}' does not exist yet"));
        }
        LoadError::InvalidTitle(_) | LoadError::PermissionDenied(_) | LoadError::Io { .. } => {
            logger::log_warning(&format!("Treating page '{title}' as absent: {err}"));
        }
    }
}
