//! Embedded HUD page

use axum::response::Html;

/// Serve the embedded HUD
pub async fn serve_ui() -> Html<&'static str> {
    Html(include_str!("hud.html"))
}
