use axum::response::Html;

/// GET / - Static page describing the API, with a browser upload form
pub async fn index() -> Html<&'static str> {
    Html(include_str!("landing.html"))
}
