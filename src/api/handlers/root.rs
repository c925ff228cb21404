use axum::response::IntoResponse;

// axum handler for the bare root; points callers at the API docs.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " - see /swagger-ui")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, response::IntoResponse};

    #[tokio::test]
    async fn root_names_the_service() {
        let response = root().await.into_response();
        let bytes = to_bytes(response.into_body(), 1024).await.expect("body");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(text.starts_with("clef"));
    }
}
