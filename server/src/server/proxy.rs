use super::wait::wait_response;
use crate::cms::{CMS_HEADER, CMS_RELOAD, CmsAdapter};
use crate::reload::HostSender;
use axum::extract::{Request, State};
use axum::response::Response;
use log::{debug, info, warn};
use std::sync::Arc;

pub(crate) struct ProxyState {
    pub adapter: Arc<dyn CmsAdapter>,
    pub host: HostSender,
    /// Target of the wait page's polling loop.
    pub wait_url: String,
}

/// Forwards every request to the CMS adapter.
///
/// A response flagged with `X-Lume-CMS: reload` asks the host for a reload
/// and is replaced by the wait page. Anything else passes through untouched.
pub(crate) async fn proxy_handler(
    State(state): State<Arc<ProxyState>>,
    request: Request,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = match state.adapter.fetch(request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(target: "server", "{} {} failed: {}", method, uri, err);
            return err.response();
        }
    };

    if !wants_reload(&response) {
        debug!("{} {} -> {}", method, uri, response.status());
        return response;
    }

    info!(target: "cms", "Reloading the site...");
    if let Err(err) = state.host.reload().await {
        warn!(target: "server", "Cannot request reload: {}", err);
    }

    wait_response(&state.wait_url)
}

fn wants_reload(response: &Response) -> bool {
    response
        .headers()
        .get(CMS_HEADER)
        .is_some_and(|value| value == CMS_RELOAD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::{HostMessage, host_channel};
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use lume_shared::{LumeError, LumeResult};
    use tower::ServiceExt;

    /// Answers `/reload` with the reload header, `/fail` with an error and
    /// everything else with a fixed response echoing the request.
    struct ScriptedAdapter;

    impl CmsAdapter for ScriptedAdapter {
        fn fetch(&self, request: Request) -> BoxFuture<'_, LumeResult<Response>> {
            async move {
                match request.uri().path() {
                    "/reload" => Ok((
                        StatusCode::ACCEPTED,
                        [(CMS_HEADER, CMS_RELOAD)],
                        "saved",
                    )
                        .into_response()),
                    "/other" => Ok(([(CMS_HEADER, "noop")], "other").into_response()),
                    "/fail" => Err(LumeError::AdapterHandlerFailure("boom".into())),
                    path => {
                        let body = format!("{} {}", request.method(), path);
                        Ok((
                            StatusCode::CREATED,
                            [
                                (header::CONTENT_TYPE, "application/x-custom"),
                                (header::ETAG, "\"abc\""),
                            ],
                            body,
                        )
                            .into_response())
                    }
                }
            }
            .boxed()
        }
    }

    fn router(host: HostSender) -> Router {
        let state = Arc::new(ProxyState {
            adapter: Arc::new(ScriptedAdapter),
            host,
            wait_url: "http://localhost:3000/admin".to_string(),
        });
        Router::new().fallback(proxy_handler).with_state(state)
    }

    fn request(method: &str, uri: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn passes_responses_through_untouched() {
        let (host, mut rx) = host_channel(4);

        let expected = ScriptedAdapter
            .fetch(request("PUT", "/api/page"))
            .await
            .unwrap();
        let response = router(host).oneshot(request("PUT", "/api/page")).await.unwrap();

        assert_eq!(response.status(), expected.status());
        let mut headers = response.headers().clone();
        // The router may frame the body with a length; nothing else is added.
        headers.remove(header::CONTENT_LENGTH);
        assert_eq!(&headers, expected.headers());
        assert_eq!(headers[header::ETAG], "\"abc\"");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let expected_body = to_bytes(expected.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, expected_body);
        assert_eq!(&body[..], b"PUT /api/page");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_header_values_pass_through() {
        let (host, mut rx) = host_channel(4);

        let response = router(host).oneshot(request("GET", "/other")).await.unwrap();

        assert_eq!(response.headers()[CMS_HEADER], "noop");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"other");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reload_header_serves_wait_page() {
        let (host, mut rx) = host_channel(4);

        let response = router(host).oneshot(request("POST", "/reload")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert!(response.headers().get(CMS_HEADER).is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = std::str::from_utf8(&body).unwrap();
        assert!(!body.contains("saved"));
        assert!(body.contains(r#"fetch("http://localhost:3000/admin")"#));

        assert_eq!(rx.try_recv().unwrap(), HostMessage::Reload);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reload_without_host_still_serves_wait_page() {
        let (host, rx) = host_channel(4);
        drop(rx);

        let response = router(host).oneshot(request("GET", "/reload")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn adapter_failure_is_scoped_to_the_request() {
        let (host, mut rx) = host_channel(4);
        let router = router(host);

        let failed = router.clone().oneshot(request("GET", "/fail")).await.unwrap();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let next = router.oneshot(request("GET", "/index.html")).await.unwrap();
        assert_eq!(next.status(), StatusCode::CREATED);
        assert!(rx.try_recv().is_err());
    }
}
