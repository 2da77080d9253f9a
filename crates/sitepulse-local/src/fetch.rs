use crate::config::FetchConfig;
use sitepulse_core::{Error, PageFetcher, Result};
use std::time::Duration;

/// Plain HTTP GET strategy (no script execution).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(10).min(cfg.timeout))
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            timeout: cfg.timeout,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&FetchConfig::from_env())
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let url = url::Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {status}")));
        }
        resp.text().await.map_err(|e| Error::Fetch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn fetch_sends_desktop_user_agent() {
        let app = Router::new().route(
            "/",
            get(|headers: axum::http::HeaderMap| async move {
                let ua = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                ([(header::CONTENT_TYPE, "text/html")], format!("<p>{ua}</p>"))
            }),
        );
        let addr = serve(app).await;

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let body = fetcher
            .fetch_text(&format!("http://{addr}/"))
            .await
            .unwrap();
        assert!(body.contains("Chrome/141.0.0.0"), "body={body}");
    }

    #[tokio::test]
    async fn fetch_treats_non_success_status_as_failure() {
        let app = Router::new().route(
            "/",
            get(|| async { (StatusCode::NOT_FOUND, "<html><body>gone</body></html>") }),
        );
        let addr = serve(app).await;

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher
            .fetch_text(&format!("http://{addr}/"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(ref m) if m.contains("404")), "{err}");
    }

    #[tokio::test]
    async fn fetch_rejects_unparseable_urls() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch_text("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
