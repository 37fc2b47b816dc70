// Async HTTP client for the Octopus Deploy REST API.
//
// Base path: /api/
// Auth: X-Octopus-ApiKey header
// Space-scoped collections live under /api/{space_id}/{collection}.

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::models::Page;

const API_KEY_HEADER: &str = "X-Octopus-ApiKey";

// ── Error response shape from the Octopus API ────────────────────────

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

// ── Query parameters ─────────────────────────────────────────────────

/// Query-string builder for collection endpoints.
///
/// Empty lists and `None` values are skipped so the server applies
/// its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(&'static str, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comma-joined list parameter (`ids`, `roles`, `environmentIds`...).
    pub fn list(mut self, key: &'static str, values: &[String]) -> Self {
        if !values.is_empty() {
            self.params.push((key, values.join(",")));
        }
        self
    }

    pub fn opt<V: ToString>(mut self, key: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.params.push((key, value.to_string()));
        }
        self
    }

    pub fn skip(self, skip: Option<u32>) -> Self {
        self.opt("skip", skip)
    }

    pub fn take(self, take: Option<u32>) -> Self {
        self.opt("take", take)
    }

    /// Value of the `take` parameter, if set.
    pub fn take_value(&self) -> Option<u32> {
        self.get("take").and_then(|v| v.parse().ok())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this query with `skip`/`take` replaced.
    fn page(&self, skip: u32, take: u32) -> Self {
        let mut params: Vec<_> = self
            .params
            .iter()
            .filter(|(k, _)| *k != "skip" && *k != "take")
            .cloned()
            .collect();
        params.push(("skip", skip.to_string()));
        params.push(("take", take.to_string()));
        Self { params }
    }

    pub fn as_params(&self) -> &[(&'static str, String)] {
        &self.params
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Octopus Deploy REST API.
///
/// Holds an optional default space; every space-scoped endpoint accepts
/// a per-call override that wins over it.
#[derive(Debug, Clone)]
pub struct OctopusClient {
    http: reqwest::Client,
    base_url: Url,
    space_id: Option<String>,
}

impl OctopusClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `X-Octopus-ApiKey` as a default header on every request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &secrecy::SecretString,
        transport: &crate::TransportConfig,
        space_id: Option<String>,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self {
            http,
            base_url,
            space_id,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        space_id: Option<String>,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            space_id,
        })
    }

    /// Ensure the base URL ends with `/api/`.
    ///
    /// Accepts `https://host`, `https://host/`, `https://host/api` and
    /// servers hosted under a virtual directory (`https://host/octopus`).
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/"));
        }

        Ok(url)
    }

    /// Default space for space-scoped endpoints.
    pub fn space_id(&self) -> Option<&str> {
        self.space_id.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Path of a space-scoped collection, e.g. `Spaces-1/environments`.
    ///
    /// Falls back to the unscoped `environments` when neither the call
    /// nor the client carries a space.
    pub(crate) fn scoped(&self, space_id: Option<&str>, path: &str) -> String {
        match space_id.or(self.space_id.as_deref()) {
            Some(space) if !space.is_empty() => format!("{space}/{path}"),
            _ => path.to_owned(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={:?}", query.as_params());

        let resp = self.http.get(url).query(query.as_params()).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::InvalidApiKey;
        }

        let raw = resp.text().await.unwrap_or_default();

        match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(err) => Error::Api {
                status: status.as_u16(),
                message: err.error_message.unwrap_or_else(|| status.to_string()),
                details: err.errors,
            },
            Err(_) => Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                details: Vec::new(),
            },
        }
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Collect every page of a `skip`/`take` collection.
    pub async fn paginate_all<T, F, Fut>(
        &self,
        query: &Query,
        page_size: u32,
        fetch: F,
    ) -> Result<Vec<T>, Error>
    where
        F: Fn(Query) -> Fut,
        Fut: Future<Output = Result<Page<T>, Error>>,
    {
        let mut all = Vec::new();
        let mut skip: u32 = 0;

        loop {
            let page = fetch(query.page(skip, page_size)).await?;
            let received = page.items.len();
            all.extend(page.items);

            if received == 0
                || received < usize::try_from(page_size).unwrap_or(usize::MAX)
                || u64::try_from(all.len()).unwrap_or(u64::MAX) >= page.total_results
            {
                break;
            }

            skip = skip.saturating_add(u32::try_from(received).unwrap_or(u32::MAX));
        }

        Ok(all)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str, space: Option<&str>) -> OctopusClient {
        OctopusClient::from_reqwest(base, reqwest::Client::new(), space.map(str::to_owned))
            .unwrap()
    }

    #[test]
    fn normalizes_base_url() {
        assert_eq!(
            client("https://octo.example.com", None).base_url().as_str(),
            "https://octo.example.com/api/"
        );
        assert_eq!(
            client("https://octo.example.com/api/", None)
                .base_url()
                .as_str(),
            "https://octo.example.com/api/"
        );
        assert_eq!(
            client("https://example.com/octopus", None)
                .base_url()
                .as_str(),
            "https://example.com/octopus/api/"
        );
    }

    #[test]
    fn scoped_paths_prefer_call_space() {
        let c = client("https://octo.example.com", Some("Spaces-1"));
        assert_eq!(c.scoped(None, "environments"), "Spaces-1/environments");
        assert_eq!(
            c.scoped(Some("Spaces-7"), "environments"),
            "Spaces-7/environments"
        );

        let unscoped = client("https://octo.example.com", None);
        assert_eq!(unscoped.scoped(None, "environments"), "environments");
    }

    #[test]
    fn query_skips_empty_values() {
        let q = Query::new()
            .list("ids", &[])
            .list("roles", &["web".into(), "db".into()])
            .opt::<String>("partialName", None)
            .take(Some(10));
        assert_eq!(
            q.as_params(),
            &[("roles", "web,db".to_owned()), ("take", "10".to_owned())]
        );
        assert_eq!(q.take_value(), Some(10));

        let paged = q.page(20, 5);
        assert_eq!(paged.get("skip"), Some("20"));
        assert_eq!(paged.get("take"), Some("5"));
        assert_eq!(paged.get("roles"), Some("web,db"));
    }
}
