use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE},
    Method, Url,
};
use serde::Serialize;

use crate::{CrmError, Result};

/// One logical HTTP call. Built once and only borrowed by the executor, so
/// every attempt resends the same method, URL, headers and body bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSpec {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|err| CrmError::Config(format!("invalid url '{url}': {err}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(Self {
            method,
            url,
            headers,
            body: None,
            timeout: None,
        })
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    /// Builds a request with a JSON body, serialized here once.
    pub fn json<T: Serialize + ?Sized>(method: Method, url: &str, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| CrmError::Decode(format!("could not encode request body: {err}")))?;
        let mut spec = Self::new(method, url)?;
        spec.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        spec.body = Some(bytes);
        Ok(spec)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Overrides the executor's default per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URL path plus query, as shown in error messages.
    pub fn path(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{query}", self.url.path()),
            None => self.url.path().to_owned(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn build(
        &self,
        http: &reqwest::Client,
        default_timeout: Duration,
    ) -> reqwest::RequestBuilder {
        let mut builder = http
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone())
            .timeout(self.timeout.unwrap_or(default_timeout));
        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{
        header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
        Method,
    };
    use serde_json::json;

    use super::RequestSpec;
    use crate::CrmError;

    #[test]
    fn json_spec_serializes_body_once() {
        let spec = RequestSpec::json(
            Method::POST,
            "https://api.example.test/crm/v3/objects/deals/search?archived=false",
            &json!({"limit": 100}),
        )
        .expect("spec must build");

        assert_eq!(spec.body(), Some(br#"{"limit":100}"#.as_slice()));
        assert_eq!(spec.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(spec.path(), "/crm/v3/objects/deals/search?archived=false");
    }

    #[test]
    fn headers_are_added_by_value() {
        let spec = RequestSpec::get("https://api.example.test/ping")
            .expect("spec must build")
            .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        let copy = spec.clone();
        assert_eq!(spec, copy);
        assert_eq!(spec.headers()[AUTHORIZATION], "Bearer t");
        assert!(spec.body().is_none());
    }

    #[test]
    fn invalid_url_is_config_error() {
        let err = RequestSpec::get("not a url").expect_err("must reject");
        assert!(matches!(err, CrmError::Config(_)));
    }
}
