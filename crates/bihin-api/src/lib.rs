// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use bihin_app::{Category, Equipment, Location, Resource, ResourceApi};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// A record type served from a REST collection under the API base.
pub trait RestResource: Resource + DeserializeOwned {
    /// Path segment of the collection, without slashes.
    const COLLECTION: &'static str;
}

impl RestResource for Category {
    const COLLECTION: &'static str = "categories";
}

impl RestResource for Location {
    const COLLECTION: &'static str = "locations";
}

impl RestResource for Equipment {
    const COLLECTION: &'static str = "equipments";
}

/// Blocking JSON client for the inventory API. Every collection and record
/// path carries a trailing slash.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = HttpClient::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn collection_url<R: RestResource>(&self) -> Result<Url> {
        self.base_url
            .join(&format!("{}/", R::COLLECTION))
            .with_context(|| format!("build {} collection url", R::COLLECTION))
    }

    pub fn record_url<R: RestResource>(&self, id: R::Id) -> Result<Url> {
        self.base_url
            .join(&format!("{}/{id}/", R::COLLECTION))
            .with_context(|| format!("build {} url for id {id}", R::KIND.singular()))
    }

    pub fn get<R: RestResource>(&self, id: R::Id) -> Result<R> {
        let url = self.record_url::<R>(id)?;
        let response = self.send(self.http.get(url.clone()), &url)?;
        response
            .json()
            .with_context(|| format!("decode {} {id}", R::KIND.singular()))
    }

    /// Checks that the API root answers with a success status.
    pub fn ping(&self) -> Result<()> {
        self.send(self.http.get(self.base_url.clone()), &self.base_url)?;
        Ok(())
    }

    fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response> {
        tracing::debug!(url = %url, "http request");
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }
}

impl<R: RestResource> ResourceApi<R> for Client {
    fn get_all(&self) -> Result<Vec<R>> {
        let url = self.collection_url::<R>()?;
        let response = self.send(self.http.get(url.clone()), &url)?;
        response
            .json()
            .with_context(|| format!("decode {} list", R::KIND.singular()))
    }

    fn create(&self, input: &R::Input) -> Result<R> {
        let url = self.collection_url::<R>()?;
        let response = self.send(self.http.post(url.clone()).json(input), &url)?;
        response
            .json()
            .with_context(|| format!("decode created {}", R::KIND.singular()))
    }

    fn update(&self, id: R::Id, input: &R::Input) -> Result<R> {
        let url = self.record_url::<R>(id)?;
        let response = self.send(self.http.put(url.clone()).json(input), &url)?;
        response
            .json()
            .with_context(|| format!("decode updated {} {id}", R::KIND.singular()))
    }

    fn delete(&self, id: R::Id) -> Result<()> {
        let url = self.record_url::<R>(id)?;
        self.send(self.http.delete(url.clone()), &url)?;
        Ok(())
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("api.base_url must not be empty");
    }
    let mut normalized = trimmed.to_owned();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }

    let url = Url::parse(&normalized)
        .with_context(|| format!("api.base_url {trimmed:?} is not a valid URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!(
            "api.base_url must use http or https, got {:?} -- e.g. http://localhost:8000/api/",
            url.scheme()
        );
    }
    Ok(url)
}

fn connection_error(base_url: &Url, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- start the inventory API or fix api.base_url ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(detail)) = fields.get("detail")
            && !detail.is_empty()
        {
            return anyhow!("server error ({}): {}", status.as_u16(), detail);
        }

        let problems = fields
            .iter()
            .filter_map(|(field, value)| field_problem(field, value))
            .collect::<Vec<_>>();
        if !problems.is_empty() {
            return anyhow!("server error ({}): {}", status.as_u16(), problems.join("; "));
        }
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

fn field_problem(field: &str, value: &Value) -> Option<String> {
    let messages = match value {
        Value::String(message) => vec![message.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    if messages.is_empty() {
        return None;
    }
    Some(format!("{field}: {}", messages.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::{Client, clean_error_response, normalize_base_url};
    use bihin_app::{Category, CategoryId, Equipment, EquipmentId, Location, LocationId};
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url(" http://localhost:8000/api ").expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
    }

    #[test]
    fn base_url_rejects_other_schemes() {
        let error = normalize_base_url("ftp://example.com/api/").expect_err("ftp is rejected");
        assert!(error.to_string().contains("http or https"));
        assert!(normalize_base_url("   ").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn record_paths_always_end_with_slash() {
        let client = Client::new("http://localhost:8000/api/", Duration::from_secs(1))
            .expect("client should initialize");
        assert_eq!(
            client
                .record_url::<Location>(LocationId::new(7))
                .expect("location url")
                .as_str(),
            "http://localhost:8000/api/locations/7/"
        );
        assert_eq!(
            client
                .record_url::<Category>(CategoryId::new(1))
                .expect("category url")
                .path(),
            "/api/categories/1/"
        );
        assert_eq!(
            client
                .collection_url::<Equipment>()
                .expect("equipment url")
                .path(),
            "/api/equipments/"
        );
        assert_eq!(
            client
                .record_url::<Equipment>(EquipmentId::new(12))
                .expect("equipment record url")
                .path(),
            "/api/equipments/12/"
        );
    }

    #[test]
    fn error_response_prefers_detail() {
        let error = clean_error_response(StatusCode::NOT_FOUND, r#"{"detail":"Not found."}"#);
        assert_eq!(error.to_string(), "server error (404): Not found.");
    }

    #[test]
    fn error_response_flattens_field_errors() {
        let error = clean_error_response(
            StatusCode::BAD_REQUEST,
            r#"{"name":["This field is required."],"status":["\"lost\" is not a valid choice."]}"#,
        );
        let message = error.to_string();
        assert!(message.starts_with("server error (400): "));
        assert!(message.contains("name: This field is required."));
        assert!(message.contains("status: \"lost\" is not a valid choice."));
    }

    #[test]
    fn error_response_falls_back_to_status() {
        assert_eq!(
            clean_error_response(StatusCode::BAD_GATEWAY, "upstream down").to_string(),
            "server error (502): upstream down"
        );
        assert_eq!(
            clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>{oops}</html>")
                .to_string(),
            "server returned 500"
        );
        assert_eq!(
            clean_error_response(StatusCode::SERVICE_UNAVAILABLE, "").to_string(),
            "server returned 503"
        );
    }
}
