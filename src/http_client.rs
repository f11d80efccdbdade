use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::constants::{CONNECT_TIMEOUT_SECONDS, USER_AGENT};

pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECONDS))
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .build()
        .context("Failed to build reqwest client")
}

async fn send_checked(request: RequestBuilder, url: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .with_context(|| format!("Request failed for {url}"))?;

    if !response.status().is_success() {
        bail!("Request failed ({}) for {url}", response.status());
    }

    Ok(response)
}

pub async fn fetch_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    timeout: Duration,
    bearer: Option<&str>,
) -> Result<T> {
    let mut request = http.get(url).timeout(timeout);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }
    let response = send_checked(request, url).await?;
    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to decode JSON body for {url}"))
}

pub async fn fetch_bytes(http: &Client, url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let response = send_checked(http.get(url).timeout(timeout), url).await?;
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read body for {url}"))?;
    Ok(bytes.to_vec())
}

pub async fn post_json<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
    http: &Client,
    url: &str,
    timeout: Duration,
    bearer: &str,
    body: &B,
) -> Result<T> {
    let request = http
        .post(url)
        .timeout(timeout)
        .bearer_auth(bearer)
        .json(body);
    let response = send_checked(request, url).await?;
    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to decode JSON body for {url}"))
}
