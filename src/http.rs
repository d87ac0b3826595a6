//! Thin JSON-over-HTTP adapter. Maps transport, status and decoding
//! failures onto [`FetchError`]; never retries.

use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::query::FetchError;

const USER_AGENT: &str = concat!("storefront/", env!("CARGO_PKG_VERSION"));

/// Longest error body echoed into an error message
const MAX_ERROR_BODY: usize = 200;

#[derive(Clone, Debug)]
pub struct HttpClient {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpClient {
  /// Create a client rooted at `base_url`. Paths passed to requests are
  /// resolved relative to it.
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let mut base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid base URL {}: {}", base_url, e))?;

    // Url::join replaces the last segment unless the path ends with '/'
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(USER_AGENT)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| FetchError::Network(format!("invalid request path {}: {}", path, e)))
  }

  /// Issue a request and return the parsed JSON body.
  pub async fn request(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<&serde_json::Value>,
  ) -> Result<serde_json::Value, FetchError> {
    let url = self.endpoint(path)?;
    debug!(method = %method, url = %url, "http request");

    let mut request = self.client.request(method, url.clone());
    if !query.is_empty() {
      request = request.query(query);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let bytes = response.bytes().await.map_err(transport_error)?;

    if !status.is_success() {
      debug!(status = status.as_u16(), url = %url, "http error status");
      return Err(status_error(status, &bytes));
    }

    serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
  }

  pub async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T, FetchError> {
    let value = self.request(Method::GET, path, query, None).await?;
    serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))
  }

  pub async fn post_json<B: Serialize, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, FetchError> {
    let body = serde_json::to_value(body)
      .map_err(|e| FetchError::Decode(format!("failed to encode request body: {}", e)))?;
    let value = self.request(Method::POST, path, &[], Some(&body)).await?;
    serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))
  }

  /// Whether the host answers at all. Any HTTP response counts.
  pub async fn reachable(&self) -> bool {
    self
      .client
      .head(self.base_url.clone())
      .send()
      .await
      .is_ok()
  }
}

fn transport_error(e: reqwest::Error) -> FetchError {
  if e.is_timeout() {
    FetchError::Network("request timed out".to_string())
  } else if e.is_decode() {
    FetchError::Decode(e.to_string())
  } else {
    FetchError::Network(e.to_string())
  }
}

fn status_error(status: StatusCode, body: &[u8]) -> FetchError {
  let text = String::from_utf8_lossy(body);
  let text = text.trim();
  let message = if text.is_empty() {
    status.canonical_reason().unwrap_or("unknown status").to_string()
  } else {
    text.chars().take(MAX_ERROR_BODY).collect()
  };

  FetchError::HttpStatus {
    status: status.as_u16(),
    message,
  }
}


#[cfg(test)]
mod tests {
  use super::test_server::serve_once;
  use super::*;
  use serde::Deserialize;
  use tokio::net::TcpListener;

  fn client(base: &str) -> HttpClient {
    HttpClient::new(base, Duration::from_secs(5)).unwrap()
  }

  #[derive(Debug, Deserialize, PartialEq)]
  struct Item {
    id: u64,
    title: String,
  }

  #[test]
  fn test_base_url_gets_trailing_slash() {
    let http = client("https://randomuser.me/api");
    assert_eq!(http.base_url().as_str(), "https://randomuser.me/api/");
    assert_eq!(
      http.endpoint("").unwrap().as_str(),
      "https://randomuser.me/api/"
    );

    let http = client("https://fakestoreapi.com");
    assert_eq!(
      http.endpoint("/products").unwrap().as_str(),
      "https://fakestoreapi.com/products"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    assert!(HttpClient::new("not a url", Duration::from_secs(1)).is_err());
  }

  #[tokio::test]
  async fn test_get_json_sends_query_and_decodes() {
    let (base, request) = serve_once("200 OK", r#"[{"id":1,"title":"Backpack"}]"#).await;
    let items: Vec<Item> = client(&base)
      .get_json("products", &[("sort", "price-low".to_string())])
      .await
      .unwrap();

    assert_eq!(
      items,
      vec![Item {
        id: 1,
        title: "Backpack".to_string()
      }]
    );
    let request = request.await.unwrap();
    assert!(request.starts_with("GET /products?sort=price-low HTTP/1.1"));
  }

  #[tokio::test]
  async fn test_post_json_sends_body() {
    let (base, request) = serve_once("201 Created", r#"{"id":21,"title":"Hat"}"#).await;
    let created: Item = client(&base)
      .post_json("products", &serde_json::json!({ "title": "Hat" }))
      .await
      .unwrap();

    assert_eq!(created.id, 21);
    let request = request.await.unwrap();
    assert!(request.starts_with("POST /products HTTP/1.1"));
    assert!(request.contains(r#"{"title":"Hat"}"#));
  }

  #[tokio::test]
  async fn test_non_success_status() {
    let (base, _request) = serve_once("500 Internal Server Error", "").await;
    let err = client(&base)
      .get_json::<Vec<Item>>("products", &[])
      .await
      .unwrap_err();

    assert_eq!(
      err,
      FetchError::HttpStatus {
        status: 500,
        message: "Internal Server Error".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_error_body_becomes_message() {
    let (base, _request) = serve_once("404 Not Found", r#"{"error":"no such product"}"#).await;
    let err = client(&base)
      .get_json::<Item>("products/999", &[])
      .await
      .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("no such product"));
  }

  #[tokio::test]
  async fn test_undecodable_body() {
    let (base, _request) = serve_once("200 OK", "<html>maintenance</html>").await;
    let err = client(&base)
      .get_json::<Vec<Item>>("products", &[])
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
  }

  #[tokio::test]
  async fn test_wrong_shape_is_decode_error() {
    let (base, _request) = serve_once("200 OK", r#"{"id":"one"}"#).await;
    let err = client(&base).get_json::<Item>("products/1", &[]).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
  }

  #[tokio::test]
  async fn test_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let http = client(&format!("http://{}", addr));
    let err = http.get_json::<Vec<Item>>("products", &[]).await.unwrap_err();
    assert!(err.is_network());
    assert!(!http.reachable().await);
  }

  #[tokio::test]
  async fn test_timeout_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let (_socket, _) = listener.accept().await.unwrap();
      tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let http = HttpClient::new(&format!("http://{}", addr), Duration::from_millis(100)).unwrap();
    let err = http.get_json::<Vec<Item>>("products", &[]).await.unwrap_err();
    assert_eq!(err, FetchError::Network("request timed out".to_string()));
  }
}
