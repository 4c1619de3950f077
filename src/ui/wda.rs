//! WebDriverAgent backend for real iOS devices and simulators.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::backend::{NormalizedPoint, UiBackend, UiError};
use super::element::{ElementKind, NodeValue, RawNode};
use super::query::ElementQuery;

/// Default WebDriverAgent address when forwarded to localhost.
pub const DEFAULT_WDA_URL: &str = "http://localhost:8100";

/// `XCUIApplicationState.runningForeground`.
const STATE_RUNNING_FOREGROUND: i64 = 4;

/// Client for a running WebDriverAgent server.
///
/// Queries are sent as XCUITest class chains, so each interaction looks the
/// element up again on the device.
pub struct WdaClient {
    base_url: String,
    session_id: String,
    client: Client,
}

impl WdaClient {
    /// Open a WebDriverAgent session.
    pub async fn connect(base_url: impl Into<String>) -> Result<Self, UiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::new();

        let response = client
            .post(format!("{}/session", base_url))
            .json(&json!({ "capabilities": { "alwaysMatch": {} } }))
            .send()
            .await?;
        let body = read_value(response).await?;
        let session_id = body
            .get("sessionId")
            .and_then(Value::as_str)
            .or_else(|| body.pointer("/value/sessionId").and_then(Value::as_str))
            .ok_or_else(|| UiError::Backend("No session id in response".to_string()))?
            .to_string();

        tracing::info!(session = %session_id, url = %base_url, "WebDriverAgent session opened");

        Ok(Self {
            base_url,
            session_id,
            client,
        })
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    async fn post(&self, url: String, body: Value) -> Result<Value, UiError> {
        let response = self.client.post(url).json(&body).send().await?;
        read_value(response).await
    }

    async fn get(&self, url: String) -> Result<Value, UiError> {
        let response = self.client.get(url).send().await?;
        read_value(response).await
    }

    /// Element id of the first match.
    async fn find(&self, query: &ElementQuery) -> Result<String, UiError> {
        self.find_all(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| UiError::NoMatch(query.to_string()))
    }

    async fn find_all(&self, query: &ElementQuery) -> Result<Vec<String>, UiError> {
        let body = self
            .post(
                self.session_url("/elements"),
                json!({ "using": "class chain", "value": query.to_class_chain() }),
            )
            .await?;

        let ids: Vec<String> = body
            .get("value")
            .and_then(Value::as_array)
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|element| {
                        element
                            .get("ELEMENT")
                            .or_else(|| element.get("element-6066-11e4-a52e-4f735466cecf"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    async fn touch_screen(&self, gesture: ScreenGesture) -> Result<(), UiError> {
        let (path, body) = gesture.request(self.window_size().await?);
        self.post(self.session_url(path), body).await?;
        Ok(())
    }

    async fn window_size(&self) -> Result<(f64, f64), UiError> {
        let body = self.get(self.session_url("/window/size")).await?;
        let width = body.pointer("/value/width").and_then(Value::as_f64);
        let height = body.pointer("/value/height").and_then(Value::as_f64);
        match (width, height) {
            (Some(width), Some(height)) => Ok((width, height)),
            _ => Err(UiError::Backend("Window size missing from response".to_string())),
        }
    }
}

/// A touch on the application element itself.
///
/// Class chains are evaluated below the application, so the application
/// cannot be looked up as an element; it is touched at the screen center.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ScreenGesture {
    Tap,
    Hold(Duration),
}

impl ScreenGesture {
    /// Endpoint and body for the gesture on a screen of the given size.
    fn request(self, (width, height): (f64, f64)) -> (&'static str, Value) {
        let (x, y) = (width / 2.0, height / 2.0);
        match self {
            ScreenGesture::Tap => ("/wda/tap/0", json!({ "x": x, "y": y })),
            ScreenGesture::Hold(duration) => (
                "/wda/touchAndHold",
                json!({ "x": x, "y": y, "duration": duration.as_secs_f64() }),
            ),
        }
    }
}

async fn read_value(response: reqwest::Response) -> Result<Value, UiError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(UiError::Backend(format!("{}: {}", status, error_text)));
    }
    Ok(response.json().await?)
}

/// Convert a node of `GET /source?format=json` into a [`RawNode`].
pub fn parse_source_node(node: &Value) -> RawNode {
    let kind = node
        .get("type")
        .and_then(Value::as_str)
        .map(ElementKind::from_type_name)
        .unwrap_or(ElementKind::Other);

    let text = |key: &str| node.get(key).and_then(Value::as_str).map(str::to_string);

    let value = match node.get("value") {
        Some(Value::String(s)) => Some(NodeValue::Text(s.clone())),
        Some(Value::Number(n)) => n.as_f64().map(NodeValue::Number),
        Some(Value::Bool(b)) => Some(NodeValue::Flag(*b)),
        _ => None,
    };

    let children: Vec<RawNode> = node
        .get("children")
        .and_then(Value::as_array)
        .map(|children| children.iter().map(parse_source_node).collect())
        .unwrap_or_default();

    RawNode {
        kind,
        identifier: text("rawIdentifier"),
        label: text("label"),
        value,
        enabled: flag(node.get("isEnabled"), true),
        selected: flag(node.get("isSelected"), false),
        children,
    }
}

/// WebDriverAgent reports booleans either as JSON booleans or as `"1"`/`"0"`.
fn flag(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => default,
    }
}

#[async_trait]
impl UiBackend for WdaClient {
    async fn snapshot(&self, app: &str) -> Result<RawNode, UiError> {
        tracing::debug!(app, "Capturing source");
        let body = self
            .get(format!("{}/source?format=json", self.base_url))
            .await?;
        let tree = body
            .get("value")
            .ok_or_else(|| UiError::Backend("Empty source response".to_string()))?;
        Ok(parse_source_node(tree))
    }

    async fn activate(&self, app: &str) -> Result<(), UiError> {
        self.post(
            self.session_url("/wda/apps/activate"),
            json!({ "bundleId": app }),
        )
        .await?;
        Ok(())
    }

    async fn exists(&self, query: &ElementQuery) -> Result<bool, UiError> {
        if query.is_application() {
            return self.is_foreground(&query.app).await;
        }
        Ok(!self.find_all(query).await?.is_empty())
    }

    async fn tap(&self, query: &ElementQuery) -> Result<(), UiError> {
        if query.is_application() {
            return self.touch_screen(ScreenGesture::Tap).await;
        }
        let element = self.find(query).await?;
        self.post(
            self.session_url(&format!("/element/{}/click", element)),
            json!({}),
        )
        .await?;
        Ok(())
    }

    async fn press(&self, query: &ElementQuery, duration: Duration) -> Result<(), UiError> {
        if query.is_application() {
            return self.touch_screen(ScreenGesture::Hold(duration)).await;
        }
        let element = self.find(query).await?;
        self.post(
            self.session_url(&format!("/wda/element/{}/touchAndHold", element)),
            json!({ "duration": duration.as_secs_f64() }),
        )
        .await?;
        Ok(())
    }

    async fn press_and_drag(
        &self,
        _app: &str,
        from: NormalizedPoint,
        to: NormalizedPoint,
        duration: Duration,
    ) -> Result<(), UiError> {
        let (width, height) = self.window_size().await?;
        self.post(
            self.session_url("/wda/dragfromtoforduration"),
            json!({
                "fromX": from.x * width,
                "fromY": from.y * height,
                "toX": to.x * width,
                "toY": to.y * height,
                "duration": duration.as_secs_f64(),
            }),
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, query: &ElementQuery, text: &str) -> Result<(), UiError> {
        let chars: Vec<String> = text.chars().map(String::from).collect();
        if query.is_application() {
            // Goes to whatever holds keyboard focus.
            self.post(self.session_url("/wda/keys"), json!({ "value": chars }))
                .await?;
            return Ok(());
        }
        let element = self.find(query).await?;
        self.post(
            self.session_url(&format!("/element/{}/value", element)),
            json!({ "value": chars, "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn press_home(&self) -> Result<(), UiError> {
        self.post(format!("{}/wda/homescreen", self.base_url), json!({}))
            .await?;
        Ok(())
    }

    async fn is_foreground(&self, app: &str) -> Result<bool, UiError> {
        let body = self
            .post(
                self.session_url("/wda/apps/state"),
                json!({ "bundleId": app }),
            )
            .await?;
        Ok(body.get("value").and_then(Value::as_i64) == Some(STATE_RUNNING_FOREGROUND))
    }
}
