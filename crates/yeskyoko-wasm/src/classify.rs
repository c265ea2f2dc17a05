//! Classification over `fetch`.
//!
//! [`FetchClassifier`] posts the serialized frame to the configured endpoint
//! and parses the JSON body. The binding [`classification_verdict`] exposes
//! verdict selection to callers that do their own fetching.

use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response, Window};
use yeskyoko_core::{ClassificationResponse, Classifier, ClassifyError};

use crate::types::{config_from_js, describe_js_error, to_js_error};

/// Status and body of one HTTP exchange.
struct Reply {
    status: u16,
    ok: bool,
    body: String,
}

/// Posts frames with the browser's `fetch`.
pub struct FetchClassifier {
    window: Window,
    endpoint: String,
}

impl FetchClassifier {
    pub fn new(window: Window, endpoint: impl Into<String>) -> Self {
        Self {
            window,
            endpoint: endpoint.into(),
        }
    }

    async fn post(&self, body: &str) -> Result<Reply, JsValue> {
        let init = RequestInit::new();
        init.set_method("POST");
        init.set_body(&JsValue::from_str(body));
        let request = Request::new_with_str_and_init(&self.endpoint, &init)?;

        let response: Response = JsFuture::from(self.window.fetch_with_request(&request))
            .await?
            .dyn_into()?;
        let text = JsFuture::from(response.text()?).await?;
        Ok(Reply {
            status: response.status(),
            ok: response.ok(),
            body: text.as_string().unwrap_or_default(),
        })
    }
}

impl Classifier for FetchClassifier {
    async fn classify(&self, data_uri: String) -> Result<ClassificationResponse, ClassifyError> {
        debug!(endpoint = %self.endpoint, bytes = data_uri.len(), "posting frame");
        let reply = self
            .post(&data_uri)
            .await
            .map_err(|e| ClassifyError::Network(describe_js_error(&e)))?;
        debug!(status = reply.status, bytes = reply.body.len(), "classification reply");

        interpret_reply(reply)
    }
}

/// A JSON body is honoured whatever the status; an unparseable body from a
/// failed request is reported as the HTTP status.
fn interpret_reply(reply: Reply) -> Result<ClassificationResponse, ClassifyError> {
    match ClassificationResponse::from_json(&reply.body) {
        Ok(response) => Ok(response),
        Err(_) if !reply.ok => Err(ClassifyError::Network(format!("HTTP {}", reply.status))),
        Err(err) => Err(err),
    }
}

/// Pick the verdict for a classification response body.
///
/// Returns `"positive"`, `"negative"` or `"no-face-detected"`, and throws
/// the service message when the body carries an `error` field.
#[wasm_bindgen]
pub fn classification_verdict(body: &str, config: JsValue) -> Result<JsValue, JsValue> {
    let config = config_from_js(config)?;
    let verdict = ClassificationResponse::from_json(body)
        .and_then(|response| response.verdict(&config))
        .map_err(to_js_error)?;
    Ok(serde_wasm_bindgen::to_value(&verdict)?)
}
