//! HTTP logits backend.
//!
//! Posts encoded inputs to an inference server and reads back one row of
//! logits per input:
//!
//! ```text
//! POST {endpoint}
//! {"model": "roberta-large-mnli", "device": "cuda:0",
//!  "inputs": [{"input_ids": [...], "attention_mask": [...], "token_type_ids": [...]}]}
//!
//! 200 OK
//! {"logits": [[-1.2, 3.4, 0.1]]}
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use nlx_core::config::BackendSettings;
use nlx_core::{Classifier, Device, Encoding, ExplainResult};

use crate::error::BackendError;

#[derive(Debug, Serialize)]
struct LogitsRequest<'a> {
    model: &'a str,
    device: String,
    inputs: Vec<EncodedInput<'a>>,
}

#[derive(Debug, Serialize)]
struct EncodedInput<'a> {
    input_ids: &'a [u32],
    attention_mask: &'a [u32],
    token_type_ids: &'a [u32],
}

impl<'a> From<&'a Encoding> for EncodedInput<'a> {
    fn from(encoding: &'a Encoding) -> Self {
        Self {
            input_ids: &encoding.input_ids,
            attention_mask: &encoding.attention_mask,
            token_type_ids: &encoding.token_type_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LogitsResponse {
    logits: Vec<Vec<f32>>,
}

/// Sequence classifier served over HTTP.
pub struct HttpClassifier {
    client: reqwest::blocking::Client,
    endpoint: String,
    model_card: String,
    device: Device,
}

impl HttpClassifier {
    pub fn new(
        endpoint: impl Into<String>,
        model_card: impl Into<String>,
        device: Device,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model_card: model_card.into(),
            device,
        })
    }

    pub fn from_settings(
        settings: &BackendSettings,
        model_card: impl Into<String>,
    ) -> Result<Self, BackendError> {
        Self::new(
            settings.endpoint.clone(),
            model_card,
            settings.device,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request<'a>(&'a self, inputs: &'a [Encoding]) -> LogitsRequest<'a> {
        LogitsRequest {
            model: &self.model_card,
            device: self.device.to_string(),
            inputs: inputs.iter().map(EncodedInput::from).collect(),
        }
    }

    fn post(&self, inputs: &[Encoding]) -> Result<Vec<Vec<f32>>, BackendError> {
        tracing::trace!(endpoint = %self.endpoint, batch = inputs.len(), "requesting logits");
        let response: LogitsResponse = self
            .client
            .post(&self.endpoint)
            .json(&self.request(inputs))
            .send()?
            .error_for_status()?
            .json()?;
        if response.logits.len() != inputs.len() {
            return Err(BackendError::response(format!(
                "expected {} logit rows, got {}",
                inputs.len(),
                response.logits.len()
            )));
        }
        Ok(response.logits)
    }
}

impl Classifier for HttpClassifier {
    fn logits(&self, input: &Encoding) -> ExplainResult<Vec<f32>> {
        let mut rows = self.post(std::slice::from_ref(input))?;
        rows.pop()
            .ok_or_else(|| BackendError::response("empty logits response").into())
    }

    fn logits_batch(&self, inputs: &[Encoding]) -> ExplainResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.post(inputs)?)
    }
}
