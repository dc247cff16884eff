use crate::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MODEL_URL, MAX_NEW_TOKENS, READ_TIMEOUT_SECS, TEMPERATURE,
    TOP_P,
};
use crate::errors::AppError;
use crate::settings::ExplanationStyle;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Remote code-explanation collaborator. Failures are values the caller can
/// display; the session keeps running either way.
pub trait ExplanationProvider: Send + Sync {
    fn explain(&self, code: &str, style: ExplanationStyle) -> Result<String, AppError>;
    fn answer(
        &self,
        question: &str,
        style: ExplanationStyle,
        code: Option<&str>,
    ) -> Result<String, AppError>;
}

pub fn instruction_for(style: ExplanationStyle) -> &'static str {
    match style {
        ExplanationStyle::Concise => {
            "Give a very short explanation of the following code and correct errors \
             (indentation, syntax or any other) if any while explaining:"
        }
        ExplanationStyle::Reiterate => {
            "Reiterate what this code does step by step and correct errors \
             (indentation, syntax or any other) if any while explaining:"
        }
        ExplanationStyle::InDepth => {
            "Give a detailed, in-depth explanation of the following code and correct errors \
             (indentation, syntax or any other) if any while explaining:"
        }
    }
}

/// Endpoints are user-configurable, so hold them to HTTPS with a real host
/// and no embedded credentials.
pub fn validate_endpoint(url: &str) -> Result<String, AppError> {
    let parsed =
        Url::parse(url).map_err(|e| AppError::Other(format!("Invalid endpoint URL: {}", e)))?;
    if parsed.scheme() != "https" {
        return Err(AppError::Other(
            "Only HTTPS endpoints are allowed".to_string(),
        ));
    }
    if parsed.host_str().is_none() {
        return Err(AppError::Other("Endpoint URL missing host".to_string()));
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(AppError::Other(
            "Endpoint URL userinfo is not allowed".to_string(),
        ));
    }
    Ok(parsed.into())
}

/// Inference endpoints answer either `[{"generated_text": ...}]` or
/// `{"generated_text": ...}`; anything else is a provider error.
fn extract_generated_text(result: &Value) -> Result<String, AppError> {
    let text = match result {
        Value::Array(items) => items
            .first()
            .and_then(|item| item["generated_text"].as_str()),
        Value::Object(map) => map.get("generated_text").and_then(Value::as_str),
        _ => None,
    };
    text.map(str::to_string)
        .ok_or_else(|| AppError::Provider("Unexpected response format from API".to_string()))
}

/// Models echo the prompt back; drop it and unescape underscores.
fn strip_prompt(generated: &str, prompt: &str) -> String {
    generated.replace(prompt, "").trim().replace("\\_", "_")
}

/// Hugging Face style inference endpoint client.
pub struct HfExplainer {
    api_key: String,
    api_url: String,
    agent: ureq::Agent,
}

impl HfExplainer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_MODEL_URL.to_string())
    }

    /// `endpoint` should come through [`validate_endpoint`] when it is
    /// user-supplied.
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: String) -> Self {
        let agent = ureq::builder()
            .timeout_connect(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout_read(Duration::from_secs(READ_TIMEOUT_SECS))
            .build();
        Self {
            api_key: api_key.into(),
            api_url: endpoint,
            agent,
        }
    }

    pub fn generate_prompt(&self, code: &str, style: ExplanationStyle) -> String {
        format!(
            "<s>[INST] {}\n\n{}\n\n[/INST]",
            instruction_for(style),
            code
        )
    }

    fn post(&self, payload: Value) -> Result<Value, AppError> {
        let response = self
            .agent
            .post(&self.api_url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(payload);
        let response = match response {
            Ok(r) => r,
            Err(ureq::Error::Status(code, _)) => {
                return Err(AppError::Network(format!(
                    "Inference endpoint returned HTTP {}",
                    code
                )))
            }
            Err(ureq::Error::Transport(t)) => return Err(AppError::Network(t.to_string())),
        };
        response
            .into_json::<Value>()
            .map_err(|e| AppError::Provider(format!("Response was not valid JSON: {}", e)))
    }
}

impl ExplanationProvider for HfExplainer {
    fn explain(&self, code: &str, style: ExplanationStyle) -> Result<String, AppError> {
        let prompt = self.generate_prompt(code, style);
        let payload = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": MAX_NEW_TOKENS,
                "temperature": TEMPERATURE,
                "top_p": TOP_P,
                "do_sample": true,
            }
        });
        let result = self.post(payload)?;
        let generated = extract_generated_text(&result)?;
        Ok(strip_prompt(&generated, &prompt))
    }

    fn answer(
        &self,
        question: &str,
        style: ExplanationStyle,
        code: Option<&str>,
    ) -> Result<String, AppError> {
        if question.trim().is_empty() {
            return Err(AppError::Other("Please enter a question".to_string()));
        }

        let code_section = match code {
            Some(code) => format!("The code is:\n```python\n{}\n```", code),
            None => "just reply normally with the given style".to_string(),
        };
        let chat_box = format!(
            "Question: {} Only answer the question above. \
             Do not answer or summarize anything else. Answer ({} style):",
            question, style
        );
        let prompt = format!(
            "You are Codi, an assistant that helps explain code and answer \
             code-related and regular questions. {} {}",
            code_section, chat_box
        );

        let result = self.post(serde_json::json!({ "inputs": prompt }))?;
        let generated = extract_generated_text(&result)?;
        Ok(strip_prompt(&generated, &prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_carries_style_instruction() {
        let explainer = HfExplainer::new("token");
        let prompt = explainer.generate_prompt("print(1)", ExplanationStyle::InDepth);
        assert!(prompt.starts_with("<s>[INST] "));
        assert!(prompt.contains("in-depth explanation"));
        assert!(prompt.contains("print(1)"));
        assert!(prompt.ends_with("[/INST]"));
    }

    #[test]
    fn test_extract_from_array_response() {
        let result = json!([{"generated_text": "hello"}]);
        assert_eq!(extract_generated_text(&result).unwrap(), "hello");
    }

    #[test]
    fn test_extract_from_object_response() {
        let result = json!({"generated_text": "hello"});
        assert_eq!(extract_generated_text(&result).unwrap(), "hello");
    }

    #[test]
    fn test_extract_rejects_unexpected_shapes() {
        for result in [json!("plain"), json!([]), json!({"error": "overloaded"})] {
            assert!(matches!(
                extract_generated_text(&result),
                Err(AppError::Provider(_))
            ));
        }
    }

    #[test]
    fn test_strip_prompt_unescapes_underscores() {
        let prompt = "<s>[INST] explain\n\ncode\n\n[/INST]";
        let generated = format!("{} my\\_var is a counter", prompt);
        assert_eq!(strip_prompt(&generated, prompt), "my_var is a counter");
    }

    #[test]
    fn test_empty_question_is_rejected() {
        let explainer = HfExplainer::new("token");
        let err = explainer
            .answer("   ", ExplanationStyle::Concise, None)
            .unwrap_err();
        assert!(matches!(err, AppError::Other(_)));
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("https://api-inference.huggingface.co/models/x").is_ok());
        assert!(validate_endpoint("http://example.com").is_err());
        assert!(validate_endpoint("https://user:pw@example.com").is_err());
        assert!(validate_endpoint("not a url").is_err());
    }
}
