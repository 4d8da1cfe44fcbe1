//! Tencent Cloud SMS client
//!
//! Implements the `SendSms` action of the SMS API (version 2021-01-11)
//! with TC3-HMAC-SHA256 request signing. A send is successful only when
//! the provider reports `Code == "Ok"` for the recipient.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::providers::{ProviderReply, SmsProvider};
use crate::request::MessageRequest;

type HmacSha256 = Hmac<Sha256>;

const SMS_ACTION: &str = "SendSms";
const SMS_VERSION: &str = "2021-01-11";
const SMS_SERVICE: &str = "sms";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host";

/// Tencent Cloud SMS client.
#[derive(Debug, Clone)]
pub struct TencentSmsClient {
    http: Client,
    secret_id: String,
    secret_key: String,
    app_id: String,
    sign_name: String,
    region: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct SendSmsBody<'a> {
    #[serde(rename = "PhoneNumberSet")]
    phone_number_set: [&'a str; 1],
    #[serde(rename = "SmsSdkAppId")]
    sms_sdk_app_id: &'a str,
    #[serde(rename = "SignName")]
    sign_name: &'a str,
    #[serde(rename = "TemplateId")]
    template_id: &'a str,
    #[serde(rename = "TemplateParamSet")]
    template_param_set: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(rename = "Response")]
    response: ApiResponse,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "Error")]
    error: Option<ApiError>,
    #[serde(rename = "SendStatusSet", default)]
    send_status_set: Vec<SendStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SendStatus {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}

impl TencentSmsClient {
    /// Create a client from loaded configuration.
    pub fn new(config: &Config) -> Result<Self> {
        config.ensure_credentials()?;

        let http = Client::builder()
            .user_agent("sms_dispatch/0.1.0")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            secret_id: config.secret_id.clone(),
            secret_key: config.secret_key.clone(),
            app_id: config.sms_app_id.clone(),
            sign_name: config.sign_name.clone(),
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        })
    }

    /// Host portion of the endpoint, as signed into the request.
    fn host(&self) -> &str {
        let stripped = self
            .endpoint
            .strip_prefix("https://")
            .or_else(|| self.endpoint.strip_prefix("http://"))
            .unwrap_or(&self.endpoint);
        stripped.split('/').next().unwrap_or(stripped)
    }

    /// Build the TC3-HMAC-SHA256 Authorization header.
    fn authorization(
        &self,
        host: &str,
        body: &str,
        timestamp: DateTime<Utc>,
    ) -> std::result::Result<String, String> {
        let date = timestamp.format("%Y-%m-%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(body.as_bytes()));

        let canonical_request = format!(
            "POST\n/\n\ncontent-type:{}\nhost:{}\n\n{}\n{}",
            CONTENT_TYPE, host, SIGNED_HEADERS, payload_hash
        );

        let credential_scope = format!("{}/{}/tc3_request", date, SMS_SERVICE);
        let string_to_sign = format!(
            "TC3-HMAC-SHA256\n{}\n{}\n{}",
            timestamp.timestamp(),
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let secret_date = hmac_sha256(
            format!("TC3{}", self.secret_key).as_bytes(),
            date.as_bytes(),
        )?;
        let secret_service = hmac_sha256(&secret_date, SMS_SERVICE.as_bytes())?;
        let secret_signing = hmac_sha256(&secret_service, b"tc3_request")?;
        let signature = hex::encode(hmac_sha256(&secret_signing, string_to_sign.as_bytes())?);

        Ok(format!(
            "TC3-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.secret_id, credential_scope, SIGNED_HEADERS, signature
        ))
    }

    async fn call(&self, request: &MessageRequest) -> std::result::Result<ProviderReply, String> {
        let body = serde_json::to_string(&SendSmsBody {
            phone_number_set: [request.recipient.as_str()],
            sms_sdk_app_id: &self.app_id,
            sign_name: &self.sign_name,
            template_id: &request.template_id,
            template_param_set: &request.template_params,
        })
        .map_err(|e| format!("request encoding failed: {}", e))?;

        let now = Utc::now();
        let host = self.host().to_string();
        let authorization = self.authorization(&host, &body, now)?;

        debug!(recipient = %request.recipient, "Sending SMS via {}", host);

        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("Authorization", authorization)
            .header("X-TC-Action", SMS_ACTION)
            .header("X-TC-Version", SMS_VERSION)
            .header("X-TC-Region", &self.region)
            .header("X-TC-Timestamp", now.timestamp().to_string())
            .body(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("failed to read response: {}", e))?;

        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status, text));
        }

        let envelope: ApiEnvelope =
            serde_json::from_str(&text).map_err(|e| format!("invalid response: {}", e))?;

        if let Some(error) = envelope.response.error {
            return Err(format!("{}: {}", error.code, error.message));
        }

        let send_status = envelope
            .response
            .send_status_set
            .first()
            .ok_or_else(|| "empty SendStatusSet in response".to_string())?;

        if send_status.code == "Ok" {
            Ok(ProviderReply::ok(send_status.message.clone()))
        } else {
            Ok(ProviderReply::failed(format!(
                "{}: {}",
                send_status.code, send_status.message
            )))
        }
    }
}

#[async_trait]
impl SmsProvider for TencentSmsClient {
    async fn send_sms(&self, request: &MessageRequest) -> ProviderReply {
        match self.call(request).await {
            Ok(reply) => reply,
            Err(detail) => ProviderReply::failed(detail),
        }
    }
}

/// HMAC-SHA256 helper function
fn hmac_sha256(key: &[u8], data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| format!("HMAC key error: {}", e))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
