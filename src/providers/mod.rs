//! SMS provider clients
//!
//! The dispatcher only sees the `SmsProvider` capability; everything
//! provider-specific (endpoint, signing, response codes) lives behind it.

pub mod tencent;

pub use tencent::TencentSmsClient;

use async_trait::async_trait;

use crate::request::MessageRequest;

/// Result of one provider call.
///
/// Errors never escape this boundary: network, auth and provider-side
/// failures all fold into `ok == false`, with the provider's own text kept
/// verbatim in `detail` for the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    pub ok: bool,
    pub detail: String,
}

impl ProviderReply {
    pub fn ok<S: Into<String>>(detail: S) -> Self {
        ProviderReply {
            ok: true,
            detail: detail.into(),
        }
    }

    pub fn failed<S: Into<String>>(detail: S) -> Self {
        ProviderReply {
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Capability to send one templated SMS.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send_sms(&self, request: &MessageRequest) -> ProviderReply;
}
