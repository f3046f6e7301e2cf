use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use thiserror::Error;
use url::Url;

use crate::config::BridgeConfig;
use crate::protocol::{ElementFingerprint, StyleSyncResult};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("style service returned status {status}")]
    Status { status: u16 },
    #[error("malformed style response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid style endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Resolves the style rules that apply to a fingerprinted element.
pub trait StyleService {
    fn resolve(
        &self,
        fingerprint: ElementFingerprint,
    ) -> LocalBoxFuture<'static, Result<StyleSyncResult, SyncError>>;
}

/// Style service reached over HTTP with `POST /cdp`.
pub struct HttpStyleService {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpStyleService {
    pub fn new(config: &BridgeConfig) -> Result<Self, SyncError> {
        let endpoint = config.style_endpoint()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl StyleService for HttpStyleService {
    fn resolve(
        &self,
        fingerprint: ElementFingerprint,
    ) -> LocalBoxFuture<'static, Result<StyleSyncResult, SyncError>> {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();

        async move {
            let response = http.post(endpoint).json(&fingerprint).send().await?;

            let status = response.status();
            if !status.is_success() {
                return Err(SyncError::Status {
                    status: status.as_u16(),
                });
            }

            let body = response.bytes().await?;
            let result: StyleSyncResult = serde_json::from_slice(&body)?;
            Ok(result)
        }
        .boxed_local()
    }
}
