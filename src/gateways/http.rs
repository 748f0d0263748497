use crate::error::RelayError;
use crate::gateways::providers::{auth_scheme, build_payload};
use crate::gateways::schema::interpret_reply;
use crate::gateways::{GatewayCredentials, GatewayRequest, PaymentGateway, Provider, UpstreamReply};
use std::time::Duration;

/// Live adapter that posts charges to a provider's REST API.
pub struct HttpGateway {
    pub provider: Provider,
    pub base_url: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl HttpGateway {
    fn charge_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.provider.charge_path()
        )
    }

    fn timeout_error(&self, status: Option<u16>) -> RelayError {
        RelayError::UpstreamGateway {
            provider: self.provider,
            status,
            message: format!("no response within {}ms", self.timeout_ms),
            timed_out: true,
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for HttpGateway {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn create_pix_charge(
        &self,
        credentials: &GatewayCredentials,
        request: &GatewayRequest,
    ) -> Result<UpstreamReply, RelayError> {
        let url = self.charge_url();
        let auth = auth_scheme(self.provider, credentials)?;
        let payload = build_payload(self.provider, request);

        // One retry, and only when the connection was never established.
        let mut retried = false;
        let resp = loop {
            let builder = self
                .client
                .post(&url)
                .json(&payload)
                .timeout(Duration::from_millis(self.timeout_ms));

            match auth.apply(builder).send().await {
                Ok(r) => break r,
                Err(e) if e.is_connect() && !retried => {
                    tracing::warn!(provider = %self.provider, error = %e, "connect failed, retrying once");
                    retried = true;
                }
                Err(e) if e.is_timeout() => return Err(self.timeout_error(None)),
                Err(e) => return Err(RelayError::upstream(self.provider, None, e.to_string())),
            }
        };

        let status = resp.status().as_u16();
        // The request timeout also covers reading the body.
        let text = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error(Some(status))
            } else {
                RelayError::upstream(self.provider, Some(status), e.to_string())
            }
        })?;
        tracing::debug!(provider = %self.provider, status, bytes = text.len(), "gateway responded");

        let body = interpret_reply(self.provider, status, &text)?;
        Ok(UpstreamReply {
            provider: self.provider,
            status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::charge::{Customer, LineItem};
    use crate::domain::document::{Document, DocumentKind};
    use axum::http::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn request() -> GatewayRequest {
        GatewayRequest {
            reference: uuid::Uuid::nil(),
            offer_id: "offer-1".into(),
            amount_minor: 1000,
            description: "Ebook".into(),
            customer: Customer {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                phone: String::new(),
                document: Document {
                    kind: DocumentKind::Cpf,
                    number: "52998224725".into(),
                },
            },
            items: vec![LineItem {
                title: "Ebook".into(),
                unit_amount_minor: 1000,
                quantity: 1,
                tangible: false,
            }],
        }
    }

    /// Sends the status line and headers, then never finishes the body.
    async fn stalled_body_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"id\":")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        format!("http://{addr}")
    }

    #[test]
    fn builds_charge_url_without_double_slash() {
        let gw = HttpGateway {
            provider: Provider::FourM,
            base_url: "https://app.4mpagamentos.com/".into(),
            timeout_ms: 1000,
            client: reqwest::Client::new(),
        };
        assert_eq!(gw.charge_url(), "https://app.4mpagamentos.com/api/v1/payments");
    }

    #[tokio::test]
    async fn stalled_body_is_a_gateway_timeout() {
        let gw = HttpGateway {
            provider: Provider::FourM,
            base_url: stalled_body_server().await,
            timeout_ms: 200,
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
        };
        let creds = GatewayCredentials {
            secret: "sk".into(),
            public_key: None,
        };

        let err = gw.create_pix_charge(&creds, &request()).await.unwrap_err();
        match &err {
            RelayError::UpstreamGateway { status, timed_out, .. } => {
                assert_eq!(*status, Some(200));
                assert!(*timed_out);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
