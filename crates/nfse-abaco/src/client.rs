// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SOAP over HTTP.
//!
//! [`SoapClient`] posts one envelope per call and returns the response body.
//! It never retries; retry decisions belong to the poller.

use std::time::Duration;

use nfse_core::{NfseError, ServiceFailure};
use nfse_xml::Document;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::envelope::{fault_message, request_envelope};

/// HTTP client for the municipal SOAP endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SoapClient {
    client: reqwest::Client,
    namespace: String,
}

impl SoapClient {
    /// Builds a client whose every request carries both timeouts.
    pub fn new(
        connect_timeout: Duration,
        request_timeout: Duration,
        namespace: impl Into<String>,
    ) -> Result<Self, NfseError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/xml; charset=utf-8"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| NfseError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            namespace: namespace.into(),
        })
    }

    /// Calls `operation` at `endpoint` with `payload` in `nfsedadosmsg`.
    ///
    /// Non-2xx answers become `SOAP_FAULT` when the body is a fault, else
    /// `TRANSPORT_ERROR`.
    pub async fn call(
        &self,
        endpoint: &str,
        operation: &str,
        payload: &str,
    ) -> Result<String, ServiceFailure> {
        let envelope = request_envelope(operation, &self.namespace, payload)
            .map_err(|e| ServiceFailure::parse("PROCESSING_ERROR", e.to_string()))?;
        let url = service_url(endpoint)?;

        let response = self
            .client
            .post(url)
            .header("SOAPAction", format!("\"{}#{operation}\"", self.namespace))
            .body(envelope)
            .send()
            .await
            .map_err(|e| request_failure(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_failure(operation, e))?;
        debug!(operation, status = %status, bytes = body.len(), "SOAP response received");

        if status.is_success() {
            return Ok(body);
        }

        let fault = Document::parse_str(&body)
            .ok()
            .and_then(|doc| fault_message(&doc));
        match fault {
            Some(message) => {
                warn!(operation, status = %status, fault = %message, "SOAP fault");
                Err(ServiceFailure::soap_fault(message))
            }
            None => {
                warn!(operation, status = %status, "unexpected HTTP status");
                Err(ServiceFailure::transport(format!(
                    "{operation} returned HTTP {status}"
                )))
            }
        }
    }
}

fn request_failure(operation: &str, err: reqwest::Error) -> ServiceFailure {
    if err.is_timeout() {
        warn!(operation, error = %err, "SOAP call timed out");
        ServiceFailure::timeout(format!("{operation} timed out: {err}"))
    } else {
        warn!(operation, error = %err, "SOAP call failed");
        ServiceFailure::transport(format!("{operation} failed: {err}"))
    }
}

/// Endpoints are configured as WSDL locations; the service lives at the
/// same URL without the `?wsdl` query.
fn service_url(endpoint: &str) -> Result<url::Url, ServiceFailure> {
    let mut url = url::Url::parse(endpoint).map_err(|e| {
        ServiceFailure::transport(format!("invalid endpoint `{endpoint}`: {e}"))
    })?;
    if url.query().is_some_and(|q| q.eq_ignore_ascii_case("wsdl")) {
        url.set_query(None);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfse_core::FailureKind;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> SoapClient {
        SoapClient::new(
            Duration::from_secs(2),
            Duration::from_secs(5),
            "http://www.e-nfs.com.br",
        )
        .unwrap()
    }

    #[test]
    fn wsdl_query_is_stripped() {
        let url = service_url("https://host/servlet/arecepcionarloterps?wsdl").unwrap();
        assert_eq!(url.as_str(), "https://host/servlet/arecepcionarloterps");
        let url = service_url("https://host/ws?x=1").unwrap();
        assert_eq!(url.query(), Some("x=1"));
    }

    #[tokio::test]
    async fn posts_envelope_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ws"))
            .and(header("content-type", "text/xml; charset=utf-8"))
            .and(body_string_contains("<nfse:ConsultarSituacaoLoteRps>"))
            .and(body_string_contains("&lt;Protocolo&gt;P1&lt;/Protocolo&gt;"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ok/>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = client()
            .call(
                &format!("{}/ws?wsdl", server.uri()),
                "ConsultarSituacaoLoteRps",
                "<Protocolo>P1</Protocolo>",
            )
            .await
            .unwrap();
        assert_eq!(body, "<ok/>");
    }

    #[tokio::test]
    async fn http_500_with_fault_is_soap_fault() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string(
                "<Envelope><Body><Fault><faultstring>boom</faultstring></Fault></Body></Envelope>",
            ))
            .mount(&server)
            .await;

        let failure = client().call(&server.uri(), "RecepcionarLoteRps", "<a/>").await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::SoapFault);
        assert_eq!(failure.message, "boom");
    }

    #[tokio::test]
    async fn http_503_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let failure = client().call(&server.uri(), "RecepcionarLoteRps", "<a/>").await.unwrap_err();
        assert_eq!(failure.code, "TRANSPORT_ERROR");
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = SoapClient::new(
            Duration::from_secs(1),
            Duration::from_millis(200),
            "http://www.e-nfs.com.br",
        )
        .unwrap();
        let failure = client.call(&server.uri(), "RecepcionarLoteRps", "<a/>").await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.code, "TIMEOUT");
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let failure = client()
            .call("http://127.0.0.1:9/ws", "RecepcionarLoteRps", "<a/>")
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Transport);
    }
}
