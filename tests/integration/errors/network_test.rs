// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Integration tests for network and transport failures

use std::sync::Arc;
use std::time::Duration;

use crate::integration::{fixtures, MockEstServer, PlainHttpTransport, PATH_SIMPLEENROLL};
use est_protocol::{EndpointDescriptor, EstClient, EstClientConfig, EstError};
use wiremock::ResponseTemplate;

#[tokio::test]
async fn test_connection_timeout() {
    let mock = MockEstServer::start().await;
    mock.mock_response(
        "POST",
        PATH_SIMPLEENROLL,
        ResponseTemplate::new(202)
            .insert_header("Retry-After", "1")
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    // Plain HTTP via a short-timeout reqwest client
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let client = EstClient::with_transport(
        EndpointDescriptor::new(mock.host()),
        Arc::new(PlainHttpTransport::with_client(http)),
    );

    let err = client
        .simple_enroll(&fixtures::csr("test.example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, EstError::Http(_)), "got: {:?}", err);
    assert!(err.is_transport_error());
}

#[tokio::test]
async fn test_connection_refused() {
    let config = EstClientConfig::builder()
        .host("127.0.0.1:1")
        .timeout(Duration::from_secs(1))
        .trust_any_insecure()
        .build()
        .expect("Valid config");

    let client = EstClient::new(config).expect("Client creation failed");

    let err = client.get_ca_certs().await.unwrap_err();
    assert!(err.is_transport_error(), "got: {:?}", err);
}

#[tokio::test]
async fn test_tls_against_plain_http_server_fails() {
    let mock = MockEstServer::start().await;
    mock.mock_cacerts(&fixtures::certs_only_base64(&[fixtures::ca_certificate("Root CA")]))
        .await;

    // The real transport always speaks TLS; the mock only speaks HTTP
    let config = EstClientConfig::builder()
        .host(mock.host())
        .timeout(Duration::from_secs(2))
        .trust_any_insecure()
        .build()
        .unwrap();

    let err = EstClient::new(config)
        .unwrap()
        .get_ca_certs()
        .await
        .unwrap_err();
    assert!(err.is_transport_error(), "got: {:?}", err);
}
