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

//! Integration tests for EST protocol violations

use crate::integration::{fixtures, MockEstServer, CONTENT_TYPE_PKCS7, PATH_SIMPLEENROLL};
use est_protocol::EstError;
use wiremock::ResponseTemplate;

#[tokio::test]
async fn test_service_unavailable() {
    let mock = MockEstServer::start().await;
    mock.mock_status("POST", PATH_SIMPLEENROLL, 503).await;

    let err = mock
        .client()
        .simple_enroll(&fixtures::csr("test.example.com"))
        .await
        .unwrap_err();

    assert!(err.is_protocol_error());
    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("503"), "{}", err);
}

#[tokio::test]
async fn test_unexpected_statuses_are_rejected() {
    for status in [201, 204, 400, 401, 403, 404, 500] {
        let mock = MockEstServer::start().await;
        mock.mock_status("POST", PATH_SIMPLEENROLL, status).await;

        let err = mock
            .client()
            .simple_enroll(&fixtures::csr("test.example.com"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(status), "status {}", status);
    }
}

#[tokio::test]
async fn test_missing_retry_after() {
    let mock = MockEstServer::start().await;
    mock.mock_response("POST", PATH_SIMPLEENROLL, ResponseTemplate::new(202))
        .await;

    let err = mock
        .client()
        .simple_enroll(&fixtures::csr("test.example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, EstError::MissingHeader(_)), "got: {:?}", err);
    assert!(err.is_protocol_error());
}

#[tokio::test]
async fn test_unparsable_retry_after() {
    let mock = MockEstServer::start().await;
    mock.mock_pending(PATH_SIMPLEENROLL, "soon").await;

    let err = mock
        .client()
        .simple_enroll(&fixtures::csr("test.example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, EstError::InvalidRetryAfter(_)), "got: {:?}", err);
}

#[tokio::test]
async fn test_signed_retry_after_is_rejected() {
    let mock = MockEstServer::start().await;
    mock.mock_pending(PATH_SIMPLEENROLL, "+120").await;

    let err = mock
        .client()
        .simple_enroll(&fixtures::csr("test.example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, EstError::InvalidRetryAfter(_)), "got: {:?}", err);
}

#[tokio::test]
async fn test_missing_transfer_encoding() {
    let mock = MockEstServer::start().await;

    let body = fixtures::certs_only_base64(&[fixtures::leaf_certificate("test.example.com")]);
    mock.mock_response(
        "POST",
        PATH_SIMPLEENROLL,
        ResponseTemplate::new(200)
            .set_body_raw(body, CONTENT_TYPE_PKCS7),
    )
    .await;

    let err = mock
        .client()
        .simple_enroll(&fixtures::csr("test.example.com"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, EstError::InvalidTransferEncoding { .. }),
        "got: {:?}",
        err
    );
}

#[tokio::test]
async fn test_binary_transfer_encoding_rejected() {
    let mock = MockEstServer::start().await;

    let body = fixtures::certs_only_base64(&[fixtures::leaf_certificate("test.example.com")]);
    mock.mock_response(
        "POST",
        PATH_SIMPLEENROLL,
        ResponseTemplate::new(200)
            .set_body_raw(body, CONTENT_TYPE_PKCS7)
            .insert_header("Content-Transfer-Encoding", "binary"),
    )
    .await;

    let err = mock
        .client()
        .simple_enroll(&fixtures::csr("test.example.com"))
        .await
        .unwrap_err();

    assert!(err.is_protocol_error(), "got: {:?}", err);
}

#[tokio::test]
async fn test_wrong_content_type_on_enroll() {
    let mock = MockEstServer::start().await;

    let body = fixtures::certs_only_base64(&[fixtures::leaf_certificate("test.example.com")]);
    mock.mock_response(
        "POST",
        PATH_SIMPLEENROLL,
        ResponseTemplate::new(200)
            .set_body_raw(body, "application/pkcs10")
            .insert_header("Content-Transfer-Encoding", "base64"),
    )
    .await;

    let err = mock
        .client()
        .simple_enroll(&fixtures::csr("test.example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, EstError::InvalidContentType { .. }), "got: {:?}", err);
}

#[tokio::test]
async fn test_empty_bundle_on_enroll() {
    let mock = MockEstServer::start().await;
    mock.mock_enroll_success(&fixtures::certs_only_base64(&[]))
        .await;

    let err = mock
        .client()
        .simple_enroll(&fixtures::csr("test.example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, EstError::EmptyCertificateBundle), "got: {:?}", err);
    assert!(err.is_protocol_error());
}
