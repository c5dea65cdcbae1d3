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

//! Integration tests for POST /simpleenroll operation

use crate::integration::{fixtures, MockEstServer, CONTENT_TYPE_PKCS10, PATH_SIMPLEENROLL};
use base64::prelude::*;
use der::Encode;
use est_protocol::{decode_enrollment_request, EnrollmentResponse};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_successful_enrollment() {
    let mock = MockEstServer::start().await;

    let issued = fixtures::leaf_certificate("test-device.example.com");
    mock.mock_enroll_success(&fixtures::certs_only_base64(std::slice::from_ref(&issued)))
        .await;

    let csr = fixtures::csr("test-device.example.com");
    let response = mock
        .client()
        .simple_enroll(&csr)
        .await
        .expect("simple_enroll failed");

    match response {
        EnrollmentResponse::Issued { certificate } => assert_eq!(*certificate, issued),
        EnrollmentResponse::Pending { .. } => panic!("Expected Issued, got Pending"),
    }
}

#[tokio::test]
async fn test_enrollment_takes_first_of_several() {
    let mock = MockEstServer::start().await;

    let leaf = fixtures::leaf_certificate("device.example.com");
    let issuer = fixtures::ca_certificate("Issuing CA");
    let body = fixtures::certs_only_base64(&[leaf.clone(), issuer.clone()]);
    mock.mock_enroll_success(&body).await;

    let response = mock
        .client()
        .simple_enroll(&fixtures::csr("device.example.com"))
        .await
        .unwrap();

    let on_the_wire = fixtures::wire_order(&body, &[issuer, leaf.clone()]);
    assert_eq!(on_the_wire.first(), Some(&leaf));
    assert_eq!(response.certificate(), Some(&leaf));
}

#[tokio::test]
async fn test_issued_is_first_certificate_on_the_wire() {
    let leaf = fixtures::leaf_certificate("device.example.com");
    let issuer = fixtures::ca_certificate("Issuing CA");

    for bundle in [
        [leaf.clone(), issuer.clone()],
        [issuer.clone(), leaf.clone()],
    ] {
        let mock = MockEstServer::start().await;
        let body = fixtures::certs_only_base64(&bundle);
        mock.mock_enroll_success(&body).await;

        let response = mock
            .client()
            .simple_enroll(&fixtures::csr("device.example.com"))
            .await
            .unwrap();

        let first_on_wire = fixtures::wire_order(&body, &bundle).into_iter().next();
        assert_eq!(response.into_certificate(), first_on_wire);
    }
}

#[tokio::test]
async fn test_pending_enrollment() {
    let mock = MockEstServer::start().await;
    mock.mock_pending(PATH_SIMPLEENROLL, "120").await;

    let response = mock
        .client()
        .simple_enroll(&fixtures::csr("test-device.example.com"))
        .await
        .expect("pending is not an error");

    assert_eq!(response, EnrollmentResponse::pending(120));
}

#[tokio::test]
async fn test_pending_with_http_date_in_past() {
    let mock = MockEstServer::start().await;
    mock.mock_pending(PATH_SIMPLEENROLL, "Wed, 21 Oct 2015 07:28:00 GMT")
        .await;

    let response = mock
        .client()
        .simple_enroll(&fixtures::csr("test-device.example.com"))
        .await
        .unwrap();

    assert_eq!(response.retry_after(), Some(0));
}

#[tokio::test]
async fn test_enrollment_request_wire_format() {
    let mock = MockEstServer::start().await;

    Mock::given(method("POST"))
        .and(path(PATH_SIMPLEENROLL))
        .and(header("content-type", CONTENT_TYPE_PKCS10))
        .and(header("content-transfer-encoding", "base64"))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "1"))
        .expect(1)
        .mount(mock.inner())
        .await;

    let csr = fixtures::csr("test-device.example.com");
    mock.client().simple_enroll(&csr).await.unwrap();

    let requests = mock.inner().received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let request = &requests[0];
    assert_eq!(
        request.headers.get("content-length").unwrap(),
        request.body.len().to_string().as_str()
    );
    assert_eq!(
        BASE64_STANDARD.decode(&request.body).unwrap(),
        csr.to_der().unwrap()
    );
}

#[tokio::test]
async fn test_submitted_csr_round_trips_through_mediator_decode() {
    let mock = MockEstServer::start().await;
    mock.mock_pending(PATH_SIMPLEENROLL, "60").await;

    let csr = fixtures::csr("round-trip.example.com");
    mock.client().simple_enroll(&csr).await.unwrap();

    let requests = mock.inner().received_requests().await.unwrap();
    let request = &requests[0];

    let decoded = decode_enrollment_request(&request.headers, &request.body).unwrap();
    assert_eq!(decoded.to_der().unwrap(), csr.to_der().unwrap());
}
