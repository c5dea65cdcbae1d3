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

//! Integration tests for GET /cacerts operation

use crate::integration::{fixtures, MockEstServer, PATH_CACERTS};
use est_protocol::EstError;
use wiremock::ResponseTemplate;

#[tokio::test]
async fn test_successful_cacerts_retrieval() {
    let mock = MockEstServer::start().await;

    let root = fixtures::ca_certificate("Root CA");
    let issuing = fixtures::ca_certificate("Issuing CA");
    let body = fixtures::certs_only_base64(&[root.clone(), issuing.clone()]);
    mock.mock_cacerts(&body).await;

    let ca_certs = mock
        .client()
        .get_ca_certs()
        .await
        .expect("get_ca_certs failed");

    // Exactly the bundle's certificates, in bundle order
    assert_eq!(ca_certs.len(), 2);
    let received: Vec<_> = ca_certs.iter().cloned().collect();
    assert_eq!(received, fixtures::wire_order(&body, &[issuing.clone(), root.clone()]));
    assert_eq!(received, vec![root, issuing]);
}

#[tokio::test]
async fn test_cacerts_keeps_bundle_order_in_both_directions() {
    let root = fixtures::ca_certificate("Root CA");
    let issuing = fixtures::ca_certificate("Issuing CA");

    // Whichever order is not canonical DER must still come back as sent.
    for bundle in [
        vec![root.clone(), issuing.clone()],
        vec![issuing.clone(), root.clone()],
    ] {
        let mock = MockEstServer::start().await;
        mock.mock_cacerts(&fixtures::certs_only_base64(&bundle)).await;

        let ca_certs = mock.client().get_ca_certs().await.unwrap();
        assert_eq!(ca_certs.certificates, bundle);
    }
}

#[tokio::test]
async fn test_cacerts_with_label() {
    let mock = MockEstServer::start().await;

    let root = fixtures::ca_certificate("Root CA");
    mock.mock_pkcs7(
        "GET",
        "/.well-known/est/arbitraryLabel1/cacerts",
        &fixtures::certs_only_base64(std::slice::from_ref(&root)),
    )
    .await;

    let ca_certs = mock
        .labelled_client("arbitraryLabel1")
        .get_ca_certs()
        .await
        .expect("labelled get_ca_certs failed");

    assert_eq!(ca_certs.first(), Some(&root));
}

#[tokio::test]
async fn test_cacerts_accepts_certs_only_content_type() {
    let mock = MockEstServer::start().await;

    let root = fixtures::ca_certificate("Root CA");
    mock.mock_response(
        "GET",
        PATH_CACERTS,
        ResponseTemplate::new(200)
            .set_body_raw(fixtures::certs_only_base64(std::slice::from_ref(&root)), "application/pkcs7-mime;smime-type=certs-only")
            .insert_header("Content-Transfer-Encoding", "base64"),
    )
    .await;

    let ca_certs = mock.client().get_ca_certs().await.unwrap();
    assert_eq!(ca_certs.len(), 1);
}

#[tokio::test]
async fn test_cacerts_rejects_content_type_variants() {
    let body = fixtures::certs_only_base64(&[fixtures::ca_certificate("Root CA")]);

    for (content_type, transfer_encoding) in [
        ("application/pkcs7-mime; smime-type=certs-only", "base64"),
        ("Application/PKCS7-MIME", "base64"),
        ("application/pkcs7-mime", "BASE64"),
    ] {
        let mock = MockEstServer::start().await;
        mock.mock_response(
            "GET",
            PATH_CACERTS,
            ResponseTemplate::new(200)
                .set_body_raw(body.clone(), content_type)
                .insert_header("Content-Transfer-Encoding", transfer_encoding),
        )
        .await;

        let err = mock.client().get_ca_certs().await.unwrap_err();
        assert!(err.is_protocol_error(), "{content_type} / {transfer_encoding}: {err:?}");
    }
}

#[tokio::test]
async fn test_invalid_content_type_handling() {
    let mock = MockEstServer::start().await;

    mock.mock_response(
        "GET",
        PATH_CACERTS,
        ResponseTemplate::new(200)
            .set_body_raw(fixtures::certs_only_base64(&[fixtures::ca_certificate("Root CA")]), "text/plain")
            .insert_header("Content-Transfer-Encoding", "base64"),
    )
    .await;

    let err = mock.client().get_ca_certs().await.unwrap_err();

    assert!(
        matches!(err, EstError::InvalidContentType { .. }),
        "Expected InvalidContentType, got: {:?}",
        err
    );
    assert!(err.is_protocol_error());
    assert!(err.to_string().contains("application/pkcs7-mime"));
}

#[tokio::test]
async fn test_malformed_pkcs7_response() {
    let mock = MockEstServer::start().await;
    mock.mock_cacerts("not-valid-base64!!!").await;

    let err = mock.client().get_ca_certs().await.unwrap_err();
    assert!(matches!(err, EstError::Base64(_)), "got: {:?}", err);
}

#[tokio::test]
async fn test_non_signed_data_response() {
    let mock = MockEstServer::start().await;

    // SEQUENCE { OID 1.2.840.113549.1.7.1 (data), [0] { OCTET STRING "" } }
    let der = [
        0x30, 0x11, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01, 0xa0,
        0x04, 0x04, 0x02, 0x00, 0x00,
    ];
    let body = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, der);
    mock.mock_cacerts(&body).await;

    let err = mock.client().get_ca_certs().await.unwrap_err();
    assert!(err.is_codec_error(), "got: {:?}", err);
}

#[tokio::test]
async fn test_empty_certificate_list() {
    let mock = MockEstServer::start().await;
    mock.mock_cacerts(&fixtures::certs_only_base64(&[])).await;

    let ca_certs = mock.client().get_ca_certs().await.unwrap();
    assert!(ca_certs.is_empty());
}

#[tokio::test]
async fn test_cacerts_rejects_202() {
    let mock = MockEstServer::start().await;
    mock.mock_status("GET", PATH_CACERTS, 202).await;

    let err = mock.client().get_ca_certs().await.unwrap_err();
    assert_eq!(err.status(), Some(202));
}
