// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use rollcall_api::{ApiError, Client, RequestDescriptor, endpoints};
use rollcall_app::RecordId;
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("valid content type header")
}

#[test]
fn unreachable_backend_is_a_transport_error_with_remediation() {
    let client = Client::new("http://127.0.0.1:1/api", Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .send(&endpoints::members())
        .expect_err("send should fail for unreachable endpoint");
    assert!(matches!(error, ApiError::Transport { .. }));
    assert!(error.to_string().contains("[api]"));
}

#[test]
fn listing_decodes_records_and_lookups() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/member");
        assert_eq!(request.method().as_str(), "GET");
        let body = r#"{"code":201,"data":[{"id":1,"name":"Asha Rao"}],
            "image_url":[{"image_for":"User","image_url":"https://img/u/"}]}"#;
        let response = Response::from_string(body)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let envelope = client.send(&endpoints::members())?;
    let (records, lookup) = envelope.collection()?;
    assert_eq!(records.len(), 1);
    assert_eq!(lookup.get("User"), Some("https://img/u/"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn bearer_token_and_json_body_are_sent() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api/", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/members/7/status");
        assert_eq!(request.method().as_str(), "PATCH");
        let authorization = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(authorization.as_deref(), Some("Bearer secret"));
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read body");
        assert_eq!(body, r#"{"user_status":"Inactive"}"#);
        let response = Response::from_string(r#"{"code":201,"message":"updated"}"#)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client =
        Client::new(&addr, Duration::from_secs(1))?.with_token(Some("secret".to_owned()));
    let envelope = client.send(&endpoints::set_member_status(RecordId::new(7), "Inactive"))?;
    assert_eq!(envelope.message.as_deref(), Some("updated"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn server_message_surfaces_on_application_error() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        for body in [
            r#"{"code":400,"message":"MID already exists"}"#,
            r#"{"code":400}"#,
        ] {
            let request = server.recv().expect("request expected");
            let response = Response::from_string(body)
                .with_status_code(200)
                .with_header(json_header());
            request.respond(response).expect("response should succeed");
        }
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let create = endpoints::create_member(vec![("name".to_owned(), "Asha".to_owned())]);
    let first = client.send(&create).expect_err("application error");
    assert_eq!(first.to_string(), "MID already exists");
    let second = client.send(&create).expect_err("application error");
    assert_eq!(
        second,
        ApiError::Application {
            code: Some(400),
            message: "request failed".to_owned()
        }
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn form_payload_is_url_encoded() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/update-member/3?_method=PUT");
        let content_type = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Content-Type"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(
            content_type.as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read body");
        assert_eq!(body, "name=Asha+Rao&mobile=98765");
        let response = Response::from_string(r#"{"success":true}"#)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client.send(&endpoints::update_member(
        RecordId::new(3),
        vec![
            ("name".to_owned(), "Asha Rao".to_owned()),
            ("mobile".to_owned(), "98765".to_owned()),
        ],
    ))?;

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn extra_headers_are_forwarded() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let accept = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("X-Panel"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(accept.as_deref(), Some("rollcall"));
        let response = Response::from_string(r#"{"code":201,"data":{}}"#)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client.send(&RequestDescriptor::get("dashboard").header("X-Panel", "rollcall"))?;

    handle.join().expect("server thread should join");
    Ok(())
}
