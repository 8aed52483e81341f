// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server};

use crate::{categories, image_lookups};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    members: Vec<Value>,
    registrations: Vec<Value>,
    canned: VecDeque<(u16, String)>,
    delay: Option<Duration>,
    requests: Vec<RecordedRequest>,
}

impl MockState {
    fn next_member_id(&self) -> i64 {
        self.members
            .iter()
            .filter_map(|member| member.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// In-process backend that keeps members and registrations across calls, so a
/// write followed by a read observes the change.
pub struct MockApi {
    base_url: String,
    server: Arc<Server>,
    state: Arc<Mutex<MockState>>,
    handle: Option<JoinHandle<()>>,
}

impl MockApi {
    pub fn start(members: Vec<Value>, registrations: Vec<Value>) -> Result<Self> {
        let server = Arc::new(
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?,
        );
        let base_url = format!("http://{}/api/", server.server_addr());
        let state = Arc::new(Mutex::new(MockState {
            members,
            registrations,
            ..MockState::default()
        }));

        let handle = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    serve(&state, request);
                }
            })
        };

        Ok(Self {
            base_url,
            server,
            state,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The next request is answered with this status and body instead of the
    /// routed handler. Queued responses are consumed in order.
    pub fn respond_next(&self, status: u16, body: impl Into<String>) {
        lock(&self.state).canned.push_back((status, body.into()));
    }

    /// Holds every response for `delay` before sending it.
    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }

    pub fn members(&self) -> Vec<Value> {
        lock(&self.state).members.clone()
    }

    pub fn registrations(&self) -> Vec<Value> {
        lock(&self.state).registrations.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn serve(state: &Mutex<MockState>, mut request: Request) {
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    let recorded = RecordedRequest {
        method: request.method().as_str().to_owned(),
        url: request.url().to_owned(),
        body,
        content_type: header_value(&request, "Content-Type"),
        authorization: header_value(&request, "Authorization"),
    };

    let (status, payload, delay) = {
        let mut guard = lock(state);
        guard.requests.push(recorded.clone());
        let delay = guard.delay;
        match guard.canned.pop_front() {
            Some((status, body)) => (status, body, delay),
            None => {
                let (status, value) = route(&mut guard, &recorded);
                (status, value.to_string(), delay)
            }
        }
    };

    if let Some(delay) = delay {
        thread::sleep(delay);
    }
    let mut response = Response::from_string(payload).with_status_code(status);
    if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
        response = response.with_header(header);
    }
    let _ = request.respond(response);
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

fn route(state: &mut MockState, request: &RecordedRequest) -> (u16, Value) {
    let (path, query) = match request.url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (request.url.as_str(), None),
    };
    let path = path.trim_start_matches("/api/").trim_start_matches('/');
    let segments: Vec<&str> = path.split('/').collect();
    let spoofed_put = query.is_some_and(|query| query.contains("_method=PUT"));

    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["member"]) => listing(state.members.clone()),
        ("POST", ["member-report"]) => listing(state.members.clone()),
        ("GET", ["registration"]) => listing(state.registrations.clone()),
        ("GET", ["panel-fetch-member-category"]) => ok_data(Value::Array(categories())),
        ("GET", ["member-by-id", id]) => match find(&state.members, id) {
            Some(index) => ok_data(state.members[index].clone()),
            None => not_found("Member not found"),
        },
        ("PATCH", ["members", id, "status"]) => {
            let Some(index) = find(&state.members, id) else {
                return not_found("Member not found");
            };
            let Ok(Value::Object(update)) = serde_json::from_str::<Value>(&request.body) else {
                return bad_request("user_status is required");
            };
            let Some(status) = update.get("user_status").cloned() else {
                return bad_request("user_status is required");
            };
            merge(&mut state.members[index], [("user_status".to_owned(), status)]);
            acknowledged("Member status updated")
        }
        ("POST", ["update-member", id]) if spoofed_put => {
            let Some(index) = find(&state.members, id) else {
                return not_found("Member not found");
            };
            merge(&mut state.members[index], form_fields(&request.body));
            acknowledged("Member updated")
        }
        ("POST", ["member"]) => {
            let id = state.next_member_id();
            let mut member = json!({"id": id});
            merge(&mut member, form_fields(&request.body));
            state.members.push(member);
            acknowledged("Member created")
        }
        ("PUT", ["registration", id]) => {
            let Some(index) = find(&state.registrations, id) else {
                return not_found("Registration not found");
            };
            let Ok(Value::Object(update)) = serde_json::from_str::<Value>(&request.body) else {
                return bad_request("invalid registration payload");
            };
            merge(&mut state.registrations[index], update);
            acknowledged("Registration updated")
        }
        ("DELETE", ["registration", id]) => match find(&state.registrations, id) {
            Some(index) => {
                state.registrations.remove(index);
                acknowledged("Registration deleted")
            }
            None => not_found("Registration not found"),
        },
        _ => (404, json!({"success": false, "message": "route not found"})),
    }
}

fn find(records: &[Value], id: &str) -> Option<usize> {
    let id: i64 = id.parse().ok()?;
    records
        .iter()
        .position(|record| record.get("id").and_then(Value::as_i64) == Some(id))
}

fn merge(record: &mut Value, fields: impl IntoIterator<Item = (String, Value)>) {
    if let Some(target) = record.as_object_mut() {
        for (key, value) in fields {
            target.insert(key, value);
        }
    }
}

fn form_fields(body: &str) -> Map<String, Value> {
    url::form_urlencoded::parse(body.as_bytes())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

fn listing(data: Vec<Value>) -> (u16, Value) {
    (
        200,
        json!({"code": 201, "data": data, "image_url": image_lookups()}),
    )
}

fn ok_data(data: Value) -> (u16, Value) {
    (200, json!({"code": 201, "data": data}))
}

fn acknowledged(message: &str) -> (u16, Value) {
    (200, json!({"code": 201, "success": true, "message": message}))
}

fn not_found(message: &str) -> (u16, Value) {
    (200, json!({"code": 404, "success": false, "message": message}))
}

fn bad_request(message: &str) -> (u16, Value) {
    (422, json!({"code": 422, "success": false, "message": message}))
}
