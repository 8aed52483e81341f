// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Backend routes, relative to `[api].base_url`.

use rollcall_app::{RecordId, ScreenKind};
use serde_json::{Value, json};

use crate::{Method, RequestDescriptor};

pub const MEMBERS: &str = "member";
pub const MEMBER_CATEGORIES: &str = "panel-fetch-member-category";
pub const REGISTRATIONS: &str = "registration";
pub const MEMBER_REPORT: &str = "member-report";

pub fn members() -> RequestDescriptor {
    RequestDescriptor::get(MEMBERS)
}

pub fn member_categories() -> RequestDescriptor {
    RequestDescriptor::get(MEMBER_CATEGORIES)
}

pub fn set_member_status(id: RecordId, status: &str) -> RequestDescriptor {
    RequestDescriptor::new(Method::Patch, format!("members/{id}/status"))
        .json(json!({ "user_status": status }))
}

pub fn member_by_id(id: RecordId) -> RequestDescriptor {
    RequestDescriptor::get(format!("member-by-id/{id}"))
}

/// The backend only accepts multipart-style updates as a POST with a method override.
pub fn update_member(id: RecordId, fields: Vec<(String, String)>) -> RequestDescriptor {
    RequestDescriptor::post(format!("update-member/{id}?_method=PUT")).form(fields)
}

pub fn create_member(fields: Vec<(String, String)>) -> RequestDescriptor {
    RequestDescriptor::post(MEMBERS).form(fields)
}

pub fn registrations() -> RequestDescriptor {
    RequestDescriptor::get(REGISTRATIONS)
}

pub fn update_registration(id: RecordId, body: Value) -> RequestDescriptor {
    RequestDescriptor::new(Method::Put, format!("{REGISTRATIONS}/{id}")).json(body)
}

pub fn delete_registration(id: RecordId) -> RequestDescriptor {
    RequestDescriptor::new(Method::Delete, format!("{REGISTRATIONS}/{id}"))
}

pub fn member_report() -> RequestDescriptor {
    RequestDescriptor::post(MEMBER_REPORT)
}

pub fn listing_for(kind: ScreenKind) -> RequestDescriptor {
    match kind {
        ScreenKind::Members => members(),
        ScreenKind::Registrations => registrations(),
        ScreenKind::MemberReport => member_report(),
    }
}

#[cfg(test)]
mod tests {
    use super::{listing_for, set_member_status, update_member};
    use crate::{Method, Payload};
    use rollcall_app::{RecordId, ScreenKind};
    use serde_json::json;

    #[test]
    fn status_patch_carries_next_status() {
        let request = set_member_status(RecordId::new(12), "Inactive");
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.target, "members/12/status");
        assert_eq!(
            request.payload,
            Payload::Json(json!({"user_status": "Inactive"}))
        );
    }

    #[test]
    fn member_update_spoofs_put() {
        let request = update_member(RecordId::new(4), vec![("name".to_owned(), "A".to_owned())]);
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.target, "update-member/4?_method=PUT");
        assert!(matches!(request.payload, Payload::Form(_)));
    }

    #[test]
    fn each_screen_has_a_listing() {
        assert_eq!(listing_for(ScreenKind::MemberReport).method, Method::Post);
        assert_eq!(listing_for(ScreenKind::Registrations).target, "registration");
    }
}
