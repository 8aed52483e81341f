// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod mock;

pub use mock::{MockApi, RecordedRequest};

use serde_json::{Value, json};

const FIRST_NAMES: [&str; 16] = [
    "Asha", "Vikram", "Meera", "Arjun", "Kavya", "Rohan", "Priya", "Sanjay", "Divya", "Karan",
    "Lakshmi", "Nikhil", "Ananya", "Suresh", "Pooja", "Rahul",
];
const LAST_NAMES: [&str; 14] = [
    "Rao", "Shah", "Iyer", "Patel", "Nair", "Kumar", "Reddy", "Menon", "Singh", "Joshi",
    "Pillai", "Das", "Gupta", "Bhat",
];

const CATEGORIES: [&str; 4] = ["Life Member", "Patron", "Annual Member", "Donor"];
const ID_CARD_TYPES: [&str; 3] = ["Regular", "Premium", "Temporary"];
const EVENTS: [&str; 6] = [
    "Annual Gala",
    "Health Camp",
    "Cultural Evening",
    "Blood Drive",
    "Sports Day",
    "Youth Summit",
];
const PAYMENT_TYPES: [&str; 4] = ["Cash", "UPI", "Card", "Cheque"];

pub const USER_IMAGE_BASE: &str = "https://img.example/users/";
pub const NO_IMAGE: &str = "https://img.example/no-image.png";

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for member and registration payloads shaped like the
/// backend's. Optional fields are sometimes absent so that collections are
/// heterogeneous.
#[derive(Debug, Clone)]
pub struct RosterFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl RosterFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }

    fn full_name(&mut self) -> String {
        format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES))
    }

    fn mobile(&mut self) -> String {
        format!("9{:09}", self.rng.next_u64() % 1_000_000_000)
    }

    fn yes_no(&mut self) -> &'static str {
        match self.rng.int_n(4) {
            0 => "Yes",
            1 => "yes",
            2 => "No",
            _ => "no",
        }
    }

    pub fn member(&mut self, id: i64) -> Value {
        let name = self.full_name();
        let email = format!("{}@example.org", name.to_lowercase().replace(' ', "."));
        let category = self.rng.int_n(CATEGORIES.len());
        let status = if self.rng.int_n(4) == 0 {
            "Inactive"
        } else {
            "Active"
        };
        let mut member = json!({
            "id": id,
            "user_mid": format!("M{id:04}"),
            "name": name,
            "mobile": self.mobile(),
            "email": email,
            "user_dob": format!(
                "{}-{:02}-{:02}",
                1950 + self.rng.int_n(55),
                1 + self.rng.int_n(12),
                1 + self.rng.int_n(28)
            ),
            "user_member_catg_id": category as i64 + 1,
            "member_category": CATEGORIES[category],
            "id_card_type": self.pick(&ID_CARD_TYPES),
            "user_status": status,
        });
        if let Some(fields) = member.as_object_mut() {
            if self.rng.bool() {
                fields.insert("user_whatsapp".to_owned(), json!(self.mobile()));
            }
            if self.rng.int_n(5) != 0 {
                fields.insert("payment_made".to_owned(), json!(self.yes_no()));
            }
            if self.rng.int_n(5) != 0 {
                fields.insert("id_card_taken".to_owned(), json!(self.yes_no()));
            }
            if self.rng.bool() {
                fields.insert("user_image".to_owned(), json!(format!("{id}.jpg")));
            }
        }
        member
    }

    pub fn members(&mut self, count: usize) -> Vec<Value> {
        (1..=count as i64).map(|id| self.member(id)).collect()
    }

    pub fn registration(&mut self, id: i64) -> Value {
        let name = self.full_name();
        let email = format!("{}@example.net", name.to_lowercase().replace(' ', "_"));
        let mut registration = json!({
            "id": id,
            "event_name": self.pick(&EVENTS),
            "event_register_name": name,
            "event_register_mobile": self.mobile(),
            "event_register_email": email,
            "event_register_amount": 100 * (1 + self.rng.int_n(20)) as i64,
            "event_register_date": format!(
                "2025-{:02}-{:02} 10:00:00",
                1 + self.rng.int_n(12),
                1 + self.rng.int_n(28)
            ),
        });
        if let Some(fields) = registration.as_object_mut() {
            if self.rng.bool() {
                fields.insert("event_register_mid".to_owned(), json!(format!("M{id:04}")));
            }
            if self.rng.bool() {
                fields.insert(
                    "event_register_payment_type".to_owned(),
                    json!(self.pick(&PAYMENT_TYPES)),
                );
                fields.insert(
                    "event_register_transaction".to_owned(),
                    json!(format!("TX{}", self.rng.next_u64() % 100_000)),
                );
            }
        }
        registration
    }

    pub fn registrations(&mut self, count: usize) -> Vec<Value> {
        (1..=count as i64).map(|id| self.registration(id)).collect()
    }

    /// A search term drawn from the generated vocabulary, so it sometimes hits.
    pub fn search_term(&mut self) -> String {
        match self.rng.int_n(4) {
            0 => String::new(),
            1 => self.pick(&FIRST_NAMES).to_lowercase(),
            2 => self.pick(&LAST_NAMES).to_uppercase(),
            _ => format!("{}", self.rng.int_n(10)),
        }
    }
}

pub fn categories() -> Vec<Value> {
    CATEGORIES
        .iter()
        .enumerate()
        .map(|(index, label)| json!({"id": index as i64 + 1, "member_category": label}))
        .collect()
}

pub fn image_lookups() -> Value {
    json!([
        {"image_for": "User", "image_url": USER_IMAGE_BASE},
        {"image_for": "No Image", "image_url": NO_IMAGE},
    ])
}

#[cfg(test)]
mod tests {
    use super::{RosterFaker, categories, image_lookups};

    #[test]
    fn new_deterministic_seed() {
        let mut left = RosterFaker::new(42);
        let mut right = RosterFaker::new(42);
        assert_eq!(left.members(5), right.members(5));
        assert_eq!(left.registration(1), right.registration(1));
    }

    #[test]
    fn zero_seed_is_normalized() {
        assert_eq!(RosterFaker::new(0).seed(), 1);
    }

    #[test]
    fn member_carries_required_fields() {
        let mut faker = RosterFaker::new(7);
        for member in faker.members(20) {
            let fields = member.as_object().expect("member object");
            for key in ["id", "name", "mobile", "user_member_catg_id", "user_status"] {
                assert!(fields.contains_key(key), "missing {key}");
            }
        }
    }

    #[test]
    fn members_vary_in_shape() {
        let mut faker = RosterFaker::new(3);
        let members = faker.members(40);
        let with_payment = members
            .iter()
            .filter(|member| member.get("payment_made").is_some())
            .count();
        assert!(with_payment > 0 && with_payment < members.len());
    }

    #[test]
    fn categories_and_lookups_match_wire_shape() {
        assert_eq!(categories().len(), 4);
        assert_eq!(categories()[0]["member_category"], "Life Member");
        assert_eq!(image_lookups()[1]["image_for"], "No Image");
    }
}
