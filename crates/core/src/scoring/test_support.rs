//! Shared record fixture builder for scorer unit tests.
#![cfg(test)]

use regiodedupe_domain::{Record, SourceType};

pub fn record_fixture(id: &str) -> Record {
    Record {
        id: id.to_string(),
        source_code: format!("src-{id}"),
        source_type: SourceType::Article,
        title: String::new(),
        title_normalized: String::new(),
        short_description: None,
        description: None,
        highlights: vec![],
        location_name: None,
        location_city: None,
        location_city_normalized: None,
        location_district: None,
        location_street: None,
        location_zipcode: None,
        geo: None,
        categories: Default::default(),
        is_family_event: None,
        is_child_focused: None,
        admission_free: None,
        dates: vec![],
        blocking_keys: Default::default(),
    }
}
