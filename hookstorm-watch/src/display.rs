//! Terminal output for endpoints and events.

use hookstorm_core::utils::format_time_remaining;
use hookstorm_sdk::objects::{Endpoint, Event};
use std::collections::HashMap;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub fn format_endpoint(endpoint: &Endpoint, now: OffsetDateTime) -> String {
    let remaining = format_time_remaining(endpoint.expires_at, now)
        .map_or_else(|| "expired".to_owned(), |left| format!("expires in {left}"));
    format!(
        "{} {} ({}, {} events)",
        endpoint.id, endpoint.url, remaining, endpoint.event_count
    )
}

/// One line per event: time, method, status, id, name and replay count.
pub fn format_event_line(event: &Event) -> String {
    let received = event.received_at.format(&Rfc3339).unwrap_or_default();
    let mut line = format!(
        "{received}  {:<6} {}  {}",
        event.method, event.status_code, event.id
    );
    if let Some(name) = event.event_name() {
        line.push_str("  ");
        line.push_str(name);
    }
    if event.replay_count > 0 {
        line.push_str(&format!("  (replayed {}x)", event.replay_count));
    }
    line
}

/// Remembers which events were already printed.
///
/// An event is printed again when its replay count changes.
#[derive(Debug, Default)]
pub struct EventPrinter {
    seen: HashMap<String, u64>,
}

impl EventPrinter {
    /// Events not printed yet, in the order the backend lists them
    /// (oldest first).
    pub fn fresh<'a>(&mut self, events: &'a [Event]) -> Vec<&'a Event> {
        events
            .iter()
            .filter(|event| {
                self.seen.insert(event.id.clone(), event.replay_count) != Some(event.replay_count)
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }
}
