//! Normalization of the loosely-shaped upstream schedule data: session field
//! probing and tariff filtering.

use std::collections::HashSet;

use serde_json::Value;

use crate::ports::RateEntry;
use crate::state::TicketCategory;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    pub time_label: String,
    pub free: u32,
    pub total: u32,
}

// Upstream renames these fields between releases; probe in order and take
// the first one present.
const TIME_FIELDS: &[&str] = &[
    "sessionTime",
    "SessionTime",
    "time",
    "Time",
    "startTime",
    "start",
];
const FREE_FIELDS: &[&str] = &["freeCount", "FreeCount", "free", "freePlaces", "available"];
const TOTAL_FIELDS: &[&str] = &["totalCount", "TotalCount", "total", "totalPlaces", "capacity"];

fn probe_str(raw: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|key| raw.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn probe_count(raw: &Value, candidates: &[&str]) -> Option<u32> {
    candidates.iter().find_map(|key| {
        let value = raw.get(key)?;
        value
            .as_u64()
            .map(|count| count as u32)
            .or_else(|| value.as_str().and_then(|count| count.trim().parse().ok()))
    })
}

pub fn parse_session(raw: &Value) -> Option<SessionInfo> {
    let time_label = probe_str(raw, TIME_FIELDS)?;
    let free = probe_count(raw, FREE_FIELDS).unwrap_or(0);
    let total = probe_count(raw, TOTAL_FIELDS).unwrap_or(0);

    // malformed capacity data must not block the flow
    let (free, total) = if free == 0 && total == 0 {
        (1, 50)
    } else {
        (free, total)
    };

    Some(SessionInfo {
        time_label,
        free,
        total,
    })
}

pub fn parse_sessions(raw: &[Value]) -> Vec<SessionInfo> {
    raw.iter()
        .filter_map(|entry| {
            let session = parse_session(entry);
            if session.is_none() {
                tracing::debug!("skipped malformed session entry: {entry}");
            }
            session
        })
        .collect()
}

fn classify_rate(name_lowered: &str) -> Option<TicketCategory> {
    let adult = ["взрос", "adult"]
        .iter()
        .any(|needle| name_lowered.contains(needle));
    let child = ["детск", "child", "kids"]
        .iter()
        .any(|needle| name_lowered.contains(needle));

    match (adult, child) {
        (true, false) => Some(TicketCategory::Adult),
        (false, true) => Some(TicketCategory::Child),
        // ambiguous or unclassifiable entries are excluded
        _ => None,
    }
}

/// Cosmetic name used for the rendered tariff list: the word «билет» dropped,
/// whitespace collapsed, «VIP» casing normalized.
fn display_name(name: &str) -> String {
    name.split_whitespace()
        .filter(|word| {
            let lowered = word.to_lowercase();
            lowered != "билет" && lowered != "билеты"
        })
        .map(|word| {
            if word.to_lowercase() == "vip" {
                "VIP".to_string()
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Filters raw rate entries down to one category: exact duplicates removed,
/// ambiguous names excluded, cosmetic duplicates collapsed (first occurrence
/// wins), most expensive first.
pub fn filter_tariffs(raw: &[RateEntry], category: TicketCategory) -> Vec<RateEntry> {
    let mut seen: HashSet<(String, i64)> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    let mut filtered: Vec<RateEntry> = Vec::new();

    for entry in raw {
        let lowered = entry.name.to_lowercase();
        if !seen.insert((lowered.clone(), entry.price)) {
            continue;
        }
        if classify_rate(&lowered) != Some(category) {
            continue;
        }

        let display = display_name(&entry.name);
        if !seen_names.insert(display.to_lowercase()) {
            continue;
        }
        filtered.push(RateEntry::new(display, entry.price));
    }

    filtered.sort_by(|a, b| b.price.cmp(&a.price));
    filtered
}

pub fn price_tier_emoji(price: i64) -> &'static str {
    if price > 2000 {
        "💎"
    } else if price > 1000 {
        "⭐"
    } else {
        "🎟"
    }
}

pub fn render_tariffs(entries: &[RateEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} {} — {} ₽",
                price_tier_emoji(entry.price),
                entry.name,
                entry.price
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{filter_tariffs, parse_session, parse_sessions, render_tariffs, SessionInfo};
    use crate::ports::RateEntry;
    use crate::state::TicketCategory;

    #[test]
    fn test_session_field_probing() {
        let variants = [
            json!({"sessionTime": "10:00", "freeCount": 5, "totalCount": 50}),
            json!({"SessionTime": "10:00", "FreeCount": 5, "TotalCount": 50}),
            json!({"time": "10:00", "free": "5", "total": "50"}),
        ];

        for raw in &variants {
            assert_eq!(
                parse_session(raw),
                Some(SessionInfo {
                    time_label: "10:00".to_string(),
                    free: 5,
                    total: 50,
                }),
                "failed on {raw}"
            );
        }
    }

    #[test]
    fn test_session_capacity_placeholder() {
        let session = parse_session(&json!({"time": "12:30"})).unwrap();
        assert_eq!((session.free, session.total), (1, 50));

        // only *both* counts missing triggers the placeholder
        let session = parse_session(&json!({"time": "12:30", "total": 50})).unwrap();
        assert_eq!((session.free, session.total), (0, 50));
    }

    #[test]
    fn test_entries_without_time_are_skipped() {
        let raw = [json!({"freeCount": 5}), json!({"time": "14:00"})];
        let sessions = parse_sessions(&raw);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].time_label, "14:00");
    }

    #[test]
    fn test_tariff_dedup_and_category_filter() {
        let raw = [
            RateEntry::new("Взрослый билет", 1500),
            RateEntry::new("взрослый билет", 1500),
            RateEntry::new("Детский", 500),
        ];

        let filtered = filter_tariffs(&raw, TicketCategory::Adult);
        assert_eq!(filtered, vec![RateEntry::new("Взрослый", 1500)]);
    }

    #[test]
    fn test_ambiguous_entries_are_excluded() {
        let raw = [
            RateEntry::new("Взрослый + детский (семейный)", 2500),
            RateEntry::new("Сопровождающий", 100),
            RateEntry::new("Детский будний", 400),
        ];

        let filtered = filter_tariffs(&raw, TicketCategory::Child);
        assert_eq!(filtered, vec![RateEntry::new("Детский будний", 400)]);
    }

    #[test]
    fn test_cosmetic_duplicates_collapse_and_sort() {
        let raw = [
            RateEntry::new("Взрослый билет vip", 3000),
            RateEntry::new("Взрослый VIP", 3200),
            RateEntry::new("Взрослый", 1500),
        ];

        let filtered = filter_tariffs(&raw, TicketCategory::Adult);
        // "Взрослый билет vip" and "Взрослый VIP" share a display name, the
        // first occurrence wins; then sorted by price descending
        assert_eq!(
            filtered,
            vec![
                RateEntry::new("Взрослый VIP", 3000),
                RateEntry::new("Взрослый", 1500),
            ]
        );
    }

    #[test]
    fn test_price_tier_rendering() {
        let rendered = render_tariffs(&[
            RateEntry::new("VIP", 2500),
            RateEntry::new("Взрослый", 1500),
            RateEntry::new("Детский", 500),
        ]);

        assert_eq!(
            rendered,
            "💎 VIP — 2500 ₽\n⭐ Взрослый — 1500 ₽\n🎟 Детский — 500 ₽"
        );
    }
}
