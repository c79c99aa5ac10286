//! VK reply-keyboard payloads.
//!
//! Pure builders: context in, serialized payload out. Which keyboard to show
//! is always the caller's decision.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::schedule::SessionInfo;
use crate::state::TicketCategory;

pub const BTN_BUY_TICKETS: &str = "🎟 Купить билет";
pub const BTN_CURRENT_LOAD: &str = "👥 Загруженность";
pub const BTN_INFO: &str = "ℹ️ Информация";
pub const BTN_OPENING_HOURS: &str = "🕒 Режим работы";
pub const BTN_CONTACTS: &str = "📞 Контакты";
pub const BTN_LOCATION: &str = "📍 Как добраться";
pub const BTN_MAIN_MENU: &str = "⬅️ В главное меню";
pub const BTN_BACK: &str = "◀️ Назад";
pub const BTN_ADULT: &str = "👤 Взрослые";
pub const BTN_CHILD: &str = "🧒 Детские";
pub const BTN_PAY: &str = "💳 Оплатить";

pub const DATE_MARK: &str = "📅";
pub const SESSION_MARK: &str = "🕒";

const PRIMARY: &str = "primary";
const SECONDARY: &str = "secondary";
const POSITIVE: &str = "positive";

#[derive(Serialize)]
struct Keyboard {
    one_time: bool,
    inline: bool,
    buttons: Vec<Vec<Button>>,
}

#[derive(Serialize)]
struct Button {
    action: Action,
    color: &'static str,
}

#[derive(Serialize)]
struct Action {
    #[serde(rename = "type")]
    kind: &'static str,
    label: String,
}

fn text_button(label: impl Into<String>, color: &'static str) -> Button {
    Button {
        action: Action {
            kind: "text",
            label: label.into(),
        },
        color,
    }
}

fn render(rows: Vec<Vec<Button>>) -> String {
    let keyboard = Keyboard {
        one_time: false,
        inline: false,
        buttons: rows,
    };
    serde_json::to_string(&keyboard).unwrap_or_else(|err| {
        tracing::error!("keyboard serialization failed: {err}");
        String::from(r#"{"buttons":[]}"#)
    })
}

pub fn main_menu() -> String {
    render(vec![
        vec![text_button(BTN_BUY_TICKETS, PRIMARY)],
        vec![
            text_button(BTN_CURRENT_LOAD, SECONDARY),
            text_button(BTN_INFO, SECONDARY),
        ],
    ])
}

pub fn info_menu() -> String {
    render(vec![
        vec![text_button(BTN_OPENING_HOURS, SECONDARY)],
        vec![
            text_button(BTN_CONTACTS, SECONDARY),
            text_button(BTN_LOCATION, SECONDARY),
        ],
        vec![text_button(BTN_MAIN_MENU, SECONDARY)],
    ])
}

pub fn back_to_info() -> String {
    render(vec![
        vec![text_button(BTN_INFO, SECONDARY)],
        vec![text_button(BTN_MAIN_MENU, SECONDARY)],
    ])
}

/// Date picker: today and the next two days, one button per row.
pub fn ticket_dates(today: NaiveDate) -> String {
    let mut rows: Vec<Vec<Button>> = (0..3)
        .map(|offset| {
            let date = today + Duration::days(offset);
            vec![text_button(
                format!("{DATE_MARK} {}", date.format("%d.%m.%Y")),
                PRIMARY,
            )]
        })
        .collect();
    rows.push(vec![text_button(BTN_MAIN_MENU, SECONDARY)]);
    render(rows)
}

pub fn sessions(sessions: &[SessionInfo]) -> String {
    let mut rows: Vec<Vec<Button>> = sessions
        .iter()
        .map(|session| {
            vec![text_button(
                format!(
                    "{SESSION_MARK} {} (свободно {} из {})",
                    session.time_label, session.free, session.total
                ),
                PRIMARY,
            )]
        })
        .collect();
    rows.push(vec![
        text_button(BTN_BACK, SECONDARY),
        text_button(BTN_MAIN_MENU, SECONDARY),
    ]);
    render(rows)
}

/// Category picker. When the user comes back from the payment step the
/// category chosen earlier is highlighted.
pub fn categories(selected: Option<TicketCategory>) -> String {
    let color = |category: TicketCategory| {
        if selected == Some(category) {
            POSITIVE
        } else {
            PRIMARY
        }
    };
    render(vec![
        vec![
            text_button(BTN_ADULT, color(TicketCategory::Adult)),
            text_button(BTN_CHILD, color(TicketCategory::Child)),
        ],
        vec![
            text_button(BTN_BACK, SECONDARY),
            text_button(BTN_MAIN_MENU, SECONDARY),
        ],
    ])
}

pub fn payment() -> String {
    render(vec![
        vec![text_button(BTN_PAY, POSITIVE)],
        vec![
            text_button(BTN_BACK, SECONDARY),
            text_button(BTN_MAIN_MENU, SECONDARY),
        ],
    ])
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::Value;

    use super::{categories, main_menu, payment, ticket_dates, BTN_MAIN_MENU, BTN_PAY};
    use crate::state::TicketCategory;

    fn button_labels(payload: &str) -> Vec<String> {
        let keyboard: Value = serde_json::from_str(payload).unwrap();
        keyboard["buttons"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|row| row.as_array().unwrap())
            .map(|button| button["action"]["label"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_date_keyboard_layout() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 30).unwrap();
        let labels = button_labels(&ticket_dates(today));

        assert_eq!(
            labels,
            vec![
                "📅 30.12.2025",
                "📅 31.12.2025",
                "📅 01.01.2026",
                BTN_MAIN_MENU,
            ]
        );
    }

    #[test]
    fn test_main_menu_is_reply_keyboard() {
        let keyboard: Value = serde_json::from_str(&main_menu()).unwrap();
        assert_eq!(keyboard["one_time"], Value::Bool(false));
        assert_eq!(keyboard["inline"], Value::Bool(false));
        assert_eq!(keyboard["buttons"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_selected_category_is_highlighted() {
        let keyboard: Value =
            serde_json::from_str(&categories(Some(TicketCategory::Adult))).unwrap();
        let top_row = keyboard["buttons"][0].as_array().unwrap();

        assert_eq!(top_row[0]["color"], "positive");
        assert_eq!(top_row[1]["color"], "primary");
    }

    #[test]
    fn test_payment_keyboard_has_pay_button() {
        let labels = button_labels(&payment());
        assert!(labels.contains(&BTN_PAY.to_string()));
    }
}
