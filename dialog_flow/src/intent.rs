//! Classification of inbound text into a tagged intent.
//!
//! Matching is case-insensitive substring / emoji-prefix based, mirroring the
//! button labels the keyboards emit. The rules are evaluated top to bottom,
//! the first one that recognizes the text wins; what to *do* with the intent
//! is the engine's business.

use chrono::NaiveDate;

use crate::state::TicketCategory;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminCommand {
    Stats,
    Search(String),
    Ban { user_id: u64, reason: Option<String> },
    Unban { user_id: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Admin(AdminCommand),
    MainMenu,
    Back,
    BuyTickets,
    CurrentLoad,
    Info,
    OpeningHours,
    Contacts,
    Location,
    DateChoice(String),
    SessionChoice(String),
    CategoryChoice(TicketCategory),
    Pay,
    Unknown,
}

type Rule = fn(&str) -> Option<Intent>;

// Order matters: the opening-hours button shares the clock emoji with the
// session buttons, so it is checked first; the menu keywords win over the
// bare "назад".
const RULES: &[Rule] = &[
    main_menu,
    opening_hours,
    back,
    date_choice,
    session_choice,
    category_choice,
    pay,
    buy_tickets,
    current_load,
    info,
    contacts,
    location,
];

pub fn classify(text: &str) -> Intent {
    let trimmed = text.trim();
    if let Some(intent) = admin(trimmed) {
        return intent;
    }

    let lowered = trimmed.to_lowercase();
    RULES
        .iter()
        .find_map(|rule| rule(&lowered))
        .unwrap_or(Intent::Unknown)
}

/// Admin patterns keep the original casing of their arguments, so they are
/// parsed before the generic lowercasing.
fn admin(text: &str) -> Option<Intent> {
    let lowered = text.to_lowercase();
    if lowered == "/stats" || lowered == "статистика" {
        return Some(Intent::Admin(AdminCommand::Stats));
    }

    let (head, tail) = text.split_once(char::is_whitespace)?;
    let tail = tail.trim();
    match head.to_lowercase().as_str() {
        "/find" if !tail.is_empty() => {
            Some(Intent::Admin(AdminCommand::Search(tail.to_string())))
        }
        "/ban" => {
            let mut parts = tail.splitn(2, char::is_whitespace);
            let user_id = parts.next()?.parse().ok()?;
            let reason = parts
                .next()
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty());
            Some(Intent::Admin(AdminCommand::Ban { user_id, reason }))
        }
        "/unban" => tail
            .parse()
            .ok()
            .map(|user_id| Intent::Admin(AdminCommand::Unban { user_id })),
        _ => None,
    }
}

fn main_menu(text: &str) -> Option<Intent> {
    const NEEDLES: &[&str] = &["меню", "/start", "начать", "старт"];
    NEEDLES
        .iter()
        .any(|needle| text.contains(needle))
        .then_some(Intent::MainMenu)
}

fn opening_hours(text: &str) -> Option<Intent> {
    (text.contains("режим работы") || text.contains("часы работы"))
        .then_some(Intent::OpeningHours)
}

fn back(text: &str) -> Option<Intent> {
    text.contains("назад").then_some(Intent::Back)
}

fn date_choice(text: &str) -> Option<Intent> {
    let candidate = text.strip_prefix("📅").unwrap_or(text).trim();
    NaiveDate::parse_from_str(candidate, "%d.%m.%Y").ok()?;
    Some(Intent::DateChoice(candidate.to_string()))
}

fn session_choice(text: &str) -> Option<Intent> {
    let rest = text.strip_prefix("🕒")?.trim();
    let label = rest.split(" (").next().unwrap_or(rest).trim();
    (!label.is_empty()).then(|| Intent::SessionChoice(label.to_string()))
}

fn category_choice(text: &str) -> Option<Intent> {
    if text.contains("взрос") {
        return Some(Intent::CategoryChoice(TicketCategory::Adult));
    }
    if text.contains("детск") {
        return Some(Intent::CategoryChoice(TicketCategory::Child));
    }
    None
}

fn pay(text: &str) -> Option<Intent> {
    (text.contains("оплат") || text.starts_with("💳")).then_some(Intent::Pay)
}

fn buy_tickets(text: &str) -> Option<Intent> {
    (text.contains("билет") || text.starts_with("🎟")).then_some(Intent::BuyTickets)
}

fn current_load(text: &str) -> Option<Intent> {
    (text.contains("загружен") || text.starts_with("👥")).then_some(Intent::CurrentLoad)
}

fn info(text: &str) -> Option<Intent> {
    (text.contains("информаци") || text.starts_with("ℹ")).then_some(Intent::Info)
}

fn contacts(text: &str) -> Option<Intent> {
    (text.contains("контакт") || text.starts_with("📞")).then_some(Intent::Contacts)
}

fn location(text: &str) -> Option<Intent> {
    (text.contains("добраться") || text.contains("адрес") || text.starts_with("📍"))
        .then_some(Intent::Location)
}

#[cfg(test)]
mod tests {
    use super::{classify, AdminCommand, Intent};
    use crate::state::TicketCategory;

    #[test]
    fn test_button_labels() {
        assert_eq!(classify("🎟 Купить билет"), Intent::BuyTickets);
        assert_eq!(classify("👥 Загруженность"), Intent::CurrentLoad);
        assert_eq!(classify("ℹ️ Информация"), Intent::Info);
        assert_eq!(classify("📞 Контакты"), Intent::Contacts);
        assert_eq!(classify("📍 Как добраться"), Intent::Location);
        assert_eq!(classify("💳 Оплатить"), Intent::Pay);
        assert_eq!(
            classify("👤 Взрослые"),
            Intent::CategoryChoice(TicketCategory::Adult)
        );
        assert_eq!(
            classify("🧒 Детские"),
            Intent::CategoryChoice(TicketCategory::Child)
        );
    }

    #[test]
    fn test_menu_keywords_win_over_back() {
        assert_eq!(classify("⬅️ В главное меню"), Intent::MainMenu);
        assert_eq!(classify("назад в меню"), Intent::MainMenu);
        assert_eq!(classify("◀️ Назад"), Intent::Back);
        assert_eq!(classify("/start"), Intent::MainMenu);
    }

    #[test]
    fn test_clock_emoji_collision() {
        // the opening-hours button and session buttons share the emoji
        assert_eq!(classify("🕒 Режим работы"), Intent::OpeningHours);
        assert_eq!(
            classify("🕒 10:00 (свободно 5 из 50)"),
            Intent::SessionChoice("10:00".to_string())
        );
    }

    #[test]
    fn test_date_choice_requires_valid_date() {
        assert_eq!(
            classify("📅 09.08.2026"),
            Intent::DateChoice("09.08.2026".to_string())
        );
        assert_eq!(
            classify("09.08.2026"),
            Intent::DateChoice("09.08.2026".to_string())
        );
        assert_eq!(classify("📅 не дата"), Intent::Unknown);
    }

    #[test]
    fn test_free_text_matching_is_case_insensitive() {
        assert_eq!(classify("Хочу БИЛЕТ на завтра"), Intent::BuyTickets);
        assert_eq!(classify("какая загруженность?"), Intent::CurrentLoad);
        assert_eq!(classify("абракадабра"), Intent::Unknown);
    }

    #[test]
    fn test_admin_patterns() {
        assert_eq!(classify("СТАТИСТИКА"), Intent::Admin(AdminCommand::Stats));
        assert_eq!(classify("/stats"), Intent::Admin(AdminCommand::Stats));
        assert_eq!(
            classify("/find Иван"),
            Intent::Admin(AdminCommand::Search("Иван".to_string()))
        );
        assert_eq!(
            classify("/ban 123 спам в комментариях"),
            Intent::Admin(AdminCommand::Ban {
                user_id: 123,
                reason: Some("спам в комментариях".to_string()),
            })
        );
        assert_eq!(
            classify("/ban 123"),
            Intent::Admin(AdminCommand::Ban {
                user_id: 123,
                reason: None,
            })
        );
        assert_eq!(
            classify("/unban 123"),
            Intent::Admin(AdminCommand::Unban { user_id: 123 })
        );
        // non-numeric id is not an admin command
        assert_eq!(classify("/ban вася"), Intent::Unknown);
    }
}
