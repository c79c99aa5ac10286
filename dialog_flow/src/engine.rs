//! The dialog engine: classifies every inbound message through an ordered
//! pipeline (admin command → command table → state handler → fallback),
//! mutates the conversation state and pushes replies out through the
//! [`Messenger`] seam.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, error, instrument, warn, Level};

use crate::intent::{classify, AdminCommand, Intent};
use crate::keyboard;
use crate::ports::{Command, CommandResolver, Messenger, ScheduleSource, UserDirectory};
use crate::schedule::{self, SessionInfo};
use crate::state::{ConversationState, ConversationStore, TicketCategory};
use crate::texts;

const ADMIN_SEARCH_LIMIT: u32 = 10;

pub struct DialogEngine<M, C, S, U> {
    messenger: M,
    commands: C,
    schedule: S,
    directory: U,
    store: Arc<dyn ConversationStore>,
}

impl<M, C, S, U> DialogEngine<M, C, S, U>
where
    M: Messenger,
    C: CommandResolver,
    S: ScheduleSource,
    U: UserDirectory,
{
    pub fn new(
        messenger: M,
        commands: C,
        schedule: S,
        directory: U,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        DialogEngine {
            messenger,
            commands,
            schedule,
            directory,
            store,
        }
    }

    /// Single entry point, one call per received message event. Never fails
    /// the caller: whatever breaks inside ends up as one generic reply, with
    /// the conversation state left as-is so a retry can succeed.
    #[instrument(level = Level::DEBUG, skip(self, text))]
    pub async fn process_message(&self, from_id: u64, peer_id: u64, text: &str) {
        if let Err(err) = self.dispatch(from_id, peer_id, text).await {
            error!("message processing failed for {from_id}: {err:#}");
            if let Err(err) = self
                .messenger
                .send(peer_id, texts::TECH_ERROR, Some(&keyboard::main_menu()))
                .await
            {
                error!("failed to deliver the error reply to {peer_id}: {err:#}");
            }
        }
    }

    async fn dispatch(&self, from_id: u64, peer_id: u64, text: &str) -> Result<()> {
        if let Err(err) = self.directory.touch_message(from_id).await {
            warn!("message counter update failed for {from_id}: {err:#}");
        }

        let intent = classify(text);
        debug!("classified message from {from_id} as {intent:?}");

        // privileged overrides, valid in every state and never part of the flow
        if let Intent::Admin(command) = intent {
            return self.handle_admin(peer_id, command).await;
        }

        match self.store.state_of(from_id) {
            ConversationState::Idle => self.handle_idle(from_id, peer_id, text, intent).await,
            ConversationState::WaitingForDate => {
                self.handle_date_step(from_id, peer_id, text, intent).await
            }
            ConversationState::WaitingForSession { date } => {
                self.handle_session_step(from_id, peer_id, date, intent).await
            }
            ConversationState::WaitingForCategory { date, session } => {
                self.handle_category_step(from_id, peer_id, date, session, intent)
                    .await
            }
            ConversationState::WaitingForPayment {
                date,
                session,
                category,
            } => {
                self.handle_payment_step(from_id, peer_id, date, session, category, intent)
                    .await
            }
        }
    }

    async fn handle_admin(&self, peer_id: u64, command: AdminCommand) -> Result<()> {
        debug!("admin command: {command:?}");
        let reply = match command {
            AdminCommand::Stats => self.directory.stats().await,
            AdminCommand::Search(query) => {
                self.directory.search(&query, ADMIN_SEARCH_LIMIT).await
            }
            AdminCommand::Ban { user_id, reason } => {
                self.directory.manage(user_id, true, reason.as_deref()).await
            }
            AdminCommand::Unban { user_id } => self.directory.manage(user_id, false, None).await,
        };
        let reply = reply.unwrap_or_else(|err| {
            warn!("admin capability failed: {err:#}");
            format!("Не удалось выполнить команду: {err:#}")
        });
        self.send(peer_id, &reply, None).await
    }

    async fn handle_idle(
        &self,
        from_id: u64,
        peer_id: u64,
        text: &str,
        intent: Intent,
    ) -> Result<()> {
        // while idle the command table wins over the built-in keywords
        match self.commands.find(text).await {
            Ok(Some(command)) => return self.reply_with_command(peer_id, command).await,
            Ok(None) => {}
            Err(err) => warn!("command lookup failed: {err:#}"),
        }

        match intent {
            Intent::BuyTickets => {
                self.store
                    .set_state(from_id, ConversationState::WaitingForDate);
                self.send(
                    peer_id,
                    texts::CHOOSE_DATE,
                    Some(keyboard::ticket_dates(today())),
                )
                .await
            }
            Intent::CurrentLoad => match self.schedule.current_load().await {
                Ok(load) => {
                    let reply = format!(
                        "Сейчас на катке {} человек, загруженность {}% 👥",
                        load.visitors, load.load_percent
                    );
                    self.send(peer_id, &reply, Some(keyboard::main_menu())).await
                }
                Err(err) => {
                    warn!("load fetch failed: {err:#}");
                    self.send(
                        peer_id,
                        texts::LOAD_FETCH_FAILED,
                        Some(keyboard::main_menu()),
                    )
                    .await
                }
            },
            Intent::Info => {
                self.send(peer_id, texts::INFO, Some(keyboard::info_menu()))
                    .await
            }
            Intent::OpeningHours => {
                self.send(peer_id, texts::OPENING_HOURS, Some(keyboard::back_to_info()))
                    .await
            }
            Intent::Contacts => {
                self.send(peer_id, texts::CONTACTS, Some(keyboard::back_to_info()))
                    .await
            }
            Intent::Location => {
                self.send(peer_id, texts::LOCATION, Some(keyboard::back_to_info()))
                    .await
            }
            Intent::MainMenu | Intent::Back => self.reset_to_menu(from_id, peer_id).await,
            _ => {
                self.send(peer_id, texts::FALLBACK, Some(keyboard::main_menu()))
                    .await
            }
        }
    }

    async fn handle_date_step(
        &self,
        from_id: u64,
        peer_id: u64,
        text: &str,
        intent: Intent,
    ) -> Result<()> {
        match intent {
            Intent::MainMenu | Intent::Back => self.reset_to_menu(from_id, peer_id).await,
            Intent::DateChoice(date) => match self.load_sessions(&date).await {
                Ok(sessions) if sessions.is_empty() => {
                    self.send(
                        peer_id,
                        texts::NO_SESSIONS,
                        Some(keyboard::ticket_dates(today())),
                    )
                    .await
                }
                Ok(sessions) => {
                    self.store.set_state(
                        from_id,
                        ConversationState::WaitingForSession { date: date.clone() },
                    );
                    let prompt = format!("Сеансы на 📅 {date}. Выберите время 👇");
                    self.send(peer_id, &prompt, Some(keyboard::sessions(&sessions)))
                        .await
                }
                Err(err) => {
                    warn!("session fetch failed for {date}: {err:#}");
                    self.send(peer_id, texts::SESSIONS_FETCH_FAILED, None).await
                }
            },
            _ => {
                // this step alone still consults the command table; a match
                // drops the flow and answers like an idle command would
                match self.commands.find(text).await {
                    Ok(Some(command)) => {
                        self.store.clear(from_id);
                        self.reply_with_command(peer_id, command).await
                    }
                    Ok(None) => {
                        self.send(
                            peer_id,
                            texts::CHOOSE_DATE_BUTTON,
                            Some(keyboard::ticket_dates(today())),
                        )
                        .await
                    }
                    Err(err) => {
                        warn!("command lookup failed: {err:#}");
                        self.send(
                            peer_id,
                            texts::CHOOSE_DATE_BUTTON,
                            Some(keyboard::ticket_dates(today())),
                        )
                        .await
                    }
                }
            }
        }
    }

    async fn handle_session_step(
        &self,
        from_id: u64,
        peer_id: u64,
        date: String,
        intent: Intent,
    ) -> Result<()> {
        match intent {
            Intent::MainMenu => self.reset_to_menu(from_id, peer_id).await,
            Intent::Back => {
                self.store
                    .set_state(from_id, ConversationState::WaitingForDate);
                self.send(
                    peer_id,
                    texts::CHOOSE_DATE,
                    Some(keyboard::ticket_dates(today())),
                )
                .await
            }
            Intent::SessionChoice(session) => {
                self.store.set_state(
                    from_id,
                    ConversationState::WaitingForCategory {
                        date: date.clone(),
                        session: session.clone(),
                    },
                );
                let summary =
                    format!("Ваш выбор: 📅 {date}, 🕒 {session}\nВыберите категорию билетов 👇");
                self.send(peer_id, &summary, Some(keyboard::categories(None)))
                    .await
            }
            _ => self.send(peer_id, texts::CHOOSE_SESSION_BUTTON, None).await,
        }
    }

    async fn handle_category_step(
        &self,
        from_id: u64,
        peer_id: u64,
        date: String,
        session: String,
        intent: Intent,
    ) -> Result<()> {
        match intent {
            Intent::MainMenu => self.reset_to_menu(from_id, peer_id).await,
            Intent::Back => match self.load_sessions(&date).await {
                Ok(sessions) => {
                    self.store.set_state(
                        from_id,
                        ConversationState::WaitingForSession { date: date.clone() },
                    );
                    let prompt = format!("Сеансы на 📅 {date}. Выберите время 👇");
                    self.send(peer_id, &prompt, Some(keyboard::sessions(&sessions)))
                        .await
                }
                Err(err) => {
                    warn!("session fetch failed for {date}: {err:#}");
                    self.send(peer_id, texts::SESSIONS_FETCH_FAILED, None).await
                }
            },
            Intent::CategoryChoice(category) => {
                let raw = match self.schedule.tariffs(&date).await {
                    Ok(raw) => raw,
                    Err(err) => {
                        warn!("tariff fetch failed for {date}: {err:#}");
                        return self.send(peer_id, texts::TARIFFS_FETCH_FAILED, None).await;
                    }
                };

                let filtered = schedule::filter_tariffs(&raw, category);
                if filtered.is_empty() {
                    return self
                        .send(
                            peer_id,
                            texts::NO_TARIFFS,
                            Some(keyboard::categories(Some(category))),
                        )
                        .await;
                }

                self.store.set_state(
                    from_id,
                    ConversationState::WaitingForPayment {
                        date: date.clone(),
                        session: session.clone(),
                        category,
                    },
                );
                let summary = format!(
                    "Ваш заказ:\n📅 {date}\n🕒 {session}\n{} билеты\n\nДоступные тарифы:\n{}\n\nНажмите «{}», чтобы перейти к оплате",
                    category.title(),
                    schedule::render_tariffs(&filtered),
                    keyboard::BTN_PAY,
                );
                self.send(peer_id, &summary, Some(keyboard::payment())).await
            }
            _ => {
                self.send(
                    peer_id,
                    texts::CHOOSE_CATEGORY_BUTTON,
                    Some(keyboard::categories(None)),
                )
                .await
            }
        }
    }

    async fn handle_payment_step(
        &self,
        from_id: u64,
        peer_id: u64,
        date: String,
        session: String,
        category: TicketCategory,
        intent: Intent,
    ) -> Result<()> {
        match intent {
            Intent::MainMenu => self.reset_to_menu(from_id, peer_id).await,
            Intent::Back => {
                self.store.set_state(
                    from_id,
                    ConversationState::WaitingForCategory {
                        date,
                        session,
                    },
                );
                self.send(
                    peer_id,
                    "Выберите категорию билетов 👇",
                    Some(keyboard::categories(Some(category))),
                )
                .await
            }
            Intent::Pay => {
                self.store.clear(from_id);
                let confirmation = format!(
                    "Заказ подтверждён ✅\n📅 {date}\n🕒 {session}\n{} билеты\n\nЖдём вас на катке!",
                    category.title(),
                );
                self.send(peer_id, &confirmation, Some(keyboard::main_menu()))
                    .await
            }
            _ => {
                self.send(peer_id, texts::PRESS_PAY_BUTTON, Some(keyboard::payment()))
                    .await
            }
        }
    }

    async fn reset_to_menu(&self, from_id: u64, peer_id: u64) -> Result<()> {
        self.store.clear(from_id);
        self.send(
            peer_id,
            texts::MAIN_MENU_PROMPT,
            Some(keyboard::main_menu()),
        )
        .await
    }

    async fn reply_with_command(&self, peer_id: u64, command: Command) -> Result<()> {
        debug!("replying with command {:?}", command.name);
        let keyboard = command.keyboard.unwrap_or_else(keyboard::main_menu);
        self.send(peer_id, &command.response, Some(keyboard)).await
    }

    async fn load_sessions(&self, date: &str) -> Result<Vec<SessionInfo>> {
        let raw = self.schedule.sessions(date).await?;
        Ok(schedule::parse_sessions(&raw))
    }

    async fn send(&self, peer_id: u64, text: &str, keyboard: Option<String>) -> Result<()> {
        self.messenger
            .send(peer_id, text, keyboard.as_deref())
            .await
            .with_context(|| format!("sending reply to {peer_id}"))?;
        Ok(())
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
