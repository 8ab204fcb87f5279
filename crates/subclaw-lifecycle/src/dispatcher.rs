//! Inbound message routing.
//!
//! The operator gets the full command console. Everybody else gets a small
//! self-service flow, throttled to one automated reply per cool-down window.
//! While the busy gate is held, every inbound message gets only the busy
//! notice.

use std::sync::Arc;

use subclaw_core::phone::normalize_phone;
use subclaw_core::types::{ClientRecord, IncomingMessage};

use crate::cooldown::ReplyCooldown;
use crate::earnings::Period;
use crate::engine::Lifecycle;
use crate::messages::{self, Severity};
use crate::renewal::parse_renewal_days;

/// Split off the first whitespace-delimited token; the rest is kept verbatim
/// (trimmed) and is `None` when empty.
fn split_command(body: &str) -> (String, Option<&str>) {
    let body = body.trim();
    let (head, rest) = match body.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (body, ""),
    };
    (head.to_lowercase(), (!rest.is_empty()).then_some(rest))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Menu,
    Help,
    Deliver(Option<String>),
    Search(Option<String>),
    Broadcast(Option<String>),
    Earnings(Option<Period>),
    Renew {
        id: Option<String>,
        days: Option<String>,
    },
    Sync,
    Sweep,
    Escalate(Option<(String, Severity)>),
    Unknown,
}

impl OperatorCommand {
    pub fn parse(body: &str) -> Self {
        let (head, rest) = split_command(body);
        let owned = rest.map(str::to_string);
        match head.as_str() {
            "menu" => Self::Menu,
            "ayuda" => Self::Help,
            "1" => Self::Deliver(
                rest.and_then(|r| r.split_whitespace().next())
                    .map(str::to_string),
            ),
            "2" => Self::Search(owned),
            "3" => Self::Broadcast(owned),
            "ganancias" => Self::Earnings(rest.map(Period::parse)),
            "renovar" => {
                let mut args = rest.unwrap_or_default().split_whitespace();
                Self::Renew {
                    id: args.next().map(str::to_string),
                    days: args.next().map(str::to_string),
                }
            }
            "actualizar" | "sync" => Self::Sync,
            "recordatorios" | "sweep" => Self::Sweep,
            "aviso" => {
                let mut args = rest.unwrap_or_default().split_whitespace();
                let id = args.next();
                let level = args
                    .next()
                    .and_then(|l| l.parse::<u8>().ok())
                    .and_then(Severity::from_level);
                Self::Escalate(id.zip(level).map(|(id, s)| (id.to_string(), s)))
            }
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    AccountData,
    Help,
    Greeting,
}

impl UserCommand {
    pub fn parse(body: &str) -> Self {
        match split_command(body).0.as_str() {
            "datos" => Self::AccountData,
            "ayuda" | "menu" => Self::Help,
            _ => Self::Greeting,
        }
    }
}

pub struct CommandDispatcher {
    lifecycle: Arc<Lifecycle>,
    cooldown: ReplyCooldown,
}

impl CommandDispatcher {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        let cooldown = ReplyCooldown::new(lifecycle.settings().reply_cooldown);
        Self { lifecycle, cooldown }
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Handle one inbound message to completion.
    pub async fn handle(&self, msg: IncomingMessage) {
        if self.lifecycle.gate().is_busy() {
            tracing::debug!("⏳ Busy, deferring message from {}", msg.from);
            let _ = self.lifecycle.send(&msg.from, messages::BUSY_NOTICE).await;
            return;
        }

        if msg.from == self.lifecycle.operator_id() {
            let command = OperatorCommand::parse(&msg.body);
            tracing::info!("🛠️ Operator command: {:?}", command);
            self.handle_operator(&msg.from, command).await;
        } else {
            self.handle_user(&msg).await;
        }
    }

    async fn reply(&self, to: &str, text: &str) -> bool {
        self.lifecycle.send(to, text).await.is_ok()
    }

    async fn handle_operator(&self, from: &str, command: OperatorCommand) {
        let lc = &self.lifecycle;
        match command {
            OperatorCommand::Menu => {
                self.reply(from, messages::ADMIN_MENU).await;
            }
            OperatorCommand::Help => {
                self.reply(from, messages::ADMIN_HELP).await;
            }
            OperatorCommand::Deliver(None) => {
                self.reply(from, messages::USAGE_DELIVER).await;
            }
            OperatorCommand::Deliver(Some(id)) => {
                let text = match lc.deliver_account(&id).await {
                    Ok(client) => messages::delivery_done(&client),
                    Err(e) if e.is_not_found() => messages::client_not_found(&id),
                    Err(_) => messages::delivery_failed(&id),
                };
                self.reply(from, &text).await;
            }
            OperatorCommand::Search(None) => {
                self.reply(from, messages::USAGE_SEARCH).await;
            }
            OperatorCommand::Search(Some(query)) => {
                let snapshot = lc.cache().snapshot();
                let hits = snapshot.search(&query);
                let text = if hits.is_empty() {
                    messages::search_miss(&query)
                } else {
                    messages::search_results(&hits)
                };
                self.reply(from, &text).await;
            }
            OperatorCommand::Broadcast(None) => {
                self.reply(from, messages::USAGE_BROADCAST).await;
            }
            OperatorCommand::Broadcast(Some(text)) => {
                lc.broadcast(from, &text).await;
            }
            OperatorCommand::Earnings(None) => {
                self.reply(from, messages::USAGE_EARNINGS).await;
            }
            OperatorCommand::Earnings(Some(period)) => {
                self.reply(from, &lc.earnings_report(period)).await;
            }
            OperatorCommand::Renew { id: None, .. } => {
                self.reply(from, messages::USAGE_RENEW).await;
            }
            OperatorCommand::Renew { id: Some(id), days } => {
                let days = parse_renewal_days(days.as_deref(), lc.settings().default_renewal_days);
                self.reply(from, &messages::renewal_started(&id, days)).await;
                let text = match lc.renew(&id, days).await {
                    Ok(new_date) => messages::renewal_done(&id, new_date),
                    Err(e) if e.is_not_found() => messages::client_not_found(&id),
                    Err(_) => messages::renewal_failed(&id),
                };
                self.reply(from, &text).await;
            }
            OperatorCommand::Sync => {
                let text = match lc.refresh().await {
                    Ok(count) => messages::sync_done(count),
                    Err(_) => messages::SYNC_FAILED.to_string(),
                };
                self.reply(from, &text).await;
            }
            OperatorCommand::Sweep => {
                self.reply(from, messages::SWEEP_STARTED).await;
                let report = lc.sweep().await;
                let text =
                    messages::sweep_summary(report.due_today, report.early_warning, report.failed);
                self.reply(from, &text).await;
            }
            OperatorCommand::Escalate(None) => {
                self.reply(from, messages::USAGE_ESCALATE).await;
            }
            OperatorCommand::Escalate(Some((id, severity))) => {
                if let Err(e) = lc.escalate(&id, severity).await
                    && e.is_not_found()
                {
                    self.reply(from, &messages::client_not_found(&id)).await;
                }
            }
            OperatorCommand::Unknown => {
                self.reply(from, messages::UNKNOWN_COMMAND).await;
            }
        }
    }

    async fn handle_user(&self, msg: &IncomingMessage) {
        let Some(reservation) = self.cooldown.try_reserve(&msg.from, self.lifecycle.now()) else {
            tracing::debug!("🤫 {} is inside the reply cool-down", msg.from);
            return;
        };

        let replied = match UserCommand::parse(&msg.body) {
            UserCommand::AccountData => self.send_account_data(&msg.from).await,
            UserCommand::Help => self.reply(&msg.from, messages::USER_HELP).await,
            UserCommand::Greeting => self.reply(&msg.from, messages::USER_GREETING).await,
        };
        if !replied {
            self.cooldown.release(reservation);
        }
    }

    /// Every cached account whose phone normalizes to the sender.
    fn accounts_of(&self, sender: &str) -> Vec<ClientRecord> {
        self.lifecycle
            .cache()
            .snapshot()
            .records()
            .iter()
            .filter(|c| c.has_phone() && normalize_phone(&c.phone) == sender)
            .cloned()
            .collect()
    }

    async fn send_account_data(&self, from: &str) -> bool {
        let accounts = self.accounts_of(from);
        match accounts.as_slice() {
            [] => self.reply(from, messages::NO_ACCOUNTS).await,
            [only] => self.reply(from, &messages::account_delivery(only)).await,
            many => {
                let mut any = self
                    .reply(from, &messages::multiple_accounts(many.len()))
                    .await;
                let delay = self.lifecycle.settings().delivery_delay;
                for account in many {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    any |= self.reply(from, &messages::account_delivery(account)).await;
                }
                any
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, OPERATOR, client_row, loaded};

    const USER: &str = "18095550001@c.us";

    async fn setup() -> (Harness, CommandDispatcher) {
        let h = loaded(vec![
            client_row("C1", "Ana Pérez", "809-555-0001", "15/01/2024", 100.0, 250.0),
            client_row("C2", "Ana Segunda", "8095550001", "18/01/2024", 50.0, 120.0),
            client_row("C3", "Luis Gómez", "8295550002", "20/02/2024", 0.0, 0.0),
        ])
        .await;
        let dispatcher = CommandDispatcher::new(h.lifecycle.clone());
        (h, dispatcher)
    }

    async fn operator_says(h: &Harness, d: &CommandDispatcher, body: &str) -> Vec<String> {
        h.transport.clear();
        d.handle(IncomingMessage::new(OPERATOR, body)).await;
        h.transport.sent_to(OPERATOR)
    }

    #[test]
    fn test_parse_operator_commands() {
        assert_eq!(OperatorCommand::parse("  MENU "), OperatorCommand::Menu);
        assert_eq!(OperatorCommand::parse("1 C7"), OperatorCommand::Deliver(Some("C7".into())));
        assert_eq!(OperatorCommand::parse("1"), OperatorCommand::Deliver(None));
        assert_eq!(
            OperatorCommand::parse("1 C7 gracias"),
            OperatorCommand::Deliver(Some("C7".into()))
        );
        assert_eq!(
            OperatorCommand::parse("3 Oferta: 2x1  hoy"),
            OperatorCommand::Broadcast(Some("Oferta: 2x1  hoy".into()))
        );
        assert_eq!(
            OperatorCommand::parse("ganancias mes"),
            OperatorCommand::Earnings(Some(Period::Month))
        );
        assert_eq!(
            OperatorCommand::parse("Renovar c1 60"),
            OperatorCommand::Renew { id: Some("c1".into()), days: Some("60".into()) }
        );
        assert_eq!(OperatorCommand::parse("sync"), OperatorCommand::Sync);
        assert_eq!(OperatorCommand::parse("actualizar"), OperatorCommand::Sync);
        assert_eq!(OperatorCommand::parse("recordatorios"), OperatorCommand::Sweep);
        assert_eq!(
            OperatorCommand::parse("aviso C1 3"),
            OperatorCommand::Escalate(Some(("C1".into(), Severity::FinalNotice)))
        );
        assert_eq!(OperatorCommand::parse("aviso C1 9"), OperatorCommand::Escalate(None));
        assert_eq!(OperatorCommand::parse("hola"), OperatorCommand::Unknown);
        assert_eq!(OperatorCommand::parse(""), OperatorCommand::Unknown);
    }

    #[test]
    fn test_parse_user_commands() {
        assert_eq!(UserCommand::parse("Datos"), UserCommand::AccountData);
        assert_eq!(UserCommand::parse("menu"), UserCommand::Help);
        assert_eq!(UserCommand::parse("buenas tardes"), UserCommand::Greeting);
    }

    #[tokio::test]
    async fn test_busy_gate_only_busy_notice() {
        let (h, d) = setup().await;
        let guard = h.lifecycle.gate().acquire("broadcast").await;

        d.handle(IncomingMessage::new(OPERATOR, "renovar C1")).await;
        d.handle(IncomingMessage::new(USER, "datos")).await;

        assert_eq!(
            h.transport.sent(),
            vec![
                (OPERATOR.to_string(), messages::BUSY_NOTICE.to_string()),
                (USER.to_string(), messages::BUSY_NOTICE.to_string()),
            ]
        );
        assert!(h.store.writes().is_empty());
        drop(guard);

        // The busy notice does not start the user's cool-down.
        d.handle(IncomingMessage::new(USER, "hola")).await;
        assert_eq!(h.transport.sent_to(USER).len(), 2);
    }

    #[tokio::test]
    async fn test_user_gets_one_reply_per_window() {
        let (h, d) = setup().await;
        d.handle(IncomingMessage::new("18290000000@c.us", "hola")).await;
        d.handle(IncomingMessage::new("18290000000@c.us", "ayuda")).await;
        assert_eq!(
            h.transport.sent_to("18290000000@c.us"),
            vec![messages::USER_GREETING.to_string()]
        );

        h.clock.advance(chrono::Duration::hours(24));
        d.handle(IncomingMessage::new("18290000000@c.us", "ayuda")).await;
        assert_eq!(h.transport.sent_to("18290000000@c.us").len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_messages_get_one_reply() {
        let (h, d) = setup().await;
        h.transport.set_latency(std::time::Duration::from_millis(20));
        let user = "18290000000@c.us";

        tokio::join!(
            d.handle(IncomingMessage::new(user, "hola")),
            d.handle(IncomingMessage::new(user, "ayuda")),
        );
        assert_eq!(h.transport.sent_to(user).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_reply_does_not_start_cooldown() {
        let (h, d) = setup().await;
        h.transport.fail_for("8290000000");
        d.handle(IncomingMessage::new("18290000000@c.us", "hola")).await;

        h.transport.clear();
        d.handle(IncomingMessage::new("18290000000@c.us", "hola")).await;
        assert_eq!(h.transport.sent_to("18290000000@c.us").len(), 1);
    }

    #[tokio::test]
    async fn test_datos_sends_every_matching_account() {
        let (h, d) = setup().await;
        d.handle(IncomingMessage::new(USER, "datos")).await;
        let sent = h.transport.sent_to(USER);
        assert_eq!(sent.len(), 3);
        assert!(sent[0].contains("2 cuentas"));
        assert!(sent[1].contains("Ana Pérez"));
        assert!(sent[2].contains("Ana Segunda"));
    }

    #[tokio::test]
    async fn test_datos_with_no_accounts() {
        let (h, d) = setup().await;
        d.handle(IncomingMessage::new("18090000000@c.us", "datos")).await;
        assert_eq!(
            h.transport.sent_to("18090000000@c.us"),
            vec![messages::NO_ACCOUNTS.to_string()]
        );
    }

    #[tokio::test]
    async fn test_operator_is_not_rate_limited() {
        let (h, d) = setup().await;
        assert_eq!(operator_says(&h, &d, "menu").await, vec![messages::ADMIN_MENU]);
        assert_eq!(operator_says(&h, &d, "menu").await, vec![messages::ADMIN_MENU]);
        assert_eq!(operator_says(&h, &d, "qué tal").await, vec![messages::UNKNOWN_COMMAND]);
    }

    #[tokio::test]
    async fn test_operator_usage_hints() {
        let (h, d) = setup().await;
        assert_eq!(operator_says(&h, &d, "1").await, vec![messages::USAGE_DELIVER]);
        assert_eq!(operator_says(&h, &d, "2").await, vec![messages::USAGE_SEARCH]);
        assert_eq!(operator_says(&h, &d, "3").await, vec![messages::USAGE_BROADCAST]);
        assert_eq!(operator_says(&h, &d, "ganancias").await, vec![messages::USAGE_EARNINGS]);
        assert_eq!(operator_says(&h, &d, "renovar").await, vec![messages::USAGE_RENEW]);
        assert_eq!(operator_says(&h, &d, "aviso C1").await, vec![messages::USAGE_ESCALATE]);
    }

    #[tokio::test]
    async fn test_operator_renew_flow() {
        let (h, d) = setup().await;
        let replies = operator_says(&h, &d, "renovar c1").await;
        assert_eq!(replies.len(), 2);
        assert!(replies[0].contains("30"));
        assert!(replies[1].contains("14-02-2024"));
        assert_eq!(h.store.writes(), vec![("J2".to_string(), "14/02/2024".to_string())]);

        let replies = operator_says(&h, &d, "renovar C9 10").await;
        assert_eq!(replies[1], messages::client_not_found("C9"));
    }

    #[tokio::test]
    async fn test_operator_search_and_earnings() {
        let (h, d) = setup().await;
        let replies = operator_says(&h, &d, "2 ana").await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("C1") && replies[0].contains("C2"));
        assert!(!replies[0].contains("C3"));

        let replies = operator_says(&h, &d, "2 nadie").await;
        assert_eq!(replies, vec![messages::search_miss("nadie")]);

        let replies = operator_says(&h, &d, "ganancias hoy").await;
        assert!(replies[0].contains("RD$250.00"));
        assert!(replies[0].contains("RD$150.00"));
    }

    #[tokio::test]
    async fn test_operator_broadcast_dedups() {
        let (h, d) = setup().await;
        d.handle(IncomingMessage::new(OPERATOR, "3 Promo de enero")).await;
        assert_eq!(h.transport.sent_to(USER).len(), 1);
        assert_eq!(h.transport.sent_to("18295550002@c.us").len(), 1);
        assert!(!h.lifecycle.gate().is_busy());
    }

    #[tokio::test]
    async fn test_operator_sync_and_sweep() {
        let (h, d) = setup().await;
        let replies = operator_says(&h, &d, "sync").await;
        assert_eq!(replies, vec![messages::sync_done(3)]);

        h.store.set_fail_reads(true);
        let replies = operator_says(&h, &d, "actualizar").await;
        assert_eq!(
            replies,
            vec![messages::STORE_READ_ALERT.to_string(), messages::SYNC_FAILED.to_string()]
        );
        assert_eq!(h.lifecycle.cache().len(), 3);

        let replies = operator_says(&h, &d, "recordatorios").await;
        assert_eq!(replies.first().map(String::as_str), Some(messages::SWEEP_STARTED));
        assert_eq!(replies.last().unwrap(), &messages::sweep_summary(1, 1, 0));
    }
}
