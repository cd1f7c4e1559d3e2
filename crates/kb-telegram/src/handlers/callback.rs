use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{debug, warn};

use kb_core::{
    domain::{MessageId, MessageRef, UserId},
    errors::Error,
    formatting::escape_html,
    intent::Intent,
    service::TransferReport,
};

use crate::router::AppState;

async fn answer(bot: &Bot, q: &CallbackQuery, text: Option<&str>, alert: bool) {
    let mut req = bot.answer_callback_query(q.id.clone());
    if let Some(t) = text {
        req = req.text(t.to_string()).show_alert(alert);
    }
    if let Err(e) = req.await {
        debug!(error = %e, "failed to answer callback query");
    }
}

fn confirmation(report: &TransferReport) -> String {
    let now = escape_html(report.transition.current.as_str());
    if report.transition.is_reaffirmation() {
        return format!("ℹ️ Chave permanece com <b>{now}</b>.");
    }
    let before = escape_html(report.transition.previous.as_str());
    format!("✅ Chave agora com <b>{now}</b> (antes: {before}).")
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let data = q.data.clone().unwrap_or_default();
    let pressed = q.message.as_ref().map(|m| {
        let from = super::origin_of(&m.chat);
        let msg = MessageRef {
            chat_id: from.chat_id,
            message_id: MessageId(m.id.0),
        };
        (from, msg)
    });

    let (Some((chat, origin)), Some(intent)) = (pressed, Intent::from_callback(&data)) else {
        answer(&bot, &q, None, false).await;
        return Ok(());
    };

    let service = &state.service;
    let user_id = UserId(q.from.id.0 as i64);

    match intent {
        Intent::TransferOpen => {
            if let Err(e) = service.open_picker(origin).await {
                warn!(chat = origin.chat_id.0, error = %e, "failed to open picker");
            }
            answer(&bot, &q, Some("Escolha para quem transferir."), false).await;
        }

        Intent::TransferCancel => {
            if let Err(e) = service.close_picker(origin).await {
                warn!(chat = origin.chat_id.0, error = %e, "failed to close picker");
            }
            answer(&bot, &q, None, false).await;
        }

        Intent::TransferSelect(name) => {
            match service.transfer(&name, user_id, chat).await {
                Ok(report) => {
                    // The pressed message may be a /status reply rather than the pinned one.
                    if report.display.message() != Some(origin) {
                        if let Err(e) = service.show_in(origin).await {
                            debug!(chat = origin.chat_id.0, error = %e, "failed to refresh pressed message");
                        }
                    }
                    if let Err(e) = service.notify(origin.chat_id, &confirmation(&report)).await {
                        debug!(chat = origin.chat_id.0, error = %e, "failed to send confirmation");
                    }
                    answer(&bot, &q, Some("Status atualizado."), false).await;
                }
                Err(Error::InvalidHolder(_)) => {
                    if let Err(e) = service.close_picker(origin).await {
                        debug!(chat = origin.chat_id.0, error = %e, "failed to close picker");
                    }
                    answer(&bot, &q, Some("Nome fora da lista."), true).await;
                }
                Err(e) => {
                    warn!(chat = origin.chat_id.0, error = %e, "transfer failed");
                    let text = if e.is_user_facing() {
                        "Não foi possível salvar. Tente novamente."
                    } else {
                        "Algo deu errado. Tente novamente."
                    };
                    answer(&bot, &q, Some(text), true).await;
                }
            }
        }

        // Commands never arrive as callbacks.
        Intent::Start | Intent::Help | Intent::Setup | Intent::Status | Intent::Reset => {
            answer(&bot, &q, None, false).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_core::{engine::Transition, display::Reconciled, roster::Roster};

    fn report(from: &str, to: &str) -> TransferReport {
        let roster = Roster::new(["Secretaria", "Lucas", "A<b>"], "Secretaria").unwrap();
        TransferReport {
            transition: Transition {
                previous: roster.resolve(from).unwrap(),
                current: roster.resolve(to).unwrap(),
            },
            display: Reconciled::Unavailable,
        }
    }

    #[test]
    fn confirmation_mentions_previous_holder() {
        assert_eq!(
            confirmation(&report("Secretaria", "Lucas")),
            "✅ Chave agora com <b>Lucas</b> (antes: Secretaria)."
        );
    }

    #[test]
    fn confirmation_for_reaffirmation() {
        assert_eq!(
            confirmation(&report("Lucas", "Lucas")),
            "ℹ️ Chave permanece com <b>Lucas</b>."
        );
        assert!(confirmation(&report("Lucas", "A<b>")).contains("A&lt;b&gt;"));
    }
}
