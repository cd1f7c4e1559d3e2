use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode};
use tracing::warn;

use kb_core::{
    display::Reconciled,
    domain::ChatId,
    formatting::escape_html,
    intent::Intent,
};

use crate::router::AppState;

fn help_text(default_holder: &str) -> String {
    format!(
        "<b>Comandos</b>\n\
/setup - cria ou atualiza a mensagem fixa de status (no grupo)\n\
/status - mostra quem está com a chave\n\
/reset - devolve a chave para {}",
        escape_html(default_holder)
    )
}

async fn reply_html(bot: &Bot, msg: &Message, html: impl Into<String>) {
    let res = bot
        .send_message(msg.chat.id, html.into())
        .parse_mode(ParseMode::Html)
        .reply_to_message_id(msg.id)
        .await;
    if let Err(e) = res {
        warn!(chat = msg.chat.id.0, error = %e, "failed to reply");
    }
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    intent: Intent,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    let service = &state.service;

    match intent {
        Intent::Start => {
            reply_html(
                &bot,
                &msg,
                "Olá! Use /setup no grupo para criar/atualizar a mensagem fixa de status.",
            )
            .await;
        }

        Intent::Help => {
            let default = service.roster().default_holder();
            reply_html(&bot, &msg, help_text(default.as_str())).await;
        }

        Intent::Setup => {
            if !(msg.chat.is_group() || msg.chat.is_supergroup()) {
                reply_html(
                    &bot,
                    &msg,
                    "Use este comando dentro do grupo onde o status deve ficar fixado.",
                )
                .await;
                return Ok(());
            }

            let text = match service.setup(chat_id).await {
                Reconciled::Updated(_) => "Status atualizado. Use os botões para transferir.",
                Reconciled::Recreated { pinned: true, .. } => {
                    "Status preparado e fixado. Use os botões para transferir."
                }
                Reconciled::Recreated { pinned: false, .. } => {
                    "Status preparado, mas não consegui fixar a mensagem (preciso ser admin)."
                }
                Reconciled::Unavailable => {
                    "Não consegui publicar o status agora. Tente novamente em instantes."
                }
            };
            reply_html(&bot, &msg, text).await;
        }

        Intent::Status => {
            if let Err(e) = service.status(chat_id).await {
                warn!(chat = chat_id.0, error = %e, "failed to post status");
            }
        }

        Intent::Reset => {
            // Every audit row names a real user.
            let Some(user_id) = super::sender_id(&msg) else {
                reply_html(
                    &bot,
                    &msg,
                    "Não consegui identificar quem enviou o comando. Envie /reset com sua conta pessoal.",
                )
                .await;
                return Ok(());
            };

            match service.reset(user_id, super::origin_of(&msg.chat)).await {
                Ok(_) => {
                    let default = escape_html(service.roster().default_holder().as_str());
                    reply_html(&bot, &msg, format!("Status resetado para <b>{default}</b>.")).await;
                }
                Err(e) => {
                    warn!(chat = chat_id.0, error = %e, "reset failed");
                    reply_html(
                        &bot,
                        &msg,
                        "❌ Não foi possível salvar o novo status. Tente novamente.",
                    )
                    .await;
                }
            }
        }

        // Button intents never arrive as commands.
        Intent::TransferOpen | Intent::TransferSelect(_) | Intent::TransferCancel => {}
    }

    Ok(())
}
