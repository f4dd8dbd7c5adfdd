//! Demo data for running without a hosted backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as Span, SecondsFormat, Utc};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use landingos_backend::{Backend, MemoryBackend};
use landingos_types::Record;
use landingos_types::models::CurrentUser;
use landingos_types::query::tables;

const CHATTER_INTERVAL: Duration = Duration::from_secs(4);

const CHATTER: &[&str] = &[
    "Oi! Vi a nova versão da landing.",
    "O botão de agendamento ficou ótimo.",
    "Podemos trocar a foto do consultório?",
    "Obrigada, aguardo a próxima prévia.",
];

pub struct Demo {
    pub admin: CurrentUser,
    pub client_id: Uuid,
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

fn ago(hours: i64) -> String {
    (Utc::now() - Span::hours(hours)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn populate(backend: &MemoryBackend) -> Demo {
    let admin = CurrentUser {
        id: Uuid::new_v4(),
        full_name: "Equipe LandingOS".into(),
    };
    let client_id = Uuid::new_v4();
    let store_owner = Uuid::new_v4();

    for (id, name, role) in [
        (admin.id, admin.full_name.as_str(), "admin"),
        (client_id, "Dra. Marina Couto", "client"),
        (store_owner, "Paulo Aurora", "client"),
    ] {
        backend.seed(
            tables::PROFILES,
            record(json!({ "id": id, "full_name": name, "role": role })),
        );
    }

    for (user_id, project_name) in [(client_id, "Clínica Dental"), (store_owner, "Loja Aurora")] {
        backend.seed(
            tables::CLIENT_PROFILES,
            record(json!({ "user_id": user_id, "project_name": project_name })),
        );
    }

    let general = Uuid::new_v4();
    for (id, project_name, name, is_default, hours) in [
        (general, "Clínica Dental", "Reunião", true, 72),
        (Uuid::new_v4(), "Clínica Dental", "Aprovação", false, 48),
        (Uuid::new_v4(), "Loja Aurora", "Geral", true, 96),
    ] {
        backend.seed(
            tables::CHAT_CHANNELS,
            record(json!({
                "id": id,
                "project_name": project_name,
                "name": name,
                "is_default": is_default,
                "created_at": ago(hours),
            })),
        );
    }

    for (sender, content, hours) in [
        (client_id, "Bom dia! Recebi o briefing.", 30),
        (admin.id, "Ótimo, seguimos com o layout aprovado.", 29),
        (client_id, "Olá, tudo certo com a publicação?", 2),
    ] {
        backend.seed(
            tables::CHAT_MESSAGES,
            record(json!({
                "channel_id": general,
                "sender_id": sender,
                "content": content,
                "message_type": "text",
                "created_at": ago(hours),
            })),
        );
    }

    debug!("Demo backend seeded");
    Demo { admin, client_id }
}

/// Posts canned client messages into `channel_id` so live updates can be
/// watched without a second client.
pub fn spawn_chatter(
    backend: Arc<MemoryBackend>,
    channel_id: Uuid,
    sender_id: Uuid,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CHATTER_INTERVAL);
        ticker.tick().await;

        for content in CHATTER {
            ticker.tick().await;
            let fields = record(json!({
                "channel_id": channel_id,
                "sender_id": sender_id,
                "content": content,
                "message_type": "text",
            }));
            if let Err(e) = backend.insert(tables::CHAT_MESSAGES, fields, &[]).await {
                warn!("Demo chatter failed: {}", e);
                return;
            }
        }
    })
}
