//! End-to-end messaging flow against the in-process backend.

use std::sync::Arc;

use chrono::FixedOffset;
use serde_json::{Value, json};
use uuid::Uuid;

use landingos_backend::Backend;
use landingos_backend::memory::{MemoryBackend, Operation};
use landingos_chat::{
    ChatConfig, ChatError, LoadState, MessagingPage, SelfEchoPolicy, SendRejected, ViewEffect,
};
use landingos_types::Record;
use landingos_types::events::{ChangeEvent, ChangeKind};
use landingos_types::models::{CurrentUser, ProjectGrouping, Sender};
use landingos_types::query::tables;

const CLINIC: &str = "Clínica Dental";
const STORE: &str = "Loja Aurora";

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

struct Fixture {
    backend: Arc<MemoryBackend>,
    admin: CurrentUser,
    client_id: Uuid,
    reuniao: Uuid,
    aprovacao: Uuid,
}

fn fixture() -> Fixture {
    let backend = Arc::new(MemoryBackend::new());
    let admin = CurrentUser {
        id: Uuid::new_v4(),
        full_name: "Equipe LandingOS".into(),
    };
    let client_id = Uuid::new_v4();
    let reuniao = Uuid::new_v4();
    let aprovacao = Uuid::new_v4();

    backend.seed(
        tables::PROFILES,
        record(json!({ "id": admin.id, "full_name": admin.full_name, "role": "admin" })),
    );
    backend.seed(
        tables::PROFILES,
        record(json!({ "id": client_id, "full_name": "Dra. Marina", "role": "client" })),
    );

    for project_name in [json!(STORE), json!(CLINIC), Value::Null, json!(CLINIC)] {
        backend.seed(
            tables::CLIENT_PROFILES,
            record(json!({ "user_id": Uuid::new_v4(), "project_name": project_name })),
        );
    }

    // Stored out of creation order on purpose.
    backend.seed(
        tables::CHAT_CHANNELS,
        record(json!({
            "id": aprovacao,
            "project_name": CLINIC,
            "name": "Aprovação",
            "is_default": false,
            "created_at": "2024-03-01T09:05:00Z",
        })),
    );
    backend.seed(
        tables::CHAT_CHANNELS,
        record(json!({
            "id": reuniao,
            "project_name": CLINIC,
            "name": "Reunião",
            "is_default": true,
            "created_at": "2024-03-01T09:00:00Z",
        })),
    );
    backend.seed(
        tables::CHAT_CHANNELS,
        record(json!({
            "project_name": STORE,
            "name": "Design",
            "is_default": false,
            "created_at": "2024-02-01T09:00:00Z",
        })),
    );
    backend.seed(
        tables::CHAT_CHANNELS,
        record(json!({
            "project_name": STORE,
            "name": "Geral",
            "is_default": true,
            "created_at": "2024-02-10T09:00:00Z",
        })),
    );

    for (sender, content, at) in [
        (client_id, "Bom dia!", "2024-03-01T10:00:00Z"),
        (admin.id, "Bom dia, Marina.", "2024-03-01T10:05:00Z"),
        (client_id, "Podemos revisar a landing?", "2024-03-02T14:00:00Z"),
    ] {
        backend.seed(
            tables::CHAT_MESSAGES,
            record(json!({
                "channel_id": reuniao,
                "sender_id": sender,
                "content": content,
                "message_type": "text",
                "created_at": at,
            })),
        );
    }

    Fixture {
        backend,
        admin,
        client_id,
        reuniao,
        aprovacao,
    }
}

fn config(self_echo: SelfEchoPolicy) -> ChatConfig {
    ChatConfig {
        message_limit: 100,
        self_echo,
        local_offset: FixedOffset::east_opt(0).unwrap(),
    }
}

async fn loaded_page(f: &Fixture) -> MessagingPage {
    loaded_page_with(f, config(SelfEchoPolicy::Ignore)).await
}

async fn loaded_page_with(f: &Fixture, config: ChatConfig) -> MessagingPage {
    let mut page = MessagingPage::new(f.backend.clone(), f.admin.clone(), config);
    page.load().await;
    page.take_effects();
    page
}

fn contents(page: &MessagingPage) -> Vec<String> {
    page.messages()
        .entries()
        .iter()
        .map(|e| e.message().content.clone())
        .collect()
}

async fn remote_insert(f: &Fixture, channel_id: Uuid, sender: Uuid, content: &str) {
    f.backend
        .insert(
            tables::CHAT_MESSAGES,
            record(json!({
                "channel_id": channel_id,
                "sender_id": sender,
                "content": content,
                "message_type": "text",
            })),
            &[],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn initial_load_opens_first_grouping_and_default_channel() {
    let f = fixture();
    let mut page = MessagingPage::new(
        f.backend.clone(),
        f.admin.clone(),
        config(SelfEchoPolicy::Ignore),
    );
    page.load().await;

    let selection = page.selection();
    assert_eq!(
        selection.groupings(),
        [ProjectGrouping::new(CLINIC), ProjectGrouping::new(STORE)]
    );
    assert_eq!(selection.active_grouping(), Some(&ProjectGrouping::new(CLINIC)));

    let names: Vec<_> = selection.channels().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Reunião", "Aprovação"]);
    assert_eq!(selection.active_channel_id(), Some(f.reuniao));

    assert_eq!(
        contents(&page),
        ["Bom dia!", "Bom dia, Marina.", "Podemos revisar a landing?"]
    );
    assert_eq!(page.messages().state(), LoadState::Ready);
    assert!(page.take_effects().contains(&ViewEffect::ScrollToEnd));
}

#[tokio::test]
async fn default_channel_is_first_even_when_created_later() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    page.select_grouping(ProjectGrouping::new(STORE)).await;

    let names: Vec<_> = page
        .selection()
        .channels()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["Geral", "Design"]);
    assert_eq!(page.selection().active_channel().unwrap().name, "Geral");
    assert_eq!(page.messages().state(), LoadState::Empty);
}

#[tokio::test]
async fn successful_send_is_reconciled_in_place() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    let before = page.messages().len();

    page.send_message("Olá, tudo certo?").await.unwrap();

    let entries = page.messages().entries();
    assert_eq!(entries.len(), before + 1);
    let last = entries.last().unwrap();
    assert!(!last.is_pending());
    assert_eq!(last.message().content, "Olá, tudo certo?");
    assert_eq!(last.message().sender.display_name(), "Equipe LandingOS");
    assert!(entries.iter().all(|e| !e.is_pending()));
    assert!(last.is_admin_side(page.user()));
    assert_eq!(page.messages().compose(), "");

    // The backend echoes the insert back; it must not be appended again.
    page.drain_realtime().await;
    assert_eq!(page.messages().len(), before + 1);
}

#[tokio::test]
async fn whitespace_send_is_a_no_op() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    let before = page.messages().len();

    let result = page.send_message("   ").await;

    assert!(matches!(result, Err(ChatError::Rejected(SendRejected::EmptyText))));
    assert_eq!(page.messages().len(), before);
    assert_eq!(f.backend.call_count(Operation::Insert), 0);
}

#[tokio::test]
async fn second_send_is_rejected_while_first_is_in_flight() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    let channel = page.selection().active_channel_id();

    let first = page
        .messages_mut()
        .begin_send(channel, Sender::from_user(&f.admin), "primeira")
        .unwrap();

    let result = page.send_message("segunda").await;
    assert!(matches!(result, Err(ChatError::Rejected(SendRejected::InFlight))));
    assert_eq!(f.backend.call_count(Operation::Insert), 0);
    assert_eq!(page.messages().len(), 4);

    page.messages_mut()
        .complete_send(&first, Err::<landingos_types::models::Message, _>("timeout"))
        .unwrap_err();
    page.send_message("segunda").await.unwrap();
    assert_eq!(contents(&page).last().unwrap(), "segunda");
}

#[tokio::test]
async fn failed_send_retracts_and_restores_compose() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    let before = page.messages().len();
    f.backend.fail_next(Operation::Insert, tables::CHAT_MESSAGES);

    let result = page.send_message("Relatório em anexo").await;

    assert!(matches!(result, Err(ChatError::Backend(_))));
    assert_eq!(page.messages().len(), before);
    assert_eq!(page.messages().compose(), "Relatório em anexo");
    assert!(
        page.take_effects()
            .contains(&ViewEffect::RestoreCompose("Relatório em anexo".into()))
    );
    assert!(!page.messages().is_sending());
}

#[tokio::test]
async fn remote_messages_arrive_with_sender_fields() {
    let f = fixture();
    let mut page = loaded_page(&f).await;

    remote_insert(&f, f.reuniao, f.client_id, "Aprovado!").await;
    assert_eq!(page.drain_realtime().await, 1);

    let last = page.messages().entries().last().unwrap();
    assert_eq!(last.message().content, "Aprovado!");
    assert_eq!(last.message().sender.display_name(), "Dra. Marina");
    assert!(!last.is_admin_side(page.user()));
    assert!(page.take_effects().contains(&ViewEffect::ScrollToEnd));
}

#[tokio::test]
async fn failed_lookup_of_notified_message_drops_it() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    let before = page.messages().len();

    remote_insert(&f, f.reuniao, f.client_id, "perdida").await;
    f.backend.fail_next(Operation::Select, tables::CHAT_MESSAGES);
    assert_eq!(page.drain_realtime().await, 1);

    assert_eq!(page.messages().len(), before);
    assert!(page.messages().entries().iter().all(|e| !e.is_pending()));
    assert!(!contents(&page).contains(&"perdida".to_string()));

    // Later notifications still resolve normally.
    remote_insert(&f, f.reuniao, f.client_id, "seguinte").await;
    page.drain_realtime().await;
    assert_eq!(contents(&page).last().unwrap(), "seguinte");
}

#[tokio::test]
async fn notification_for_unknown_message_is_dropped() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    let before = page.messages().len();

    let delivered = f.backend.hub().publish(&ChangeEvent {
        table: tables::CHAT_MESSAGES.to_string(),
        kind: ChangeKind::Insert,
        record: record(json!({
            "id": Uuid::new_v4(),
            "channel_id": f.reuniao,
            "sender_id": f.client_id,
            "content": "fantasma",
        })),
    });
    assert_eq!(delivered, 1);
    assert_eq!(page.drain_realtime().await, 1);

    assert_eq!(page.messages().len(), before);
    assert!(page.take_effects().is_empty());
}

#[tokio::test]
async fn next_event_waits_for_a_notification() {
    let f = fixture();
    let mut page = loaded_page(&f).await;

    remote_insert(&f, f.reuniao, f.client_id, "Chegou?").await;
    assert!(page.next_event().await);
    assert_eq!(contents(&page).last().unwrap(), "Chegou?");
}

#[tokio::test]
async fn switching_channels_discards_previous_sequence() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    let aprovacao = page.selection().channel(f.aprovacao).unwrap().clone();

    page.select_channel(aprovacao).await;

    assert!(page.messages().is_empty());
    assert_eq!(page.messages().state(), LoadState::Empty);
    // One message subscription and one channel subscription.
    assert_eq!(f.backend.hub().subscriber_count(), 2);

    remote_insert(&f, f.reuniao, f.client_id, "no canal antigo").await;
    page.drain_realtime().await;
    assert!(page.messages().is_empty());

    remote_insert(&f, f.aprovacao, f.client_id, "no canal novo").await;
    page.drain_realtime().await;
    assert_eq!(contents(&page), ["no canal novo"]);
}

#[tokio::test]
async fn self_echo_of_unmatched_write_is_ignored_by_default() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    let before = page.messages().len();
    f.backend.fail_after_write(tables::CHAT_MESSAGES);

    assert!(page.send_message("talvez salvo").await.is_err());
    page.drain_realtime().await;

    assert_eq!(page.messages().len(), before);
    assert_eq!(page.messages().compose(), "talvez salvo");
}

#[tokio::test]
async fn self_echo_of_unmatched_write_can_be_recovered() {
    let f = fixture();
    let mut page = loaded_page_with(&f, config(SelfEchoPolicy::RecoverUnmatched)).await;
    let before = page.messages().len();
    f.backend.fail_after_write(tables::CHAT_MESSAGES);

    assert!(page.send_message("talvez salvo").await.is_err());
    page.drain_realtime().await;

    assert_eq!(page.messages().len(), before + 1);
    assert_eq!(contents(&page).last().unwrap(), "talvez salvo");

    // A successful send still never duplicates under this policy.
    page.send_message("outra").await.unwrap();
    page.drain_realtime().await;
    assert_eq!(page.messages().len(), before + 2);
}

#[tokio::test]
async fn channel_inserts_refresh_the_list() {
    let f = fixture();
    let mut page = loaded_page(&f).await;

    f.backend
        .insert(
            tables::CHAT_CHANNELS,
            record(json!({ "project_name": CLINIC, "name": "Financeiro", "is_default": false })),
            &[],
        )
        .await
        .unwrap();
    page.drain_realtime().await;

    let names: Vec<_> = page
        .selection()
        .channels()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["Reunião", "Aprovação", "Financeiro"]);
    assert_eq!(page.selection().active_channel_id(), Some(f.reuniao));
    assert_eq!(page.messages().len(), 3);
}

#[tokio::test]
async fn create_and_delete_channels() {
    let f = fixture();
    let mut page = loaded_page(&f).await;

    let created = page.create_channel("  Briefing ", None).await.unwrap();
    assert_eq!(created.name, "Briefing");
    assert!(!created.is_default);
    assert!(page.selection().channel(created.id).is_some());

    page.delete_channel(created.id).await.unwrap();
    assert!(page.selection().channel(created.id).is_none());
    assert_eq!(f.backend.rows(tables::CHAT_CHANNELS).len(), 5);

    assert!(matches!(
        page.delete_channel(f.reuniao).await,
        Err(ChatError::DefaultChannelLocked)
    ));
    assert!(matches!(
        page.create_channel("   ", None).await,
        Err(ChatError::BlankChannelName)
    ));
}

#[tokio::test]
async fn deleting_the_open_channel_falls_back_to_default() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    let aprovacao = page.selection().channel(f.aprovacao).unwrap().clone();
    page.select_channel(aprovacao).await;

    page.delete_channel(f.aprovacao).await.unwrap();

    assert_eq!(page.selection().active_channel_id(), Some(f.reuniao));
    assert_eq!(page.messages().len(), 3);
}

#[tokio::test]
async fn failed_channel_creation_raises_an_alert() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    f.backend.fail_next(Operation::Insert, tables::CHAT_CHANNELS);

    assert!(page.create_channel("Briefing", None).await.is_err());
    assert!(
        page.take_effects()
            .iter()
            .any(|e| matches!(e, ViewEffect::Alert(_)))
    );
    assert_eq!(page.selection().channels().len(), 2);
}

#[tokio::test]
async fn failed_channel_fetch_leaves_an_empty_pane() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    f.backend.fail_next(Operation::Select, tables::CHAT_CHANNELS);

    page.select_grouping(ProjectGrouping::new(STORE)).await;

    assert!(page.selection().channels().is_empty());
    assert!(page.selection().active_channel().is_none());
    assert_eq!(page.selection().channels_state(), LoadState::Empty);
    assert_eq!(page.messages().state(), LoadState::Empty);
}

#[tokio::test]
async fn grouping_without_channels_shows_empty_message_pane() {
    let f = fixture();
    let mut page = loaded_page(&f).await;
    assert_eq!(f.backend.hub().subscriber_count(), 2);

    page.select_grouping(ProjectGrouping::new("Estúdio Vazio")).await;

    assert!(page.selection().channels().is_empty());
    assert!(page.selection().active_channel().is_none());
    assert_eq!(page.selection().channels_state(), LoadState::Empty);
    assert!(page.messages().is_empty());
    assert_eq!(page.messages().state(), LoadState::Empty);
    assert!(!page.realtime().is_watching_messages());
    assert!(page.realtime().is_watching_channels());
    assert!(matches!(
        page.send_message("alguém aí?").await,
        Err(ChatError::Rejected(SendRejected::NoChannel))
    ));
}

#[tokio::test]
async fn failed_grouping_fetch_keeps_empty_initial_state() {
    let f = fixture();
    f.backend.fail_next(Operation::Select, tables::CLIENT_PROFILES);

    let mut page = MessagingPage::new(
        f.backend.clone(),
        f.admin.clone(),
        config(SelfEchoPolicy::Ignore),
    );
    page.load().await;

    assert!(page.selection().groupings().is_empty());
    assert!(page.selection().active_grouping().is_none());
    assert_eq!(page.messages().state(), LoadState::Unselected);
}

#[tokio::test]
async fn message_fetch_keeps_the_most_recent_page() {
    let f = fixture();
    let page = loaded_page_with(
        &f,
        ChatConfig {
            message_limit: 2,
            ..config(SelfEchoPolicy::Ignore)
        },
    )
    .await;

    assert_eq!(contents(&page), ["Bom dia, Marina.", "Podemos revisar a landing?"]);
}

#[tokio::test]
async fn messages_are_grouped_by_day() {
    let f = fixture();
    let page = loaded_page(&f).await;

    let days = page.messages().days();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].entries.len(), 2);
    assert_eq!(days[1].entries.len(), 1);
    assert_eq!(days, page.messages().days());
}

#[tokio::test]
async fn dropping_the_page_tears_down_subscriptions() {
    let f = fixture();
    let page = loaded_page(&f).await;
    assert_eq!(f.backend.hub().subscriber_count(), 2);

    drop(page);
    assert_eq!(f.backend.hub().subscriber_count(), 0);
}
