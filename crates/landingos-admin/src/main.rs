mod config;
mod render;
mod seed;

use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::{info, warn};

use landingos_backend::{Backend, MemoryBackend, RestBackend};
use landingos_chat::MessagingPage;
use landingos_types::models::ProjectGrouping;

use config::{BackendSource, Config};

enum Command {
    Show,
    Send(String),
    Open(String),
    Create(String),
    Delete(String),
    Follow,
}

fn parse_command(mut args: impl Iterator<Item = String>) -> anyhow::Result<Command> {
    let Some(verb) = args.next() else {
        return Ok(Command::Show);
    };
    let rest = args.collect::<Vec<_>>().join(" ");

    let command = match verb.as_str() {
        "show" => Command::Show,
        "follow" => Command::Follow,
        "send" => Command::Send(rest),
        "open" => Command::Open(rest),
        "create" => Command::Create(rest),
        "delete" => Command::Delete(rest),
        other => bail!(
            "unknown command '{}' (expected show, send, open, create, delete or follow)",
            other
        ),
    };
    Ok(command)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "landingos=debug".into()),
        )
        .init();

    let command = parse_command(std::env::args().skip(1))?;
    let config = Config::from_env()?;
    let offset = config.chat.local_offset;

    let mut demo = None;
    let (backend, user): (Arc<dyn Backend>, _) = match config.backend {
        BackendSource::Rest { rest, user } => {
            info!("Using backend at {}", rest.base_url);
            let backend = RestBackend::new(rest).context("failed to build REST client")?;
            (Arc::new(backend) as Arc<dyn Backend>, user)
        }
        BackendSource::Demo => {
            info!("No LANDINGOS_BACKEND_URL set, running against demo data");
            let backend = Arc::new(MemoryBackend::new());
            let data = seed::populate(&backend);
            let user = data.admin;
            demo = Some((backend.clone(), data.client_id));
            (backend as Arc<dyn Backend>, user)
        }
    };

    let mut page = MessagingPage::new(backend, user, config.chat);
    page.load().await;

    if let Some(label) = config.grouping {
        let grouping = ProjectGrouping::new(label);
        if page.selection().groupings().contains(&grouping) {
            page.select_grouping(grouping).await;
        } else {
            warn!("Project grouping '{}' not found", grouping);
        }
    }

    match command {
        Command::Show => {}
        Command::Send(text) => {
            if let Err(e) = page.send_message(&text).await {
                warn!("Message not sent: {}", e);
            }
        }
        Command::Open(name) => {
            let channel = page
                .selection()
                .channels()
                .iter()
                .find(|c| c.name == name)
                .cloned()
                .with_context(|| format!("no channel named '{}'", name))?;
            page.select_channel(channel).await;
        }
        Command::Create(name) => {
            if let Ok(channel) = page.create_channel(&name, None).await {
                println!("Created #{}", channel.name);
            }
        }
        Command::Delete(name) => {
            let id = page
                .selection()
                .channels()
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.id)
                .with_context(|| format!("no channel named '{}'", name))?;
            if let Err(e) = page.delete_channel(id).await {
                warn!("Channel not deleted: {}", e);
            }
        }
        Command::Follow => {
            render::page(&page, offset);
            render::effects(page.take_effects());

            let chatter = match (&demo, page.selection().active_channel_id()) {
                (Some((backend, client_id)), Some(channel_id)) => {
                    Some(seed::spawn_chatter(backend.clone(), channel_id, *client_id))
                }
                _ => None,
            };

            println!();
            println!("Following, press Ctrl+C to stop.");
            let mut shown = page.messages().len();
            loop {
                tokio::select! {
                    alive = page.next_event() => {
                        if !alive {
                            info!("No live updates available");
                            break;
                        }
                        for entry in page.messages().entries().iter().skip(shown) {
                            println!("{}", render::line(&page, entry, offset));
                        }
                        shown = page.messages().len();
                        render::effects(page.take_effects());
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }

            if let Some(chatter) = chatter {
                chatter.abort();
            }
            return Ok(());
        }
    }

    render::page(&page, offset);
    render::effects(page.take_effects());
    Ok(())
}
