use std::env;

use anyhow::{Context, Result, anyhow, bail};
use chrono::FixedOffset;
use uuid::Uuid;

use landingos_backend::RestConfig;
use landingos_chat::{ChatConfig, SelfEchoPolicy};
use landingos_types::models::CurrentUser;

pub enum BackendSource {
    /// Hosted backend reached over REST, acting as `user`.
    Rest { rest: RestConfig, user: CurrentUser },
    /// Seeded in-process backend.
    Demo,
}

pub struct Config {
    pub backend: BackendSource,
    pub chat: ChatConfig,
    /// Grouping to open instead of the first one.
    pub grouping: Option<String>,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_limit(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => bail!("LANDINGOS_MESSAGE_LIMIT must be a positive integer, got '{}'", raw),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend = match var("LANDINGOS_BACKEND_URL") {
            Some(base_url) => {
                let api_key = var("LANDINGOS_API_KEY").ok_or_else(|| {
                    anyhow!("LANDINGOS_API_KEY is required with LANDINGOS_BACKEND_URL")
                })?;
                let user_id = var("LANDINGOS_USER_ID")
                    .ok_or_else(|| {
                        anyhow!("LANDINGOS_USER_ID is required with LANDINGOS_BACKEND_URL")
                    })?
                    .parse::<Uuid>()
                    .context("LANDINGOS_USER_ID is not a UUID")?;

                BackendSource::Rest {
                    rest: RestConfig {
                        base_url,
                        api_key,
                        access_token: var("LANDINGOS_ACCESS_TOKEN"),
                    },
                    user: CurrentUser {
                        id: user_id,
                        full_name: var("LANDINGOS_USER_NAME").unwrap_or_else(|| "Admin".into()),
                    },
                }
            }
            None => BackendSource::Demo,
        };

        let mut chat = ChatConfig::default();
        if let Some(limit) = var("LANDINGOS_MESSAGE_LIMIT") {
            chat.message_limit = parse_limit(&limit)?;
        }
        if let Some(policy) = var("LANDINGOS_SELF_ECHO") {
            chat.self_echo = policy.parse::<SelfEchoPolicy>().map_err(|e| anyhow!(e))?;
        }
        if let Some(minutes) = var("LANDINGOS_UTC_OFFSET_MINUTES") {
            let minutes: i32 = minutes
                .parse()
                .context("LANDINGOS_UTC_OFFSET_MINUTES must be an integer")?;
            chat.local_offset = FixedOffset::east_opt(minutes * 60)
                .ok_or_else(|| anyhow!("UTC offset of {} minutes is out of range", minutes))?;
        }

        Ok(Self {
            backend,
            chat,
            grouping: var("LANDINGOS_GROUPING"),
        })
    }
}
