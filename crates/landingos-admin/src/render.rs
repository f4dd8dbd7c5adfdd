use chrono::FixedOffset;

use landingos_chat::{LoadState, MessageEntry, MessagingPage, ViewEffect};

pub fn page(page: &MessagingPage, offset: FixedOffset) {
    let selection = page.selection();
    let active = selection.active_grouping();

    println!("Projects:");
    if selection.groupings().is_empty() {
        println!("  (none)");
    }
    for grouping in selection.groupings() {
        let marker = if Some(grouping) == active { '>' } else { ' ' };
        println!(" {} {}", marker, grouping);
    }

    println!();
    println!("Channels:");
    match selection.channels_state() {
        LoadState::Unselected => println!("  (no project selected)"),
        LoadState::Loading => println!("  loading..."),
        LoadState::Empty => println!("  (no channels)"),
        LoadState::Ready => {
            let open = selection.active_channel_id();
            for channel in selection.channels() {
                let marker = if Some(channel.id) == open { '>' } else { ' ' };
                let pin = if channel.is_default { " [pinned]" } else { "" };
                println!(" {} #{}{}", marker, channel.name, pin);
            }
        }
    }

    println!();
    messages(page, offset);
}

pub fn messages(page: &MessagingPage, offset: FixedOffset) {
    let list = page.messages();
    match list.state() {
        LoadState::Unselected => println!("Select a channel."),
        LoadState::Loading => println!("Loading messages..."),
        LoadState::Empty if list.channel_id().is_none() => println!("No channel to show."),
        LoadState::Empty => println!("No messages yet."),
        LoadState::Ready => {
            for bucket in list.days() {
                println!("--- {} ---", bucket.day.format("%d/%m/%Y"));
                for entry in bucket.entries {
                    println!("{}", line(page, entry, offset));
                }
            }
        }
    }
}

pub fn line(page: &MessagingPage, entry: &MessageEntry, offset: FixedOffset) -> String {
    let message = entry.message();
    let time = message.created_at.with_timezone(&offset).format("%H:%M");
    let status = if entry.is_pending() { " (sending)" } else { "" };

    if entry.is_admin_side(page.user()) {
        format!("{:>48} [{}{}]", message.content, time, status)
    } else {
        format!(
            "[{}] {}: {}",
            time,
            message.sender.display_name(),
            message.content
        )
    }
}

pub fn effects(effects: Vec<ViewEffect>) {
    for effect in effects {
        match effect {
            ViewEffect::ScrollToEnd => {}
            ViewEffect::RestoreCompose(text) => println!("! not sent, draft kept: {}", text),
            ViewEffect::Alert(text) => println!("! {}", text),
        }
    }
}
