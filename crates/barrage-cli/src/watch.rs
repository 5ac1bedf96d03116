//! `barrage watch`: stream a room's comments to the terminal

use anyhow::{bail, Result};
use barrage_client::{ChannelListener, ClientNotification, LiveDanmakuClient, StaticResolver};
use barrage_core::{Comment, CommentMode, ConnectionState, Event};
use barrage_transport::WebSocketTransport;
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::WatchConfig;

/// Output options for the watch loop
#[derive(Debug, Clone, Copy)]
pub struct WatchOutput {
    pub json: bool,
    pub popularity: bool,
}

pub async fn run_watch(
    config: WatchConfig,
    output: WatchOutput,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    if config.room_id == 0 {
        bail!("No room id given (use --room or a config file)");
    }

    println!(
        "{} Watching room {} via {} host(s)",
        "BARRAGE".cyan().bold(),
        config.room_id,
        config.hosts.len()
    );

    let (listener, mut notes) = ChannelListener::new();
    let client = LiveDanmakuClient::<WebSocketTransport>::builder(config.room_id)
        .config(config.client.clone())
        .build_websocket(StaticResolver::new(config.connection_info()), listener)?;
    client.start();

    let result = loop {
        tokio::select! {
            note = notes.recv() => match note {
                Some(ClientNotification::State(state)) => {
                    print_state(&state);
                    if let ConnectionState::Error { message } = state {
                        break Err(anyhow::anyhow!(message));
                    }
                }
                Some(ClientNotification::Event(event)) => print_event(&event, output)?,
                None => break Ok(()),
            },
            _ = shutdown_rx.recv() => {
                info!("Shutting down watch");
                break Ok(());
            }
        }
    };

    client.stop();
    println!("{}", "Watch stopped".yellow());
    result
}

fn print_state(state: &ConnectionState) {
    let label = match state {
        ConnectionState::Connected { .. } => "STATE".green().bold(),
        ConnectionState::Error { .. } => "STATE".red().bold(),
        ConnectionState::Disconnected { .. } | ConnectionState::Reconnecting { .. } => {
            "STATE".yellow().bold()
        }
        ConnectionState::Connecting => "STATE".cyan().bold(),
    };
    println!("{} {}", label, state);
}

fn print_event(event: &Event, output: WatchOutput) -> Result<()> {
    if let Some(line) = format_event(event, output)? {
        println!("{}", line);
    }
    Ok(())
}

/// Render one event, or `None` when the output options hide it
fn format_event(event: &Event, output: WatchOutput) -> Result<Option<String>> {
    if matches!(event, Event::PopularityUpdate { .. }) && !output.popularity {
        return Ok(None);
    }
    if output.json {
        return Ok(Some(serde_json::to_string(event)?));
    }

    let line = match event {
        Event::Comment(comment) => format_comment(comment),
        Event::PopularityUpdate { value } => format!("{} {}", "HOT".magenta(), value),
    };
    Ok(Some(line))
}

fn format_comment(comment: &Comment) -> String {
    let mode = match comment.mode {
        CommentMode::Scroll => "",
        CommentMode::Top => " [top]",
        CommentMode::Bottom => " [bottom]",
    };
    let [_, r, g, b] = comment.color.to_be_bytes();
    format!(
        "{}{} {}",
        comment.user_name.truecolor(r, g, b).bold(),
        mode.dimmed(),
        comment.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment() -> Event {
        Event::Comment(Comment {
            text: "hello".to_string(),
            mode: CommentMode::Top,
            color: 0x00ff_ffff,
            timestamp_ms: 1_700_000_000_000,
            recommend_score: 5,
            user_id: 42,
            user_name: "viewer".to_string(),
        })
    }

    const JSON: WatchOutput = WatchOutput {
        json: true,
        popularity: false,
    };

    #[test]
    fn test_json_hides_popularity_without_flag() {
        let event = Event::PopularityUpdate { value: 1234 };
        assert_eq!(format_event(&event, JSON).unwrap(), None);

        let shown = WatchOutput {
            popularity: true,
            ..JSON
        };
        let line = format_event(&event, shown).unwrap().unwrap();
        assert_eq!(line, r#"{"type":"popularity_update","value":1234}"#);
    }

    #[test]
    fn test_plain_hides_popularity_without_flag() {
        let plain = WatchOutput {
            json: false,
            popularity: false,
        };
        let event = Event::PopularityUpdate { value: 7 };
        assert_eq!(format_event(&event, plain).unwrap(), None);

        let shown = WatchOutput {
            popularity: true,
            ..plain
        };
        assert!(format_event(&event, shown).unwrap().unwrap().ends_with(" 7"));
    }

    #[test]
    fn test_comments_always_printed() {
        let line = format_event(&comment(), JSON).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "comment");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["user_id"], 42);

        let plain = WatchOutput {
            json: false,
            popularity: false,
        };
        let line = format_event(&comment(), plain).unwrap().unwrap();
        assert!(line.contains("viewer"));
        assert!(line.ends_with(" hello"));
    }
}
