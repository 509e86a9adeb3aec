//! One WebSocket race session: connect, join, and pump frames until the
//! race ends or the link breaks.

use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use keyrace_server::infrastructure::dto::websocket::{ClientMessage, ServerMessage};
use keyrace_shared::time::{Clock, SystemClock};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    error::ClientError,
    formatter::RaceFormatter,
    reconnect::ReconnectController,
    runner::ClientConfig,
    typing::{Autotyper, TypedProgress, TypingState},
    ui::{InputEvent, redisplay_prompt},
};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);
const AUTOTYPE_TICK: Duration = Duration::from_millis(100);

/// How a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Final standings received
    Finished,
    /// The player quit
    Quit,
}

/// `{server}/ws/races/{race_id}?participant_id=..&display_name=..`
pub fn race_url(config: &ClientConfig) -> Result<Url, ClientError> {
    let mut url =
        Url::parse(&config.server_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(config.server_url.clone()))?
        .pop_if_empty()
        .extend(["ws", "races", config.race_id.as_str()]);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("participant_id", &config.participant_id);
        if let Some(name) = &config.display_name {
            query.append_pair("display_name", name);
        }
    }
    Ok(url)
}

async fn send_frame<S>(write: &mut S, message: &ClientMessage) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let json =
        serde_json::to_string(message).map_err(|e| ClientError::WebSocket(e.to_string()))?;
    write.send(Message::text(json)).await?;
    Ok(())
}

fn progress_frame(progress: TypedProgress) -> ClientMessage {
    ClientMessage::Progress {
        chars_typed: progress.chars_typed,
        errors: progress.errors,
    }
}

/// Run one connection.
///
/// `typing` outlives the session so a reconnect continues from the same
/// cursor until the server's snapshot overrides it.
pub async fn run_race_session(
    config: &ClientConfig,
    typing: &mut TypingState,
    input: &mut mpsc::UnboundedReceiver<InputEvent>,
    controller: &mut ReconnectController,
) -> Result<SessionEnd, ClientError> {
    let url = race_url(config)?;
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    tracing::info!("Connected to {}", url);
    typing.begin_connection();

    let (mut write, mut read) = ws_stream.split();
    send_frame(&mut write, &ClientMessage::Join).await?;

    let interactive = config.autotype_wpm.is_none();
    let mut bot = config.autotype_wpm.map(Autotyper::new);
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut bot_tick = tokio::time::interval(AUTOTYPE_TICK);

    loop {
        tokio::select! {
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(ClientError::WebSocket("connection closed by server".to_string()));
                    }
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(_)) => continue,
                };
                let message: ServerMessage = match serde_json::from_str(text.as_str()) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!("Ignoring unreadable frame: {}", e);
                        continue;
                    }
                };

                match message {
                    ServerMessage::State(state) => {
                        controller.on_connected();
                        typing.sync(&state);
                        print!("{}", RaceFormatter::format_state(&state, SystemClock.now_millis()));
                    }
                    ServerMessage::CountdownTick { remaining_secs } => {
                        print!("{}", RaceFormatter::format_countdown(remaining_secs));
                    }
                    ServerMessage::ProgressBroadcast(progress) => {
                        print!("{}", RaceFormatter::format_progress(&progress));
                    }
                    ServerMessage::Finished(result) => {
                        print!("{}", RaceFormatter::format_standings(&result, &config.participant_id));
                        return Ok(SessionEnd::Finished);
                    }
                    ServerMessage::Error { kind, message } => {
                        print!("{}", RaceFormatter::format_error(kind, &message));
                        return Err(ClientError::Server { kind, message });
                    }
                }
                if interactive {
                    redisplay_prompt(&config.participant_id);
                }
            }
            _ = heartbeat.tick() => {
                send_frame(&mut write, &ClientMessage::Heartbeat).await?;
            }
            event = input.recv() => match event {
                Some(InputEvent::Line(line)) => {
                    if let Some(progress) = typing.type_line(&line) {
                        send_frame(&mut write, &progress_frame(progress)).await?;
                        if !typing.is_complete() {
                            println!("Next: {}", typing.remaining());
                        }
                    } else if !typing.is_racing() {
                        println!("The race has not started yet");
                    }
                    redisplay_prompt(&config.participant_id);
                }
                Some(InputEvent::Start) => {
                    send_frame(&mut write, &ClientMessage::Start).await?;
                }
                Some(InputEvent::Quit) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Quit);
                }
            },
            _ = bot_tick.tick(), if bot.is_some() && typing.is_racing() => {
                if let Some(bot) = bot.as_mut()
                    && let Some(progress) = typing.advance(bot.tick(AUTOTYPE_TICK))
                {
                    send_frame(&mut write, &progress_frame(progress)).await?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::BackoffPolicy;

    fn config(display_name: Option<&str>) -> ClientConfig {
        ClientConfig {
            server_url: "ws://127.0.0.1:8080".to_string(),
            race_id: "race-1".to_string(),
            participant_id: "alice".to_string(),
            display_name: display_name.map(str::to_string),
            autotype_wpm: None,
            backoff: BackoffPolicy::default(),
        }
    }

    #[test]
    fn test_race_url_includes_identity() {
        // テスト項目: 接続 URL にレース ID と参加者情報がエンコードされて含まれる
        // given (前提条件):
        let config = config(Some("Alice Smith"));

        // when (操作):
        let url = race_url(&config).unwrap();

        // then (期待する結果):
        assert_eq!(
            url.as_str(),
            "ws://127.0.0.1:8080/ws/races/race-1?participant_id=alice&display_name=Alice+Smith"
        );
    }

    #[test]
    fn test_race_url_without_display_name() {
        // テスト項目: 表示名が未指定の場合はクエリに含まれない
        // given (前提条件):
        let config = config(None);

        // when (操作):
        let url = race_url(&config).unwrap();

        // then (期待する結果):
        assert_eq!(
            url.as_str(),
            "ws://127.0.0.1:8080/ws/races/race-1?participant_id=alice"
        );
    }

    #[test]
    fn test_race_url_rejects_garbage() {
        // テスト項目: 解釈できないサーバー URL はエラーになる
        // given (前提条件):
        let mut config = config(None);
        config.server_url = "not a url".to_string();

        // when (操作):
        let result = race_url(&config);

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }
}
