//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 参加者ごとに現在のセッションの `PusherChannel` を保持する
//! - 参加者へのメッセージ送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された送信チャンネルを受け取り、Room アクターから
//! 届いたフレームを流すだけです。チャンネルが drop されると、UI 層の
//! 送信タスクがソケットを閉じます。

use std::collections::HashMap;

use crate::domain::{MessagePushError, MessagePusher, ParticipantId, PusherChannel, SessionId};

/// WebSocket を使った MessagePusher 実装
///
/// Key: participant id
/// Value: (現在のセッション ID, そのセッションの送信チャンネル)
#[derive(Debug, Default)]
pub struct WebSocketMessagePusher {
    clients: HashMap<ParticipantId, (SessionId, PusherChannel)>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessagePusher for WebSocketMessagePusher {
    fn register_client(
        &mut self,
        participant_id: ParticipantId,
        session: SessionId,
        channel: PusherChannel,
    ) -> Option<PusherChannel> {
        tracing::debug!(
            "Participant '{}' registered to MessagePusher (session {})",
            participant_id,
            session
        );
        self.clients
            .insert(participant_id, (session, channel))
            .map(|(_, previous)| previous)
    }

    fn unregister_client(&mut self, participant_id: &ParticipantId, session: SessionId) -> bool {
        match self.clients.get(participant_id) {
            Some((current, _)) if *current == session => {
                self.clients.remove(participant_id);
                tracing::debug!(
                    "Participant '{}' unregistered from MessagePusher",
                    participant_id
                );
                true
            }
            _ => false,
        }
    }

    fn push_to(
        &self,
        participant_id: &ParticipantId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let (_, sender) = self
            .clients
            .get(participant_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(participant_id.to_string()))?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }

    fn broadcast(&self, targets: &[ParticipantId], content: &str) -> Result<(), MessagePushError> {
        for target in targets {
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = self.push_to(target, content) {
                tracing::debug!("Skipping '{}' during broadcast: {}", target, e);
            }
        }
        Ok(())
    }

    fn connected(&self) -> Vec<ParticipantId> {
        self.clients.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 特定の参加者にメッセージを送信できる
        // given (前提条件):
        let mut pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        pusher.register_client(pid("alice"), SessionId::generate(), tx);

        // when (操作):
        let result = pusher.push_to(&pid("alice"), "Hello");

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some("Hello".to_string()));
    }

    #[test]
    fn test_push_to_client_not_found() {
        // テスト項目: 接続していない参加者への送信はエラーを返す
        let pusher = WebSocketMessagePusher::new();
        let result = pusher.push_to(&pid("nobody"), "Hello");
        assert!(matches!(result, Err(MessagePushError::ClientNotFound(_))));
    }

    #[tokio::test]
    async fn test_broadcast_skips_missing_targets() {
        // テスト項目: ブロードキャスト時、一部の参加者が未接続でも成功する
        // given (前提条件):
        let mut pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        pusher.register_client(pid("alice"), SessionId::generate(), tx);

        // when (操作):
        let result = pusher.broadcast(&[pid("alice"), pid("ghost")], "tick");

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some("tick".to_string()));
    }

    #[test]
    fn test_reregister_returns_replaced_channel() {
        // テスト項目: 再接続時は古いチャンネルが返され、古いセッションの登録解除は無視される
        // given (前提条件):
        let mut pusher = WebSocketMessagePusher::new();
        let old_session = SessionId::generate();
        let new_session = SessionId::generate();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, _new_rx) = mpsc::unbounded_channel();
        pusher.register_client(pid("alice"), old_session, old_tx);

        // when (操作):
        let replaced = pusher.register_client(pid("alice"), new_session, new_tx);
        let stale_removed = pusher.unregister_client(&pid("alice"), old_session);

        // then (期待する結果):
        assert!(replaced.is_some());
        assert!(!stale_removed);
        assert_eq!(pusher.connected(), vec![pid("alice")]);
        assert!(pusher.unregister_client(&pid("alice"), new_session));
        assert!(pusher.connected().is_empty());
    }
}
