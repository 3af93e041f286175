#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use games::config::GameConfig;
use games::models::callback::{CallbackData, InlineKeyboard};
use games::models::chat_event::{ChatCommand, ChatEvent};
use games::models::game_session::{now_ts, GameKind, GameSession};
use games::models::player::{ChatId, MessageId, Player, PlayerId};
use games::repositories::catalog::{ClubCatalog, DuelPool};
use games::repositories::memory_repository::{
    InMemoryGameRecordRepository, InMemoryLeaderboardRepository,
};
use games::services::chat_transport::ChatTransport;
use games::services::errors::transport_errors::TransportError;
use games::services::game_context::GameContext;
use games::services::game_hub::GameHub;

pub const CHAT: ChatId = -1001;

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message {
        message_id: MessageId,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    Photo {
        message_id: MessageId,
        caption: String,
    },
    Edit {
        message_id: MessageId,
        text: String,
    },
    Cleared {
        message_id: MessageId,
    },
    Reply {
        player_id: PlayerId,
        text: String,
    },
}

/// Chat transport double that keeps everything the engines send.
pub struct TestTransport {
    players: Mutex<HashMap<PlayerId, Player>>,
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
}

impl TestTransport {
    pub fn new(players: &[Player]) -> Self {
        TestTransport {
            players: Mutex::new(players.iter().map(|p| (p.id, p.clone())).collect()),
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn push(&self, sent: Sent) {
        self.sent.lock().expect("transport lock poisoned").push(sent);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("transport lock poisoned").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Message { text, .. } | Sent::Edit { text, .. } => Some(text),
                Sent::Photo { caption, .. } => Some(caption),
                _ => None,
            })
            .collect()
    }

    pub fn replies_to(&self, player_id: PlayerId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reply { player_id: p, text } if p == player_id => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Latest message carrying a button with the given payload shape.
    pub fn last_message_with<F>(&self, matches: F) -> Option<(MessageId, InlineKeyboard)>
    where
        F: Fn(&CallbackData) -> bool,
    {
        self.sent().into_iter().rev().find_map(|s| match s {
            Sent::Message {
                message_id,
                keyboard: Some(keyboard),
                ..
            } if keyboard.buttons().any(|b| matches(&b.data)) => Some((message_id, keyboard)),
            _ => None,
        })
    }
}

#[async_trait]
impl ChatTransport for TestTransport {
    async fn send_message(
        &self,
        _chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageId, TransportError> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.push(Sent::Message {
            message_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(message_id)
    }

    async fn send_photo(
        &self,
        _chat_id: ChatId,
        _photo: &str,
        caption: &str,
    ) -> Result<MessageId, TransportError> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.push(Sent::Photo {
            message_id,
            caption: caption.to_string(),
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        _chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), TransportError> {
        self.push(Sent::Edit {
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn clear_keyboard(
        &self,
        _chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        self.push(Sent::Cleared { message_id });
        Ok(())
    }

    async fn reply_to_actor(
        &self,
        _chat_id: ChatId,
        player_id: PlayerId,
        text: &str,
    ) -> Result<(), TransportError> {
        self.push(Sent::Reply {
            player_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn get_player(&self, player_id: PlayerId) -> Result<Player, TransportError> {
        self.players
            .lock()
            .expect("transport lock poisoned")
            .get(&player_id)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(format!("player {}", player_id)))
    }
}

pub struct TestBot {
    pub hub: GameHub,
    pub games: Arc<InMemoryGameRecordRepository>,
    pub leaderboard: Arc<InMemoryLeaderboardRepository>,
    pub transport: Arc<TestTransport>,
    pub ann: Player,
    pub bob: Player,
}

pub fn ann() -> Player {
    Player::new(1, "Ann")
}

pub fn bob() -> Player {
    Player::new(2, "Bob")
}

/// Six clubs that all share "kane", each with one member of its own.
pub fn club_catalog() -> ClubCatalog {
    let clubs = [
        ("real", "modric"),
        ("bayern", "kimmich"),
        ("spurs", "son"),
        ("city", "foden"),
        ("inter", "lautaro"),
        ("psg", "hakimi"),
    ];
    ClubCatalog::from_members(
        clubs
            .into_iter()
            .map(|(club, own)| (club.to_string(), vec!["kane".to_string(), own.to_string()]))
            .collect(),
    )
}

pub fn duel_pool() -> DuelPool {
    let json = r#"{
        "easy": [
            {"canonical_name": "messi", "aliases": ["лео месси"]},
            {"canonical_name": "ronaldo", "aliases": ["cr7"]}
        ],
        "hard": [
            {"canonical_name": "modric"},
            {"canonical_name": "kroos"},
            {"canonical_name": "lewandowski", "aliases": ["lewy"]}
        ]
    }"#;
    DuelPool::from_json_str(json).expect("valid duel pool")
}

pub fn bot_with(games: Arc<InMemoryGameRecordRepository>) -> TestBot {
    let ann = ann();
    let bob = bob();
    let leaderboard = Arc::new(InMemoryLeaderboardRepository::new());
    let transport = Arc::new(TestTransport::new(&[ann.clone(), bob.clone()]));
    let ctx = Arc::new(GameContext::new(
        games.clone(),
        leaderboard.clone(),
        transport.clone(),
        GameConfig::default(),
    ));
    TestBot {
        hub: GameHub::new(ctx, Arc::new(club_catalog()), Arc::new(duel_pool())),
        games,
        leaderboard,
        transport,
        ann,
        bob,
    }
}

pub fn bot() -> TestBot {
    bot_with(Arc::new(InMemoryGameRecordRepository::new()))
}

pub fn command(sender: &Player, name: &str, reply_to: Option<&Player>) -> ChatEvent {
    ChatEvent::Command {
        chat_id: CHAT,
        is_group: true,
        sender: sender.clone(),
        command: ChatCommand::parse(name),
        reply_to: reply_to.cloned(),
    }
}

pub fn press(sender: &Player, message_id: MessageId, data: CallbackData) -> ChatEvent {
    ChatEvent::Callback {
        chat_id: CHAT,
        message_id,
        sender: sender.clone(),
        data: data.to_string(),
    }
}

pub fn say(sender: &Player, text: &str) -> ChatEvent {
    say_at(sender, text, now_ts())
}

pub fn say_at(sender: &Player, text: &str, sent_at: i64) -> ChatEvent {
    ChatEvent::Text {
        chat_id: CHAT,
        sender: sender.clone(),
        text: text.to_string(),
        sent_at,
    }
}

pub async fn wait(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

pub async fn session(bot: &TestBot, kind: GameKind) -> Option<GameSession> {
    bot.hub.context().registry.snapshot(CHAT, kind).await
}

/// Message id of the Club Connect board currently in play.
pub fn board_message(bot: &TestBot) -> MessageId {
    bot.transport
        .last_message_with(|data| matches!(data, CallbackData::Cell(_)))
        .map(|(message_id, _)| message_id)
        .expect("a board was posted")
}

/// Proposes a game from Ann to Bob and has Bob accept it.
pub async fn start_game(bot: &TestBot, kind: GameKind) -> GameSession {
    let name = match kind {
        GameKind::ClubConnect => "/ttt",
        GameKind::Duel => "/duel",
    };
    bot.hub.handle(command(&bot.ann, name, Some(&bot.bob))).await;
    let (invite, _) = bot
        .transport
        .last_message_with(|data| matches!(data, CallbackData::Accept(_)))
        .expect("invite was sent");
    bot.hub
        .handle(press(&bot.bob, invite, CallbackData::Accept(kind)))
        .await;
    session(bot, kind).await.expect("game started")
}
