mod common;

use common::*;
use games::models::callback::CallbackData;
use games::models::club_connect::CellRef;
use games::models::game_session::{GameKind, GameStatus, Seat};
use games::models::player::Player;
use games::repositories::game_repository::GameRecordRepository;
use games::repositories::leaderboard_repository::LeaderboardRepository;

fn cell(row: usize, col: usize) -> CellRef {
    CellRef::new(row, col).expect("cell on the board")
}

async fn pick(bot: &TestBot, player: &Player, row: usize, col: usize) {
    let board = board_message(bot);
    bot.hub
        .handle(press(player, board, CallbackData::Cell(cell(row, col))))
        .await;
}

async fn claim(bot: &TestBot, player: &Player, row: usize, col: usize) {
    pick(bot, player, row, col).await;
    bot.hub.handle(say(player, "Kane")).await;
}

#[tokio::test(start_paused = true)]
async fn test_game_played_to_a_win() {
    let bot = bot();
    let started = start_game(&bot, GameKind::ClubConnect).await;

    claim(&bot, &bot.ann, 0, 0).await;
    claim(&bot, &bot.bob, 1, 0).await;
    claim(&bot, &bot.ann, 0, 1).await;
    claim(&bot, &bot.bob, 1, 1).await;
    claim(&bot, &bot.ann, 0, 2).await;

    assert!(session(&bot, GameKind::ClubConnect).await.is_none());
    assert!(!bot.hub.club_connect().timer_armed(CHAT));
    let stored = bot.games.get_game(&started.id).await.unwrap();
    assert_eq!(stored.status, GameStatus::Finished);
    assert_eq!(stored.winner_id, Some(bot.ann.id));
    assert!(bot.transport.texts().iter().any(|t| t.contains("Ann wins!")));

    let ann = bot
        .leaderboard
        .stats(GameKind::ClubConnect, bot.ann.id)
        .await
        .unwrap()
        .unwrap();
    let bob = bot
        .leaderboard
        .stats(GameKind::ClubConnect, bot.bob.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((ann.wins, ann.losses), (1, 0));
    assert_eq!((bob.wins, bob.losses), (0, 1));

    bot.hub.handle(command(&bot.ann, "/ttt_history", None)).await;
    let history = bot.transport.texts().last().cloned().unwrap();
    assert!(history.contains("Ann vs Bob"));
}

#[tokio::test(start_paused = true)]
async fn test_moves_out_of_turn_are_refused() {
    let bot = bot();
    start_game(&bot, GameKind::ClubConnect).await;

    pick(&bot, &bot.bob, 1, 1).await;
    claim(&bot, &bot.ann, 1, 1).await;
    pick(&bot, &bot.bob, 1, 1).await;

    let replies = bot.transport.replies_to(bot.bob.id);
    assert_eq!(
        replies,
        vec!["It is not your turn.".to_string(), "That cell is already taken.".to_string()]
    );
    let live = session(&bot, GameKind::ClubConnect).await.unwrap();
    let state = live.club_connect().unwrap();
    assert_eq!(state.board.get(cell(1, 1)), Some(Seat::First));
    assert_eq!(state.turn, Seat::Second);
}

#[tokio::test(start_paused = true)]
async fn test_idle_turn_passes_after_timeout() {
    let bot = bot();
    start_game(&bot, GameKind::ClubConnect).await;

    wait(20).await;
    pick(&bot, &bot.ann, 2, 2).await;
    // Selecting a cell restarts the clock
    wait(20).await;
    assert_eq!(
        session(&bot, GameKind::ClubConnect).await.unwrap().club_connect().unwrap().turn,
        Seat::First
    );

    wait(11).await;
    let live = session(&bot, GameKind::ClubConnect).await.unwrap();
    let state = live.club_connect().unwrap();
    assert_eq!(state.turn, Seat::Second);
    assert_eq!(state.selected_cell, None);
    assert!(bot
        .transport
        .texts()
        .iter()
        .any(|t| t.starts_with("Ann ran out of time. Turn: Bob.")));
    assert!(bot.hub.club_connect().timer_armed(CHAT));
}

#[tokio::test(start_paused = true)]
async fn test_second_pick_in_a_turn_is_refused() {
    let bot = bot();
    start_game(&bot, GameKind::ClubConnect).await;

    wait(5).await;
    pick(&bot, &bot.ann, 2, 2).await;
    for _ in 0..3 {
        wait(9).await;
        pick(&bot, &bot.ann, 1, 1).await;
    }
    let live = session(&bot, GameKind::ClubConnect).await.unwrap();
    assert_eq!(live.club_connect().unwrap().selected_cell, Some(cell(2, 2)));

    wait(4).await;
    let live = session(&bot, GameKind::ClubConnect).await.unwrap();
    assert_eq!(live.club_connect().unwrap().turn, Seat::Second);
    assert_eq!(
        bot.transport.replies_to(bot.ann.id),
        vec!["You already picked a cell, name a player now.".to_string(); 3]
    );
}

#[tokio::test(start_paused = true)]
async fn test_presses_on_replaced_boards_are_ignored() {
    let bot = bot();
    start_game(&bot, GameKind::ClubConnect).await;
    let opening_board = board_message(&bot);

    claim(&bot, &bot.ann, 0, 0).await;
    assert_ne!(board_message(&bot), opening_board);
    bot.hub
        .handle(press(&bot.bob, opening_board, CallbackData::Cell(cell(2, 2))))
        .await;
    let live = session(&bot, GameKind::ClubConnect).await.unwrap();
    assert_eq!(live.club_connect().unwrap().selected_cell, None);

    // A board left over from an earlier game in the chat is no better
    bot.hub.handle(command(&bot.bob, "/surrender", None)).await;
    let finished_board = board_message(&bot);
    start_game(&bot, GameKind::ClubConnect).await;
    bot.hub
        .handle(press(&bot.ann, finished_board, CallbackData::Cell(cell(2, 2))))
        .await;
    let live = session(&bot, GameKind::ClubConnect).await.unwrap();
    assert_eq!(live.club_connect().unwrap().selected_cell, None);

    let stale = "That board is no longer in play.".to_string();
    assert_eq!(bot.transport.replies_to(bot.bob.id), vec![stale.clone()]);
    assert_eq!(bot.transport.replies_to(bot.ann.id), vec![stale]);
}

#[tokio::test(start_paused = true)]
async fn test_game_saved_once_the_store_recovers() {
    let bot = bot();
    bot.games.set_fail_writes(true);
    let started = start_game(&bot, GameKind::ClubConnect).await;
    assert!(bot
        .transport
        .texts()
        .contains(&"Could not save the game right now. Play continues.".to_string()));
    assert!(bot.games.get_game(&started.id).await.is_err());

    bot.games.set_fail_writes(false);
    bot.hub.handle(command(&bot.ann, "/surrender", None)).await;

    let stored = bot.games.get_game(&started.id).await.unwrap();
    assert_eq!(stored.status, GameStatus::Finished);
    assert_eq!(stored.winner_id, Some(bot.bob.id));
    bot.hub.handle(command(&bot.ann, "/ttt_history", None)).await;
    let history = bot.transport.texts().last().cloned().unwrap();
    assert!(history.contains("Ann vs Bob"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_needs_both_players() {
    let bot = bot();
    let started = start_game(&bot, GameKind::ClubConnect).await;

    bot.hub.handle(command(&bot.ann, "/cancel", None)).await;
    bot.hub.handle(command(&bot.ann, "/cancel", None)).await;
    assert!(session(&bot, GameKind::ClubConnect).await.is_some());

    bot.hub.handle(command(&bot.bob, "/cancel", None)).await;

    assert!(session(&bot, GameKind::ClubConnect).await.is_none());
    assert_eq!(
        bot.games.get_game(&started.id).await.unwrap().status,
        GameStatus::Canceled
    );
    assert_eq!(
        bot.transport.texts().last().map(String::as_str),
        Some("Both players agreed. The game is cancelled.")
    );
    assert!(bot
        .leaderboard
        .stats(GameKind::ClubConnect, bot.ann.id)
        .await
        .unwrap()
        .is_none());

    // A new challenge is possible right away
    bot.hub.handle(command(&bot.bob, "/ttt", Some(&bot.ann))).await;
    assert_eq!(bot.hub.challenges().pending_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duel_runs_next_to_club_connect() {
    let bot = bot();
    start_game(&bot, GameKind::ClubConnect).await;
    start_game(&bot, GameKind::Duel).await;

    assert!(session(&bot, GameKind::ClubConnect).await.is_some());
    assert!(session(&bot, GameKind::Duel).await.is_some());

    bot.hub.handle(command(&bot.bob, "/ttt", Some(&bot.ann))).await;
    assert_eq!(
        bot.transport.replies_to(bot.bob.id),
        vec!["A game is already running in this chat.".to_string()]
    );
}
