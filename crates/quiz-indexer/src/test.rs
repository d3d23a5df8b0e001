#![cfg(test)]

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{address, b256, keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::SolEvent;
use quiz_rules::{CREATOR_REWARD_BEST, PLAYER_REWARD_CORRECT, PLAYER_REWARD_WRONG};

use crate::abi::QuizGame;
use crate::chain::id_topic;
use crate::config::{hours_to_blocks, parse_address_list};
use crate::decoder::{sort_chain_order, ANSWER_SUBMITTED, PLAYER_REGISTERED};
use crate::fetcher::horizon_start;
use crate::leaderboard::collect_player_names;
use crate::rpc::custom_error_name;
use crate::score::count_answers;
use crate::stats::accuracy_pct;
use crate::*;

// ════════════════════════════════════════════════════════════════════════════
//  Helpers
// ════════════════════════════════════════════════════════════════════════════

const CONTRACT: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
const OWNER: Address = address!("00000000000000000000000000000000000000aa");
const ALICE: Address = address!("0000000000000000000000000000000000000001");
const BOB: Address = address!("0000000000000000000000000000000000000002");
const CAROL: Address = address!("0000000000000000000000000000000000000003");
const DAVE: Address = address!("0000000000000000000000000000000000000004");
const SALT: B256 = b256!("2222222222222222222222222222222222222222222222222222222222222222");

fn setup() -> MockQuizChain {
    MockQuizChain::new(OWNER)
}

fn config() -> QuizConfig {
    QuizConfig::new(CONTRACT, "http://127.0.0.1:8545")
}

fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    move |key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }
}

fn raw<E: SolEvent>(block: u64, index: u64, event: &E) -> RawLog {
    let data = event.encode_log_data();
    RawLog {
        block_number: block,
        log_index: index,
        topics: data.topics().to_vec(),
        data: data.data,
    }
}

fn registered_query() -> LogQuery {
    LogQuery::new(CONTRACT, PLAYER_REGISTERED)
}

/// OWNER, ALICE, BOB and CAROL registered at blocks 1-4 with scores.
fn populated() -> MockQuizChain {
    let chain = setup();
    chain.register_player(1, OWNER, "owner");
    chain.register_player(2, ALICE, "alice");
    chain.register_player(3, BOB, "bob");
    chain.register_player(4, CAROL, "carol");
    chain.set_score(OWNER, 99);
    chain.set_score(ALICE, 10);
    chain.set_score(BOB, 20);
    chain.set_score(CAROL, 10);
    chain
}

fn names(entries: &[quiz_rules::LeaderboardEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

// ════════════════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn test_config_missing_contract_address_fails() {
    let err = QuizConfig::from_lookup(lookup(&[("QUIZ_RPC_URL", "http://x")])).unwrap_err();
    assert!(matches!(err, IndexerError::MissingConfig(_)));
}

#[test]
fn test_config_missing_rpc_url_fails() {
    let pairs = [("QUIZ_CONTRACT_ADDRESS", "0x5fbdb2315678afecb367f032d93f642f64180aa3")];
    let err = QuizConfig::from_lookup(lookup(&pairs)).unwrap_err();
    assert!(matches!(err, IndexerError::MissingConfig(_)));
}

#[test]
fn test_config_invalid_address_fails() {
    let pairs = [("QUIZ_CONTRACT_ADDRESS", "0x1234"), ("QUIZ_RPC_URL", "http://x")];
    let err = QuizConfig::from_lookup(lookup(&pairs)).unwrap_err();
    assert!(matches!(err, IndexerError::InvalidConfig { .. }));
}

#[test]
fn test_config_defaults() {
    let pairs = [
        ("QUIZ_CONTRACT_ADDRESS", "0x5fbdb2315678afecb367f032d93f642f64180aa3"),
        ("QUIZ_RPC_URL", "http://x"),
    ];
    let cfg = QuizConfig::from_lookup(lookup(&pairs)).unwrap();
    assert_eq!(cfg.contract_address, CONTRACT);
    assert_eq!(cfg.rpc_url, "http://x");
    assert_eq!(cfg.start_block, 0);
    assert_eq!(cfg.lookback_blocks, 1200); // 4 h × 300 blocks/h
    assert_eq!(cfg.log_window, 1500);
    assert_eq!(cfg.read_batch_size, 8);
    assert_eq!(cfg.poll_interval, Duration::from_secs(12));
    assert!(cfg.blacklist.is_empty());
}

#[test]
fn test_config_falls_through_empty_keys() {
    let pairs = [
        ("QUIZ_CONTRACT_ADDRESS", "  "),
        ("NEXT_PUBLIC_CONTRACT_ADDRESS", "0x5fbdb2315678afecb367f032d93f642f64180aa3"),
        ("RPC_URL", "http://fallback"),
    ];
    let cfg = QuizConfig::from_lookup(lookup(&pairs)).unwrap();
    assert_eq!(cfg.contract_address, CONTRACT);
    assert_eq!(cfg.rpc_url, "http://fallback");
}

#[test]
fn test_config_lookback_blocks_beat_hours() {
    let pairs = [
        ("QUIZ_CONTRACT_ADDRESS", "0x5fbdb2315678afecb367f032d93f642f64180aa3"),
        ("QUIZ_RPC_URL", "http://x"),
        ("LOG_LOOKBACK_BLOCKS", "500"),
        ("LOG_LOOKBACK_HOURS", "10"),
    ];
    let cfg = QuizConfig::from_lookup(lookup(&pairs)).unwrap();
    assert_eq!(cfg.lookback_blocks, 500);
}

#[test]
fn test_config_lookback_hours() {
    let base = [
        ("QUIZ_CONTRACT_ADDRESS", "0x5fbdb2315678afecb367f032d93f642f64180aa3"),
        ("QUIZ_RPC_URL", "http://x"),
    ];
    let with_hours = |hours: &'static str| {
        let mut pairs = base.to_vec();
        pairs.push(("LOG_LOOKBACK_HOURS", hours));
        QuizConfig::from_lookup(lookup(&pairs)).unwrap().lookback_blocks
    };
    assert_eq!(with_hours("0.5"), 150);
    assert_eq!(with_hours("0"), 0);
    assert_eq!(with_hours("-2"), 0);
    assert_eq!(with_hours("soon"), 1200);
}

#[test]
fn test_config_blocks_per_hour_override() {
    let pairs = [
        ("QUIZ_CONTRACT_ADDRESS", "0x5fbdb2315678afecb367f032d93f642f64180aa3"),
        ("QUIZ_RPC_URL", "http://x"),
        ("LOG_LOOKBACK_HOURS", "2"),
        ("BLOCKS_PER_HOUR", "1800"),
    ];
    let cfg = QuizConfig::from_lookup(lookup(&pairs)).unwrap();
    assert_eq!(cfg.lookback_blocks, 3600);
}

#[test]
fn test_hours_to_blocks_floor_of_one() {
    assert_eq!(hours_to_blocks(0.001, 300), 1);
    assert_eq!(hours_to_blocks(0.0, 300), 0);
    assert_eq!(hours_to_blocks(f64::NAN, 300), 0);
    assert_eq!(hours_to_blocks(1.5, 300), 450);
}

#[test]
fn test_blacklist_drops_malformed_entries() {
    let list = parse_address_list(
        "0x0000000000000000000000000000000000000001, nope ,,0x0000000000000000000000000000000000000002",
    );
    assert_eq!(list.len(), 2);
    assert!(list.contains(&ALICE));
    assert!(list.contains(&BOB));
}

// ════════════════════════════════════════════════════════════════════════════
//  Errors
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn test_rpc_error_classification() {
    assert!(matches!(
        ChainError::from_rpc(-32005, "limit exceeded"),
        ChainError::RateLimited(_)
    ));
    assert!(matches!(
        ChainError::from_rpc(-32600, "bad request"),
        ChainError::RangeTooLarge(_)
    ));
    assert!(matches!(
        ChainError::from_rpc(-32000, "query exceeds max 10 block range"),
        ChainError::RangeTooLarge(_)
    ));
    assert!(matches!(
        ChainError::from_rpc(3, "execution reverted: AlreadyAnswered()"),
        ChainError::Revert(_)
    ));
    assert!(matches!(
        ChainError::from_rpc(-32000, "header not found"),
        ChainError::Transport(_)
    ));
}

#[test]
fn test_revert_reason_mapping() {
    assert_eq!(
        RevertReason::from_message("execution reverted: AlreadyRegistered()"),
        RevertReason::AlreadyRegistered
    );
    assert_eq!(
        RevertReason::from_message("QuestionNotRevealed"),
        RevertReason::QuestionNotRevealed
    );
    assert_eq!(
        RevertReason::from_message("out of gas"),
        RevertReason::Other("out of gas".into())
    );
    assert!(RevertReason::QuestionNotRevealed
        .to_string()
        .contains("not been revealed"));
}

#[test]
fn test_chain_error_lifts_into_indexer_error() {
    let err = IndexerError::from(ChainError::Revert("execution reverted: InvalidAnswer()".into()));
    assert!(matches!(err, IndexerError::Revert(RevertReason::InvalidAnswer)));

    let err = IndexerError::from(ChainError::RateLimited("slow down".into()));
    assert!(matches!(err, IndexerError::RateLimited));

    let err = IndexerError::from(ChainError::Transport("reset".into()));
    assert!(matches!(err, IndexerError::Chain(ChainError::Transport(_))));
}

#[test]
fn test_custom_error_selector_lookup() {
    let selector = keccak256("AlreadyAnswered()".as_bytes());
    assert_eq!(custom_error_name(&selector[..4]), Some("AlreadyAnswered"));
    assert_eq!(custom_error_name(&[0xde, 0xad, 0xbe, 0xef]), None);
    assert_eq!(custom_error_name(&[0x01]), None);
}

// ════════════════════════════════════════════════════════════════════════════
//  Log horizon
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn test_horizon_start() {
    assert_eq!(horizon_start(1000, 100), 901);
    assert_eq!(horizon_start(100, 100), 1);
    assert_eq!(horizon_start(50, 100), 0);
}

#[tokio::test]
async fn test_resolve_from_block() {
    let chain = setup();
    chain.set_head(1000);
    let fetcher = LogFetcher::new(&chain, 10);

    assert_eq!(fetcher.resolve_from_block(0, 7).await.unwrap(), 7);
    assert_eq!(fetcher.resolve_from_block(100, 0).await.unwrap(), 901);
    assert_eq!(fetcher.resolve_from_block(100, 950).await.unwrap(), 950);
}

#[tokio::test]
async fn test_lookback_limits_leaderboard_scan() {
    let chain = setup();
    chain.register_player(500, BOB, "bob");
    chain.register_player(950, ALICE, "alice");
    chain.set_head(1000);

    let mut cfg = config();
    cfg.lookback_blocks = 100;
    let board = fetch_leaderboard(&chain, &cfg).await.unwrap();

    assert_eq!(names(&board), vec!["alice"]);
    assert!(chain.queries().iter().all(|(from, _)| *from == 901));
}

// ════════════════════════════════════════════════════════════════════════════
//  Log fetcher
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_fetch_single_wide_query() {
    let chain = setup();
    chain.register_player(10, ALICE, "alice");
    chain.set_head(100);

    let logs = LogFetcher::new(&chain, 10)
        .fetch(&registered_query())
        .await
        .unwrap();

    assert_eq!(logs.len(), 1);
    assert_eq!(chain.queries(), vec![(0, None)]);
}

#[tokio::test]
async fn test_fetch_falls_back_to_windows() {
    let chain = setup();
    chain.register_player(5, ALICE, "alice");
    chain.register_player(15, BOB, "bob");
    chain.register_player(25, CAROL, "carol");
    chain.set_head(29);
    chain.set_max_log_range(Some(10));

    let logs = LogFetcher::new(&chain, 10)
        .fetch(&registered_query())
        .await
        .unwrap();

    assert_eq!(logs.len(), 3);
    assert_eq!(
        chain.queries(),
        vec![(0, None), (0, Some(9)), (10, Some(19)), (20, Some(29))]
    );
}

#[tokio::test]
async fn test_chunked_windows_are_contiguous() {
    let chain = setup();
    chain.set_head(500);

    LogFetcher::new(&chain, 10)
        .fetch_chunked(&registered_query(), 100, 129)
        .await
        .unwrap();

    assert_eq!(
        chain.queries(),
        vec![(100, Some(109)), (110, Some(119)), (120, Some(129))]
    );
}

#[tokio::test]
async fn test_chunked_last_window_is_clamped() {
    let chain = setup();

    LogFetcher::new(&chain, 10)
        .fetch_chunked(&registered_query(), 0, 24)
        .await
        .unwrap();

    assert_eq!(
        chain.queries(),
        vec![(0, Some(9)), (10, Some(19)), (20, Some(24))]
    );
}

#[tokio::test]
async fn test_chunked_window_halves_on_rejection() {
    let chain = setup();
    chain.register_player(3, ALICE, "alice");
    chain.register_player(8, BOB, "bob");
    chain.set_max_log_range(Some(4));

    let logs = LogFetcher::new(&chain, 10)
        .fetch_chunked(&registered_query(), 0, 9)
        .await
        .unwrap();

    assert_eq!(logs.len(), 2);
    assert_eq!(
        chain.queries(),
        vec![
            (0, Some(9)),
            (0, Some(4)),
            (0, Some(1)),
            (2, Some(3)),
            (4, Some(5)),
            (6, Some(7)),
            (8, Some(9)),
        ]
    );
}

#[tokio::test]
async fn test_zero_window_is_clamped_to_one() {
    let chain = setup();

    LogFetcher::new(&chain, 0)
        .fetch_chunked(&registered_query(), 0, 2)
        .await
        .unwrap();

    assert_eq!(chain.queries(), vec![(0, Some(0)), (1, Some(1)), (2, Some(2))]);
}

#[tokio::test]
async fn test_fetch_surfaces_rate_limit() {
    let chain = setup();
    chain.set_rate_limited(true);

    let err = LogFetcher::new(&chain, 10)
        .fetch(&registered_query())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::RateLimited));
}

#[tokio::test]
async fn test_fetch_respects_topic_filters() {
    let chain = setup();
    chain.submit(1, 0, ALICE, 1);
    chain.submit(2, 1, ALICE, 2);
    chain.submit(3, 1, BOB, 3);

    let query = LogQuery::new(CONTRACT, ANSWER_SUBMITTED).topic2(id_topic(1));
    let logs = LogFetcher::new(&chain, 10).fetch(&query).await.unwrap();
    assert_eq!(logs.len(), 2);
}

// ════════════════════════════════════════════════════════════════════════════
//  Decoder
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn test_decode_answer_submitted() {
    let log = raw(
        7,
        2,
        &QuizGame::AnswerSubmitted {
            player: ALICE,
            questionId: U256::from(3),
            answer: 2,
        },
    );
    let decoded = decode_log(&log).unwrap();
    assert_eq!(decoded.block_number, 7);
    assert_eq!(decoded.log_index, 2);
    assert_eq!(
        decoded.event,
        QuizEvent::AnswerSubmitted {
            player: ALICE,
            question_id: 3,
            answer: 2,
        }
    );
}

#[test]
fn test_decode_answer_revealed() {
    let log = raw(
        1,
        0,
        &QuizGame::AnswerRevealed {
            questionId: U256::from(0),
            correctAnswer: 3,
            salt: SALT,
        },
    );
    assert_eq!(
        decode_log(&log).unwrap().event,
        QuizEvent::AnswerRevealed {
            question_id: 0,
            correct_answer: 3,
            salt: SALT,
        }
    );
}

#[test]
fn test_decode_name_changed_and_score_updated() {
    let renamed = raw(
        1,
        0,
        &QuizGame::NameChanged {
            player: BOB,
            newName: "bobby".into(),
        },
    );
    let scored = raw(
        1,
        1,
        &QuizGame::ScoreUpdated {
            player: BOB,
            newScore: U256::from(17),
        },
    );
    assert_eq!(
        decode_log(&renamed).unwrap().event,
        QuizEvent::NameChanged {
            player: BOB,
            new_name: "bobby".into(),
        }
    );
    assert_eq!(
        decode_log(&scored).unwrap().event,
        QuizEvent::ScoreUpdated {
            player: BOB,
            new_score: 17,
        }
    );
}

#[test]
fn test_decode_rejects_oversized_score() {
    let log = raw(
        1,
        0,
        &QuizGame::ScoreUpdated {
            player: BOB,
            newScore: U256::MAX,
        },
    );
    assert!(matches!(decode_log(&log), Err(ChainError::Overflow(_))));
}

#[test]
fn test_decode_logs_skips_bad_entries() {
    let good = raw(
        4,
        0,
        &QuizGame::PlayerRegistered {
            player: ALICE,
            name: "alice".into(),
        },
    );
    let unknown_topic = RawLog {
        block_number: 4,
        log_index: 1,
        topics: vec![B256::ZERO],
        data: Bytes::new(),
    };
    let no_topics = RawLog {
        block_number: 4,
        log_index: 2,
        topics: vec![],
        data: Bytes::new(),
    };
    let truncated = RawLog {
        data: Bytes::new(),
        ..raw(
            4,
            3,
            &QuizGame::AnswerSubmitted {
                player: BOB,
                questionId: U256::from(1),
                answer: 1,
            },
        )
    };

    let decoded = decode_logs(&[good, unknown_topic, no_topics, truncated]);
    assert_eq!(decoded.len(), 1);
    assert_eq!(
        decoded[0].event,
        QuizEvent::PlayerRegistered {
            player: ALICE,
            name: "alice".into(),
        }
    );
}

#[test]
fn test_sort_chain_order() {
    let event = QuizEvent::ScoreUpdated {
        player: ALICE,
        new_score: 1,
    };
    let at = |block, index| DecodedLog {
        block_number: block,
        log_index: index,
        event: event.clone(),
    };
    let mut logs = vec![at(5, 1), at(2, 9), at(5, 0)];
    sort_chain_order(&mut logs);
    let order: Vec<(u64, u64)> = logs.iter().map(|l| (l.block_number, l.log_index)).collect();
    assert_eq!(order, vec![(2, 9), (5, 0), (5, 1)]);
}

// ════════════════════════════════════════════════════════════════════════════
//  Leaderboard
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_leaderboard_excludes_owner_and_blacklist() {
    let chain = populated();
    let mut cfg = config();
    cfg.blacklist.insert(CAROL);

    let board = fetch_leaderboard(&chain, &cfg).await.unwrap();
    assert_eq!(names(&board), vec!["bob", "alice"]);
}

#[tokio::test]
async fn test_leaderboard_orders_ties_by_name() {
    let chain = populated();

    let board = fetch_leaderboard(&chain, &config()).await.unwrap();
    assert_eq!(names(&board), vec!["bob", "alice", "carol"]);
    assert_eq!(board[0].score, 20);
    assert_eq!(board[0].address, BOB);
}

#[tokio::test]
async fn test_leaderboard_uses_latest_name() {
    let chain = populated();
    chain.rename_player(5, ALICE, "alicia");
    chain.rename_player(6, ALICE, "ally");

    let board = fetch_leaderboard(&chain, &config()).await.unwrap();
    assert_eq!(names(&board), vec!["bob", "ally", "carol"]);
}

#[tokio::test]
async fn test_leaderboard_drops_player_with_failed_reads() {
    let chain = populated();
    chain.fail_reads_for(BOB);

    let board = fetch_leaderboard(&chain, &config()).await.unwrap();
    assert_eq!(names(&board), vec!["alice", "carol"]);
}

#[tokio::test]
async fn test_leaderboard_keeps_owner_when_owner_unreadable() {
    let chain = populated();
    chain.set_owner_unreadable(true);

    let board = fetch_leaderboard(&chain, &config()).await.unwrap();
    assert_eq!(names(&board), vec!["owner", "bob", "alice", "carol"]);
}

#[tokio::test]
async fn test_leaderboard_small_batches() {
    let chain = populated();
    let mut cfg = config();
    cfg.read_batch_size = 1;

    let board = fetch_leaderboard(&chain, &cfg).await.unwrap();
    assert_eq!(board.len(), 3);
}

#[tokio::test]
async fn test_leaderboard_chunks_when_range_rejected() {
    let chain = populated();
    chain.set_head(40);
    chain.set_max_log_range(Some(15));
    let mut cfg = config();
    cfg.log_window = 15;

    let board = fetch_leaderboard(&chain, &cfg).await.unwrap();
    assert_eq!(board.len(), 3);
}

#[tokio::test]
async fn test_leaderboard_empty() {
    let chain = setup();
    chain.set_head(10);

    let board = fetch_leaderboard(&chain, &config()).await.unwrap();
    assert!(board.is_empty());
}

#[tokio::test]
async fn test_leaderboard_rate_limited() {
    let chain = populated();
    chain.set_rate_limited(true);

    let err = fetch_leaderboard(&chain, &config()).await.unwrap_err();
    assert!(matches!(err, IndexerError::RateLimited));
}

#[test]
fn test_rename_ignored_for_unregistered_address() {
    let registered = vec![raw(
        1,
        0,
        &QuizGame::PlayerRegistered {
            player: ALICE,
            name: "alice".into(),
        },
    )];
    let renamed = vec![
        raw(
            3,
            0,
            &QuizGame::NameChanged {
                player: ALICE,
                newName: "second".into(),
            },
        ),
        raw(
            2,
            0,
            &QuizGame::NameChanged {
                player: ALICE,
                newName: "first".into(),
            },
        ),
        raw(
            2,
            1,
            &QuizGame::NameChanged {
                player: DAVE,
                newName: "ghost".into(),
            },
        ),
    ];

    let names = collect_player_names(&registered, &renamed);
    assert_eq!(names.len(), 1);
    assert_eq!(names.get(&ALICE).map(String::as_str), Some("second"));
    assert!(!names.contains_key(&DAVE));
}

// ════════════════════════════════════════════════════════════════════════════
//  Score breakdown
// ════════════════════════════════════════════════════════════════════════════

const OPTIONS: [&str; 4] = ["a", "b", "c", "d"];

/// q0 by CAROL, revealed (1): ALICE 1, BOB 2, DAVE 1.
/// q1 by ALICE, unrevealed: BOB 0.
/// q2 by ALICE, revealed (3): BOB 3, CAROL 0.
fn quiz_chain() -> MockQuizChain {
    let chain = setup();
    let q0 = chain.add_question(CAROL, "q0", OPTIONS);
    let q1 = chain.add_question(ALICE, "q1", OPTIONS);
    let q2 = chain.add_question(ALICE, "q2", OPTIONS);

    chain.submit(10, q0, ALICE, 1);
    chain.submit(11, q0, BOB, 2);
    chain.submit(12, q0, DAVE, 1);
    chain.submit(13, q1, BOB, 0);
    chain.submit(14, q2, BOB, 3);
    chain.submit(15, q2, CAROL, 0);
    chain.reveal(20, q0, 1, SALT);
    chain.reveal(21, q2, 3, SALT);

    chain.set_score(ALICE, 17);
    chain.set_score(BOB, 10);
    chain
}

#[tokio::test]
async fn test_breakdown_answered_and_created() {
    let chain = quiz_chain();
    let breakdown = fetch_score_breakdown(&chain, &config(), ALICE).await.unwrap();

    assert_eq!(breakdown.answered.len(), 1);
    let row = &breakdown.answered[0];
    assert_eq!(row.question_id, 0);
    assert_eq!(row.question_text, "q0");
    assert_eq!(row.my_answer, Some(1));
    assert_eq!(row.correct_answer, Some(1));
    assert!(row.is_revealed);
    assert_eq!(row.earned, PLAYER_REWARD_CORRECT);

    let created: Vec<u64> = breakdown.created.iter().map(|r| r.question_id).collect();
    assert_eq!(created, vec![1, 2]);

    let pending = &breakdown.created[0];
    assert!(!pending.is_revealed);
    assert_eq!(pending.correct_answer, None);
    assert_eq!((pending.correct_count, pending.wrong_count), (0, 0));
    assert_eq!(pending.earned, 0);

    let revealed = &breakdown.created[1];
    assert_eq!(revealed.correct_answer, Some(3));
    assert_eq!((revealed.correct_count, revealed.wrong_count), (1, 1));
    assert_eq!(revealed.earned, CREATOR_REWARD_BEST);

    assert_eq!(breakdown.total_score, 17);
    assert_eq!(breakdown.recomputed_total(), 17);
}

#[tokio::test]
async fn test_breakdown_player_only() {
    let chain = quiz_chain();
    let breakdown = fetch_score_breakdown(&chain, &config(), BOB).await.unwrap();

    let rows: Vec<(u64, Option<u8>, Option<u8>, u64)> = breakdown
        .answered
        .iter()
        .map(|r| (r.question_id, r.my_answer, r.correct_answer, r.earned))
        .collect();
    assert_eq!(
        rows,
        vec![
            (0, Some(2), Some(1), PLAYER_REWARD_WRONG),
            (1, Some(0), None, 0),
            (2, Some(3), Some(3), PLAYER_REWARD_CORRECT),
        ]
    );
    assert!(breakdown.created.is_empty());
    assert_eq!(breakdown.total_score, 10);
}

#[tokio::test]
async fn test_breakdown_creator_tally_across_windows() {
    let chain = quiz_chain();
    chain.set_head(60);
    chain.set_max_log_range(Some(8));
    let mut cfg = config();
    cfg.log_window = 8;

    let breakdown = fetch_score_breakdown(&chain, &cfg, CAROL).await.unwrap();
    let row = &breakdown.created[0];
    assert_eq!(row.question_id, 0);
    assert_eq!((row.correct_count, row.wrong_count), (2, 1));
    assert_eq!(row.earned, CREATOR_REWARD_BEST);
}

#[tokio::test]
async fn test_breakdown_total_score_failure_is_zero() {
    let chain = quiz_chain();
    chain.fail_reads_for(ALICE);

    let breakdown = fetch_score_breakdown(&chain, &config(), ALICE).await.unwrap();
    assert_eq!(breakdown.total_score, 0);
    assert_eq!(breakdown.answered.len(), 1);
}

#[tokio::test]
async fn test_breakdown_no_questions() {
    let chain = setup();
    let breakdown = fetch_score_breakdown(&chain, &config(), ALICE).await.unwrap();
    assert_eq!(breakdown, ScoreBreakdown::default());
}

#[test]
fn test_count_answers_ignores_other_questions() {
    let submitted = |qid: u64, answer: u8| {
        raw(
            1,
            0,
            &QuizGame::AnswerSubmitted {
                player: ALICE,
                questionId: U256::from(qid),
                answer,
            },
        )
    };
    let logs = vec![
        submitted(4, 2),
        submitted(4, 2),
        submitted(4, 0),
        submitted(5, 2),
    ];
    assert_eq!(count_answers(&logs, 4, 2), (2, 1));
    assert_eq!(count_answers(&logs, 9, 2), (0, 0));
}

#[tokio::test]
async fn test_submissions_in_chain_order() {
    let chain = quiz_chain();
    let history = fetch_submissions(&chain, &config(), BOB).await.unwrap();

    let rows: Vec<(u64, u8, u64)> = history
        .iter()
        .map(|s| (s.question_id, s.answer, s.block_number))
        .collect();
    assert_eq!(rows, vec![(0, 2, 11), (1, 0, 13), (2, 3, 14)]);
}

// ════════════════════════════════════════════════════════════════════════════
//  Answer statistics
// ════════════════════════════════════════════════════════════════════════════

/// q0: ALICE right, BOB wrong, DAVE right. q2: BOB right.
fn evaluated_chain() -> MockQuizChain {
    let chain = populated();
    chain.evaluate(10, 0, ALICE, true);
    chain.evaluate(11, 0, BOB, false);
    chain.evaluate(12, 0, DAVE, true);
    chain.evaluate(13, 2, BOB, true);
    chain
}

#[tokio::test]
async fn test_stats_per_question_and_player() {
    let chain = evaluated_chain();
    let stats = fetch_quiz_stats(&chain, &config()).await.unwrap();

    assert_eq!(stats.question(0), AnswerTally { correct: 2, total: 3 });
    assert_eq!(stats.question(0).accuracy_pct(), 67);
    assert_eq!(stats.question(1), AnswerTally::default());
    assert_eq!(stats.question(1).accuracy_pct(), 0);
    assert_eq!(stats.question(2).accuracy_pct(), 100);

    assert_eq!(stats.player(BOB), AnswerTally { correct: 1, total: 2 });
    assert_eq!(stats.player(ALICE), AnswerTally { correct: 1, total: 1 });
    assert_eq!(stats.player(CAROL), AnswerTally::default());
    assert_eq!(stats.overall, AnswerTally { correct: 3, total: 4 });
}

#[tokio::test]
async fn test_stats_ignore_other_events() {
    let chain = evaluated_chain();
    chain.submit(14, 0, CAROL, 1);

    let stats = fetch_quiz_stats(&chain, &config()).await.unwrap();
    assert_eq!(stats.overall.total, 4);
    assert!(chain.queries().iter().all(|(from, _)| *from == 0));
}

#[tokio::test]
async fn test_stats_scan_through_windows() {
    let chain = evaluated_chain();
    chain.set_head(50);
    chain.set_max_log_range(Some(5));
    let mut cfg = config();
    cfg.log_window = 5;

    let stats = fetch_quiz_stats(&chain, &cfg).await.unwrap();
    assert_eq!(stats.overall, AnswerTally { correct: 3, total: 4 });
    // one rejected wide query, then 0..=50 in 5-block windows
    assert_eq!(chain.queries().len(), 1 + 11);
}

#[tokio::test]
async fn test_stats_respect_lookback() {
    let chain = evaluated_chain();
    chain.set_head(112);
    let mut cfg = config();
    cfg.lookback_blocks = 101; // horizon starts at block 12

    let stats = fetch_quiz_stats(&chain, &cfg).await.unwrap();
    assert_eq!(stats.overall, AnswerTally { correct: 2, total: 2 });
}

#[test]
fn test_accuracy_rounding() {
    assert_eq!(accuracy_pct(0, 0), 0);
    assert_eq!(accuracy_pct(1, 3), 33);
    assert_eq!(accuracy_pct(1, 2), 50);
    assert_eq!(accuracy_pct(2, 3), 67);
    assert_eq!(accuracy_pct(u64::MAX, u64::MAX), 100);
}

#[tokio::test]
async fn test_leaderboard_summary() {
    let chain = evaluated_chain();
    let cfg = config();
    let (board, stats) = tokio::try_join!(
        fetch_leaderboard(&chain, &cfg),
        fetch_quiz_stats(&chain, &cfg)
    )
    .unwrap();

    let summary = summarize(&board, &stats);
    assert_eq!(summary.total_players, 3);
    assert_eq!(summary.total_answers, 4);
    assert_eq!(summary.accuracy_pct, 75);
    // (20 + 10 + 10) / 3 rounded
    assert_eq!(summary.average_score, 13);
    assert_eq!(summary.top_scorer.map(|e| e.name), Some("bob".to_string()));
}

#[test]
fn test_summary_of_empty_board() {
    let summary = summarize(&[], &QuizStats::default());
    assert_eq!(summary, LeaderboardSummary::default());
}

// ════════════════════════════════════════════════════════════════════════════
//  Session and subscriptions
// ════════════════════════════════════════════════════════════════════════════

fn score_event(block: u64, player: Address, score: u64) -> DecodedLog {
    DecodedLog {
        block_number: block,
        log_index: 0,
        event: QuizEvent::ScoreUpdated {
            player,
            new_score: score,
        },
    }
}

#[test]
fn test_score_cache() {
    let mut cache = ScoreCache::new();
    assert_eq!(cache.get(), None);
    cache.set(12);
    assert_eq!(cache.get(), Some(12));
    cache.clear();
    assert_eq!(cache.get(), None);
}

#[tokio::test]
async fn test_session_applies_only_own_score() {
    let chain = Arc::new(setup());
    let mut session = Session::connect(chain, &config(), ALICE, 0);

    assert_eq!(session.score(), None);
    assert!(!session.apply(&score_event(1, BOB, 50)));
    assert_eq!(session.score(), None);
    assert!(session.apply(&score_event(2, ALICE, 7)));
    assert_eq!(session.score(), Some(7));
}

#[tokio::test]
async fn test_session_refresh_reads_contract() {
    let chain = Arc::new(setup());
    chain.set_score(ALICE, 42);
    let mut session = Session::connect(chain.clone(), &config(), ALICE, 0);

    assert_eq!(session.refresh(&*chain).await.unwrap(), 42);
    assert_eq!(session.score(), Some(42));
}

#[tokio::test(start_paused = true)]
async fn test_session_follows_score_events() {
    let chain = Arc::new(setup());
    chain.emit(
        4,
        &QuizGame::ScoreUpdated {
            player: ALICE,
            newScore: U256::from(7),
        },
    );
    let mut session = Session::connect(chain.clone(), &config(), ALICE, 0);

    let event = session.next_event().await.unwrap();
    assert_eq!(event.block_number, 4);
    assert_eq!(session.score(), Some(7));

    session.disconnect();
    assert!(!session.is_connected());
    assert_eq!(session.score(), None);
    assert!(session.next_event().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_watcher_streams_new_events() {
    let chain = Arc::new(setup());
    chain.register_player(3, ALICE, "alice");
    let mut sub = EventWatcher::subscribe(chain.clone(), &config(), 0);

    let first = sub.recv().await.unwrap();
    assert_eq!(
        first.event,
        QuizEvent::PlayerRegistered {
            player: ALICE,
            name: "alice".into(),
        }
    );

    chain.submit(5, 0, ALICE, 2);
    let second = sub.recv().await.unwrap();
    assert_eq!(second.block_number, 5);
    assert_eq!(
        second.event,
        QuizEvent::AnswerSubmitted {
            player: ALICE,
            question_id: 0,
            answer: 2,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_watcher_starts_at_from_block() {
    let chain = Arc::new(setup());
    chain.register_player(2, ALICE, "alice");
    chain.register_player(12, BOB, "bob");
    let mut sub = EventWatcher::subscribe(chain.clone(), &config(), 10);

    let first = sub.recv().await.unwrap();
    assert_eq!(first.block_number, 12);
}

#[tokio::test(start_paused = true)]
async fn test_watcher_retries_after_rate_limit() {
    let chain = Arc::new(setup());
    chain.register_player(3, ALICE, "alice");
    chain.set_rate_limited(true);
    let mut sub = EventWatcher::subscribe(chain.clone(), &config(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(sub.try_recv().is_none());

    chain.set_rate_limited(false);
    let first = sub.recv().await.unwrap();
    assert_eq!(first.block_number, 3);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_subscription_stops_polling() {
    let chain = Arc::new(setup());
    let sub = EventWatcher::subscribe(chain.clone(), &config(), 0);
    tokio::time::sleep(Duration::from_secs(30)).await;
    sub.unsubscribe();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let polled = chain.queries().len();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(chain.queries().len(), polled);
}
