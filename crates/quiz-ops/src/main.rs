//! # quiz-ops
//!
//! Operator commands for a deployed `QuizGame` contract.
//!
//! ## Commands
//! - Read: `leaderboard`, `score`, `history`, `status`, `watch`
//! - Offline: `rules`, `commit`, `verify`
//! - Write (needs `PRIVATE_KEY`): `register`, `add-question`, `reveal`, `submit`
//!
//! Settings come from the environment (a `.env` file is honoured); see
//! `QuizConfig::from_env` for the keys.

mod questions;

use std::sync::Arc;

use alloy::primitives::{Address, B256};
use anyhow::{bail, Context, Result};
use quiz_indexer::{
    fetch_leaderboard, fetch_quiz_stats, fetch_score_breakdown, fetch_submissions, summarize,
    EventWatcher, QuizChain, QuizConfig, QuizEvent, QuizWriter, RpcQuizChain, Session,
};
use quiz_rules::{check_answer_index, parse_salt, verify_reveal, Commitment, SCORE_RULES};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::questions::parse_questions;

const USAGE: &str = "\
usage: quiz-ops <command> [args]

read
  leaderboard [--json]              ranked players with answer stats
  score <address> [--json]          score breakdown for one player
  history <address>                 answered flags and submissions
  status                            every question with state and responses
  watch [address]                   stream contract events

offline
  rules                             scoring table
  commit <index> [salt]             answer commitment for a new question
  verify <hash> <index> <salt>      check a reveal against a commitment

write (PRIVATE_KEY)
  register <name>
  add-question <questions.json> [--reveal]
  reveal <id> <index> <salt>
  submit <id> <index>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{USAGE}");
        return Ok(());
    };

    match command.as_str() {
        "rules" => print_rules(),
        "commit" => commit(rest)?,
        "verify" => verify(rest)?,
        "help" | "-h" | "--help" => println!("{USAGE}"),
        "leaderboard" | "score" | "history" | "status" | "watch" => {
            let config = QuizConfig::from_env()?;
            let chain = RpcQuizChain::connect(&config).await?;
            match command.as_str() {
                "leaderboard" => leaderboard(&chain, &config, has_flag(rest, "--json")).await?,
                "score" => score(&chain, &config, rest).await?,
                "history" => history(&chain, &config, rest).await?,
                "status" => status(&chain, &config).await?,
                _ => watch(Arc::new(chain), &config, rest).await?,
            }
        }
        "register" | "add-question" | "reveal" | "submit" => {
            let config = QuizConfig::from_env()?;
            let key = std::env::var("PRIVATE_KEY").context("PRIVATE_KEY is not set")?;
            let writer = QuizWriter::connect(&config, &key).await?;
            match command.as_str() {
                "register" => register(&writer, rest).await?,
                "add-question" => add_questions(&writer, rest).await?,
                "reveal" => reveal(&writer, rest).await?,
                _ => submit(&writer, rest).await?,
            }
        }
        other => bail!("unknown command `{other}`\n\n{USAGE}"),
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Argument helpers
// ═══════════════════════════════════════════════════════════════════════════════

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Positional arguments, flags removed.
fn positional(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect()
}

fn arg<'a>(args: &[&'a str], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .copied()
        .with_context(|| format!("missing <{name}>\n\n{USAGE}"))
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse()
        .with_context(|| format!("invalid address `{raw}`"))
}

fn parse_index(raw: &str) -> Result<u8> {
    let index: u8 = raw
        .parse()
        .with_context(|| format!("invalid answer index `{raw}`"))?;
    Ok(check_answer_index(index)?)
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.parse()
        .with_context(|| format!("invalid question id `{raw}`"))
}

fn label<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Offline
// ═══════════════════════════════════════════════════════════════════════════════

fn print_rules() {
    let rules = SCORE_RULES;
    println!("Player, after reveal");
    println!("  correct answer          +{}", rules.player_correct);
    println!("  wrong answer            +{}", rules.player_wrong);
    println!("Creator, after reveal");
    println!("  40-70% correct or tie   +{}", rules.creator_best);
    println!("  mostly correct          +{}", rules.creator_high);
    println!("  mostly wrong            +{}", rules.creator_low);
    println!("  no answers              +0");
}

fn commit(args: &[String]) -> Result<()> {
    let args = positional(args);
    let index = parse_index(arg(&args, 0, "index")?)?;
    let commitment = match args.get(1) {
        Some(raw) => Commitment::new(index, parse_salt(raw)?)?,
        None => Commitment::generate(index)?,
    };
    println!("index  {}", commitment.index);
    println!("salt   {}", commitment.salt);
    println!("hash   {}", commitment.hash);
    println!("keep the salt private until reveal");
    Ok(())
}

fn verify(args: &[String]) -> Result<()> {
    let args = positional(args);
    let hash: B256 = arg(&args, 0, "hash")?
        .parse()
        .context("invalid commitment hash")?;
    let index = parse_index(arg(&args, 1, "index")?)?;
    let salt = parse_salt(arg(&args, 2, "salt")?)?;
    if verify_reveal(hash, index, salt) {
        println!("reveal matches commitment");
        Ok(())
    } else {
        bail!("reveal does not match commitment {hash}")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Read
// ═══════════════════════════════════════════════════════════════════════════════

async fn leaderboard(chain: &RpcQuizChain, config: &QuizConfig, json: bool) -> Result<()> {
    let (entries, stats) =
        tokio::try_join!(fetch_leaderboard(chain, config), fetch_quiz_stats(chain, config))?;
    let summary = summarize(&entries, &stats);
    if json {
        let report = serde_json::json!({ "entries": entries, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("no registered players");
        return Ok(());
    }
    println!(
        "{:>4}  {:<24} {:>6} {:>8} {:>6}  {:<42}",
        "#", "name", "score", "correct", "total", "address"
    );
    for (rank, entry) in entries.iter().enumerate() {
        let tally = stats.player(entry.address);
        println!(
            "{:>4}  {:<24} {:>6} {:>8} {:>6}  {:<42}",
            rank + 1,
            entry.name,
            entry.score,
            tally.correct,
            tally.total,
            entry.address.to_string()
        );
    }

    println!("\nplayers          {}", summary.total_players);
    println!("answers          {}", summary.total_answers);
    println!("accuracy         {}%", summary.accuracy_pct);
    println!("average score    {}", summary.average_score);
    if let Some(top) = &summary.top_scorer {
        println!("top scorer       {} with {} points", top.name, top.score);
    }
    Ok(())
}

async fn score(chain: &RpcQuizChain, config: &QuizConfig, args: &[String]) -> Result<()> {
    let json = has_flag(args, "--json");
    let args = positional(args);
    let player = parse_address(arg(&args, 0, "address")?)?;
    let breakdown = fetch_score_breakdown(chain, config, player).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
        return Ok(());
    }

    println!("total score {}", breakdown.total_score);
    println!("\nanswered");
    for row in &breakdown.answered {
        println!(
            "  #{:<4} mine {:<2} correct {:<2} +{:<3} {}",
            row.question_id,
            label(row.my_answer),
            label(row.correct_answer),
            row.earned,
            row.question_text
        );
    }
    println!("\ncreated");
    for row in &breakdown.created {
        println!(
            "  #{:<4} correct {:<3} wrong {:<3} +{:<3} {}{}",
            row.question_id,
            row.correct_count,
            row.wrong_count,
            row.earned,
            row.question_text,
            if row.is_revealed { "" } else { " (not revealed)" }
        );
    }
    let recomputed = breakdown.recomputed_total();
    if recomputed != breakdown.total_score {
        println!("\nrecomputed {recomputed} differs from contract total");
    }
    Ok(())
}

async fn history(chain: &RpcQuizChain, config: &QuizConfig, args: &[String]) -> Result<()> {
    let args = positional(args);
    let player = parse_address(arg(&args, 0, "address")?)?;

    let score = chain.player_score(player).await?;
    println!("player {player}  score {score}");
    for id in 0..chain.question_count().await? {
        let answered = chain.has_player_answered(id, player).await?;
        println!("  question {id}: {}", if answered { "answered" } else { "open" });
    }

    let submissions = fetch_submissions(chain, config, player).await?;
    println!("\n{} submission(s) in scan range", submissions.len());
    for s in submissions {
        println!(
            "  block {:<10} question {:<4} answer {}",
            s.block_number, s.question_id, s.answer
        );
    }
    Ok(())
}

async fn status(chain: &RpcQuizChain, config: &QuizConfig) -> Result<()> {
    let count = chain.question_count().await?;
    let stats = fetch_quiz_stats(chain, config).await?;
    println!("{count} question(s)");
    for id in 0..count {
        let (state, question) = tokio::try_join!(chain.question_state(id), chain.question(id))?;
        let correct = if state.is_revealed {
            chain.correct_answer(id).await.ok()
        } else {
            None
        };
        println!(
            "\n#{id} {}\n  creator {}  active {}  revealed {}  correct {}",
            question.text,
            state.creator,
            state.is_active,
            state.is_revealed,
            label(correct)
        );
        for (i, option) in question.options.iter().enumerate() {
            println!("  [{i}] {option}");
        }
        let tally = stats.question(id);
        println!(
            "  responses {}  correct {} ({}%)",
            tally.total,
            tally.correct,
            tally.accuracy_pct()
        );
    }
    Ok(())
}

async fn watch(chain: Arc<RpcQuizChain>, config: &QuizConfig, args: &[String]) -> Result<()> {
    let args = positional(args);
    let from_block = chain.block_number().await?.saturating_add(1);

    let Some(raw) = args.first() else {
        info!(from_block, "watching all events");
        let mut subscription = EventWatcher::subscribe(chain, config, from_block);
        while let Some(log) = subscription.recv().await {
            println!("{:>10}  {}", log.block_number, serde_json::to_string(&log.event)?);
        }
        return Ok(());
    };

    let player = parse_address(raw)?;
    let mut session = Session::connect(chain.clone(), config, player, from_block);
    let score = session.refresh(chain.as_ref()).await?;
    println!("{player} score {score}");
    while let Some(log) = session.next_event().await {
        let mine = match &log.event {
            QuizEvent::PlayerRegistered { player: p, .. }
            | QuizEvent::NameChanged { player: p, .. }
            | QuizEvent::AnswerSubmitted { player: p, .. }
            | QuizEvent::AnswerEvaluated { player: p, .. }
            | QuizEvent::ScoreUpdated { player: p, .. } => *p == player,
            QuizEvent::AnswerRevealed { .. } => true,
        };
        if mine {
            println!("{:>10}  {}", log.block_number, serde_json::to_string(&log.event)?);
        }
        if let QuizEvent::ScoreUpdated { player: p, .. } = log.event {
            if p == player {
                println!("score now {}", label(session.score()));
            }
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Write
// ═══════════════════════════════════════════════════════════════════════════════

async fn register(writer: &QuizWriter, args: &[String]) -> Result<()> {
    let name = args.join(" ");
    if name.trim().is_empty() {
        bail!("missing <name>\n\n{USAGE}");
    }
    let tx = writer.register(name.trim()).await?;
    println!("registered {} as `{}` in {tx}", writer.sender(), name.trim());
    Ok(())
}

async fn add_questions(writer: &QuizWriter, args: &[String]) -> Result<()> {
    let reveal_now = has_flag(args, "--reveal");
    let args = positional(args);
    let path = arg(&args, 0, "questions.json")?;
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let questions = parse_questions(&raw)?;
    info!(count = questions.len(), path, "adding questions");

    for question in questions {
        let commitment = Commitment::generate(question.answer_index)?;
        let tx = writer
            .add_question(&question.text, question.options.clone(), commitment.hash)
            .await?;
        let id = writer
            .question_count()
            .await?
            .checked_sub(1)
            .context("question count did not grow")?;
        println!("#{id} {}  ({tx})", question.text);
        println!("  answer {}  salt {}", commitment.index, commitment.salt);

        if reveal_now {
            let tx = writer
                .reveal_answer(id, commitment.index, commitment.salt)
                .await?;
            println!("  revealed ({tx})");
        }
    }
    if !reveal_now {
        println!("\nstore the salts above; they are needed to reveal");
    }
    Ok(())
}

async fn reveal(writer: &QuizWriter, args: &[String]) -> Result<()> {
    let args = positional(args);
    let id = parse_id(arg(&args, 0, "id")?)?;
    let index = parse_index(arg(&args, 1, "index")?)?;
    let salt = parse_salt(arg(&args, 2, "salt")?)?;
    let tx = writer.reveal_answer(id, index, salt).await?;
    println!("revealed question {id} ({tx})");
    Ok(())
}

async fn submit(writer: &QuizWriter, args: &[String]) -> Result<()> {
    let args = positional(args);
    let id = parse_id(arg(&args, 0, "id")?)?;
    let index = parse_index(arg(&args, 1, "index")?)?;
    let tx = writer.submit_answer(id, index).await?;
    println!("submitted answer {index} to question {id} ({tx})");
    Ok(())
}
