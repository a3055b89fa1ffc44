//! CLI harness for the engine
//!
//! Seeds a small demo game and drives it through the external action
//! boundary with newline-delimited JSON actions, from a script file or
//! stdin. Prints the events each action produced plus the state identifier
//! to resume from. This is a test harness for the boundary, not a UI.

use anyhow::{Context, Result};
use clap::Parser;
use garrison::core::{Card, CardKind, PlayerId, Property};
use garrison::game::{
    perform_action, register_game, ActionContext, ActionOutcome, Game, SnapshotStore,
};
use serde::Deserialize;
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "garrison", about = "Drive a demo game through the action boundary")]
struct Args {
    /// RNG seed for the demo game.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Script of actions, one JSON object per line
    /// (`{"action": "...", "context": {...}}`); stdin when omitted.
    #[arg(long)]
    script: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ScriptedAction {
    action: String,
    #[serde(default)]
    context: ActionContext,
}

/// A small symmetric demo setup: a hero in the hero zone, a deck of plain
/// units with a few keywords, an opening hand, starting workers and gold.
fn demo_game(seed: u64) -> Result<Game> {
    let mut game = Game::new(seed);

    for player in [PlayerId::P1, PlayerId::P2] {
        let hero = game.cards.create(|id| {
            Card::new(
                id,
                "Captain",
                player,
                CardKind::hero(),
                garrison::core::Attributes::statline(2, 2, 3),
            )
        });
        game.board_mut(player).hero_zone.push(hero);

        let statlines: [(&str, i32, i32, i32, Option<Property>); 6] = [
            ("Recruit", 1, 1, 2, None),
            ("Sentry", 2, 2, 3, None),
            ("Skylancer", 3, 2, 2, Some(Property::Flying)),
            ("Shadowfoot", 3, 2, 1, Some(Property::Stealth)),
            ("Duelist", 3, 2, 2, Some(Property::SwiftStrike)),
            ("Ram", 4, 4, 3, Some(Property::Overpower)),
        ];
        for _ in 0..2 {
            for (name, cost, attack, health, keyword) in statlines {
                let id = game.cards.create(|id| {
                    let card = Card::unit(id, name, player, cost, attack, health);
                    match keyword {
                        Some(k) => card.with_base(k, 1),
                        None => card,
                    }
                });
                game.board_mut(player).deck.push(id);
            }
        }

        for n in 0..4 {
            let id = game
                .cards
                .create(|id| Card::unit(id, format!("Worker {n}"), player, 1, 0, 1));
            game.board_mut(player).workers.push(id);
        }
        game.board_mut(player).gold = 4;

        use rand::seq::SliceRandom;
        let mut deck = std::mem::take(&mut game.board_mut(player).deck);
        deck.shuffle(&mut game.rng);
        game.board_mut(player).deck = deck;
        game.draw_cards(player, 5)?;
    }

    game.start_turn()?;
    game.run_cleanup()?;
    Ok(game)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let game = demo_game(args.seed)?;
    let mut store = SnapshotStore::new(args.seed.wrapping_add(1));
    let mut state_id = register_game(&mut store, &game)?;
    let mut seen_events = game.log.len();
    println!("state {state_id}");

    let reader: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(std::io::BufReader::new(
            std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(std::io::BufReader::new(std::io::stdin())),
    };

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let scripted: ScriptedAction =
            serde_json::from_str(line).with_context(|| format!("parsing action '{line}'"))?;

        let mut ctx = scripted.context.clone();
        ctx.entry("stateId".to_string()).or_insert(state_id.clone());

        match perform_action(&mut store, &scripted.action, &ctx) {
            ActionOutcome::Success(success) => {
                for event in success.event_log.iter().skip(seen_events) {
                    println!("  {}", event.text);
                }
                seen_events = success.event_log.len();
                state_id = success.state_id;
                println!("state {state_id}");
            }
            ActionOutcome::Failure { error } => {
                println!("  error: {error}");
            }
        }
    }

    let final_game = store.load(&state_id)?;
    match final_game.winner {
        Some(winner) => println!("game over: {winner} wins"),
        None => println!("game suspended at state {state_id}"),
    }
    Ok(())
}
