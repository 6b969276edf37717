//! gdl - command-line interface for the GDL Datalog engine and state machine.

use std::fs;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use gdl_core::database::QueryResult;
use gdl_core::term::Term;
use gdl_core::{lexer, parser as gdl_parser};
use gdl_core::{LegalResult, ScoreResult, StateMachine};

#[derive(Parser)]
#[command(name = "gdl")]
#[command(about = "Datalog-with-negation engine and GDL state machine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose tracing output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and load a .gdl file, reporting role/fact/rule counts
    Check {
        /// Path to a .gdl source file
        file: String,
    },
    /// Load a file and answer a single query term
    Query {
        /// Path to a .gdl source file
        file: String,
        /// Query term, e.g. "(path ?x ?y)"
        term: String,
    },
    /// Load a file, submit moves, and report the resulting position
    Play {
        /// Path to a .gdl source file
        file: String,
        /// A move as "player:term", repeatable
        #[arg(long = "move")]
        moves: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("gdl_core=debug")
            .init();
    }

    let outcome = match cli.command {
        Commands::Check { file } => check_command(&file),
        Commands::Query { file, term } => query_command(&file, &term),
        Commands::Play { file, moves } => play_command(&file, &moves),
    };

    if let Err(err) = outcome {
        println!("{} {}", "✗".red(), err);
        process::exit(1);
    }
    Ok(())
}

fn read_source(file: &str) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("failed to read file: {file}"))
}

fn parse_term(source: &str) -> Result<Term> {
    let tokens = lexer::lex(source, None);
    let mut terms = gdl_parser::parse(&tokens)?;
    terms
        .pop()
        .with_context(|| format!("no term found in '{source}'"))
}

fn check_command(file: &str) -> Result<()> {
    println!("{} Checking {}...", "→".blue(), file);
    let source = read_source(file)?;
    let fsm = StateMachine::store(&source, Some(file))?;
    println!("{} Game loaded successfully", "✓".green());
    println!("  Players: {}", fsm.players().len());
    for player in fsm.players() {
        println!("    - {player}");
    }
    Ok(())
}

fn query_command(file: &str, term: &str) -> Result<()> {
    let source = read_source(file)?;
    let mut fsm = StateMachine::store(&source, Some(file))?;
    let query_term = parse_term(term)?;
    match fsm.query(&query_term)? {
        QueryResult::Boolean(b) => println!("{b}"),
        QueryResult::Bindings(bindings) => {
            if bindings.is_empty() {
                println!("false");
            }
            for binding in &bindings {
                let rendered: Vec<String> = binding
                    .iter()
                    .map(|(name, value)| format!("?{name} = {value}"))
                    .collect();
                println!("{{{}}}", rendered.join(", "));
            }
        }
    }
    Ok(())
}

fn play_command(file: &str, moves: &[String]) -> Result<()> {
    let source = read_source(file)?;
    let mut fsm = StateMachine::store(&source, Some(file))?;

    for raw in moves {
        let (player, move_term) = raw
            .split_once(':')
            .with_context(|| format!("move '{raw}' is not in 'player:term' form"))?;
        fsm.submit_move(player, move_term)?;
        println!("{} {player} played {move_term}", "▸".blue());
    }

    if fsm.is_terminal()? {
        println!("{} Position is terminal", "=".blue().bold());
        if let ScoreResult::ByPlayer(scores) = fsm.score(None)? {
            for (player, score) in scores {
                println!("  {player}: {score}");
            }
        }
        return Ok(());
    }

    println!("{} Not terminal", "▸".blue());
    match fsm.legal(None, None)? {
        LegalResult::ByPlayer(moves_by_player) => {
            for (player, legal_moves) in moves_by_player {
                println!("  {player}: {}", legal_moves.join(", "));
            }
        }
        _ => unreachable!("legal(None, None) always returns ByPlayer"),
    }

    Ok(())
}
