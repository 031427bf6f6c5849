//! `inkflow chat` — interactive concierge session.

use crate::commands::build_stack;
use inkflow_agent::ConciergeDispatcher;
use inkflow_core::{Session, SessionKey, Turn};
use std::io::{BufRead, Write};

pub async fn run(session_id: &str) -> anyhow::Result<()> {
    let stack = build_stack().await?;

    println!();
    println!("  Inkflow 智能助理  —  model: {}", stack.config.default_model);
    println!("  输入内容并回车；输入 exit 退出。");
    println!();

    let dispatcher = ConciergeDispatcher::new(
        stack.llm,
        stack.notes,
        stack.counters,
        stack.stops,
        stack.sink,
    );

    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "local".into());
    let mut session = Session::new(SessionKey::new(user, session_id));

    let stdin = std::io::stdin();
    loop {
        print!("you > ");
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }

        session.push(Turn::user(line));
        match dispatcher.run(&session, line).await {
            Ok(outcome) => {
                let reply: Vec<String> = outcome
                    .results
                    .iter()
                    .chain(outcome.re_analysis.iter().flatten())
                    .map(|r| r.content.clone())
                    .collect();
                session.push(Turn::assistant(reply.join("\n")));
            }
            Err(e) => {
                eprintln!("error: {e}");
            }
        }
        println!();
    }

    Ok(())
}
