use crate::arbiter::battle::{Battle, BattleEvent};
use crate::arbiter::lobby::Lobby;
use clap::{Parser, Subcommand};
use std::sync::{Arc, RwLock};

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "show the current battle and waiting agents")]
    Status,
    #[command(about = "stop prompting agents until resumed")]
    Pause,
    #[command(about = "continue a paused battle")]
    Resume,
    #[command(about = "end the current battle without a winner")]
    Stop,
    #[command(about = "print the move transcript of the current battle")]
    History,
    #[command(about = "print the latest battle events")]
    Log {
        #[arg(default_value_t = 10, help = "how many events to show")]
        count: usize,
    },
    #[command(about = "list finished battles")]
    Results,
    #[command(about = "shut the console down, battles keep running")]
    Quit,
}

pub struct Control {
    lobby: Arc<RwLock<Lobby>>,
}

impl Control {
    pub fn new(lobby: Arc<RwLock<Lobby>>) -> Self {
        Self { lobby }
    }

    pub fn begin(&mut self) {
        while let Some(command) = read_input::<Command>() {
            if !self.execute(command) {
                return;
            }
        }
    }

    /// Runs one console command, false once the console should close.
    fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::Status => self.status(),
            Command::Pause => self.with_battle(|battle| println!("paused: {}", battle.pause())),
            Command::Resume => self.with_battle(|battle| println!("resumed: {}", battle.resume())),
            Command::Stop => self.with_battle(|battle| println!("stopped: {}", battle.stop())),
            Command::History => self.with_battle(|battle| println!("{}", battle.game().transcript())),
            Command::Log { count } => self.with_battle(|battle| {
                let events = battle.events();
                for event in &events[events.len().saturating_sub(count)..] {
                    print_event(event);
                }
            }),
            Command::Results => self.results(),
            Command::Quit => return false,
        }
        true
    }

    fn results(&self) {
        let Ok(lobby) = self.lobby.read() else {
            println!("lobby is unavailable");
            return;
        };

        let mut results = lobby.results().peekable();
        if results.peek().is_none() {
            println!("no battle has finished yet");
        }
        for (index, summary) in results.enumerate() {
            println!("{}. {summary}", index + 1);
        }
    }

    fn status(&self) {
        let Ok(lobby) = self.lobby.read() else {
            println!("lobby is unavailable");
            return;
        };

        println!("waiting agents:");
        for name in lobby.iter_waiting() {
            println!("{name}");
        }

        let battle = lobby.battle();
        drop(lobby);

        match battle.as_ref().and_then(|battle| battle.read().ok()) {
            Some(battle) => print!("{}", battle.snapshot()),
            None => println!("no battle in progress"),
        }
    }

    fn with_battle(&self, f: impl FnOnce(&mut Battle)) {
        let battle = self.lobby.read().ok().and_then(|lobby| lobby.battle());
        let Some(battle) = battle else {
            println!("no battle in progress");
            return;
        };

        if let Ok(mut battle) = battle.write() {
            f(&mut battle);
        }
    }
}

fn print_event(event: &BattleEvent) {
    match event {
        BattleEvent::Move {
            agent,
            record,
            evaluation,
            thinking,
            at,
            ..
        } => println!(
            "[{}] '{agent}' {} {} ({evaluation:+.2}) in {}ms",
            at.format("%T"),
            record.mv(),
            record.notation,
            thinking.as_millis()
        ),
        BattleEvent::Rejected {
            agent,
            candidate,
            reason,
            attempt,
            ..
        } => println!("'{agent}' attempt {attempt} rejected: {candidate} {reason}"),
        BattleEvent::Error { message, at } => println!("[{}] {message}", at.format("%T")),
    }
}

/// Reads console lines until one parses as a `T`. `None` once stdin is closed.
fn read_input<T: clap::FromArgMatches + clap::Subcommand>() -> Option<T> {
    loop {
        let mut line = String::new();
        if let Err(_) | Ok(0) = std::io::stdin().read_line(&mut line) {
            return None;
        }

        let parts = line.split_whitespace();

        #[derive(Parser)]
        #[command(
            name = "",
            no_binary_name = true,
            disable_help_flag = true,
            disable_version_flag = true,
            next_line_help = false,
            help_template = "{usage-heading} {usage}\n{all-args}"
        )]
        struct Input<T: clap::FromArgMatches + clap::Subcommand> {
            #[command(subcommand)]
            command: T,
        }

        match Input::<T>::try_parse_from(parts) {
            Ok(Input { command }) => return Some(command),
            Err(err) => {
                print!("{}", err);
                continue;
            }
        };
    }
}
