use crate::arbiter::config::BattleConfig;
use chrono::{DateTime, Local, TimeDelta};
use log::{debug, info, warn};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use xiangqi_arena::display_format::DisplayFormat;
use xiangqi_arena::game::{Game, GameResult, MoveRecord};
use xiangqi_arena::piece::Side;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BattleStatus {
    Waiting,
    Playing,
    Paused,
    Finished,
    Stopped,
    Error,
}

impl BattleStatus {
    pub fn is_over(self) -> bool {
        matches!(self, Self::Finished | Self::Stopped | Self::Error)
    }
}

impl Display for BattleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Finished => "finished",
            Self::Stopped => "stopped",
            Self::Error => "error",
        };
        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum EndReason {
    Capture,
    MoveLimit,
    Forfeit,
    Stopped,
    Aborted,
}

impl EndReason {
    pub fn name(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::MoveLimit => "limit",
            Self::Forfeit => "forfeit",
            Self::Stopped => "stopped",
            Self::Aborted => "aborted",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Outcome {
    pub winner: Option<Side>,
    pub reason: EndReason,
}

#[derive(Clone, Debug)]
pub enum BattleEvent {
    Move {
        agent: String,
        record: MoveRecord,
        evaluation: f64,
        board: String,
        thinking: Duration,
        at: DateTime<Local>,
    },
    Rejected {
        agent: String,
        side: Side,
        candidate: String,
        reason: String,
        attempt: u32,
        at: DateTime<Local>,
    },
    Error {
        message: String,
        at: DateTime<Local>,
    },
}

/// What became of one move attempt.
#[derive(Clone, Debug)]
pub enum Verdict {
    Accepted(MoveRecord),
    Rejected { reason: String, remaining: u32 },
    Forfeited { reason: String },
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum BattleError {
    NotPlaying(BattleStatus),
    OutOfTurn(Side),
}

impl Display for BattleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPlaying(status) => write!(f, "battle is {status}"),
            Self::OutOfTurn(side) => write!(f, "it is not {side}'s turn"),
        }
    }
}

impl std::error::Error for BattleError {}

/// One contest between two named agents. Owns the game and is the only thing that feeds it moves.
pub struct Battle {
    game: Game,
    red: String,
    black: String,
    config: BattleConfig,
    status: BattleStatus,
    events: Vec<BattleEvent>,
    failed_attempts: u32,
    started: Option<DateTime<Local>>,
    finished: Option<DateTime<Local>>,
    outcome: Option<Outcome>,
}

impl Battle {
    pub fn new(red: String, black: String, config: BattleConfig) -> Self {
        Self {
            game: Game::opening(),
            red,
            black,
            config,
            status: BattleStatus::Waiting,
            events: Vec::new(),
            failed_attempts: 0,
            started: None,
            finished: None,
            outcome: None,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn status(&self) -> BattleStatus {
        self.status
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn agent(&self, side: Side) -> &str {
        match side {
            Side::Red => &self.red,
            Side::Black => &self.black,
        }
    }

    pub fn start(&mut self) -> bool {
        if self.status != BattleStatus::Waiting {
            return false;
        }
        info!("battle started: '{}' (red) vs '{}' (black)", self.red, self.black);
        self.status = BattleStatus::Playing;
        self.started = Some(Local::now());
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.status != BattleStatus::Playing {
            return false;
        }
        self.status = BattleStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != BattleStatus::Paused {
            return false;
        }
        self.status = BattleStatus::Playing;
        true
    }

    pub fn stop(&mut self) -> bool {
        if self.status.is_over() {
            return false;
        }
        self.finish(BattleStatus::Stopped, None, EndReason::Stopped);
        true
    }

    /// Back to the opening with a fresh log, ready to start again.
    pub fn reset(&mut self) {
        self.game.reset();
        self.status = BattleStatus::Waiting;
        self.events.clear();
        self.failed_attempts = 0;
        self.started = None;
        self.finished = None;
        self.outcome = None;
    }

    fn finish(&mut self, status: BattleStatus, winner: Option<Side>, reason: EndReason) {
        self.status = status;
        self.outcome = Some(Outcome { winner, reason });
        self.finished = Some(Local::now());

        match winner {
            Some(side) => info!("battle over by {}: '{}' wins", reason.name(), self.agent(side)),
            None => info!("battle over by {} without a winner", reason.name()),
        }
    }

    fn check_turn(&self, side: Side) -> Result<(), BattleError> {
        if self.status != BattleStatus::Playing {
            return Err(BattleError::NotPlaying(self.status));
        }
        if self.game.active_side() != side {
            return Err(BattleError::OutOfTurn(side));
        }
        Ok(())
    }

    /// Feeds an agent's candidate move to the game, counting failures against the agent's turn.
    pub fn submit(&mut self, side: Side, candidate: &str, thinking: Duration) -> Result<Verdict, BattleError> {
        self.check_turn(side)?;

        let record = match self.game.try_apply(candidate) {
            Ok(record) => record.clone(),
            Err(err) => return Ok(self.miss(side, candidate, err.reason())),
        };

        self.failed_attempts = 0;
        self.events.push(BattleEvent::Move {
            agent: self.agent(side).to_owned(),
            record: record.clone(),
            evaluation: self.game.evaluate(),
            board: self.game.serialize(),
            thinking,
            at: Local::now(),
        });
        debug!(
            "'{}' played {} {} ({:+.2})",
            self.agent(side),
            record.mv(),
            record.notation,
            self.game.evaluate()
        );

        match self.game.result() {
            GameResult::InProgress if self.game.move_count() >= self.config.max_moves => {
                self.finish(BattleStatus::Finished, None, EndReason::MoveLimit)
            }
            GameResult::InProgress => {}
            GameResult::RedWins => self.finish(BattleStatus::Finished, Some(Side::Red), EndReason::Capture),
            GameResult::BlackWins => self.finish(BattleStatus::Finished, Some(Side::Black), EndReason::Capture),
            GameResult::Draw => self.finish(BattleStatus::Finished, None, EndReason::Capture),
        }

        Ok(Verdict::Accepted(record))
    }

    /// The agent did not answer within the move time.
    pub fn timeout(&mut self, side: Side) -> Result<Verdict, BattleError> {
        self.check_turn(side)?;
        Ok(self.miss(side, "-", "timeout"))
    }

    fn miss(&mut self, side: Side, candidate: &str, reason: &str) -> Verdict {
        self.failed_attempts += 1;
        warn!(
            "'{}' attempt {} of {} failed: {reason} {candidate:?}",
            self.agent(side),
            self.failed_attempts,
            self.config.max_attempts
        );

        self.events.push(BattleEvent::Rejected {
            agent: self.agent(side).to_owned(),
            side,
            candidate: candidate.to_owned(),
            reason: reason.to_owned(),
            attempt: self.failed_attempts,
            at: Local::now(),
        });

        if self.failed_attempts >= self.config.max_attempts {
            self.forfeit(side, &format!("no valid move after {} attempts", self.failed_attempts));
            return Verdict::Forfeited { reason: reason.to_owned() };
        }

        Verdict::Rejected {
            reason: reason.to_owned(),
            remaining: self.config.max_attempts - self.failed_attempts,
        }
    }

    /// `side` leaves the battle, by disconnecting or running out of attempts.
    pub fn forfeit(&mut self, side: Side, message: &str) {
        if self.status.is_over() {
            return;
        }
        self.events.push(BattleEvent::Error {
            message: format!("'{}' forfeits: {message}", self.agent(side)),
            at: Local::now(),
        });
        self.finish(BattleStatus::Finished, Some(side.opponent()), EndReason::Forfeit);
    }

    /// The battle could not go on for reasons neither agent is blamed for.
    pub fn abort(&mut self, message: &str) {
        if self.status.is_over() {
            return;
        }
        self.events.push(BattleEvent::Error {
            message: message.to_owned(),
            at: Local::now(),
        });
        self.finish(BattleStatus::Error, None, EndReason::Aborted);
    }

    pub fn duration(&self) -> TimeDelta {
        match self.started {
            Some(started) => self.finished.unwrap_or_else(Local::now) - started,
            None => TimeDelta::zero(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            red: self.red.clone(),
            black: self.black.clone(),
            board: self.game.serialize(),
            rendered: self.game.display(DisplayFormat::string().with_concise(false)).to_string(),
            side: self.game.active_side(),
            move_count: self.game.move_count(),
            last_move: self.game.last_move().map(|record| format!("{} {}", record.mv(), record.notation)),
            legal_moves: self.game.legal_moves(),
            evaluation: self.game.evaluate(),
        }
    }

    /// Accepted moves and thinking time of one side, from the event log.
    pub fn stats(&self, side: Side) -> AgentStats {
        let mut stats = AgentStats {
            name: self.agent(side).to_owned(),
            moves: 0,
            thinking: Duration::ZERO,
        };

        for event in &self.events {
            if let BattleEvent::Move { record, thinking, .. } = event
                && record.side == side
            {
                stats.moves += 1;
                stats.thinking += *thinking;
            }
        }

        stats
    }

    pub fn summary(&self) -> Summary {
        Summary {
            red: self.stats(Side::Red),
            black: self.stats(Side::Black),
            status: self.status,
            outcome: self.outcome,
            total_moves: self.game.move_count(),
            duration: self.duration(),
            transcript: self.game.transcript(),
        }
    }
}

/// Point-in-time view for consoles and observers.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub status: BattleStatus,
    pub red: String,
    pub black: String,
    pub board: String,
    pub rendered: String,
    pub side: Side,
    pub move_count: usize,
    pub last_move: Option<String>,
    pub legal_moves: Vec<String>,
    pub evaluation: f64,
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "'{}' (red) vs '{}' (black) - {}", self.red, self.black, self.status)?;
        write!(f, "{}", self.rendered)?;
        write!(f, "{} moves played, {} to move", self.move_count, self.side)?;
        if let Some(last_move) = &self.last_move {
            write!(f, ", last {last_move}")?;
        }
        writeln!(f, ", evaluation {:+.2}", self.evaluation)?;
        writeln!(f, "legal: {}", self.legal_moves.join(" "))
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AgentStats {
    pub name: String,
    pub moves: usize,
    pub thinking: Duration,
}

impl AgentStats {
    pub fn average(&self) -> Duration {
        match u32::try_from(self.moves) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(moves) => self.thinking / moves,
        }
    }
}

impl Display for AgentStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' {} moves, {:.3}s thinking ({:.3}s avg)",
            self.name,
            self.moves,
            self.thinking.as_secs_f64(),
            self.average().as_secs_f64()
        )
    }
}

#[derive(Clone, Debug)]
pub struct Summary {
    pub red: AgentStats,
    pub black: AgentStats,
    pub status: BattleStatus,
    pub outcome: Option<Outcome>,
    pub total_moves: usize,
    pub duration: TimeDelta,
    pub transcript: String,
}

impl Summary {
    pub fn winner(&self) -> Option<&str> {
        match self.outcome?.winner? {
            Side::Red => Some(self.red.name.as_str()),
            Side::Black => Some(self.black.name.as_str()),
        }
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' vs '{}' - ", self.red.name, self.black.name)?;
        match (self.outcome, self.winner()) {
            (None, _) => write!(f, "{}", self.status)?,
            (Some(outcome), Some(winner)) => write!(f, "'{winner}' won by {}", outcome.reason.name())?,
            (Some(outcome), None) => write!(f, "no winner ({})", outcome.reason.name())?,
        }
        writeln!(
            f,
            " after {} moves in {}.{:03}s",
            self.total_moves,
            self.duration.num_seconds(),
            self.duration.num_milliseconds() % 1000
        )?;
        writeln!(f, "  red:   {}", self.red)?;
        write!(f, "  black: {}", self.black)
    }
}
