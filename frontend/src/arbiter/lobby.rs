use crate::arbiter::battle::{Battle, Summary};
use crate::arbiter::config::BattleConfig;
use crate::arbiter::instance::Instance;
use crate::line_stream::AsyncLineStream;
use crate::protocol::{ArbiterMessage, Protocol};
use log::{debug, info, trace};
use smol::lock::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock, Weak};

/// Finished battles kept for the console.
const MAX_RESULTS: usize = 100;

/// Agents waiting for an opponent, observers, and the battle currently running.
/// Shared by the connection tasks, the battle task and the console.
pub struct Lobby {
    this: Weak<RwLock<Self>>,
    config: BattleConfig,
    waiting: VecDeque<Instance>,
    observers: Observers,
    battle: Option<Arc<RwLock<Battle>>>,
    results: VecDeque<Summary>,
}

impl Lobby {
    pub fn new(config: BattleConfig) -> Arc<RwLock<Self>> {
        Arc::new_cyclic(|weak| {
            RwLock::new(Self {
                this: weak.clone(),
                config,
                waiting: VecDeque::new(),
                observers: Observers::default(),
                battle: None,
                results: VecDeque::new(),
            })
        })
    }

    pub fn join(&mut self, instance: Instance) {
        info!("'{}' is waiting for an opponent", instance.name());
        self.waiting.push_back(instance);
        self.match_waiting();
    }

    pub fn battle(&self) -> Option<Arc<RwLock<Battle>>> {
        self.battle.clone()
    }

    pub fn observers(&self) -> Observers {
        self.observers.clone()
    }

    /// Most recent last.
    pub fn results(&self) -> impl Iterator<Item = &Summary> {
        self.results.iter()
    }

    pub fn record(&mut self, summary: Summary) {
        info!("{summary}");
        if self.results.len() == MAX_RESULTS {
            self.results.pop_front();
        }
        self.results.push_back(summary);
    }

    pub fn iter_waiting(&self) -> impl Iterator<Item = &str> {
        self.waiting.iter().map(Instance::name)
    }

    fn match_waiting(&mut self) {
        if self.battle.is_some() || self.waiting.len() < 2 {
            debug!("{} agents waiting, no battle to start", self.waiting.len());
            return;
        }

        let (Some(red), Some(black)) = (self.waiting.pop_front(), self.waiting.pop_front()) else {
            return;
        };
        let Some(this) = self.this.upgrade() else {
            return;
        };

        let battle = Battle::new(red.name().to_owned(), black.name().to_owned(), self.config.clone());
        let battle = Arc::new(RwLock::new(battle));
        self.battle = Some(battle.clone());
        let observers = self.observers.clone();

        trace!("spawning battle between '{}' and '{}'", red.name(), black.name());

        smol::spawn(async move {
            let (red, black) = Instance::compete(&observers, &battle, red, black).await;

            let Ok(mut lobby) = this.write() else {
                return;
            };

            if let Ok(battle) = battle.read() {
                lobby.record(battle.summary());
            }

            lobby.battle = None;
            lobby.waiting.extend(red);
            lobby.waiting.extend(black);
            lobby.match_waiting();
        })
        .detach();
    }
}

struct Observer {
    stream: AsyncLineStream,
    /// Plies already contained in the board this observer was sent.
    since: usize,
}

/// Connections watching battles. Joining and broadcasting take turns on one async lock,
/// so an observer sees every move exactly once after the board it was sent.
#[derive(Clone, Default)]
pub struct Observers(Arc<Mutex<Vec<Observer>>>);

impl Observers {
    /// Sends the board of the battle `current` returns, if any, and registers the observer.
    pub async fn watch(
        &self,
        mut stream: AsyncLineStream,
        current: impl FnOnce() -> Option<Arc<RwLock<Battle>>>,
    ) -> std::io::Result<()> {
        let mut observers = self.0.lock().await;

        let snapshot = current().and_then(|battle| {
            let battle = battle.read().ok()?;
            let game = ArbiterMessage::Game {
                board: battle.game().serialize(),
                side: battle.game().active_side(),
            };
            Some((game, battle.game().move_count()))
        });

        let since = match snapshot {
            Some((game, since)) => {
                stream.write_line(&Protocol::encode_arbiter(&game)).await?;
                since
            }
            None => 0,
        };

        info!("observer {} joined", stream.peer().map_or("?".to_string(), |peer| peer.to_string()));
        observers.push(Observer { stream, since });
        Ok(())
    }

    /// Sends one message to every observer, dropping those that have gone away.
    /// `ply` is the index of the move an update carries.
    pub async fn broadcast(&self, message: &ArbiterMessage, ply: Option<usize>) {
        let mut observers = self.0.lock().await;
        let line = Protocol::encode_arbiter(message);
        let mut alive = Vec::with_capacity(observers.len());

        for mut observer in observers.drain(..) {
            if ply.is_some_and(|ply| ply < observer.since) {
                alive.push(observer);
                continue;
            }
            if let ArbiterMessage::Game { .. } = message {
                observer.since = 0;
            }

            if observer.stream.write_line(&line).await.is_ok() {
                alive.push(observer);
            } else {
                debug!("dropping observer that stopped listening");
            }
        }

        *observers = alive;
    }

    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }
}
