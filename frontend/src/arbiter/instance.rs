use crate::arbiter::battle::{Battle, BattleStatus, Verdict};
use crate::arbiter::config::BattleConfig;
use crate::arbiter::lobby::Observers;
use crate::line_stream::AsyncLineStream;
use crate::protocol::{ArbiterMessage, PlayerMessage, Protocol};
use log::{debug, info, trace, warn};
use smol::Timer;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use xiangqi_arena::game::MoveRecord;
use xiangqi_arena::piece::Side;

/// A connected agent.
pub struct Instance {
    name: String,
    stream: AsyncLineStream,
}

enum Reply {
    Message(PlayerMessage),
    Timeout,
    Closed,
}

fn with_battle<T>(battle: &RwLock<Battle>, f: impl FnOnce(&mut Battle) -> T) -> Option<T> {
    battle.write().ok().map(|mut battle| f(&mut battle))
}

impl Instance {
    pub fn new(name: String, stream: AsyncLineStream) -> Self {
        info!("new instance '{name}' registered");
        Self { name, stream }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `battle` to the end with `red` and `black` as its agents. Agents that are still connected
    /// afterwards are handed back.
    pub async fn compete(
        observers: &Observers,
        battle: &RwLock<Battle>,
        mut red: Instance,
        mut black: Instance,
    ) -> (Option<Instance>, Option<Instance>) {
        let started = with_battle(battle, |battle| {
            battle.start();
            let game = ArbiterMessage::Game {
                board: battle.game().serialize(),
                side: battle.game().active_side(),
            };
            (game, battle.config().clone())
        });

        let Some((game, config)) = started else {
            return (Some(red), Some(black));
        };

        debug!("starting game with '{}' as red and '{}' as black", red.name, black.name);

        let result = match Self::compete_init(&game, &mut red, &mut black).await {
            Ok(()) => {
                observers.broadcast(&game, None).await;
                Self::compete_main(observers, battle, &config, &mut red, &mut black).await
            }
            Err(side) => Err(side),
        };

        if let Err(side) = result {
            let name = match side {
                Side::Red => &red.name,
                Side::Black => &black.name,
            };
            warn!("game terminated due to '{name}' disconnecting");
            with_battle(battle, |battle| battle.forfeit(side, "disconnected"));
        }

        let end = with_battle(battle, |battle| battle.outcome()).flatten();
        if let Some(outcome) = end {
            let message = ArbiterMessage::End {
                winner: outcome.winner,
                reason: outcome.reason.name().to_owned(),
            };
            let _ = red.send(&message).await;
            let _ = black.send(&message).await;
            observers.broadcast(&message, None).await;
        }

        match result {
            Err(Side::Red) => (None, Some(black)),
            Err(Side::Black) => (Some(red), None),
            Ok(()) => (Some(red), Some(black)),
        }
    }

    async fn recv(&mut self) -> Option<PlayerMessage> {
        loop {
            let line = self.stream.read_line().await?;
            trace!("'{}' sent {line}", self.name);

            match Protocol::decode_player(&line) {
                Some(message) => return Some(message),
                None => warn!("'{}' sent unrecognized line {line:?}", self.name),
            }
        }
    }

    async fn recv_within(&mut self, time: Duration) -> Reply {
        let recv = async {
            match self.recv().await {
                Some(message) => Reply::Message(message),
                None => Reply::Closed,
            }
        };
        let timeout = async {
            Timer::after(time).await;
            Reply::Timeout
        };
        smol::future::or(recv, timeout).await
    }

    async fn send(&mut self, message: &ArbiterMessage) -> std::io::Result<()> {
        self.stream.write_line(&Protocol::encode_arbiter(message)).await
    }

    async fn wait_ready(&mut self, side: Side) -> Result<(), Side> {
        loop {
            match self.recv().await {
                Some(PlayerMessage::Ready) => return Ok(()),
                Some(_) => {}
                None => return Err(side),
            }
        }
    }

    async fn compete_init(game: &ArbiterMessage, red: &mut Instance, black: &mut Instance) -> Result<(), Side> {
        smol::future::try_zip(
            async { red.send(game).await.map_err(|_| Side::Red) },
            async { black.send(game).await.map_err(|_| Side::Black) },
        )
        .await?;

        smol::future::try_zip(red.wait_ready(Side::Red), black.wait_ready(Side::Black)).await?;
        trace!("both '{}' and '{}' are ready for game", red.name, black.name);
        Ok(())
    }

    async fn compete_main(
        observers: &Observers,
        battle: &RwLock<Battle>,
        config: &BattleConfig,
        red: &mut Instance,
        black: &mut Instance,
    ) -> Result<(), Side> {
        loop {
            let Some((status, side)) = with_battle(battle, |battle| (battle.status(), battle.game().active_side()))
            else {
                return Ok(());
            };

            match status {
                status if status.is_over() => {
                    debug!("game between '{}' and '{}' concluded as {status}", red.name, black.name);
                    return Ok(());
                }
                BattleStatus::Playing => {}
                _ => {
                    Timer::after(Duration::from_millis(100)).await;
                    continue;
                }
            }

            let player = match side {
                Side::Red => &mut *red,
                Side::Black => &mut *black,
            };

            let Some(record) = player.take_turn(battle, config, side).await? else {
                continue;
            };

            let ply = record.index;
            let message = ArbiterMessage::Update {
                mv: record.mv(),
                notation: record.notation,
            };
            smol::future::try_zip(
                async { red.send(&message).await.map_err(|_| Side::Red) },
                async { black.send(&message).await.map_err(|_| Side::Black) },
            )
            .await?;
            observers.broadcast(&message, Some(ply)).await;
        }
    }

    /// Prompts until the move is accepted, the agent forfeits, or the battle leaves the playing state.
    async fn take_turn(
        &mut self,
        battle: &RwLock<Battle>,
        config: &BattleConfig,
        side: Side,
    ) -> Result<Option<MoveRecord>, Side> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            trace!("prompting '{}' for move with {}ms remaining", self.name, config.move_time);
            self.send(&ArbiterMessage::Prompt { time: config.move_time })
                .await
                .map_err(|_| side)?;

            let started = Instant::now();
            let (candidate, verdict) = loop {
                match self.recv_within(config.move_time()).await {
                    Reply::Closed => return Err(side),
                    Reply::Timeout => break ("-".to_owned(), with_battle(battle, |battle| battle.timeout(side))),
                    Reply::Message(PlayerMessage::Play { mv }) => {
                        let verdict = with_battle(battle, |battle| battle.submit(side, &mv, started.elapsed()));
                        break (mv, verdict);
                    }
                    Reply::Message(message) => debug!("'{}' sent {message:?} instead of a move", self.name),
                }
            };

            match verdict {
                None => return Ok(None),
                Some(Err(err)) => {
                    debug!("move from '{}' dropped: {err}", self.name);
                    return Ok(None);
                }
                Some(Ok(Verdict::Accepted(record))) => return Ok(Some(record)),
                Some(Ok(Verdict::Rejected { reason, remaining })) => {
                    trace!("'{}' has {remaining} attempts left", self.name);
                    self.send(&ArbiterMessage::Reject { candidate, reason })
                        .await
                        .map_err(|_| side)?;
                    Timer::after(config.backoff(attempt)).await;
                }
                Some(Ok(Verdict::Forfeited { reason })) => {
                    let _ = self.send(&ArbiterMessage::Reject { candidate, reason }).await;
                    return Ok(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol::net::{TcpListener, TcpStream};

    fn config() -> BattleConfig {
        BattleConfig {
            max_moves: 200,
            max_attempts: 3,
            move_time: 300,
            backoff: 40,
        }
    }

    async fn pair(listener: &TcpListener) -> (AsyncLineStream, AsyncLineStream) {
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (AsyncLineStream::new(server), AsyncLineStream::new(client))
    }

    async fn agent(listener: &TcpListener, name: &str) -> (Instance, AsyncLineStream) {
        let (server, client) = pair(listener).await;
        (Instance::new(name.to_owned(), server), client)
    }

    async fn line(stream: &mut AsyncLineStream) -> String {
        stream.read_line().await.unwrap()
    }

    async fn ready(stream: &mut AsyncLineStream) {
        assert!(line(stream).await.starts_with("game "));
        stream.write_line("ready").await.unwrap();
    }

    #[test]
    fn bad_moves_back_off_then_forfeit() {
        smol::block_on(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let (red, mut alpha) = agent(&listener, "alpha").await;
            let (black, mut beta) = agent(&listener, "beta").await;
            let observers = Observers::default();
            let (server, mut watcher) = pair(&listener).await;
            observers.watch(server, || None).await.unwrap();
            let battle = RwLock::new(Battle::new("alpha".into(), "beta".into(), config()));

            let script = async {
                ready(&mut alpha).await;
                ready(&mut beta).await;

                assert_eq!(line(&mut alpha).await, "prompt 300");
                alpha.write_line("play zz99").await.unwrap();
                assert_eq!(line(&mut alpha).await, "reject zz99 malformed");
                let rejected = Instant::now();
                assert_eq!(line(&mut alpha).await, "prompt 300");
                assert!(rejected.elapsed() >= Duration::from_millis(30));

                alpha.write_line("play a9a6").await.unwrap();
                assert_eq!(line(&mut alpha).await, "reject a9a6 illegal");
                let rejected = Instant::now();
                assert_eq!(line(&mut alpha).await, "prompt 300");
                assert!(rejected.elapsed() >= Duration::from_millis(70));

                // third attempt runs out the clock
                assert_eq!(line(&mut alpha).await, "reject - timeout");
                assert_eq!(line(&mut alpha).await, "end black forfeit");
                assert_eq!(line(&mut beta).await, "end black forfeit");
            };

            let ((red, black), ()) = smol::future::zip(Instance::compete(&observers, &battle, red, black), script).await;
            assert!(red.is_some() && black.is_some());

            assert!(line(&mut watcher).await.starts_with("game "));
            assert_eq!(line(&mut watcher).await, "end black forfeit");

            let battle = battle.read().unwrap();
            assert_eq!(battle.summary().winner(), Some("beta"));
            assert_eq!(battle.game().move_count(), 0);
        });
    }

    #[test]
    fn moves_fan_out_and_pause_holds_prompts() {
        smol::block_on(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let (red, mut alpha) = agent(&listener, "alpha").await;
            let (black, mut beta) = agent(&listener, "beta").await;
            let observers = Observers::default();
            let (server, mut watcher) = pair(&listener).await;
            observers.watch(server, || None).await.unwrap();
            let battle = RwLock::new(Battle::new("alpha".into(), "beta".into(), config()));

            let script = async {
                ready(&mut alpha).await;
                ready(&mut beta).await;

                assert_eq!(line(&mut alpha).await, "prompt 300");
                alpha.write_line("play h7e7").await.unwrap();
                assert_eq!(line(&mut alpha).await, "update h7e7 炮二平五");
                assert_eq!(line(&mut beta).await, "update h7e7 炮二平五");

                assert_eq!(line(&mut beta).await, "prompt 300");
                assert!(battle.write().unwrap().pause());
                beta.write_line("play h0g2").await.unwrap();
                Timer::after(Duration::from_millis(150)).await;
                assert_eq!(battle.read().unwrap().game().move_count(), 1);

                assert!(battle.write().unwrap().resume());
                assert_eq!(line(&mut beta).await, "prompt 300");
                beta.write_line("play h0g2").await.unwrap();
                assert_eq!(line(&mut alpha).await, "update h0g2 馬８进７");
                assert_eq!(line(&mut beta).await, "update h0g2 馬８进７");

                assert_eq!(line(&mut alpha).await, "prompt 300");
                assert!(battle.write().unwrap().stop());
                assert_eq!(line(&mut alpha).await, "end draw stopped");
                assert_eq!(line(&mut beta).await, "end draw stopped");
            };

            let ((red, black), ()) = smol::future::zip(Instance::compete(&observers, &battle, red, black), script).await;
            assert!(red.is_some() && black.is_some());

            assert!(line(&mut watcher).await.starts_with("game "));
            assert_eq!(line(&mut watcher).await, "update h7e7 炮二平五");
            assert_eq!(line(&mut watcher).await, "update h0g2 馬８进７");
            assert_eq!(line(&mut watcher).await, "end draw stopped");
            assert_eq!(battle.read().unwrap().summary().black.moves, 1);
        });
    }

    #[test]
    fn disconnect_before_ready_forfeits() {
        smol::block_on(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let (red, mut alpha) = agent(&listener, "alpha").await;
            let (black, mut beta) = agent(&listener, "beta").await;
            let observers = Observers::default();
            let battle = RwLock::new(Battle::new("alpha".into(), "beta".into(), config()));

            let script = async {
                ready(&mut alpha).await;
                assert!(line(&mut beta).await.starts_with("game "));
                drop(beta);
                assert_eq!(line(&mut alpha).await, "end red forfeit");
            };

            let ((red, black), ()) = smol::future::zip(Instance::compete(&observers, &battle, red, black), script).await;
            assert_eq!(red.map(|instance| instance.name), Some("alpha".to_owned()));
            assert!(black.is_none());
        });
    }
}
