use clap::Parser;
use frontend::line_stream::LineStream;
use frontend::protocol::{ArbiterMessage, PlayerMessage, Protocol, VERSION};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::net::{IpAddr, SocketAddr, TcpStream};
use xiangqi_arena::display_format::DisplayFormat;
use xiangqi_arena::game::Game;
use xiangqi_arena::location::Move;
use xiangqi_arena::piece::Side;

#[derive(Parser, Debug)]
struct Arguments {
    #[clap(short, long, default_value = "127.0.0.1")]
    ip: IpAddr,

    #[clap(short, long, default_value_t = 5000)]
    port: u16,

    #[clap(short, long, default_value = "robot")]
    name: String,

    #[clap(short, long, help = "take the move with the best material balance instead of a random one")]
    greedy: bool,

    #[clap(long, default_value_t = 0.0, help = "chance of sending a malformed move instead")]
    noise: f64,

    #[clap(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let arguments = Arguments::parse();

    let stream = TcpStream::connect(SocketAddr::new(arguments.ip, arguments.port))?;
    let stream = LineStream::new(&stream);
    let send = |message: PlayerMessage| stream.write_line(Protocol::encode_player(&message));

    let mut random = arguments
        .seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

    send(PlayerMessage::Init { version: VERSION })?;
    send(PlayerMessage::Info {
        name: arguments.name.clone(),
    })?;

    let mut game = Game::opening();

    while let Some(line) = stream.read_line() {
        let Some(message) = Protocol::decode_arbiter(&line) else {
            warn!("ignoring unrecognized line {line:?}");
            continue;
        };

        match message {
            ArbiterMessage::Game { board, side } => {
                game = Game::from_serialized(&board, side).ok_or("invalid game format")?;
                info!("new game, {side} to move");
                send(PlayerMessage::Ready)?;
            }
            ArbiterMessage::Prompt { time } => {
                debug!("prompted with {time}ms");
                print!("{}", game.display(DisplayFormat::pretty()));

                let mv = answer(&mut game, &arguments, &mut random);
                send(PlayerMessage::Play { mv })?;
            }
            ArbiterMessage::Update { mv, notation } => {
                if let Err(err) = game.play(mv) {
                    return Err(format!("arbiter sent {mv} which does not apply: {err}").into());
                }
                info!("{mv} {notation}");
            }
            ArbiterMessage::Reject { candidate, reason } => warn!("{candidate} rejected: {reason}"),
            ArbiterMessage::End { winner, reason } => match winner {
                Some(side) => println!("{side} won by {reason}"),
                None => println!("no winner, {reason}"),
            },
        }
    }

    Ok(())
}

/// What to send back for a prompt. Something is always sent, so a stuck robot forfeits
/// on rejections rather than waiting out every timeout.
fn answer(game: &mut Game, arguments: &Arguments, random: &mut StdRng) -> String {
    if random.random_bool(arguments.noise.clamp(0.0, 1.0)) {
        return "zz99".to_owned();
    }

    match choose(game, arguments.greedy, random) {
        Some(mv) => mv.to_string(),
        None => {
            warn!("no legal move for {}, passing", game.active_side());
            "pass".to_owned()
        }
    }
}

fn choose(game: &mut Game, greedy: bool, random: &mut StdRng) -> Option<Move> {
    let mut moves = game.legal_move_list();
    moves.shuffle(random);

    if !greedy {
        return moves.first().copied();
    }

    let sign = match game.active_side() {
        Side::Red => 1.0,
        Side::Black => -1.0,
    };

    // shuffled first so equal scores are broken at random
    let mut ranked = Vec::with_capacity(moves.len());
    for mv in moves {
        if game.play(mv).is_ok() {
            ranked.push((mv, sign * game.evaluate()));
            game.undo();
        }
    }

    for (mv, value) in &ranked {
        debug!("{mv} - {value:+.2}");
    }

    ranked
        .into_iter()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(mv, _)| mv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments(extra: &[&str]) -> Arguments {
        Arguments::parse_from(["robot"].into_iter().chain(extra.iter().copied()))
    }

    #[test]
    fn stuck_robot_still_answers() {
        let mut game = Game::from_serialized("4k4/9/9/9/9/9/9/9/9/9", Side::Red).unwrap();
        let mut random = StdRng::seed_from_u64(7);
        assert_eq!(answer(&mut game, &arguments(&[]), &mut random), "pass");
    }

    #[test]
    fn greedy_takes_the_general() {
        let mut game = Game::from_serialized("4k4/9/9/9/9/9/9/9/9/4R1K2", Side::Red).unwrap();
        let mut random = StdRng::seed_from_u64(7);
        assert_eq!(answer(&mut game, &arguments(&["--greedy"]), &mut random), "e9e0");
        assert_eq!(game.move_count(), 0);
    }

    #[test]
    fn full_noise_sends_garbage() {
        let mut game = Game::opening();
        let mut random = StdRng::seed_from_u64(7);
        assert_eq!(answer(&mut game, &arguments(&["--noise", "1"]), &mut random), "zz99");
    }
}
