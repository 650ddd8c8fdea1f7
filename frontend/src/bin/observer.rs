use clap::Parser;
use frontend::line_stream::LineStream;
use frontend::protocol::{ArbiterMessage, PlayerMessage, Protocol, VERSION};
use std::error::Error;
use std::net::{IpAddr, SocketAddr, TcpStream};
use xiangqi_arena::display_format::DisplayFormat;
use xiangqi_arena::game::Game;

#[derive(Parser, Debug)]
struct Arguments {
    #[clap(short, long, default_value = "127.0.0.1")]
    ip: IpAddr,

    #[clap(short, long, default_value_t = 5000)]
    port: u16,

    #[clap(long, help = "letters instead of ideographs and no colors")]
    plain: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let arguments = Arguments::parse();
    if arguments.plain {
        DisplayFormat::set_defaults(false, false);
    }

    let stream = TcpStream::connect(SocketAddr::new(arguments.ip, arguments.port))?;
    let stream = LineStream::new(&stream);
    stream.write_line(Protocol::encode_player(&PlayerMessage::Init { version: VERSION }))?;
    stream.write_line(Protocol::encode_player(&PlayerMessage::Watch))?;

    let mut game = None;

    while let Some(line) = stream.read_line() {
        match Protocol::decode_arbiter(&line) {
            Some(ArbiterMessage::Game { board, side }) => {
                let current = Game::from_serialized(&board, side).ok_or("invalid game format")?;
                println!("new game, {side} to move");
                print!("{}", current.display(DisplayFormat::pretty()));
                game = Some(current);
            }
            Some(ArbiterMessage::Update { mv, notation }) => {
                let Some(current) = game.as_mut() else {
                    continue;
                };
                let side = current.active_side();
                current.play(mv)?;
                println!("{side}: {mv} {notation}");
                print!("{}", current.display(DisplayFormat::pretty()));
            }
            Some(ArbiterMessage::End { winner, reason }) => {
                match winner {
                    Some(side) => println!("{side} won by {reason}"),
                    None => println!("no winner, {reason}"),
                }
                if let Some(current) = game.take() {
                    println!("{}", current.transcript());
                }
            }
            _ => println!("{line}"),
        }
    }

    Ok(())
}
