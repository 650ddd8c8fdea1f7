use chrono::Local;
use clap::Parser;
use env_logger::Target;
use frontend::arbiter::config::BattleConfig;
use frontend::arbiter::control::Control;
use frontend::arbiter::instance::Instance;
use frontend::arbiter::lobby::Lobby;
use frontend::line_stream::AsyncLineStream;
use frontend::protocol::{PlayerMessage, Protocol, VERSION};
use log::{LevelFilter, info, warn};
use smol::net::TcpStream as AsyncTcpStream;
use std::error::Error;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::thread;

#[derive(Parser)]
struct Arguments {
    #[clap(short, long, default_value_t = 5000)]
    port: u16,

    #[clap(long, default_value = "log.txt")]
    log_file: String,

    #[command(flatten)]
    battle: BattleConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    let arguments = Arguments::parse();

    let file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&arguments.log_file)?;

    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Debug)
        .format(|buf, record| {
            writeln!(
                buf,
                "{style}[{}] [{:5}]{style:#} {}",
                Local::now().format("%T%.3f"),
                record.level(),
                record.args(),
                style = buf.default_level_style(record.level()),
            )
        })
        .target(Target::Pipe(Box::new(std::io::BufWriter::new(file))))
        .target(Target::Stderr)
        .init();

    let address = format!("127.0.0.1:{}", arguments.port);
    let lobby = Lobby::new(arguments.battle);

    let mut control = Control::new(lobby.clone());
    thread::spawn(move || control.begin());

    smol::block_on(async {
        let listener = smol::net::TcpListener::bind(&address).await?;
        info!("server listening at {address}");

        loop {
            let (stream, address) = listener.accept().await?;
            info!("received incoming connection from {address}");
            smol::spawn(connect(lobby.clone(), stream, address)).detach();
        }
    })
}

async fn connect(lobby: Arc<RwLock<Lobby>>, stream: AsyncTcpStream, address: SocketAddr) {
    let stream = AsyncLineStream::new(stream);
    if let Err(err) = initialize_connection(lobby, stream).await {
        warn!("connection from {address} closed with error {err}");
    }
}

async fn initialize_connection(lobby: Arc<RwLock<Lobby>>, mut stream: AsyncLineStream) -> Result<(), Box<dyn Error>> {
    let Some(PlayerMessage::Init { version: VERSION }) = read(&mut stream).await else {
        return Err(format!("expected init message with version {VERSION}").into());
    };

    match read(&mut stream).await {
        Some(PlayerMessage::Info { name }) => {
            info!("connection initialized as instance for agent '{name}'");
            let instance = Instance::new(name, stream);
            lobby.write().map_err(|_| "lobby poisoned")?.join(instance);
        }
        Some(PlayerMessage::Watch) => {
            let observers = lobby.read().map_err(|_| "lobby poisoned")?.observers();
            let current = || lobby.read().ok().and_then(|lobby| lobby.battle());
            observers.watch(stream, current).await?;
        }
        _ => return Err("expected info or watch message".into()),
    }

    Ok(())
}

async fn read(stream: &mut AsyncLineStream) -> Option<PlayerMessage> {
    Protocol::decode_player(&stream.read_line().await?)
}
