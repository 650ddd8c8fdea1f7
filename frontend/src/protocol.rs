use xiangqi_arena::location::Move;
use xiangqi_arena::piece::Side;

pub const VERSION: u32 = 1;

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ArbiterMessage {
    Game { board: String, side: Side },
    Prompt { time: u64 },
    Update { mv: Move, notation: String },
    Reject { candidate: String, reason: String },
    End { winner: Option<Side>, reason: String },
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum PlayerMessage {
    Init { version: u32 },
    Info { name: String },
    Watch,
    Ready,
    /// Kept as raw text; the arbiter decides whether it is a move at all.
    Play { mv: String },
}

pub struct Protocol;

impl Protocol {
    fn decode(line: &str) -> (&str, impl Iterator<Item = &str>) {
        let mut parts = line.split_whitespace().fuse();
        (parts.next().unwrap_or(""), parts)
    }

    pub fn decode_arbiter(line: &str) -> Option<ArbiterMessage> {
        let (kind, mut arguments) = Protocol::decode(line);
        let message = match kind {
            "game" => ArbiterMessage::Game {
                board: arguments.next()?.to_string(),
                side: Side::from_name(arguments.next()?)?,
            },
            "prompt" => ArbiterMessage::Prompt {
                time: arguments.next()?.parse().ok()?,
            },
            "update" => ArbiterMessage::Update {
                mv: arguments.next()?.parse().ok()?,
                notation: arguments.next()?.to_string(),
            },
            "reject" => ArbiterMessage::Reject {
                candidate: arguments.next()?.to_string(),
                reason: arguments.next()?.to_string(),
            },
            "end" => ArbiterMessage::End {
                winner: match arguments.next()? {
                    "draw" => None,
                    winner => Some(Side::from_name(winner)?),
                },
                reason: arguments.next()?.to_string(),
            },
            _ => return None,
        };
        Some(message)
    }

    pub fn decode_player(line: &str) -> Option<PlayerMessage> {
        let (kind, mut arguments) = Protocol::decode(line);
        let message = match kind {
            "init" => PlayerMessage::Init {
                version: arguments.next()?.parse().ok()?,
            },
            "info" => PlayerMessage::Info {
                name: arguments.next()?.to_string(),
            },
            "watch" => PlayerMessage::Watch,
            "ready" => PlayerMessage::Ready,
            "play" => PlayerMessage::Play {
                mv: arguments.next()?.to_string(),
            },
            _ => return None,
        };
        Some(message)
    }

    pub fn encode_arbiter(message: &ArbiterMessage) -> String {
        match message {
            ArbiterMessage::Game { board, side } => format!("game {board} {side}"),
            ArbiterMessage::Prompt { time } => format!("prompt {time}"),
            ArbiterMessage::Update { mv, notation } => format!("update {mv} {notation}"),
            ArbiterMessage::Reject { candidate, reason } => format!("reject {candidate} {reason}"),
            ArbiterMessage::End { winner, reason } => {
                format!("end {} {reason}", winner.map_or("draw", Side::name))
            }
        }
    }

    pub fn encode_player(message: &PlayerMessage) -> String {
        match message {
            PlayerMessage::Init { version } => format!("init {version}"),
            PlayerMessage::Info { name } => format!("info {name}"),
            PlayerMessage::Watch => "watch".to_string(),
            PlayerMessage::Ready => "ready".to_string(),
            PlayerMessage::Play { mv } => format!("play {mv}"),
        }
    }
}
