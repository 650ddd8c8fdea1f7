use clap::Args;
use std::time::Duration;

/// Limits applied to every battle the arbiter runs.
#[derive(Args, Clone, Debug)]
pub struct BattleConfig {
    #[arg(long, default_value_t = 200, help = "plies after which the battle is drawn")]
    pub max_moves: usize,

    #[arg(long, default_value_t = 3, help = "move attempts an agent gets per turn before forfeiting")]
    pub max_attempts: u32,

    #[arg(long, default_value_t = 30000, help = "milliseconds an agent has for each attempt")]
    pub move_time: u64,

    #[arg(long, default_value_t = 500, help = "milliseconds to wait before prompting again after a bad move")]
    pub backoff: u64,
}

impl BattleConfig {
    pub fn move_time(&self) -> Duration {
        Duration::from_millis(self.move_time)
    }

    /// Grows linearly with the number of failed attempts so far.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff.saturating_mul(attempt as u64))
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_moves: 200,
            max_attempts: 3,
            move_time: 30000,
            backoff: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Arguments {
        #[command(flatten)]
        battle: BattleConfig,
    }

    #[test]
    fn defaults_match_arguments() {
        let parsed = Arguments::parse_from(["arbiter"]).battle;
        let default = BattleConfig::default();
        assert_eq!(parsed.max_moves, default.max_moves);
        assert_eq!(parsed.max_attempts, default.max_attempts);
        assert_eq!(parsed.move_time(), default.move_time());
        assert_eq!(parsed.backoff, default.backoff);
    }

    #[test]
    fn backoff_grows() {
        let config = Arguments::parse_from(["arbiter", "--backoff", "100", "--max-attempts", "5"]).battle;
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(3), Duration::from_millis(300));
    }
}
