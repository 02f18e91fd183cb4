//! Startup configuration: command-line flags with environment fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use weinbot_sdk::client::DEFAULT_API_BASE;
use weinbot_sdk::event::permissions;

use crate::coinflip::Odds;

#[derive(Parser, Debug, Clone)]
#[command(name = "weinbot", about = "Wine orders and coin flips for a Discord guild")]
pub struct BotConfig {
    /// Bot token for the REST API
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Application id (used for command registration and interaction webhooks)
    #[arg(long, env = "DISCORD_APPLICATION_ID")]
    pub application_id: String,

    /// Hex-encoded Ed25519 public key of the application
    #[arg(long, env = "DISCORD_PUBLIC_KEY")]
    pub public_key: String,

    /// Channel where orders may be started
    #[arg(long, env = "ORDER_CHANNEL_ID")]
    pub order_channel: String,

    /// Channel that receives new orders for staff
    #[arg(long, env = "STAFF_CHANNEL_ID")]
    pub staff_channel: String,

    /// Role that may accept and reject orders
    #[arg(long, env = "STAFF_ROLE_ID")]
    pub staff_role: Option<String>,

    /// Permission bits that also grant staff rights (default: MANAGE_GUILD)
    #[arg(long, env = "STAFF_PERMISSION", default_value_t = permissions::MANAGE_GUILD)]
    pub staff_permission: u64,

    /// Register commands in this guild only (instant update) instead of globally
    #[arg(long, env = "GUILD_ID")]
    pub guild: Option<String>,

    /// SQLite database path
    #[arg(long, env = "WEINBOT_DB", default_value = "weinbot.db")]
    pub db_path: PathBuf,

    /// Address for the interactions endpoint
    #[arg(long, env = "WEINBOT_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Product catalog (TOML). Uses the built-in catalog when unset.
    #[arg(long, env = "WEINBOT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Seconds before an unfinished product selection expires
    #[arg(long, env = "SELECTION_TTL_SECS", default_value_t = 900)]
    pub selection_ttl_secs: u64,

    /// Seconds between outbox relay runs
    #[arg(long, env = "OUTBOX_INTERVAL_SECS", default_value_t = 30)]
    pub outbox_interval_secs: u64,

    /// How long a submission waits for its staff post before answering the
    /// customer. The post continues in the background after that.
    #[arg(long, env = "STAFF_POST_WAIT_MS", default_value_t = 2000)]
    pub staff_post_wait_ms: u64,

    /// Delay before the coin duel result is revealed
    #[arg(long, env = "COIN_DELAY_MS", default_value_t = 2000)]
    pub coin_delay_ms: u64,

    /// Fixed win chance for the coin duel, in percent. Shown to players.
    /// Unset means a fair flip.
    #[arg(long, env = "COIN_WIN_PERCENT", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub coin_win_percent: Option<u8>,

    /// Match trigger names regardless of case
    #[arg(long, env = "TRIGGERS_CASE_INSENSITIVE")]
    pub triggers_case_insensitive: bool,

    /// REST API base URL
    #[arg(long, env = "DISCORD_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

impl BotConfig {
    pub fn selection_ttl(&self) -> Duration {
        Duration::from_secs(self.selection_ttl_secs)
    }

    /// Half the TTL, but not more often than every 10 seconds.
    pub fn sweep_interval(&self) -> Duration {
        (self.selection_ttl() / 2).max(Duration::from_secs(10))
    }

    pub fn outbox_interval(&self) -> Duration {
        Duration::from_secs(self.outbox_interval_secs.max(1))
    }

    pub fn staff_post_wait(&self) -> Duration {
        Duration::from_millis(self.staff_post_wait_ms)
    }

    pub fn coin_delay(&self) -> Duration {
        Duration::from_millis(self.coin_delay_ms)
    }

    pub fn coin_odds(&self) -> Odds {
        match self.coin_win_percent {
            Some(win_percent) => Odds::Fixed { win_percent },
            None => Odds::Fair,
        }
    }
}

impl Default for BotConfig {
    /// Local defaults with placeholder credentials, for tests and tooling.
    fn default() -> Self {
        Self {
            token: String::new(),
            application_id: "0".into(),
            public_key: String::new(),
            order_channel: "orders".into(),
            staff_channel: "staff".into(),
            staff_role: None,
            staff_permission: permissions::MANAGE_GUILD,
            guild: None,
            db_path: PathBuf::from("weinbot.db"),
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            catalog: None,
            selection_ttl_secs: 900,
            outbox_interval_secs: 30,
            staff_post_wait_ms: 2000,
            coin_delay_ms: 2000,
            coin_win_percent: None,
            triggers_case_insensitive: false,
            api_base: DEFAULT_API_BASE.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 11] = [
        "weinbot",
        "--token",
        "t",
        "--application-id",
        "1",
        "--public-key",
        "ab",
        "--order-channel",
        "o",
        "--staff-channel",
        "s",
    ];

    #[test]
    fn parses_defaults() {
        let cfg = BotConfig::try_parse_from(REQUIRED).unwrap();
        assert_eq!(cfg.staff_permission, permissions::MANAGE_GUILD);
        assert_eq!(cfg.selection_ttl(), Duration::from_secs(900));
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(450));
        assert_eq!(cfg.coin_delay(), Duration::from_millis(2000));
        assert_eq!(cfg.staff_post_wait(), Duration::from_millis(2000));
        assert_eq!(cfg.coin_odds(), Odds::Fair);
        assert!(!cfg.triggers_case_insensitive);
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn win_percent_is_bounded() {
        let mut args = REQUIRED.to_vec();
        args.extend(["--coin-win-percent", "15"]);
        let cfg = BotConfig::try_parse_from(args).unwrap();
        assert_eq!(cfg.coin_odds(), Odds::Fixed { win_percent: 15 });

        let mut args = REQUIRED.to_vec();
        args.extend(["--coin-win-percent", "101"]);
        assert!(BotConfig::try_parse_from(args).is_err());
    }

    #[test]
    fn sweep_interval_has_a_floor() {
        let cfg = BotConfig {
            selection_ttl_secs: 4,
            ..BotConfig::default()
        };
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(10));
    }
}
