use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, queries, Result};

/// Typed process configuration, loaded once at startup.
///
/// Everything comes from environment variables (with optional `.env` file);
/// the core never reads the environment after `load` returns, so components
/// stay testable with a hand-built `Config`.
#[derive(Clone, Debug)]
pub struct Config {
    /// Bot token for the gateway handshake. Opaque secret.
    pub bot_token: String,
    /// Vestigial command prefix, kept for parity with the bot framework.
    pub command_prefix: String,

    /// Guild to enumerate channels for.
    pub server_id: u64,
    /// Primary channel for member/message reports.
    pub basic_channel_id: Option<u64>,
    pub channel_one_id: Option<u64>,
    pub channel_two_id: Option<u64>,

    /// How long to wait for the gateway handshake before giving up.
    pub ready_timeout: Duration,
    /// Scan window for history queries.
    pub history_limit: usize,
    /// Recency bound for substring search, in days.
    pub search_days: u32,
    /// Optional substring to search for in the primary channel.
    pub search_query: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let server_id = parse_u64(env_str("SERVER_ID")).ok_or_else(|| {
            Error::Config("SERVER_ID environment variable is required (numeric)".to_string())
        })?;

        let command_prefix = env_str("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string());

        let basic_channel_id = parse_u64(env_str("BASIC_CHANNEL_ID"));
        let channel_one_id = parse_u64(env_str("CHANNEL_ONE_ID"));
        let channel_two_id = parse_u64(env_str("CHANNEL_TWO_ID"));

        let ready_timeout =
            Duration::from_secs(parse_u64(env_str("READY_TIMEOUT_SECS")).unwrap_or(30));
        let history_limit = parse_u64(env_str("HISTORY_LIMIT"))
            .map(|v| v as usize)
            .unwrap_or(queries::DEFAULT_LIMIT);
        let search_days = parse_u64(env_str("SEARCH_DAYS"))
            .map(|v| v as u32)
            .unwrap_or(queries::DEFAULT_SEARCH_DAYS);
        let search_query = env_str("SEARCH_QUERY").filter(|q| !q.trim().is_empty());

        Ok(Self {
            bot_token,
            command_prefix,
            server_id,
            basic_channel_id,
            channel_one_id,
            channel_two_id,
            ready_timeout,
            history_limit,
            search_days,
            search_query,
        })
    }

    /// The channel ids the report sequence touches, in order, deduplicated.
    pub fn target_channels(&self) -> Vec<u64> {
        let mut out = Vec::new();
        for id in [self.basic_channel_id, self.channel_one_id, self.channel_two_id]
            .into_iter()
            .flatten()
        {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn parse_u64(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let value = v.trim().trim_matches('"').trim_matches('\'');
        env::set_var(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}"))
    }

    #[test]
    fn parse_u64_accepts_padded_numbers() {
        assert_eq!(parse_u64(Some(" 42 ".to_string())), Some(42));
        assert_eq!(parse_u64(Some("nope".to_string())), None);
        assert_eq!(parse_u64(None), None);
    }

    #[test]
    fn dotenv_does_not_override_existing_env() {
        let path = tmp("dcf-dotenv");
        env::set_var("DCF_TEST_PRESET", "original");
        fs::write(
            &path,
            "# comment\nDCF_TEST_PRESET=overridden\nDCF_TEST_FRESH=\"quoted\"\n",
        )
        .unwrap();

        load_dotenv_if_present(&path);

        assert_eq!(env::var("DCF_TEST_PRESET").unwrap(), "original");
        assert_eq!(env::var("DCF_TEST_FRESH").unwrap(), "quoted");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn target_channels_deduplicates_in_order() {
        let cfg = Config {
            bot_token: "t".to_string(),
            command_prefix: "!".to_string(),
            server_id: 1,
            basic_channel_id: Some(10),
            channel_one_id: Some(20),
            channel_two_id: Some(10),
            ready_timeout: Duration::from_secs(30),
            history_limit: 100,
            search_days: 7,
            search_query: None,
        };
        assert_eq!(cfg.target_channels(), vec![10, 20]);
    }
}
