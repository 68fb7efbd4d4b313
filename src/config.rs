use anyhow::Result;
use chrono::FixedOffset;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub guild_id: Option<u64>,
    /// Role names or role ids allowed to run admin commands.
    pub admin_roles: Vec<String>,
    pub utc_offset: FixedOffset,
    pub stats_window_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .ok_or_else(|| anyhow::anyhow!("DISCORD_TOKEN environment variable is required"))?;

        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| "sqlite:lcsp.db".to_string());

        let guild_id = match lookup("GUILD_ID") {
            Some(raw) if !raw.trim().is_empty() && raw.trim() != "0" => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("GUILD_ID must be a numeric id, got {raw:?}"))?,
            ),
            _ => None,
        };

        let admin_roles = lookup("ADMIN_ROLES")
            .map(|raw| {
                raw.split(',')
                    .map(|role| role.trim().to_string())
                    .filter(|role| !role.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|roles| !roles.is_empty())
            .unwrap_or_else(|| vec!["ADMIN".to_string()]);

        let offset_hours = match lookup("UTC_OFFSET_HOURS") {
            Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
                anyhow::anyhow!("UTC_OFFSET_HOURS must be an integer, got {raw:?}")
            })?,
            None => 1,
        };
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("UTC_OFFSET_HOURS out of range: {offset_hours}"))?;

        let stats_window_days = match lookup("STATS_WINDOW_DAYS") {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                anyhow::anyhow!("STATS_WINDOW_DAYS must be an integer, got {raw:?}")
            })?,
            None => 30,
        };
        if stats_window_days <= 0 {
            anyhow::bail!("STATS_WINDOW_DAYS must be positive, got {stats_window_days}");
        }

        Ok(Config {
            discord_token,
            database_url,
            guild_id,
            admin_roles,
            utc_offset,
            stats_window_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = Config::from_lookup(lookup_from(&[("DISCORD_TOKEN", "abc")])).unwrap();

        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.database_url, "sqlite:lcsp.db");
        assert_eq!(config.guild_id, None);
        assert_eq!(config.admin_roles, vec!["ADMIN".to_string()]);
        assert_eq!(config.utc_offset.local_minus_utc(), 3600);
        assert_eq!(config.stats_window_days, 30);
    }

    #[test]
    fn missing_token_is_an_error() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn admin_roles_are_split_and_trimmed() {
        let config = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("ADMIN_ROLES", " ADMIN, Bureau ,,123456 "),
            ("GUILD_ID", "42"),
            ("UTC_OFFSET_HOURS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.admin_roles, vec!["ADMIN", "Bureau", "123456"]);
        assert_eq!(config.guild_id, Some(42));
        assert_eq!(config.utc_offset.local_minus_utc(), 7200);
    }

    #[test]
    fn zero_guild_id_means_global_registration() {
        let config =
            Config::from_lookup(lookup_from(&[("DISCORD_TOKEN", "abc"), ("GUILD_ID", "0")])).unwrap();
        assert_eq!(config.guild_id, None);
    }

    #[test]
    fn non_positive_window_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("STATS_WINDOW_DAYS", "0"),
        ]));
        assert!(result.is_err());
    }
}
