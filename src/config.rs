use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/study_bot.db";
const DEFAULT_TIMEZONE: &str = "Asia/Riyadh";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    /// Timezone for private schedules and for groups that never set one.
    pub timezone: Tz,
    /// How late a due task may still be posted.
    pub task_grace_minutes: i64,
    /// Telegram user ids allowed to administer any group.
    pub admin_ids: Vec<i64>,
    /// Local hour at which daily camp reports go out.
    pub camp_report_hour: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = non_empty_var("DATABASE_URL")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let http_port = non_empty_var("HTTP_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let timezone = non_empty_var("BOT_TIMEZONE")
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string())
            .parse::<Tz>()
            .map_err(|_| anyhow!("Invalid BOT_TIMEZONE"))?;

        let task_grace_minutes: i64 = non_empty_var("TASK_GRACE_MINUTES")
            .unwrap_or_else(|| "15".to_string())
            .parse()
            .map_err(|_| anyhow!("Invalid TASK_GRACE_MINUTES"))?;
        if task_grace_minutes < 0 {
            return Err(anyhow!("Invalid TASK_GRACE_MINUTES"));
        }

        let admin_ids = match non_empty_var("ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw)?,
            None => Vec::new(),
        };

        let camp_report_hour: u32 = non_empty_var("CAMP_REPORT_HOUR")
            .unwrap_or_else(|| "23".to_string())
            .parse()
            .map_err(|_| anyhow!("Invalid CAMP_REPORT_HOUR"))?;
        if camp_report_hour > 23 {
            return Err(anyhow!("Invalid CAMP_REPORT_HOUR"));
        }

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            timezone,
            task_grace_minutes,
            admin_ids,
            camp_report_hour,
        })
    }

    pub fn is_global_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| anyhow!("Invalid ADMIN_IDS entry '{}'", id))
        })
        .collect()
}
