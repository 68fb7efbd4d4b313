use crate::database::models::Pole;
use anyhow::Result;
use chrono::{DateTime, Utc};

pub const MAX_WINDOW_DAYS: i64 = 365;

pub fn validate_window_days(days: i64) -> Result<i64> {
    if days <= 0 {
        return Err(anyhow::anyhow!("Le nombre de jours doit être positif"));
    }

    if days > MAX_WINDOW_DAYS {
        return Err(anyhow::anyhow!(
            "La période ne peut pas dépasser {} jours",
            MAX_WINDOW_DAYS
        ));
    }

    Ok(days)
}

pub fn validate_future_date(date: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if date <= now {
        return Err(anyhow::anyhow!("La réunion doit être dans le futur!"));
    }
    Ok(())
}

pub fn pole_names() -> String {
    Pole::ALL
        .iter()
        .map(|pole| pole.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
