use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

pub fn parse_time_string(time_str: &str) -> Result<NaiveTime> {
    let time_str = time_str.trim();

    if let Ok(time) = NaiveTime::parse_from_str(time_str, "%H:%M") {
        return Ok(time);
    }

    if let Ok(time) = NaiveTime::parse_from_str(time_str, "%H:%M:%S") {
        return Ok(time);
    }

    Err(anyhow::anyhow!("Format d'heure invalide. Utilisez HH:MM"))
}

pub fn parse_date_string(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%d/%m/%Y")
        .map_err(|_| anyhow::anyhow!("Format de date invalide. Utilisez JJ/MM/AAAA"))
}

/// Reads a `JJ/MM/AAAA` date and `HH:MM` time typed in the server's local offset.
pub fn parse_local_datetime(date_str: &str, time_str: &str, offset: &FixedOffset) -> Result<DateTime<Utc>> {
    let date = parse_date_string(date_str)?;
    let time = parse_time_string(time_str)?;

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|datetime| datetime.to_utc())
        .ok_or_else(|| anyhow::anyhow!("Date invalide: {} {}", date_str, time_str))
}

pub fn format_datetime_local(datetime: DateTime<Utc>, offset: &FixedOffset) -> String {
    datetime.with_timezone(offset).format("%d/%m/%Y à %H:%M").to_string()
}

pub fn format_date_local(datetime: DateTime<Utc>, offset: &FixedOffset) -> String {
    datetime.with_timezone(offset).format("%d/%m/%Y").to_string()
}

pub fn format_short_local(datetime: DateTime<Utc>, offset: &FixedOffset) -> String {
    datetime.with_timezone(offset).format("%d/%m à %H:%M").to_string()
}
