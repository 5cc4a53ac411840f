//! Retrieve command implementation.

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveTime};
use datums_lib::Warehouse;

/// Prints a packet's stored datums as CSV on stdout.
pub(crate) fn retrieve(
    warehouse: &Warehouse,
    packet: &str,
    since: Option<&str>,
    until: Option<&str>,
) -> Result<()> {
    let since = since.map(parse_bound).transpose()?;
    let until = until.map(parse_bound).transpose()?;

    let datums = warehouse
        .retrieve(packet, since, until)
        .with_context(|| format!("failed to retrieve packet '{packet}'"))?;
    println!("{}", datums.csv);
    Ok(())
}

/// Parses a range bound given either as epoch seconds or as a
/// `YYYY-MM-DD` date (interpreted as midnight UTC).
fn parse_bound(raw: &str) -> Result<i64> {
    if let Ok(seconds) = raw.parse::<i64>() {
        return Ok(seconds);
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid bound '{raw}', expected epoch seconds or YYYY-MM-DD"))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epoch_seconds() {
        assert_eq!(parse_bound("1500000000").unwrap(), 1_500_000_000);
    }

    #[test]
    fn test_parse_date() {
        // 2017-07-14T00:00:00Z
        assert_eq!(parse_bound("2017-07-14").unwrap(), 1_499_990_400);
    }

    #[test]
    fn test_invalid_bound() {
        assert!(parse_bound("yesterday").is_err());
    }
}
