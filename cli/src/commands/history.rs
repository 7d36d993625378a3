use anyhow::{Context, bail};
use chrono::{DateTime, TimeDelta, Utc};
use patrol_common::inspection::TimeRange;
use patrol_common::registry::InspectionStore;
use patrol_core::repository::JsonLinesStore;

use crate::commands::HistoryArgs;
use crate::mprint;
use crate::terminal::{format, print};

pub async fn history(args: HistoryArgs) -> anyhow::Result<()> {
    let range = time_range(&args, Utc::now())?;
    let store = JsonLinesStore::new(&args.store.path);
    let mut records = store.query(range).await?;
    if let Some(sn) = &args.sn {
        records.retain(|r| &r.sn == sn);
    }
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.sn.cmp(&b.sn)));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        print::no_results("records");
        return Ok(());
    }

    print::header("inspection history");
    for (idx, record) in records.iter().enumerate() {
        if idx > 0 {
            mprint!();
        }
        print::tree_head(idx, &record.sn);
        print::detail_tree(&format::record_to_details(record));
    }
    print::footer();
    Ok(())
}

fn time_range(args: &HistoryArgs, now: DateTime<Utc>) -> anyhow::Result<TimeRange> {
    let end = match &args.until {
        Some(text) => parse_instant(text)?,
        None => now,
    };
    let start = match &args.since {
        Some(text) => parse_instant(text)?,
        None => end - TimeDelta::hours(args.hours),
    };
    if start >= end {
        bail!("empty time window: {start} is not before {end}");
    }
    Ok(TimeRange::new(start, end))
}

fn parse_instant(text: &str) -> anyhow::Result<DateTime<Utc>> {
    let instant = DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("'{text}' is not an RFC 3339 timestamp"))?;
    Ok(instant.with_timezone(&Utc))
}
