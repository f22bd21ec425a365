use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  NaiveDateTime,
  SecondsFormat,
  Utc
};

const NAIVE_FORMATS: [&str; 2] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f"
];

/// Parses a timestamp coming from the task service.
///
/// Columns without a zone are emitted as naive ISO-8601 values; those are
/// taken as UTC.
pub fn parse_timestamp(
  raw: &str
) -> anyhow::Result<DateTime<Utc>> {
  let token = raw.trim();

  if let Ok(parsed) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(parsed.with_timezone(&Utc));
  }

  for format in NAIVE_FORMATS {
    if let Ok(naive) =
      NaiveDateTime::parse_from_str(
        token, format
      )
    {
      return Ok(naive.and_utc());
    }
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return start_of_day(date);
  }

  Err(anyhow!(
    "unrecognized timestamp: {token}"
  ))
}

pub fn format_timestamp(
  dt: DateTime<Utc>
) -> String {
  dt.to_rfc3339_opts(
    SecondsFormat::Secs,
    true
  )
}

/// Parses a user supplied due date: `today`, `tomorrow`, `YYYY-MM-DD` or a
/// full RFC 3339 timestamp. Day-only inputs resolve to midnight UTC.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_due(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<DateTime<Utc>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "" => {
      return Err(anyhow!(
        "due date cannot be empty"
      ));
    }
    | "today" => {
      return start_of_day(
        now.date_naive()
      );
    }
    | "tomorrow" => {
      let today =
        parse_due("today", now)?;
      return Ok(
        today + Duration::days(1)
      );
    }
    | _ => {}
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return start_of_day(date);
  }

  DateTime::parse_from_rfc3339(token)
    .map(|dt| dt.with_timezone(&Utc))
    .with_context(|| {
      format!(
        "invalid due date '{token}'; \
         expected today, tomorrow, \
         YYYY-MM-DD or RFC 3339"
      )
    })
}

pub fn is_same_day(
  a: DateTime<Utc>,
  b: DateTime<Utc>
) -> bool {
  a.date_naive() == b.date_naive()
}

fn start_of_day(
  date: NaiveDate
) -> anyhow::Result<DateTime<Utc>> {
  date
    .and_hms_opt(0, 0, 0)
    .map(|naive| naive.and_utc())
    .ok_or_else(|| {
      anyhow!(
        "failed to construct \
         midnight for {date}"
      )
    })
}
