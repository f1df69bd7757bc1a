use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Timezone of the exchanges the integrated brokers report on.
///
/// Balance dates are calendar days in this zone, so a run shortly after
/// midnight UTC still lands on the local trading day.
pub const DEFAULT_MARKET_TZ: Tz = chrono_tz::Asia::Seoul;

/// Converts a UTC instant to a calendar day in the given timezone.
pub fn market_date_from_utc(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Today's calendar day in [`DEFAULT_MARKET_TZ`].
pub fn market_date_today() -> NaiveDate {
    market_date_from_utc(Utc::now(), DEFAULT_MARKET_TZ)
}
