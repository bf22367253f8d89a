//! Wall-clock conversions in the configured timezone.
//!
//! Postgres owns the tz database, so conversions are asked of it rather than
//! done in-process.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

/// Today's date in `tz`.
pub async fn local_today(pool: &PgPool, tz: &str) -> Result<NaiveDate, sqlx::Error> {
    sqlx::query_scalar::<_, NaiveDate>("SELECT (NOW() AT TIME ZONE $1)::date")
        .bind(tz)
        .fetch_one(pool)
        .await
}

/// Calendar date of an instant in `tz`.
pub async fn local_date_of(pool: &PgPool, ts: DateTime<Utc>, tz: &str) -> Result<NaiveDate, sqlx::Error> {
    sqlx::query_scalar::<_, NaiveDate>("SELECT ($1::timestamptz AT TIME ZONE $2)::date")
        .bind(ts)
        .bind(tz)
        .fetch_one(pool)
        .await
}

/// The instant a wall-clock `date` + `time` in `tz` refers to.
pub async fn to_utc(pool: &PgPool, date: NaiveDate, time: NaiveTime, tz: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    sqlx::query_scalar::<_, DateTime<Utc>>("SELECT ($1::date + $2::time) AT TIME ZONE $3")
        .bind(date)
        .bind(time)
        .bind(tz)
        .fetch_one(pool)
        .await
}
