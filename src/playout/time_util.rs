use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Wall clock as a naive UTC instant, the precision everything else works in.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Next instant at which a fixed-anchor slot with time-of-day `start_time`
/// fires, strictly after `after`.
///
/// The day is treated as a flat 86,400 seconds: around DST transitions the
/// "+24h" step can land an hour off the literal wall clock. That matches the
/// rest of the scheduler, which never promises sub-day DST accuracy.
pub fn next_fixed_fire(after: NaiveDateTime, start_time: NaiveTime, tz: Tz) -> NaiveDateTime {
    let local_date = tz.from_utc_datetime(&after).date_naive();
    let candidate = local_to_utc(local_date.and_time(start_time), tz);

    if candidate > after {
        candidate
    } else {
        candidate + Duration::hours(24)
    }
}

fn local_to_utc(local: NaiveDateTime, tz: Tz) -> NaiveDateTime {
    // Ambiguous local times (fall-back) take the earlier offset; local times
    // inside a spring-forward gap are nudged past it.
    match tz.from_local_datetime(&local).earliest() {
        Some(dt) => dt.naive_utc(),
        None => tz
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.naive_utc())
            .unwrap_or(local),
    }
}

/// Smallest multiple of `minutes` (on the UTC epoch-second grid) that is
/// `>= t`. `minutes <= 0` leaves `t` untouched.
pub fn ceil_to_minute_boundary(t: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    if minutes <= 0 {
        return t;
    }

    let step = minutes * 60;
    let ts = t.and_utc().timestamp();
    let floored = ts.div_euclid(step) * step;
    let rounded = if floored < ts { floored + step } else { floored };

    DateTime::from_timestamp(rounded, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or(t)
}
