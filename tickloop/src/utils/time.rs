use std::time::{Duration, Instant};

/// Roughly 30 years. Stands in for deadlines too far out to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Returns `now + delay`, saturating to a far-future instant when the sum
/// does not fit in an `Instant`.
pub(crate) fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay).unwrap_or_else(|| far_future(now))
}

fn far_future(now: Instant) -> Instant {
    now.checked_add(FAR_FUTURE).unwrap_or(now)
}
