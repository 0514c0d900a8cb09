use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// Cooperative cancellation flag shared between the control thread and the
/// worker. The worker only reads it at its poll points.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Byte accounting for one batch.
///
/// `bytes_total` is the work volume (file bytes times passes), so `bytes_done`
/// saturates there and the percentage never runs past 100.
#[derive(Debug)]
pub struct BatchProgress {
    bytes_total: u64,
    bytes_done: u64,
    min_interval: Duration,
    last_emit: Option<Instant>,
    last_percent: Option<u8>,
}

impl BatchProgress {
    pub fn new(bytes_total: u64, min_interval: Duration) -> Self {
        Self { bytes_total, bytes_done: 0, min_interval, last_emit: None, last_percent: None }
    }

    pub fn bytes_total(&self) -> u64 {
        self.bytes_total
    }

    pub fn bytes_done(&self) -> u64 {
        self.bytes_done
    }

    /// floor(done / total * 100); `None` when there is no byte volume at all.
    pub fn percent(&self) -> Option<u8> {
        if self.bytes_total == 0 {
            return None;
        }
        let pct = (self.bytes_done as u128 * 100) / self.bytes_total as u128;
        Some(pct.min(100) as u8)
    }

    /// Account `n` written bytes. Returns a percentage to publish when the
    /// throttle interval has elapsed and the value moved forward.
    pub fn advance(&mut self, n: u64, now: Instant) -> Option<u8> {
        self.bytes_done = self.bytes_done.saturating_add(n).min(self.bytes_total);
        if let Some(t) = self.last_emit {
            if now.duration_since(t) < self.min_interval {
                return None;
            }
        }
        self.last_emit = Some(now);
        self.take_if_new()
    }

    /// Unthrottled: the current percentage if it has not been published yet.
    pub fn flush(&mut self) -> Option<u8> {
        self.take_if_new()
    }

    /// 100 unless it was already published.
    pub fn complete(&mut self) -> Option<u8> {
        if self.last_percent == Some(100) {
            return None;
        }
        self.last_percent = Some(100);
        Some(100)
    }

    fn take_if_new(&mut self) -> Option<u8> {
        let pct = self.percent()?;
        match self.last_percent {
            Some(prev) if pct <= prev => None,
            _ => {
                self.last_percent = Some(pct);
                Some(pct)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_total_has_no_percentage() {
        let mut p = BatchProgress::new(0, Duration::ZERO);
        assert_eq!(p.percent(), None);
        assert_eq!(p.advance(10, Instant::now()), None);
        assert_eq!(p.bytes_done(), 0);
        assert_eq!(p.complete(), Some(100));
    }

    #[test]
    fn throttles_and_never_repeats() {
        let t0 = Instant::now();
        let mut p = BatchProgress::new(1000, Duration::from_millis(500));
        assert_eq!(p.advance(100, t0), Some(10));
        // inside the interval
        assert_eq!(p.advance(100, t0 + Duration::from_millis(100)), None);
        assert_eq!(p.advance(100, t0 + Duration::from_millis(600)), Some(30));
        assert_eq!(p.flush(), None);
        assert_eq!(p.advance(5, t0 + Duration::from_millis(1200)), None);
        assert_eq!(p.advance(695, t0 + Duration::from_millis(1300)), None);
        assert_eq!(p.flush(), Some(100));
        assert_eq!(p.complete(), None);
    }

    #[test]
    fn done_saturates_at_total() {
        let mut p = BatchProgress::new(10, Duration::ZERO);
        p.advance(25, Instant::now());
        assert_eq!(p.bytes_done(), 10);
        assert_eq!(p.percent(), Some(100));
    }

    #[test]
    fn cancel_token_is_shared() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }
}
