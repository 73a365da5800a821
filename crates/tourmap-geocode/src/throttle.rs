//! Request throttle for the external geocoding service.
//!
//! Bounds the number of simultaneous lookups and spaces their start times
//! at least `min_interval` apart. Excess callers queue in FIFO order on the
//! semaphore.

use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

pub struct Throttle {
    permits: Semaphore,
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    /// `max_in_flight` is clamped to at least 1.
    #[must_use]
    pub fn new(max_in_flight: usize, min_interval: Duration) -> Self {
        Self {
            permits: Semaphore::new(max_in_flight.max(1)),
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits for an in-flight slot and for the next start time, then returns
    /// a permit that must be held for the duration of the request.
    ///
    /// # Errors
    ///
    /// Returns [`tokio::sync::AcquireError`] only if the semaphore was closed,
    /// which this type never does.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, tokio::sync::AcquireError> {
        let permit = self.permits.acquire().await?;

        let start = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = next_slot.map_or(now, |slot| slot.max(now));
            *next_slot = Some(start + self.min_interval);
            start
        };

        if start > Instant::now() {
            tracing::trace!(
                wait_ms = start.duration_since(Instant::now()).as_millis(),
                "throttling geocoder request"
            );
            tokio::time::sleep_until(start).await;
        }

        Ok(permit)
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_acquire_does_not_wait() {
        let throttle = Throttle::new(1, Duration::from_secs(1));
        let before = Instant::now();
        let _permit = throttle.acquire().await.unwrap();
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_acquires_are_spaced_by_min_interval() {
        let throttle = Throttle::new(1, Duration::from_millis(1000));
        let start = Instant::now();
        drop(throttle.acquire().await.unwrap());
        drop(throttle.acquire().await.unwrap());
        drop(throttle.acquire().await.unwrap());
        assert!(Instant::now().duration_since(start) >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_max_in_flight_permits_are_held() {
        let throttle = Arc::new(Throttle::new(1, Duration::ZERO));
        let in_flight = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let peak = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let throttle = Arc::clone(&throttle);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _permit = throttle.acquire().await.unwrap();
                let now = in_flight.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                peak.fetch_max(now, std::sync::atomic::Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_in_flight_is_clamped_to_one() {
        let throttle = Throttle::new(0, Duration::ZERO);
        assert_eq!(throttle.permits.available_permits(), 1);
    }
}
