//! Id and clock collaborators for the capsule store

use std::cell::Cell;

use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 8;

/// Source of fresh capsule ids
pub trait IdGenerator {
    fn generate(&self) -> String;
}

/// Source of the current time
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// `cap_<base36 millis>_<random base36>`
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeRandomIdGenerator;

impl IdGenerator for TimeRandomIdGenerator {
    fn generate(&self) -> String {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let mut rng = rand::thread_rng();
        let suffix: String = (0..RANDOM_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        let id = format!("cap_{}_{}", to_base36(millis), suffix);
        log::debug!("Generated capsule id {}", id);
        id
    }
}

/// Wall clock, truncated to the millisecond precision the timestamps are stored with
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Deterministic ids: `<prefix>1`, `<prefix>2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: Cell<u64>,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: Cell::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.get();
        self.next.set(n + 1);
        format!("{}{}", self.prefix, n)
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<T: Clock + ?Sized> Clock for std::rc::Rc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::rc::Rc;

    #[test]
    fn test_generated_ids_are_distinct() {
        let generator = TimeRandomIdGenerator;
        let ids: HashSet<String> = (0..10_000).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_generated_id_shape() {
        let id = TimeRandomIdGenerator.generate();
        let parts: Vec<&str> = id.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "cap");
        assert_eq!(parts[2].len(), RANDOM_LEN);
        assert!(id.chars().all(|c| c == '_' || c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_296), "100");
    }

    #[test]
    fn test_sequential_ids() {
        let generator = SequentialIdGenerator::new("cap_test_");
        assert_eq!(generator.generate(), "cap_test_1");
        assert_eq!(generator.generate(), "cap_test_2");
    }

    #[test]
    fn test_manual_clock_shared() {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = Rc::new(ManualClock::new(start));
        let shared = Rc::clone(&clock);

        clock.advance(chrono::Duration::minutes(5));
        assert_eq!(shared.now(), start + chrono::Duration::minutes(5));
    }
}
