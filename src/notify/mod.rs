//! The notification coordinator (spec.md §4.6): a single mutex and one
//! condition variable broadcasting every state change, watched by waiters
//! with disjoint predicates (which two products have sold today, which
//! streak lengths have been reached). A single broadcast condition is
//! correct here because the set of distinct predicates is unbounded — one
//! per `(p1, p2)` pair, one per streak length `n` — so per-predicate
//! condition variables would not scale (spec.md §9).

use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex};

struct State {
    sold_today: HashSet<String>,
    last_product_sold: Option<String>,
    consecutive_count: i64,
    /// Every (streak length, product) pair reached today, so a waiter that
    /// subscribes after the streak occurred still observes it.
    streaks_reached: HashMap<i64, HashSet<String>>,
    current_day: i64,
}

pub struct Notifier {
    state: Mutex<State>,
    condvar: Condvar,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                sold_today: HashSet::new(),
                last_product_sold: None,
                consecutive_count: 0,
                streaks_reached: HashMap::new(),
                current_day: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    pub fn register_sale(&self, product: &str) {
        let mut state = self.state.lock().expect("notifier lock poisoned");
        state.sold_today.insert(product.to_string());

        if state.last_product_sold.as_deref() == Some(product) {
            state.consecutive_count += 1;
        } else {
            state.last_product_sold = Some(product.to_string());
            state.consecutive_count = 1;
        }
        let streak = state.consecutive_count;
        state
            .streaks_reached
            .entry(streak)
            .or_default()
            .insert(product.to_string());

        self.condvar.notify_all();
    }

    pub fn new_day(&self) {
        let mut state = self.state.lock().expect("notifier lock poisoned");
        state.current_day += 1;
        state.sold_today.clear();
        state.streaks_reached.clear();
        state.last_product_sold = None;
        state.consecutive_count = 0;
        self.condvar.notify_all();
    }

    /// Blocks until both products have sold today, or the day ends first.
    /// Returns `true` iff both were seen before day turnover.
    pub fn wait_simultaneous(&self, p1: &str, p2: &str) -> bool {
        let mut state = self.state.lock().expect("notifier lock poisoned");
        let start_day = state.current_day;
        while state.current_day == start_day
            && !(state.sold_today.contains(p1) && state.sold_today.contains(p2))
        {
            state = self.condvar.wait(state).expect("notifier lock poisoned");
        }
        state.current_day == start_day
    }

    /// Blocks until streak length `n` has been reached by some product, or
    /// the day ends first. Returns one matching product (tie-break is
    /// implementation-defined among products that reached exactly `n`), or
    /// `None` if the day turned over first.
    pub fn wait_consecutive(&self, n: i64) -> Option<String> {
        let mut state = self.state.lock().expect("notifier lock poisoned");
        let start_day = state.current_day;
        while state.current_day == start_day && !state.streaks_reached.contains_key(&n) {
            state = self.condvar.wait(state).expect("notifier lock poisoned");
        }
        if state.current_day != start_day {
            return None;
        }
        state
            .streaks_reached
            .get(&n)
            .and_then(|products| products.iter().next().cloned())
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn simultaneous_wait_succeeds_once_both_sold() {
        let notifier = Arc::new(Notifier::new());
        let waiter = {
            let n = notifier.clone();
            thread::spawn(move || n.wait_simultaneous("Banana", "Apple"))
        };

        thread::sleep(Duration::from_millis(20));
        notifier.register_sale("Banana");
        notifier.register_sale("Apple");

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn new_day_cancels_pending_simultaneous_wait() {
        let notifier = Arc::new(Notifier::new());
        let waiter = {
            let n = notifier.clone();
            thread::spawn(move || n.wait_simultaneous("Banana", "Apple"))
        };

        thread::sleep(Duration::from_millis(20));
        notifier.new_day();

        assert!(!waiter.join().unwrap());
    }

    #[test]
    fn consecutive_wait_resolves_for_late_subscriber() {
        let notifier = Notifier::new();
        notifier.register_sale("Orange");
        notifier.register_sale("Orange");
        notifier.register_sale("Orange");

        assert_eq!(notifier.wait_consecutive(3), Some("Orange".to_string()));
    }

    #[test]
    fn consecutive_count_resets_on_product_change() {
        let notifier = Notifier::new();
        notifier.register_sale("Orange");
        notifier.register_sale("Orange");
        notifier.register_sale("Banana");

        assert_eq!(notifier.wait_consecutive(2), Some("Orange".to_string()));
        let one = notifier.wait_consecutive(1).unwrap();
        assert!(one == "Orange" || one == "Banana");
    }

    #[test]
    fn wait_simultaneous_does_not_see_sales_from_prior_day() {
        let notifier = Notifier::new();
        notifier.register_sale("A");
        notifier.register_sale("B");
        notifier.new_day();
        assert!(!notifier.state.lock().unwrap().sold_today.contains("A"));
    }
}
