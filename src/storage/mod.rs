//! The storage engine (spec.md §4.5): a three-level hierarchy —
//! in-memory current-day buffer, a bounded LRU of closed-day series, and
//! day files on disk — guarded end to end by a single coarse mutex.
//!
//! Correctness over throughput: every public operation holds the lock for
//! its full duration, including cold file reads, because the workload is
//! dominated by short in-memory operations with occasional bulk reads.

mod day_file;
mod lru;
mod state;

use crate::error::Error;
use crate::protocol::AggrKind;
use crate::sale::Sale;
use lru::LruCache;
use state::RetentionState;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Stats {
    count: i64,
    volume: f64,
    max: f64,
}

struct Inner {
    current_events: Vec<Sale>,
    loaded_series: LruCache<Vec<Sale>>,
    agg_cache: HashMap<i64, HashMap<String, Stats>>,
    retention: RetentionState,
}

pub struct StorageEngine {
    inner: Mutex<Inner>,
    data_dir: PathBuf,
    retention_window: i64,
}

impl StorageEngine {
    pub fn open(data_dir: impl Into<PathBuf>, loaded_series_capacity: usize, retention_window: i64) -> Result<Self, Error> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|e| Error::io(&data_dir, e))?;
        let retention = state::load(&data_dir, retention_window);
        Ok(Self {
            inner: Mutex::new(Inner {
                current_events: Vec::new(),
                loaded_series: LruCache::new(loaded_series_capacity),
                agg_cache: HashMap::new(),
                retention,
            }),
            data_dir,
            retention_window,
        })
    }

    pub fn current_day(&self) -> i64 {
        self.inner.lock().expect("storage lock poisoned").retention.current_day
    }

    pub fn add_event(&self, product: impl Into<String>, quantity: i32, price: f64) {
        let mut inner = self.inner.lock().expect("storage lock poisoned");
        inner.current_events.push(Sale::new(product, quantity, price));
    }

    /// Closes the open day: writes it to disk, advances `currentDay`,
    /// persists retention state, and evicts/deletes anything now outside
    /// the retention window. If the day-file write fails, the buffer is
    /// left intact and `currentDay` is not advanced (spec.md §4.5).
    pub fn persist_day(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().expect("storage lock poisoned");
        let day = inner.retention.current_day;

        day_file::write_day_file(&self.data_dir, day, &inner.current_events)?;
        inner.current_events.clear();
        inner.retention.current_day += 1;

        state::save(&self.data_dir, inner.retention)?;

        let threshold = inner.retention.current_day - self.retention_window;
        inner.agg_cache.retain(|k, _| *k >= threshold);
        inner.loaded_series.evict_older_than(threshold);

        let oldest = inner.retention.oldest_cleaned_day;
        for stale_day in oldest..threshold {
            if let Err(e) = day_file::delete_day_file(&self.data_dir, stale_day) {
                log::warn!("failed to delete day_{stale_day}.dat: {e}");
            }
        }
        inner.retention.oldest_cleaned_day = threshold.max(oldest);
        Ok(())
    }

    /// Equivalent to `persist_day` under the name the connection handler
    /// dispatches NEW_DAY to.
    pub fn new_day(&self) -> Result<(), Error> {
        self.persist_day()
    }

    pub fn aggregate(&self, kind: AggrKind, product: &str, days: i64) -> Result<f64, Error> {
        let mut inner = self.inner.lock().expect("storage lock poisoned");
        let current_day = inner.retention.current_day;
        let days_to_process = days.min(self.retention_window).min(current_day);

        let mut total = Stats::default();
        let inner = &mut *inner;
        for i in 1..=days_to_process {
            let target = current_day - i;
            let stats = Self::get_or_compute_stats(
                &self.data_dir,
                &mut inner.loaded_series,
                &mut inner.agg_cache,
                target,
                product,
            )?;
            total.count += stats.count;
            total.volume += stats.volume;
            if stats.max > total.max {
                total.max = stats.max;
            }
        }

        Ok(match kind {
            AggrKind::Qty => total.count as f64,
            AggrKind::Vol => total.volume,
            AggrKind::Avg => {
                if total.count > 0 {
                    total.volume / total.count as f64
                } else {
                    0.0
                }
            }
            AggrKind::Max => total.max,
        })
    }

    fn get_or_compute_stats(
        data_dir: &std::path::Path,
        loaded_series: &mut LruCache<Vec<Sale>>,
        agg_cache: &mut HashMap<i64, HashMap<String, Stats>>,
        day: i64,
        product: &str,
    ) -> Result<Stats, Error> {
        if let Some(stats) = agg_cache.get(&day).and_then(|m| m.get(product)) {
            return Ok(*stats);
        }

        let sales = Self::fetch_day_events(data_dir, loaded_series, day)?;
        let mut stats = Stats::default();
        for sale in &sales {
            if sale.product == product {
                stats.count += sale.quantity as i64;
                stats.volume += sale.quantity as f64 * sale.price;
                if sale.price > stats.max {
                    stats.max = sale.price;
                }
            }
        }
        agg_cache
            .entry(day)
            .or_default()
            .insert(product.to_string(), stats);
        Ok(stats)
    }

    fn fetch_day_events(
        data_dir: &std::path::Path,
        loaded_series: &mut LruCache<Vec<Sale>>,
        day: i64,
    ) -> Result<Vec<Sale>, Error> {
        if let Some(sales) = loaded_series.get(day) {
            return Ok(sales.clone());
        }
        let sales = day_file::read_day_file(data_dir, day)?;
        if sales.is_empty() && !data_file_exists(data_dir, day) {
            return Ok(sales);
        }
        loaded_series.put(day, sales.clone());
        Ok(sales)
    }

    /// Returns the sales for `day` whose product is in `filter`. `filter`
    /// empty means no product is matched; spec.md leaves empty-filter
    /// semantics to the caller (the connection handler accepts `[0, 10000]`
    /// entries, including zero).
    pub fn get_events_for_day(&self, day: i64, filter: &[String]) -> Result<Vec<Sale>, Error> {
        let mut inner = self.inner.lock().expect("storage lock poisoned");
        if day < 0 || day >= inner.retention.current_day {
            return Err(Error::OutOfWindow(format!(
                "day {day} is not a closed day (current day is {})",
                inner.retention.current_day
            )));
        }
        let sales = Self::fetch_day_events(&self.data_dir, &mut inner.loaded_series, day)?;
        Ok(sales
            .into_iter()
            .filter(|s| filter.iter().any(|p| p == &s.product))
            .collect())
    }

    pub fn retention_window(&self) -> i64 {
        self.retention_window
    }
}

fn data_file_exists(data_dir: &std::path::Path, day: i64) -> bool {
    day_file::day_file_path(data_dir, day).exists()
}
