//! A bounded, fixed-size worker pool (spec.md §4.3): a FIFO queue of
//! nullary tasks behind one mutex and one condition variable. Workers
//! never grow or shrink at runtime; a panicking task is caught and logged
//! rather than taking its worker down with it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// The task queue and the shutdown flag live under one mutex so that
/// "is the pool shutting down" and "push onto the queue" are always
/// observed together: a `submit()` that checks the flag can't race a
/// `shutdown()` that flips it and drains the queue out from under it.
struct QueueState {
    tasks: VecDeque<Task>,
    shutting_down: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    panicked_tasks: AtomicU64,
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(num_workers: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                shutting_down: false,
            }),
            not_empty: Condvar::new(),
            panicked_tasks: AtomicU64::new(0),
        });

        let workers = (0..num_workers)
            .map(|id| {
                let shared = shared.clone();
                std::thread::spawn(move || worker_loop(id, shared))
            })
            .collect();

        Self { shared, workers }
    }

    /// Enqueues a task. Silently discarded if the pool is shutting down.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock().expect("pool lock poisoned");
        if state.shutting_down {
            return;
        }
        state.tasks.push_back(Box::new(task));
        self.shared.not_empty.notify_one();
    }

    pub fn panicked_task_count(&self) -> u64 {
        self.shared.panicked_tasks.load(Ordering::Relaxed)
    }

    /// Flags the pool shutting down, wakes every worker, and waits for all
    /// of them to drain the queue and exit (spec.md: "set the flag under
    /// the queue lock").
    pub fn shutdown(mut self) {
        self.shared.state.lock().expect("pool lock poisoned").shutting_down = true;
        self.shared.not_empty.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(id: usize, shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.state.lock().expect("pool lock poisoned");
            loop {
                if let Some(task) = state.tasks.pop_front() {
                    break Some(task);
                }
                if state.shutting_down {
                    break None;
                }
                state = shared.not_empty.wait(state).expect("pool lock poisoned");
            }
        };

        let Some(task) = task else {
            log::info!("worker {id} exiting, queue drained");
            return;
        };

        if std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).is_err() {
            shared.panicked_tasks.fetch_add(1, Ordering::Relaxed);
            log::warn!("worker {id} caught a panicking task, continuing");
        }
    }
}
