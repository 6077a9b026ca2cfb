//! Worker-pool completion dispatcher.
//!
//! Transport bindings run their completions on threads owned by a
//! [`Dispatcher`]: jobs posted via [`post`](Dispatcher::post) execute on
//! the next free worker, jobs posted via [`post_after`](Dispatcher::post_after)
//! are held by a timer thread until their deadline. Stream adapters never
//! spawn threads of their own.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::Error;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum WorkerMsg {
    Run(Job),
    Shutdown,
}

enum TimerMsg {
    Arm(Instant, Job),
    Shutdown,
}

/// Handle to a pool of completion worker threads.
///
/// Cheap to clone; all clones drive the same pool. The pool shuts down when
/// [`shutdown`](Dispatcher::shutdown) is called or the last handle drops.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    job_tx: Sender<WorkerMsg>,
    timer_tx: Sender<TimerMsg>,
    workers: usize,
    down: AtomicBool,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl Dispatcher {
    /// Launch a dispatcher with `threads` workers plus one timer thread.
    /// `threads == 0` uses the number of available cores.
    pub fn new(threads: usize) -> Result<Self, Error> {
        let workers = if threads == 0 {
            thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            threads
        };

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<WorkerMsg>();
        let (timer_tx, timer_rx) = crossbeam_channel::unbounded::<TimerMsg>();

        let mut handles = Vec::with_capacity(workers + 1);
        for id in 0..workers {
            let rx = job_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("sluice-worker-{id}"))
                .spawn(move || run_worker(rx))
                .map_err(Error::Io)?;
            handles.push(handle);
        }

        let forward = job_tx.clone();
        let handle = thread::Builder::new()
            .name("sluice-timer".to_string())
            .spawn(move || run_timer(timer_rx, forward))
            .map_err(Error::Io)?;
        handles.push(handle);

        Ok(Dispatcher {
            inner: Arc::new(Inner {
                job_tx,
                timer_tx,
                workers,
                down: AtomicBool::new(false),
                handles: Mutex::new(handles),
            }),
        })
    }

    /// Run `job` on the next free worker thread.
    pub fn post<F>(&self, job: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.down.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }
        self.inner
            .job_tx
            .send(WorkerMsg::Run(Box::new(job)))
            .map_err(|_| Error::Shutdown)
    }

    /// Run `job` on a worker thread no earlier than `delay` from now.
    /// A zero delay posts directly.
    pub fn post_after<F>(&self, delay: Duration, job: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        if delay.is_zero() {
            return self.post(job);
        }
        if self.inner.down.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }
        self.inner
            .timer_tx
            .send(TimerMsg::Arm(Instant::now() + delay, Box::new(job)))
            .map_err(|_| Error::Shutdown)
    }

    /// Number of worker threads (excluding the timer thread).
    pub fn workers(&self) -> usize {
        self.inner.workers
    }

    /// Stop accepting jobs, let queued jobs finish, and join all threads.
    /// Jobs still held by the timer are dropped unrun.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl Inner {
    fn shutdown(&self) {
        if self.down.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.timer_tx.send(TimerMsg::Shutdown);
        for _ in 0..self.workers {
            let _ = self.job_tx.send(WorkerMsg::Shutdown);
        }
        let handles = {
            let mut guard = self.handles.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(rx: Receiver<WorkerMsg>) {
    while let Ok(msg) = rx.recv() {
        match msg {
            WorkerMsg::Run(job) => job(),
            WorkerMsg::Shutdown => break,
        }
    }
}

/// Armed delayed job, min-ordered by deadline (ties broken by arm order).
struct Armed {
    at: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for Armed {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Armed {}

impl PartialOrd for Armed {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Armed {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest deadline.
        other.at.cmp(&self.at).then(other.seq.cmp(&self.seq))
    }
}

fn run_timer(rx: Receiver<TimerMsg>, forward: Sender<WorkerMsg>) {
    let mut armed: BinaryHeap<Armed> = BinaryHeap::new();
    let mut seq: u64 = 0;

    loop {
        let msg = match armed.peek() {
            Some(next) => {
                let wait = next.at.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(msg) => Some(msg),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
            None => match rx.recv() {
                Ok(msg) => Some(msg),
                Err(_) => return,
            },
        };

        match msg {
            Some(TimerMsg::Arm(at, job)) => {
                armed.push(Armed { at, seq, job });
                seq += 1;
            }
            Some(TimerMsg::Shutdown) => return,
            None => {}
        }

        let now = Instant::now();
        while armed.peek().is_some_and(|next| next.at <= now) {
            let due = armed.pop().expect("peeked entry");
            if forward.send(WorkerMsg::Run(due.job)).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    #[test]
    fn post_runs_job_on_worker_thread() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let (tx, rx) = mpsc::channel();

        dispatcher
            .post(move || {
                let name = thread::current().name().map(str::to_string);
                tx.send(name).unwrap();
            })
            .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(name.unwrap().starts_with("sluice-worker-"));
        dispatcher.shutdown();
    }

    #[test]
    fn post_after_respects_delay() {
        let dispatcher = Dispatcher::new(1).unwrap();
        let (tx, rx) = mpsc::channel();
        let begun = Instant::now();

        dispatcher
            .post_after(Duration::from_millis(50), move || {
                tx.send(Instant::now()).unwrap();
            })
            .unwrap();

        let fired = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(fired.duration_since(begun) >= Duration::from_millis(50));
        dispatcher.shutdown();
    }

    #[test]
    fn delayed_jobs_fire_in_deadline_order() {
        let dispatcher = Dispatcher::new(1).unwrap();
        let (tx, rx) = mpsc::channel();

        for (tag, delay_ms) in [(2u8, 60u64), (0, 10), (1, 30)] {
            let tx = tx.clone();
            dispatcher
                .post_after(Duration::from_millis(delay_ms), move || {
                    tx.send(tag).unwrap();
                })
                .unwrap();
        }

        let mut order = Vec::new();
        for _ in 0..3 {
            order.push(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        }
        assert_eq!(order, vec![0, 1, 2]);
        dispatcher.shutdown();
    }

    #[test]
    fn all_posted_jobs_run() {
        let dispatcher = Dispatcher::new(4).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let ran = ran.clone();
            dispatcher
                .post(move || {
                    ran.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
        }

        dispatcher.shutdown();
        assert_eq!(ran.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn post_after_shutdown_is_rejected() {
        let dispatcher = Dispatcher::new(1).unwrap();
        dispatcher.shutdown();
        let result = dispatcher.post(|| {});
        assert!(matches!(result, Err(Error::Shutdown)));
    }
}
