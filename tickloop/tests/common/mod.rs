#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tickloop::{ReadinessSource, TimerSource, Wake, WakeReason};

/// Ordered record of collaborator calls, shared with the test.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<&'static str>>>);

impl Journal {
    pub fn push(&self, entry: &'static str) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    /// Entries excluding the per-tick ones.
    pub fn lifecycle(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|e| *e != "process_due" && *e != "wait")
            .collect()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| **e == entry).count()
    }
}

/// Switches that make the fakes fail on demand.
#[derive(Default)]
pub struct Faults {
    pub timers_init: AtomicBool,
    pub sockets_init: AtomicBool,
    pub timers_shutdown: AtomicBool,
    pub sockets_shutdown: AtomicBool,
    pub panic_in_wait: AtomicBool,
    pub panic_in_timers_init: AtomicBool,
    pub panic_in_sockets_shutdown: AtomicBool,
}

fn fail(flag: &AtomicBool, what: &str) -> io::Result<()> {
    if flag.load(Ordering::SeqCst) {
        Err(io::Error::other(format!("{what} failed")))
    } else {
        Ok(())
    }
}

/// Timer source with nothing ever scheduled.
pub struct FakeTimers {
    pub journal: Journal,
    pub faults: Arc<Faults>,
    pub ticks: Arc<AtomicUsize>,
}

impl TimerSource for FakeTimers {
    fn initialize(&mut self) -> io::Result<()> {
        self.journal.push("timers.initialize");
        if self.faults.panic_in_timers_init.load(Ordering::SeqCst) {
            panic!("timers.initialize exploded");
        }
        fail(&self.faults.timers_init, "timers.initialize")
    }

    fn process_due(&mut self, _now: Instant) -> Option<Instant> {
        self.journal.push("process_due");
        self.ticks.fetch_add(1, Ordering::SeqCst);
        None
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.journal.push("timers.shutdown");
        fail(&self.faults.timers_shutdown, "timers.shutdown")
    }
}

/// Latching wake signal built on a condition variable.
#[derive(Clone, Default)]
pub struct Signal(Arc<(Mutex<bool>, Condvar)>);

impl Wake for Signal {
    fn wake(&self) {
        let (lock, cvar) = &*self.0;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }
}

impl Signal {
    /// Blocks until woken or `deadline` passes. Returns `true` when woken.
    fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let (lock, cvar) = &*self.0;
        let mut woken = lock.lock().unwrap();

        loop {
            if *woken {
                *woken = false;
                return true;
            }

            match deadline {
                None => woken = cvar.wait(woken).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    woken = cvar.wait_timeout(woken, deadline - now).unwrap().0;
                }
            }
        }
    }
}

/// Readiness source without sockets: waits are ended by wakes or deadlines.
pub struct FakeSockets {
    pub journal: Journal,
    pub faults: Arc<Faults>,
    pub signal: Signal,
}

impl ReadinessSource for FakeSockets {
    type Waker = Signal;

    fn initialize(&mut self) -> io::Result<()> {
        self.journal.push("sockets.initialize");
        fail(&self.faults.sockets_init, "sockets.initialize")
    }

    fn waker(&self) -> Signal {
        self.signal.clone()
    }

    fn wait(&mut self, deadline: Option<Instant>) -> io::Result<WakeReason> {
        if self.faults.panic_in_wait.load(Ordering::SeqCst) {
            panic!("wait exploded");
        }

        let woken = self.signal.wait_until(deadline);
        self.journal.push("wait");

        Ok(if woken {
            WakeReason::Woken
        } else {
            WakeReason::Timeout
        })
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.journal.push("sockets.shutdown");
        if self.faults.panic_in_sockets_shutdown.load(Ordering::SeqCst) {
            panic!("sockets.shutdown exploded");
        }
        fail(&self.faults.sockets_shutdown, "sockets.shutdown")
    }
}

pub struct Fakes {
    pub journal: Journal,
    pub faults: Arc<Faults>,
    pub ticks: Arc<AtomicUsize>,
}

pub fn fakes() -> (FakeTimers, FakeSockets, Fakes) {
    let journal = Journal::default();
    let faults = Arc::new(Faults::default());
    let ticks = Arc::new(AtomicUsize::new(0));

    let timers = FakeTimers {
        journal: journal.clone(),
        faults: faults.clone(),
        ticks: ticks.clone(),
    };
    let sockets = FakeSockets {
        journal: journal.clone(),
        faults: faults.clone(),
        signal: Signal::default(),
    };

    (
        timers,
        sockets,
        Fakes {
            journal,
            faults,
            ticks,
        },
    )
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    condition()
}
