use crate::{
    audio::AudioManager,
    config::Config,
    font::FontCache,
    platform::{Platform, WindowId},
    router::EventRouter,
    window::WindowState,
    Error, Result,
};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    time::Duration,
};
use tracing::{debug, warn};

pub(crate) type Job = Box<dyn FnOnce(&mut Owner) + Send>;

/// Everything that must only be touched from the owner thread.
pub struct Owner {
    pub(crate) platform: Box<dyn Platform>,
    pub(crate) windows: HashMap<WindowId, WindowState>,
    pub(crate) fonts: FontCache,
    pub(crate) router: EventRouter,
    pub(crate) event_queue_capacity: usize,
}

impl Owner {
    pub(crate) fn new(platform: Box<dyn Platform>, config: &Config) -> Self {
        Self {
            platform,
            windows: HashMap::new(),
            fonts: FontCache::new(),
            router: EventRouter::new(config.retry_capacity, config.retry_polls),
            event_queue_capacity: config.event_queue_capacity,
        }
    }

    pub(crate) fn poll_events(&mut self) {
        self.router.poll(self.platform.as_mut(), &self.windows);
    }

    /// Releases every window that is still registered.
    pub(crate) fn shutdown(&mut self) {
        for (id, state) in self.windows.drain() {
            debug!(window = %id, "destroying window at shutdown");
            state.release(self.platform.as_mut());
        }
    }
}

/// The sending side of the owner thread's job slot.
///
/// The slot holds one job, so concurrent callers queue up on it and jobs run
/// strictly one after another.
#[derive(Clone)]
pub struct Dispatcher {
    jobs: Sender<Job>,
}

impl Dispatcher {
    pub(crate) fn channel() -> (Self, Receiver<Job>) {
        let (jobs, rx) = bounded(1);
        (Self { jobs }, rx)
    }

    /// Runs `f` on the owner thread and waits for its result.
    ///
    /// A panic in `f` resumes on the calling thread. Calling this from the
    /// owner thread itself deadlocks.
    pub fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Owner) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (ack_tx, ack_rx) = bounded(1);
        let job: Job = Box::new(move |owner| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| f(owner)));
            let _ = ack_tx.send(result);
        });
        self.jobs.send(job).map_err(|_| Error::Closed)?;
        match ack_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(Error::Closed),
        }
    }
}

/// Serves jobs and polls events until `done` disconnects or every
/// [`Dispatcher`] is gone.
pub(crate) fn owner_loop(
    owner: &mut Owner,
    audio: &mut AudioManager,
    jobs: &Receiver<Job>,
    done: &Receiver<()>,
    poll_rate: Duration,
) {
    let ticker = tick(poll_rate);
    debug!(?poll_rate, "owner loop started");
    loop {
        select! {
            recv(jobs) -> job => match job {
                Ok(job) => job(owner),
                Err(_) => break,
            },
            recv(ticker) -> _ => {
                owner.poll_events();
                if let Err(err) = audio.recover_if_needed() {
                    warn!("failed to restart audio: {err:#}");
                }
            }
            recv(done) -> _ => break,
        }
    }
    debug!("owner loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessPlatform;
    use std::thread;

    fn owner() -> Owner {
        Owner::new(Box::new(HeadlessPlatform::new()), &Config::default())
    }

    fn serve(jobs: Receiver<Job>, count: usize) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let mut owner = owner();
            for job in jobs.iter().take(count) {
                job(&mut owner);
            }
        })
    }

    #[test]
    fn returns_the_closure_value() {
        let (dispatcher, jobs) = Dispatcher::channel();
        let server = serve(jobs, 1);
        let value = dispatcher.call(|owner| owner.windows.len() + 41).unwrap();
        assert_eq!(value, 41);
        server.join().unwrap();
    }

    #[test]
    fn closed_after_the_owner_is_gone() {
        let (dispatcher, jobs) = Dispatcher::channel();
        drop(jobs);
        assert!(matches!(dispatcher.call(|_| ()), Err(Error::Closed)));
    }

    #[test]
    fn dropped_job_reports_closed() {
        let (dispatcher, jobs) = Dispatcher::channel();
        let server = thread::spawn(move || drop(jobs.recv().unwrap()));
        assert!(matches!(dispatcher.call(|_| ()), Err(Error::Closed)));
        server.join().unwrap();
    }

    #[test]
    fn panic_reaches_the_caller_and_the_owner_survives() {
        let (dispatcher, jobs) = Dispatcher::channel();
        let server = serve(jobs, 2);
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            dispatcher.call(|_| -> () { panic!("boom") })
        }));
        let payload = caught.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
        assert_eq!(dispatcher.call(|_| 7).unwrap(), 7);
        server.join().unwrap();
    }
}
