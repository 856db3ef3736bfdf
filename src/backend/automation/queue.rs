//! Single-consumer command queue in front of a host session.
//!
//! Host automation interfaces are not safe for concurrent callers, so one
//! dedicated worker thread owns the session and runs queued calls strictly
//! in order. Each call gets a sequence number when it is enqueued; the
//! worker runs calls in sequence order.
//!
//! A caller that stops waiting (see [`Ticket::wait`]) does not cancel its
//! call. The worker still runs it and drops the result, and later calls wait
//! behind it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::service::{AutomationService, InvokeError, Parameters, SessionHandle};
use crate::common::{Error, Result};

/// One host command.
#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub command: String,
    pub params: Parameters,
}

impl Step {
    pub fn new(command: impl Into<String>, params: Parameters) -> Self {
        Self {
            command: command.into(),
            params,
        }
    }
}

/// Steps that run back to back with no other call in between. The result of
/// the last step answers the call.
struct Job {
    seq: u64,
    steps: Vec<Step>,
    reply: Sender<Result<Value>>,
}

enum Message {
    Call(Job),
    Shutdown,
}

/// A queued call.
#[derive(Debug)]
pub struct Ticket {
    seq: u64,
    command: String,
    queued_at: Instant,
    reply: Receiver<Result<Value>>,
}

impl Ticket {
    /// Position of the call in the session's execution order.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Block until the call completes or `timeout` runs out.
    ///
    /// The budget counts from when the call was queued, so time spent behind
    /// earlier calls is included. On timeout the call's outcome is unknown.
    pub fn wait(self, timeout: Option<Duration>) -> Result<Value> {
        let Some(budget) = timeout else {
            return self.reply.recv().unwrap_or_else(|_| Err(worker_gone()));
        };
        let remaining = budget.saturating_sub(self.queued_at.elapsed());
        match self.reply.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                let elapsed_ms = self.queued_at.elapsed().as_millis() as u64;
                warn!(seq = self.seq, command = %self.command, elapsed_ms, "host call timed out");
                Err(Error::Timeout {
                    command: self.command,
                    seq: self.seq,
                    elapsed_ms,
                })
            },
            Err(RecvTimeoutError::Disconnected) => Err(worker_gone()),
        }
    }
}

fn worker_gone() -> Error {
    Error::Connection("host worker stopped".to_string())
}

fn session_lost() -> Error {
    Error::Connection("host session is no longer usable".to_string())
}

/// Owns the worker thread of one host session.
pub(crate) struct HostQueue {
    tx: Sender<Message>,
    next_seq: Mutex<u64>,
    alive: Arc<AtomicBool>,
    session: SessionHandle,
}

impl HostQueue {
    /// Start a worker and establish the session on it.
    pub fn connect(
        service: Arc<dyn AutomationService>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let (tx, rx) = unbounded::<Message>();
        let (ready_tx, ready_rx) = bounded(1);
        let alive = Arc::new(AtomicBool::new(true));
        let worker_alive = Arc::clone(&alive);

        thread::Builder::new()
            .name("hwpkit-host".into())
            .spawn(move || {
                let session = match service.connect_or_attach() {
                    Ok(session) => session,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    },
                };
                if ready_tx.send(Ok(session.clone())).is_err() {
                    // The caller gave up waiting.
                    service.disconnect(session);
                    return;
                }
                run(service.as_ref(), &session, &rx, &worker_alive);
                worker_alive.store(false, Ordering::SeqCst);
                service.disconnect(session);
                debug!("host worker exited");
            })
            .map_err(|e| Error::Connection(format!("cannot start host worker: {e}")))?;

        let ready = match connect_timeout {
            Some(t) => ready_rx.recv_timeout(t).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    Error::Connection(format!("host did not answer within {} ms", t.as_millis()))
                },
                RecvTimeoutError::Disconnected => worker_gone(),
            })?,
            None => ready_rx.recv().map_err(|_| worker_gone())?,
        };
        let session = ready.map_err(|e| Error::Connection(e.to_string()))?;
        info!(session = %session, "attached to automation host");

        Ok(Self {
            tx,
            next_seq: Mutex::new(0),
            alive,
            session,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Queue `steps` as one call.
    pub fn submit(&self, steps: Vec<Step>) -> Result<Ticket> {
        if !self.is_alive() {
            return Err(session_lost());
        }
        let command = steps
            .last()
            .map(|s| s.command.clone())
            .ok_or_else(|| Error::validation("command", "no host command to run"))?;
        let (reply_tx, reply_rx) = bounded(1);
        let queued_at = Instant::now();

        // Numbering and sending under one lock keeps channel order equal to
        // sequence order.
        let mut next = self.next_seq.lock();
        *next += 1;
        let seq = *next;
        self.tx
            .send(Message::Call(Job {
                seq,
                steps,
                reply: reply_tx,
            }))
            .map_err(|_| worker_gone())?;
        drop(next);

        debug!(seq, command = %command, "queued host call");
        Ok(Ticket {
            seq,
            command,
            queued_at,
            reply: reply_rx,
        })
    }

    /// Stop accepting calls. Calls already queued still run, then the worker
    /// releases the session.
    pub fn shutdown(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            let _ = self.tx.send(Message::Shutdown);
            debug!(session = %self.session, "host queue shut down");
        }
    }
}

impl Drop for HostQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    service: &dyn AutomationService,
    session: &SessionHandle,
    rx: &Receiver<Message>,
    alive: &AtomicBool,
) {
    let mut lost = false;
    for message in rx.iter() {
        let job = match message {
            Message::Call(job) => job,
            Message::Shutdown => break,
        };
        let result = if lost {
            Err(session_lost())
        } else {
            execute(service, session, &job)
        };
        if let Err(Error::Connection(reason)) = &result
            && !lost
        {
            warn!(seq = job.seq, reason = %reason, "host disconnected");
            lost = true;
            alive.store(false, Ordering::SeqCst);
        }
        if job.reply.send(result).is_err() {
            debug!(seq = job.seq, "discarded result of abandoned call");
        }
    }
}

fn execute(service: &dyn AutomationService, session: &SessionHandle, job: &Job) -> Result<Value> {
    let started = Instant::now();
    let mut last = Value::Null;
    for step in &job.steps {
        last = service
            .invoke(session, &step.command, step.params.clone())
            .map_err(|e| match e {
                InvokeError::Rejected(host) => Error::Host {
                    command: step.command.clone(),
                    detail: match host.code {
                        Some(code) => format!("{} (code {code})", host.message),
                        None => host.message,
                    },
                },
                InvokeError::Disconnected(reason) => Error::Connection(reason),
            })?;
    }
    debug!(
        seq = job.seq,
        steps = job.steps.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "host call finished"
    );
    Ok(last)
}
