//! Background job model and queue.

use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::entities::{LoginType, UserInfo};

/// Deferred work executed after the HTTP response has been sent.
///
/// Processed by [`crate::application::job_worker::run_job_worker`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundJob {
    /// Resolve the client location and persist a login audit record.
    LoginRecord {
        user: UserInfo,
        ip: String,
        login_type: LoginType,
    },
    /// Deliver an HTML mail and record it in the daily mail log.
    SendMail {
        title: String,
        content: String,
        tos: String,
        client_ip: String,
    },
}

impl BackgroundJob {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoginRecord { .. } => "login_record",
            Self::SendMail { .. } => "send_mail",
        }
    }
}

/// Producer side of the job channel.
///
/// Enqueueing never blocks the request: when the bounded channel is full the
/// job is dropped with a warning.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<BackgroundJob>,
}

impl JobQueue {
    /// Creates a queue and the receiver to hand to the worker.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BackgroundJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Returns `false` if the job was dropped.
    pub fn enqueue(&self, job: BackgroundJob) -> bool {
        let kind = job.kind();
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::counter!("jobs_dropped_total", "kind" => kind).increment(1);
                warn!(kind, "Job queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                metrics::counter!("jobs_dropped_total", "kind" => kind).increment(1);
                warn!(kind, "Job worker stopped, dropping job");
                false
            }
        }
    }

    /// Free slots left in the queue.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
