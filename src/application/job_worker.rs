//! Background job execution.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use chrono::Utc;

use crate::domain::entities::{LoginType, NewLoginRecord, UserInfo};
use crate::domain::jobs::BackgroundJob;
use crate::domain::repositories::{LoginRecordRepository, UserRepository};
use crate::error::AppError;
use crate::infrastructure::geo::{IpLocator, ProxyDetector, is_private_ip};
use crate::infrastructure::mail::{MailError, MailSender};

/// Attempts after the first failure for mail jobs.
const MAIL_RETRIES: usize = 1;
/// Attempts after the first failure for database jobs.
const DB_RETRIES: usize = 3;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Database(#[from] AppError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("mail delivery is not configured")]
    MailDisabled,
}

/// Dependencies the jobs run against.
pub struct JobContext {
    pub login_records: Arc<dyn LoginRecordRepository>,
    pub users: Arc<dyn UserRepository>,
    pub locator: Arc<IpLocator>,
    /// Flags logins arriving through proxies. `None` skips the check.
    pub proxy: Option<ProxyDetector>,
    pub mailer: Option<Arc<dyn MailSender>>,
}

/// Consumes the job channel until every sender is dropped, running at most
/// `concurrency` jobs at a time.
pub async fn run_job_worker(
    mut rx: mpsc::Receiver<BackgroundJob>,
    ctx: Arc<JobContext>,
    concurrency: usize,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    info!(concurrency, "Job worker started");

    while let Some(job) = rx.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let kind = job.kind();
            match process_job(&ctx, job).await {
                Ok(()) => {
                    metrics::counter!("jobs_processed_total", "kind" => kind).increment(1);
                    debug!(kind, "Job done");
                }
                Err(e) => {
                    metrics::counter!("jobs_failed_total", "kind" => kind).increment(1);
                    error!(kind, "Job failed after retries: {}", e);
                }
            }
        });
    }

    info!("Job worker stopped");
}

/// Runs a single job, retrying transient failures.
pub async fn process_job(ctx: &JobContext, job: BackgroundJob) -> Result<(), JobError> {
    match job {
        BackgroundJob::LoginRecord {
            user,
            ip,
            login_type,
        } => record_login(ctx, &user, &ip, login_type).await,
        BackgroundJob::SendMail {
            title,
            content,
            tos,
            client_ip,
        } => {
            let Some(mailer) = ctx.mailer.as_ref() else {
                warn!(to = tos, "Dropping mail, no mail sender configured");
                return Err(JobError::MailDisabled);
            };
            let strategy = ExponentialBackoff::from_millis(500)
                .map(jitter)
                .take(MAIL_RETRIES);
            Retry::spawn(strategy, || mailer.send(&title, &content, &tos, &client_ip)).await?;
            Ok(())
        }
    }
}

async fn record_login(
    ctx: &JobContext,
    user: &UserInfo,
    ip: &str,
    login_type: LoginType,
) -> Result<(), JobError> {
    let physical_address = ctx.locator.locate_str(ip).to_string();
    let login_time = Utc::now();
    let record = NewLoginRecord {
        user_id: user.id,
        ip: ip.to_string(),
        physical_address,
        login_type,
        login_time,
    };

    let strategy = ExponentialBackoff::from_millis(100)
        .map(jitter)
        .take(DB_RETRIES);
    Retry::spawn(strategy.clone(), || ctx.login_records.insert(record.clone())).await?;
    Retry::spawn(strategy, || ctx.users.update_last_login(user.id, login_time)).await?;

    if is_proxy_login(ctx, ip).await {
        metrics::counter!("proxy_logins_total").increment(1);
        warn!(user = %user.username, ip, "Login through a proxy or anycast address");
    }

    info!(
        user = %user.username,
        ip,
        login_type = %login_type,
        "Login recorded"
    );
    Ok(())
}

/// Private and unparsable addresses are never looked up. Lookup failures
/// count as not flagged.
async fn is_proxy_login(ctx: &JobContext, ip: &str) -> bool {
    let Some(proxy) = ctx.proxy.as_ref() else {
        return false;
    };
    let Ok(addr) = ip.parse() else {
        return false;
    };
    if is_private_ip(addr) {
        return false;
    }
    match proxy.is_proxy(addr).await {
        Ok(flagged) => flagged,
        Err(e) => {
            debug!(ip, "Proxy check failed: {}", e);
            false
        }
    }
}
