//! Coordinator Mailbox
//!
//! Commands from callers and lifecycle notifications from pool threads,
//! consumed in order by the coordinator thread.

use log::debug;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::TaskError;
use crate::tasks::listener::InternalListener;
use crate::tasks::Task;

pub(crate) enum Message<K, R> {
    Submit(Arc<Task<K, R>>),
    Cancel(K),
    ClearFinished,
    Started(Arc<Task<K, R>>),
    Succeeded(Arc<Task<K, R>>, R),
    Failed(Arc<Task<K, R>>, TaskError),
    Canceled(Arc<Task<K, R>>),
}

impl<K, R> Message<K, R> {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Submit(_) => "submit",
            Self::Cancel(_) => "cancel",
            Self::ClearFinished => "clear_finished",
            Self::Started(_) => "started",
            Self::Succeeded(..) => "succeeded",
            Self::Failed(..) => "failed",
            Self::Canceled(_) => "canceled",
        }
    }
}

/// Internal listener posting pool-thread notifications into the mailbox.
///
/// Holds a weak sender so retained tasks never keep the loop alive.
pub(crate) struct MailboxListener<K, R> {
    mailbox: mpsc::WeakUnboundedSender<Message<K, R>>,
}

impl<K, R> MailboxListener<K, R> {
    pub(crate) fn new(mailbox: mpsc::WeakUnboundedSender<Message<K, R>>) -> Self {
        Self { mailbox }
    }

    fn post(&self, message: Message<K, R>) {
        match self.mailbox.upgrade() {
            Some(tx) => {
                if let Err(e) = tx.send(message) {
                    debug!("Mailbox closed, dropping {} notification", e.0.name());
                }
            }
            None => debug!("Coordinator gone, dropping {} notification", message.name()),
        }
    }
}

impl<K, R> InternalListener<K, R> for MailboxListener<K, R>
where
    K: Send + Sync,
    R: Send + Sync,
{
    fn on_start(&self, task: &Arc<Task<K, R>>) {
        self.post(Message::Started(task.clone()));
    }

    fn on_success(&self, task: &Arc<Task<K, R>>, result: R) {
        self.post(Message::Succeeded(task.clone(), result));
    }

    fn on_failed(&self, task: &Arc<Task<K, R>>, error: TaskError) {
        self.post(Message::Failed(task.clone(), error));
    }

    fn on_canceled(&self, task: &Arc<Task<K, R>>) {
        self.post(Message::Canceled(task.clone()));
    }
}
