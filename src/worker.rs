use std::io;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::{HarvestError, Result};

/// Handle of a job running on its own thread.
/// The job's `Result` arrives through a channel.
#[derive(Debug)]
pub struct JobHandle<T> {
    name: String,
    receiver: Receiver<Result<T>>,
    thread: Option<JoinHandle<()>>,
}

/// Run a blocking `job` (harvest, keyword fitting) on a dedicated named thread.
pub fn spawn<T, F>(name: impl Into<String>, job: F) -> Result<JobHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let name = name.into();
    let (sender, receiver) = mpsc::channel();
    let thread = thread::Builder::new().name(name.clone()).spawn(move || {
        // 受信側が先に破棄されていても気にしない
        let _ = sender.send(job());
    })?;
    debug!(job = %name, "worker started");
    Ok(JobHandle {
        name,
        receiver,
        thread: Some(thread),
    })
}

impl<T> JobHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the job reports.
    /// A job that panicked is reported as an I/O error.
    pub fn wait(mut self) -> Result<T> {
        let received = self.receiver.recv();
        self.join();
        match received {
            Ok(result) => result,
            Err(_) => Err(self.panicked()),
        }
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn panicked(&self) -> HarvestError {
        HarvestError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("worker `{}` terminated without a result", self.name),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_is_delivered() {
        let handle = spawn("sum", || Ok((1..=10u64).sum::<u64>())).unwrap();
        assert_eq!(handle.name(), "sum");
        assert_eq!(handle.wait().unwrap(), 55);
    }

    #[test]
    fn errors_are_delivered() {
        let handle = spawn::<(), _>("fail", || Err(HarvestError::Configuration("bad".into()))).unwrap();
        assert!(matches!(handle.wait(), Err(HarvestError::Configuration(_))));
    }

    #[test]
    fn panic_becomes_error() {
        let handle = spawn::<(), _>("boom", || panic!("boom")).unwrap();
        assert!(handle.wait().is_err());
    }
}
