//! Background execution of whole archive operations.
//!
//! The engine is synchronous; callers that want a responsive front end run
//! one operation on a worker thread and poll the shared
//! [`ProgressMonitor`]. The monitor rejects a second operation while one is
//! running, and the worker converts a terminal error into the monitor's
//! result slot instead of unwinding, so the caller observes it
//! asynchronously.

use oxizip_core::error::{Result, ZipError};
use oxizip_core::status::{ProgressMonitor, TaskResult};
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread::JoinHandle;

const COPY_BUF_SIZE: usize = 32 * 1024;

/// Run `operation` on a worker thread under the monitor.
///
/// Fails immediately (without spawning) when the monitor is busy. The
/// operation's outcome lands in [`ProgressMonitor::result`].
pub fn run_in_background<F>(monitor: Arc<ProgressMonitor>, operation: F) -> Result<JoinHandle<()>>
where
    F: FnOnce(&ProgressMonitor) -> Result<()> + Send + 'static,
{
    monitor.begin()?;
    let handle = std::thread::Builder::new()
        .name("oxizip-task".to_string())
        .spawn(move || {
            let outcome = match operation(&monitor) {
                Ok(()) => TaskResult::Success,
                Err(ZipError::Cancelled) => TaskResult::Cancelled,
                Err(error) => TaskResult::Error(error.to_string()),
            };
            monitor.finish(outcome);
        })
        .map_err(ZipError::Io)?;
    Ok(handle)
}

/// Run `operation` on the calling thread under the monitor, with the same
/// busy-rejection and result bookkeeping as the background form.
pub fn run_monitored<F>(monitor: &ProgressMonitor, operation: F) -> Result<()>
where
    F: FnOnce(&ProgressMonitor) -> Result<()>,
{
    monitor.begin()?;
    let result = operation(monitor);
    let outcome = match &result {
        Ok(()) => TaskResult::Success,
        Err(ZipError::Cancelled) => TaskResult::Cancelled,
        Err(error) => TaskResult::Error(error.to_string()),
    };
    monitor.finish(outcome);
    result
}

/// Copy a stream in buffer-sized chunks, checking the monitor between
/// chunks: a pause parks here, a cancel exits with [`ZipError::Cancelled`]
/// at the next boundary.
pub fn copy_with_monitor<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    monitor: &ProgressMonitor,
) -> Result<u64> {
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;
    loop {
        monitor.checkpoint()?;
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
        monitor.add_work_completed(n as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxizip_core::status::TaskState;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn test_background_success_lands_in_result_slot() {
        let monitor = Arc::new(ProgressMonitor::new());
        let handle = run_in_background(Arc::clone(&monitor), |m| {
            m.add_work_completed(42);
            Ok(())
        })
        .unwrap();
        handle.join().unwrap();

        assert_eq!(monitor.result(), Some(TaskResult::Success));
        assert_eq!(monitor.state(), TaskState::Ready);
        assert_eq!(monitor.progress().0, 42);
    }

    #[test]
    fn test_background_error_becomes_terminal_result() {
        let monitor = Arc::new(ProgressMonitor::new());
        let handle = run_in_background(Arc::clone(&monitor), |_| {
            Err(ZipError::WrongPassword)
        })
        .unwrap();
        handle.join().unwrap();

        match monitor.result() {
            Some(TaskResult::Error(message)) => assert!(message.contains("password")),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(monitor.state(), TaskState::Ready);
    }

    #[test]
    fn test_second_operation_rejected_while_busy() {
        let monitor = Arc::new(ProgressMonitor::new());
        let gate = Arc::new(std::sync::Barrier::new(2));

        let worker_gate = Arc::clone(&gate);
        let handle = run_in_background(Arc::clone(&monitor), move |_| {
            worker_gate.wait();
            Ok(())
        })
        .unwrap();

        assert!(run_in_background(Arc::clone(&monitor), |_| Ok(())).is_err());
        gate.wait();
        handle.join().unwrap();
    }

    #[test]
    fn test_copy_cancellation_stops_at_chunk_boundary() {
        let monitor = Arc::new(ProgressMonitor::new());
        monitor.begin().unwrap();
        monitor.request_cancel();

        let mut source = Cursor::new(vec![0u8; 1024]);
        let mut dest = Vec::new();
        let err = copy_with_monitor(&mut source, &mut dest, &monitor).unwrap_err();
        assert!(matches!(err, ZipError::Cancelled));
        assert!(dest.is_empty());
    }

    #[test]
    fn test_cancel_during_background_copy() {
        let monitor = Arc::new(ProgressMonitor::new());
        // A reader that never runs dry keeps the copy loop alive until
        // cancellation lands.
        struct Endless;
        impl Read for Endless {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                Ok(buf.len())
            }
        }

        let handle = run_in_background(Arc::clone(&monitor), |m| {
            copy_with_monitor(&mut Endless, &mut std::io::sink(), m)?;
            Ok(())
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(20));
        monitor.request_cancel();
        handle.join().unwrap();
        assert_eq!(monitor.result(), Some(TaskResult::Cancelled));
    }

    #[test]
    fn test_run_monitored_inline() {
        let monitor = ProgressMonitor::new();
        run_monitored(&monitor, |m| {
            let mut src = Cursor::new(b"abcdef".to_vec());
            let mut dst = Vec::new();
            copy_with_monitor(&mut src, &mut dst, m)?;
            assert_eq!(dst, b"abcdef");
            Ok(())
        })
        .unwrap();
        assert_eq!(monitor.result(), Some(TaskResult::Success));
        assert_eq!(monitor.progress().0, 6);
    }
}
