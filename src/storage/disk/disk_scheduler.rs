//! Disk scheduler: a single background worker draining an unbounded queue of
//! disk operations, so callers never block the buffer pool's latches on I/O.
//!
//! Requests are owned values (`DiskOp`), not raw pointers into caller memory —
//! a deliberate departure from a pointer-based request struct, since an
//! owned `Box<[u8; FRAME_SIZE]>` crossing the channel needs no `unsafe impl
//! Send` and no lifetime argument tying the request to its caller's stack
//! frame. Each request carries its own completion channel; the scheduler
//! itself never blocks waiting for a caller to consume a result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::common::config::FRAME_SIZE;
use crate::common::error::{CrioError, Result};
use crate::common::types::PageId;

use super::disk_manager::DiskManager;

pub type Frame = Box<[u8; FRAME_SIZE]>;

pub enum DiskOp {
    Read {
        page_id: PageId,
        responder: mpsc::Sender<DiskCompletion>,
    },
    Write {
        page_id: PageId,
        data: Frame,
        responder: mpsc::Sender<DiskCompletion>,
    },
    Flush {
        page_id: PageId,
        responder: mpsc::Sender<DiskCompletion>,
    },
}

pub enum DiskCompletion {
    ReadOk(Frame),
    WriteOk,
    FlushOk,
    Err(CrioError),
}

/// Owns the worker thread and the queue feeding it.
pub struct DiskScheduler {
    sender: Sender<DiskOp>,
    shutdown: Arc<AtomicBool>,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl DiskScheduler {
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver) = unbounded::<DiskOp>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = shutdown.clone();
        let worker = thread::spawn(move || {
            Self::run(disk_manager, receiver, worker_shutdown);
        });
        Self {
            sender,
            shutdown,
            worker: parking_lot::Mutex::new(Some(worker)),
        }
    }

    fn run(disk_manager: Arc<DiskManager>, receiver: Receiver<DiskOp>, shutdown: Arc<AtomicBool>) {
        loop {
            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(op) => {
                    if shutdown.load(Ordering::Acquire) {
                        Self::fail_closed(op);
                        continue;
                    }
                    Self::process(&disk_manager, op);
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    if shutdown.load(Ordering::Acquire) && receiver.is_empty() {
                        break;
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
        // Drain and fail anything left queued after the shutdown flag was observed.
        while let Ok(op) = receiver.try_recv() {
            Self::fail_closed(op);
        }
    }

    fn fail_closed(op: DiskOp) {
        let responder = match &op {
            DiskOp::Read { responder, .. } => responder,
            DiskOp::Write { responder, .. } => responder,
            DiskOp::Flush { responder, .. } => responder,
        };
        let _ = responder.send(DiskCompletion::Err(CrioError::SchedulerClosed));
    }

    fn process(disk_manager: &DiskManager, op: DiskOp) {
        match op {
            DiskOp::Read { page_id, responder } => {
                let mut buf: Frame = Box::new([0u8; FRAME_SIZE]);
                let result = match disk_manager.read_page(page_id, buf.as_mut_slice()) {
                    Ok(()) => DiskCompletion::ReadOk(buf),
                    Err(e) => DiskCompletion::Err(e),
                };
                let _ = responder.send(result);
            }
            DiskOp::Write {
                page_id,
                data,
                responder,
            } => {
                let result = match disk_manager.write_page(page_id, data.as_slice()) {
                    Ok(()) => DiskCompletion::WriteOk,
                    Err(e) => DiskCompletion::Err(e),
                };
                let _ = responder.send(result);
            }
            DiskOp::Flush { page_id, responder } => {
                let result = match disk_manager.flush(page_id) {
                    Ok(()) => DiskCompletion::FlushOk,
                    Err(e) => DiskCompletion::Err(e),
                };
                let _ = responder.send(result);
            }
        }
    }

    fn submit(
        &self,
        build: impl FnOnce(mpsc::Sender<DiskCompletion>) -> DiskOp,
    ) -> Result<mpsc::Receiver<DiskCompletion>> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(CrioError::SchedulerClosed);
        }
        let (tx, rx) = mpsc::channel();
        self.sender
            .send(build(tx))
            .map_err(|_| CrioError::SchedulerClosed)?;
        Ok(rx)
    }

    fn await_completion(rx: mpsc::Receiver<DiskCompletion>) -> Result<DiskCompletion> {
        rx.recv().map_err(|_| CrioError::SchedulerClosed)
    }

    /// Synchronously reads a page by enqueueing a request and blocking on
    /// its completion channel.
    pub fn schedule_read(&self, page_id: PageId) -> Result<Frame> {
        let rx = self.submit(|responder| DiskOp::Read { page_id, responder })?;
        match Self::await_completion(rx)? {
            DiskCompletion::ReadOk(frame) => Ok(frame),
            DiskCompletion::Err(e) => Err(e),
            _ => unreachable!("read request completed with a non-read result"),
        }
    }

    pub fn schedule_write(&self, page_id: PageId, data: Frame) -> Result<()> {
        let rx = self.submit(|responder| DiskOp::Write {
            page_id,
            data,
            responder,
        })?;
        match Self::await_completion(rx)? {
            DiskCompletion::WriteOk => Ok(()),
            DiskCompletion::Err(e) => Err(e),
            _ => unreachable!("write request completed with a non-write result"),
        }
    }

    pub fn schedule_flush(&self, page_id: PageId) -> Result<()> {
        let rx = self.submit(|responder| DiskOp::Flush { page_id, responder })?;
        match Self::await_completion(rx)? {
            DiskCompletion::FlushOk => Ok(()),
            DiskCompletion::Err(e) => Err(e),
            _ => unreachable!("flush request completed with a non-flush result"),
        }
    }

    /// Stops accepting new work. Requests already queued are drained and
    /// fail with [`CrioError::SchedulerClosed`] rather than being serviced.
    /// Idempotent: a second call is a no-op.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
