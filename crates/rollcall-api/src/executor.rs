// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use rollcall_app::FailureKind;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::{ApiError, Client, Envelope, RequestDescriptor};

/// Anything that can carry one request to the backend and back.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: &RequestDescriptor) -> Result<Envelope, ApiError>;
}

impl Transport for Client {
    fn send(&self, request: &RequestDescriptor) -> Result<Envelope, ApiError> {
        Client::send(self, request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorState {
    #[default]
    Idle,
    InFlight {
        request_id: u64,
    },
    Succeeded,
    Failed(FailureKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub request_id: u64,
    pub request: RequestDescriptor,
    pub result: Result<Envelope, ApiError>,
}

/// Runs at most one request at a time on a worker thread and hands the
/// completion back exactly once through `poll` or `wait`.
pub struct Executor<T: Transport = Client> {
    transport: Arc<T>,
    state: ExecutorState,
    next_request_id: u64,
    pending: Option<Receiver<Completion>>,
}

impl<T: Transport> Executor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            state: ExecutorState::Idle,
            next_request_id: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, ExecutorState::InFlight { .. })
    }

    /// Starts `request` and returns its id. A second submit before the first
    /// completion is observed fails with `Busy` and leaves the in-flight call
    /// alone.
    pub fn submit(&mut self, request: RequestDescriptor) -> Result<u64, ApiError> {
        if self.is_busy() {
            debug!(path = %request.target, "rejected submit while in flight");
            return Err(ApiError::Busy);
        }
        self.next_request_id = self.next_request_id.saturating_add(1);
        let request_id = self.next_request_id;
        self.state = ExecutorState::InFlight { request_id };
        debug!(
            request_id,
            method = request.method.as_str(),
            path = %request.target,
            "executor in flight"
        );

        let (tx, rx) = mpsc::channel();
        self.pending = Some(rx);
        let transport = Arc::clone(&self.transport);
        thread::spawn(move || {
            let result = transport.send(&request);
            let _ = tx.send(Completion {
                request_id,
                request,
                result,
            });
        });
        Ok(request_id)
    }

    /// Non-blocking. Returns the completion of the in-flight request once it
    /// has arrived, and `None` otherwise.
    pub fn poll(&mut self) -> Option<Completion> {
        let ExecutorState::InFlight { request_id } = self.state else {
            return None;
        };
        let received = match self.pending.as_ref()?.try_recv() {
            Ok(completion) => completion,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => return Some(self.worker_lost(request_id)),
        };
        Some(self.settle(received))
    }

    /// Blocks until the in-flight request completes. `None` when idle.
    pub fn wait(&mut self) -> Option<Completion> {
        self.wait_timeout(None)
    }

    pub fn wait_timeout(&mut self, timeout: Option<Duration>) -> Option<Completion> {
        let ExecutorState::InFlight { request_id } = self.state else {
            return None;
        };
        let pending = self.pending.as_ref()?;
        let received = match timeout {
            Some(timeout) => pending.recv_timeout(timeout),
            None => pending.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(completion) => Some(self.settle(completion)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.worker_lost(request_id)),
        }
    }

    /// Submit and wait.
    pub fn execute(&mut self, request: RequestDescriptor) -> Result<Envelope, ApiError> {
        self.submit(request)?;
        match self.wait() {
            Some(completion) => completion.result,
            None => Err(ApiError::transport("request worker stopped")),
        }
    }

    fn settle(&mut self, completion: Completion) -> Completion {
        self.pending = None;
        self.state = match &completion.result {
            Ok(_) => ExecutorState::Succeeded,
            Err(error) => {
                ExecutorState::Failed(error.failure_kind().unwrap_or(FailureKind::Transport))
            }
        };
        match &completion.result {
            Ok(_) => info!(
                request_id = completion.request_id,
                path = %completion.request.target,
                "request succeeded"
            ),
            Err(error) => info!(
                request_id = completion.request_id,
                path = %completion.request.target,
                %error,
                "request failed"
            ),
        }
        completion
    }

    fn worker_lost(&mut self, request_id: u64) -> Completion {
        self.pending = None;
        self.state = ExecutorState::Failed(FailureKind::Transport);
        Completion {
            request_id,
            request: RequestDescriptor::get(String::new()),
            result: Err(ApiError::transport("request worker stopped")),
        }
    }
}
