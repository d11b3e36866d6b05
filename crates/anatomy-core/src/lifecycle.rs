//! Viewer lifecycle: Uninitialized -> Running -> Disposed
//!
//! `Disposed` is terminal. Asynchronous work (the asset load) is issued a
//! [`LoadTicket`]; once the viewer is disposed every outstanding ticket is
//! rejected, so a late resolution cannot touch a torn-down scene.

use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerState {
    #[default]
    Uninitialized,
    Running,
    Disposed,
}

impl ViewerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerState::Uninitialized => "uninitialized",
            ViewerState::Running => "running",
            ViewerState::Disposed => "disposed",
        }
    }
}

/// Proof that an asynchronous result belongs to the current viewer run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    state: ViewerState,
    generation: u64,
    frames: u64,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ViewerState::Running
    }

    pub fn is_disposed(&self) -> bool {
        self.state == ViewerState::Disposed
    }

    /// Uninitialized -> Running. Returns false from any other state.
    pub fn start(&mut self) -> bool {
        if self.state != ViewerState::Uninitialized {
            debug!(state = self.state.as_str(), "Ignoring start");
            return false;
        }
        self.state = ViewerState::Running;
        info!("Viewer running");
        true
    }

    /// Any state -> Disposed. Returns true only for the call that actually
    /// transitioned; later calls are no-ops.
    pub fn dispose(&mut self) -> bool {
        if self.state == ViewerState::Disposed {
            debug!("Viewer already disposed");
            return false;
        }
        self.state = ViewerState::Disposed;
        self.generation += 1;
        info!(frames = self.frames, "Viewer disposed");
        true
    }

    /// Ticket for an asynchronous operation, only while running
    pub fn issue_ticket(&mut self) -> Option<LoadTicket> {
        self.is_running().then_some(LoadTicket {
            generation: self.generation,
        })
    }

    /// Whether a result carrying `ticket` may still be applied
    pub fn accepts(&self, ticket: LoadTicket) -> bool {
        self.is_running() && ticket.generation == self.generation
    }

    /// Count a frame tick. Returns false when frames must not run.
    pub fn begin_frame(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.frames += 1;
        true
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Aspect ratio for a viewport, `None` when either side is zero
pub fn aspect_ratio(width: u32, height: u32) -> Option<f32> {
    if width == 0 || height == 0 {
        return None;
    }
    Some(width as f32 / height as f32)
}
