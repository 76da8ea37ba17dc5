use shared::tcu_hal::FaultCause;

/// Fault flag that can only go from clear to set. Keeps the first cause.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultLatch {
    cause: Option<FaultCause>,
}

impl FaultLatch {
    pub const fn new() -> Self {
        Self { cause: None }
    }

    /// Returns true if this call is the one that latched the fault.
    pub fn latch(&mut self, cause: FaultCause) -> bool {
        if self.cause.is_some() {
            return false;
        }

        self.cause = Some(cause);
        true
    }

    pub fn is_latched(&self) -> bool {
        self.cause.is_some()
    }

    pub fn cause(&self) -> Option<FaultCause> {
        self.cause
    }
}
