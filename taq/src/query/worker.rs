//! Background worker lifecycle
//!
//! The engine never hands work to a worker. It only signals the start and
//! end of each query run so a service doing background writes can open and
//! flush around it.

/// Passed to the launcher through its parameters; there is no global instance
pub trait WorkerService {
    fn activate(&self);
    fn close(&self);
}
