pub mod allocation;
pub mod worker;
pub mod worker_registry;

pub use allocation::{run_allocation_loop, run_allocation_pass, AllocationPass};
pub use worker::{handle_tick, run_instrument_worker, WorkerShared};
pub use worker_registry::{DispatchOutcome, WorkerRegistry};
