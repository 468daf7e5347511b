pub mod clock;
pub mod controller;
pub mod scheduler;
pub mod state;

pub use clock::{ClockReading, SessionClock};
pub use controller::SessionController;
pub use scheduler::StepScheduler;
pub use state::{SessionOutcome, SessionPhase, SessionState, StepStatus};
