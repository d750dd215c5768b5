pub mod config;
pub mod driver;
pub mod status;
pub mod timing;

pub use config::ProbeConfig;
pub use driver::{RunOutcome, Step, StepFailure, VerifyDriver};
pub use timing::{DelaySource, NoopDelay, TokioDelay, stagger_delay};
