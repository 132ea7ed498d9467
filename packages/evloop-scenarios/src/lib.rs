//! Small programs whose console output shows the order in which the event
//! loop runs synchronous code, microtasks, timers, I/O callbacks and
//! immediates.

pub mod console;
pub mod http;
mod programs;
pub mod scenario;

pub use console::Console;
pub use http::{HttpGet, HttpResponse};
pub use scenario::{Scenario, ScenarioOptions, ScenarioOutcome, UnknownScenario, run};
