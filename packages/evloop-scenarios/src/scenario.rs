use crate::console::Console;
use crate::programs;
use evloop_scheduler::{LocalScheduler, RunSummary, SchedulerConfig, SchedulerError, TaskResult};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    SetTimeoutZero,
    AsyncIo,
    Blocking,
    EventLoop1,
    EventLoop2,
    EventLoop3,
    EventLoop4,
}

type Program = fn(&Rc<LocalScheduler>, &Console, &ScenarioOptions) -> TaskResult;

impl Scenario {
    pub const ALL: [Scenario; 7] = [
        Scenario::SetTimeoutZero,
        Scenario::AsyncIo,
        Scenario::Blocking,
        Scenario::EventLoop1,
        Scenario::EventLoop2,
        Scenario::EventLoop3,
        Scenario::EventLoop4,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::SetTimeoutZero => "set-timeout-zero",
            Scenario::AsyncIo => "async-io",
            Scenario::Blocking => "blocking",
            Scenario::EventLoop1 => "event-loop-1",
            Scenario::EventLoop2 => "event-loop-2",
            Scenario::EventLoop3 => "event-loop-3",
            Scenario::EventLoop4 => "event-loop-4",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Scenario::SetTimeoutZero => "zero-delay timer waits for the main program",
            Scenario::AsyncIo => "file read, network request and a 5s timer",
            Scenario::Blocking => "blocking vs. deferred key derivation",
            Scenario::EventLoop1 => "timer, immediate and file read phases",
            Scenario::EventLoop2 => "next-tick and promise microtasks before the phases",
            Scenario::EventLoop3 => "work scheduled from inside an I/O callback",
            Scenario::EventLoop4 => "nested next-tick drains before promises",
        }
    }

    fn program(self) -> Program {
        match self {
            Scenario::SetTimeoutZero => programs::set_timeout_zero,
            Scenario::AsyncIo => programs::async_io,
            Scenario::Blocking => programs::blocking,
            Scenario::EventLoop1 => programs::event_loop_1,
            Scenario::EventLoop2 => programs::event_loop_2,
            Scenario::EventLoop3 => programs::event_loop_3,
            Scenario::EventLoop4 => programs::event_loop_4,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown scenario `{0}`")]
pub struct UnknownScenario(pub String);

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| UnknownScenario(s.to_owned()))
    }
}

/// Knobs for the collaborators the scenarios talk to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScenarioOptions {
    /// File read by the scenarios that touch the disk.
    pub file_path: PathBuf,
    /// PBKDF2 iterations for the key-derivation scenario.
    pub key_rounds: u32,
    /// Passes the simulated network request takes. File reads take the
    /// scheduler's default latency.
    pub network_latency_passes: u32,
    /// Print lines as they are logged.
    pub echo: bool,
    pub scheduler: SchedulerConfig,
}

impl Default for ScenarioOptions {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("./file.txt"),
            key_rounds: 100_000,
            network_latency_passes: 2,
            echo: false,
            scheduler: SchedulerConfig::default(),
        }
    }
}

pub struct ScenarioOutcome {
    pub scenario: Scenario,
    pub lines: Vec<String>,
    pub result: Result<RunSummary, SchedulerError>,
}

impl ScenarioOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs `scenario` on a fresh scheduler and returns what it printed.
pub fn run(scenario: Scenario, options: &ScenarioOptions) -> ScenarioOutcome {
    let span = tracing::info_span!("scenario", name = scenario.name());
    let _enter = span.enter();

    let scheduler = Rc::new(LocalScheduler::with_config(options.scheduler.clone()));
    let console = Console::new(options.echo);
    let program = scenario.program();

    let result = scheduler.run(|| program(&scheduler, &console, options));
    if let Err(err) = &result {
        tracing::warn!(error = %err, "scenario ended with an error");
    }

    ScenarioOutcome {
        scenario,
        lines: console.lines(),
        result,
    }
}
