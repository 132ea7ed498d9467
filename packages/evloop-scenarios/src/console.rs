use evloop_scheduler::TaskResult;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Records every line a scenario prints, optionally echoing it to stdout.
/// Cloning shares the same transcript.
#[derive(Clone, Default)]
pub struct Console {
    lines: Rc<RefCell<Vec<String>>>,
    echo: bool,
}

impl Console {
    pub fn new(echo: bool) -> Self {
        Self {
            lines: Rc::default(),
            echo,
        }
    }

    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            echo_line(&mut io::stdout().lock(), &line);
        }
        self.lines.borrow_mut().push(line);
    }

    /// A callback that prints `line` when the loop runs it.
    pub fn say(&self, line: &'static str) -> impl FnOnce() -> TaskResult + 'static {
        let console = self.clone();
        move || {
            console.log(line);
            Ok(())
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

// A closed stdout (e.g. piped into `head`) is not an error; the transcript
// still records the line.
fn echo_line(out: &mut impl Write, line: &str) {
    if let Err(err) = writeln!(out, "{line}") {
        if err.kind() != io::ErrorKind::BrokenPipe {
            tracing::warn!(error = %err, "failed to echo console line");
        }
    }
}
