//! The main programs of each scenario. Each one runs synchronously as the
//! loop's top-level code and leaves its deferred work on the scheduler.

use crate::console::Console;
use crate::http::HttpGet;
use crate::scenario::ScenarioOptions;
use evloop_scheduler::{DeriveKey, Digest, LocalScheduler, ReadFile, TaskResult};
use std::rc::Rc;

const POSTS_URL: &str = "https://jsonplaceholder.typicode.com/posts";

fn multiply(a: u64, b: u64) -> u64 {
    a * b
}

fn log_product(console: &Console, a: u64, b: u64) {
    let c = multiply(a, b);
    console.log(format!("Multiplication of a and b is:  {c}"));
}

pub fn set_timeout_zero(
    sch: &Rc<LocalScheduler>,
    console: &Console,
    _options: &ScenarioOptions,
) -> TaskResult {
    console.log("Hello World");
    let (a, b) = (45_716_571, 563_622);

    // Runs only once the main program has returned.
    sch.set_timeout(0, console.say("call me right now"))?;
    sch.set_timeout(3_000, console.say("call me after 3 second"))?;

    log_product(console, a, b);
    Ok(())
}

pub fn async_io(sch: &Rc<LocalScheduler>, console: &Console, options: &ScenarioOptions) -> TaskResult {
    console.log("Hello World");
    let (a, b) = (123_826_333, 2_628_363);

    let request = HttpGet::new(POSTS_URL).verify_tls(false);
    let on_response = console.clone();
    sch.submit_io_after(options.network_latency_passes, request, move |res| {
        on_response.log(format!("statusCode: {}", res.status));
        Ok(())
    })?;

    sch.set_timeout(5_000, console.say("Timeout called after 5 second"))?;

    let on_read = console.clone();
    sch.submit_io(ReadFile::new(&options.file_path), move |data| {
        // A failed read takes the whole loop down.
        let data = data?;
        on_read.log(data.trim_end());
        Ok(())
    })?;

    log_product(console, a, b);
    Ok(())
}

pub fn blocking(sch: &Rc<LocalScheduler>, console: &Console, options: &ScenarioOptions) -> TaskResult {
    console.log("Hello World");
    let (a, b) = (123_826_333, 2_628_363);
    let params = DeriveKey::new("password", "salt", options.key_rounds, 64, Digest::Sha512);

    // Nothing else on the loop can run until this returns.
    sch.perform_blocking(params.clone())?;
    console.log("first Key is generated");

    let on_key = console.clone();
    sch.submit_io(params, move |key| {
        key?;
        on_key.log("Second Key is generated");
        Ok(())
    })?;

    log_product(console, a, b);
    Ok(())
}

pub fn event_loop_1(
    sch: &Rc<LocalScheduler>,
    console: &Console,
    options: &ScenarioOptions,
) -> TaskResult {
    let a = 100;

    sch.set_immediate(console.say("setImmediate"))?;
    read_file_then_say(sch, console, options)?;
    sch.set_timeout(0, console.say("Timer expired"))?;

    console.log(format!("a {a}"));
    console.log("last line of the code");
    Ok(())
}

pub fn event_loop_2(
    sch: &Rc<LocalScheduler>,
    console: &Console,
    options: &ScenarioOptions,
) -> TaskResult {
    let a = 100;

    sch.set_immediate(console.say("setImmediate"))?;
    sch.queue_promise_reaction(console.say("Promise resolved"))?;
    read_file_then_say(sch, console, options)?;
    sch.set_timeout(0, console.say("Timer expired"))?;
    sch.next_tick(console.say("process.nextTick"))?;

    console.log(format!("a {a}"));
    console.log("last line of the code");
    Ok(())
}

pub fn event_loop_3(
    sch: &Rc<LocalScheduler>,
    console: &Console,
    options: &ScenarioOptions,
) -> TaskResult {
    sch.set_immediate(console.say("1st setImmediate"))?;
    sch.set_timeout(0, console.say("1st timer"))?;
    sch.queue_promise_reaction(console.say("Promise resolved"))?;

    let inner = sch.clone();
    let on_read = console.clone();
    sch.submit_io(ReadFile::new(&options.file_path), move |_data| {
        inner.set_timeout(0, on_read.say("2nd timer"))?;
        inner.next_tick(on_read.say("2nd process.nextTick"))?;
        inner.set_immediate(on_read.say("2nd setImmediate"))?;
        on_read.log("File read operation");
        Ok(())
    })?;

    sch.next_tick(console.say("1st process.nextTick"))?;
    console.log("last line of the code");
    Ok(())
}

pub fn event_loop_4(
    sch: &Rc<LocalScheduler>,
    console: &Console,
    options: &ScenarioOptions,
) -> TaskResult {
    sch.set_immediate(console.say("setImmediate"))?;
    sch.set_timeout(0, console.say("Timer expired"))?;
    sch.queue_promise_reaction(console.say("Promise resolved"))?;
    read_file_then_say(sch, console, options)?;

    let inner = sch.clone();
    let outer = console.clone();
    sch.next_tick(move || {
        inner.next_tick(outer.say("inner process.nextTick"))?;
        outer.log("process.nextTick");
        Ok(())
    })?;

    console.log("last line of the code");
    Ok(())
}

// The phase demos only care about when the read completes, not whether it
// found the file.
fn read_file_then_say(
    sch: &Rc<LocalScheduler>,
    console: &Console,
    options: &ScenarioOptions,
) -> TaskResult {
    let on_read = console.clone();
    sch.submit_io(ReadFile::new(&options.file_path), move |_data| {
        on_read.log("File read operation");
        Ok(())
    })?;
    Ok(())
}
