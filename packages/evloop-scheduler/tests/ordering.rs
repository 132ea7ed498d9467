use evloop_scheduler::{Deferred, LocalScheduler, Scheduler, TaskResult};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<&'static str>>>;

fn record(log: &Log, label: &'static str) -> impl FnOnce() -> TaskResult + 'static {
    let log = log.clone();
    move || {
        log.borrow_mut().push(label);
        Ok(())
    }
}

#[test]
fn test_execution_order() {
    let scheduler = LocalScheduler::new();
    let log: Log = Rc::default();

    // Schedule tasks in mixed order
    scheduler.set_immediate(record(&log, "immediate")).unwrap();
    scheduler.set_timeout(0, record(&log, "timer")).unwrap();
    scheduler
        .queue_promise_reaction(record(&log, "promise"))
        .unwrap();
    scheduler
        .schedule_io_callback(Box::new(record(&log, "io")))
        .unwrap();
    scheduler.next_tick(record(&log, "next tick")).unwrap();

    let summary = scheduler.run(record(&log, "main")).unwrap();

    // Verify order: main -> microtasks -> timers -> I/O -> immediates
    let expected = vec!["main", "next tick", "promise", "timer", "io", "immediate"];
    assert_eq!(*log.borrow(), expected);
    assert_eq!(summary.passes, 1);
}

#[test]
fn test_zero_delay_timers_wait_for_main_and_drain() {
    let scheduler = Rc::new(LocalScheduler::new());
    let log: Log = Rc::default();

    let main = {
        let sch = scheduler.clone();
        let log = log.clone();
        move || -> TaskResult {
            for _ in 0..3 {
                sch.set_timeout(0, record(&log, "timer"))?;
            }
            sch.queue_promise_reaction(record(&log, "promise"))?;
            log.borrow_mut().push("main done");
            Ok(())
        }
    };
    scheduler.run(main).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["main done", "promise", "timer", "timer", "timer"]
    );
}

#[test]
fn test_equal_due_timers_run_in_insertion_order() {
    let scheduler = LocalScheduler::new();
    let log: Log = Rc::default();

    scheduler.set_timeout(5, record(&log, "a")).unwrap();
    scheduler.set_timeout(5, record(&log, "b")).unwrap();
    scheduler.set_timeout(0, record(&log, "c")).unwrap();
    scheduler.set_timeout(5, record(&log, "d")).unwrap();

    let summary = scheduler.run(|| Ok(())).unwrap();

    assert_eq!(*log.borrow(), vec!["c", "a", "b", "d"]);
    assert_eq!(summary.final_tick, 5);
}

#[test]
fn test_clock_jumps_to_next_due_timer() {
    let scheduler = Rc::new(LocalScheduler::new());
    let seen = Rc::new(RefCell::new(Vec::new()));

    for delay in [3000, 0] {
        let sch = scheduler.clone();
        let seen = seen.clone();
        scheduler
            .set_timeout(delay, move || {
                seen.borrow_mut().push(sch.now());
                Ok(())
            })
            .unwrap();
    }

    let summary = scheduler.run(|| Ok(())).unwrap();

    assert_eq!(*seen.borrow(), vec![0, 3000]);
    assert_eq!(summary.passes, 2);
    assert_eq!(summary.final_tick, 3000);
}

#[test]
fn test_immediate_runs_after_same_pass_io_and_timers() {
    let scheduler = Rc::new(LocalScheduler::new());
    let log: Log = Rc::default();

    {
        let sch = scheduler.clone();
        let log = log.clone();
        scheduler
            .set_timeout(0, move || {
                log.borrow_mut().push("timer");
                sch.set_immediate(record(&log, "immediate from timer"))?;
                sch.schedule_io_callback(Box::new(record(&log, "io from timer")))?;
                Ok(())
            })
            .unwrap();
    }
    scheduler.set_immediate(record(&log, "immediate")).unwrap();
    scheduler
        .schedule_io_callback(Box::new(record(&log, "io")))
        .unwrap();

    scheduler.run(|| Ok(())).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "timer",
            "io",
            "io from timer",
            "immediate",
            "immediate from timer"
        ]
    );
}

#[test]
fn test_zero_delay_timer_from_timer_waits_for_next_pass() {
    let scheduler = Rc::new(LocalScheduler::new());
    let log: Log = Rc::default();

    {
        let sch = scheduler.clone();
        let log = log.clone();
        scheduler
            .set_timeout(0, move || {
                log.borrow_mut().push("first timer");
                sch.set_timeout(0, record(&log, "second timer"))?;
                sch.set_immediate(record(&log, "immediate"))?;
                Ok(())
            })
            .unwrap();
    }

    let summary = scheduler.run(|| Ok(())).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["first timer", "immediate", "second timer"]
    );
    assert_eq!(summary.passes, 2);
    assert_eq!(summary.final_tick, 0);
}

#[test]
fn test_io_producer_completes_after_first_immediate_phase() {
    // Immediate(A), Timer(0, B), PromiseReaction(C), I/O producer D,
    // NextTick(E) which queues NextTick(F).
    let scheduler = Rc::new(LocalScheduler::new());
    let log: Log = Rc::default();

    let main = {
        let sch = scheduler.clone();
        let log = log.clone();
        move || -> TaskResult {
            sch.set_immediate(record(&log, "A"))?;
            sch.set_timeout(0, record(&log, "B"))?;
            sch.queue_promise_reaction(record(&log, "C"))?;
            {
                let log = log.clone();
                sch.submit_io(Deferred::new("read file", || ()), move |()| {
                    log.borrow_mut().push("D");
                    Ok(())
                })?;
            }
            {
                let inner = sch.clone();
                let log = log.clone();
                sch.next_tick(move || {
                    inner.next_tick(record(&log, "F"))?;
                    log.borrow_mut().push("E");
                    Ok(())
                })?;
            }
            log.borrow_mut().push("top-level");
            Ok(())
        }
    };

    let summary = scheduler.run(main).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["top-level", "E", "F", "C", "B", "A", "D"]
    );
    assert_eq!(summary.passes, 2);
}

#[test]
fn test_work_queued_by_io_callback_runs_after_it() {
    let scheduler = Rc::new(LocalScheduler::new());
    let log: Log = Rc::default();

    let main = {
        let sch = scheduler.clone();
        let log = log.clone();
        move || -> TaskResult {
            sch.set_immediate(record(&log, "1st immediate"))?;
            sch.set_timeout(0, record(&log, "1st timer"))?;
            sch.queue_promise_reaction(record(&log, "promise"))?;

            let inner = sch.clone();
            let io_log = log.clone();
            sch.submit_io(Deferred::new("read file", || ()), move |()| {
                inner.set_timeout(0, record(&io_log, "2nd timer"))?;
                inner.next_tick(record(&io_log, "2nd next tick"))?;
                inner.set_immediate(record(&io_log, "2nd immediate"))?;
                io_log.borrow_mut().push("io");
                Ok(())
            })?;

            sch.next_tick(record(&log, "1st next tick"))?;
            log.borrow_mut().push("last line");
            Ok(())
        }
    };

    let summary = scheduler.run(main).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "last line",
            "1st next tick",
            "promise",
            "1st timer",
            "1st immediate",
            "io",
            "2nd next tick",
            "2nd immediate",
            "2nd timer",
        ]
    );
    assert_eq!(summary.passes, 3);
}
