use evloop_scheduler::{
    CallbackKind, LocalScheduler, ScheduleError, Scheduler, SchedulerConfig, SchedulerError,
    SchedulerState, TaskResult,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn test_empty_program_terminates_immediately() {
    let scheduler = LocalScheduler::new();

    // Initially idle
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert!(!scheduler.has_pending_work());

    let summary = scheduler.run(|| Ok(())).unwrap();

    assert_eq!(summary.passes, 0);
    assert_eq!(summary.invocations_of(CallbackKind::Main), 1);
    assert_eq!(summary.total_invocations(), 1);
    assert_eq!(scheduler.state(), SchedulerState::Terminated);
}

#[test]
fn test_run_is_single_use() {
    let scheduler = LocalScheduler::new();
    scheduler.run(|| Ok(())).unwrap();

    let ran = Cell::new(false);
    let err = scheduler
        .run(|| {
            ran.set(true);
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(
        err,
        SchedulerError::InvalidState {
            state: SchedulerState::Terminated
        }
    ));
    assert!(!ran.get());
}

#[test]
fn test_nested_run_is_rejected() {
    let scheduler = Rc::new(LocalScheduler::new());
    let nested = Rc::new(RefCell::new(None));

    {
        let sch = scheduler.clone();
        let nested = nested.clone();
        scheduler
            .run(move || {
                *nested.borrow_mut() = Some(sch.run(|| Ok(())));
                Ok(())
            })
            .unwrap();
    }

    let nested = nested.borrow_mut().take().unwrap();
    assert!(matches!(
        nested,
        Err(SchedulerError::InvalidState {
            state: SchedulerState::RunningMain
        })
    ));
}

#[test]
fn test_callbacks_observe_scheduler_state() {
    let scheduler = Rc::new(LocalScheduler::new());
    let states = Rc::new(RefCell::new(Vec::new()));

    let observe = |label: &'static str| {
        let sch = scheduler.clone();
        let states = states.clone();
        move || -> TaskResult {
            states.borrow_mut().push((label, sch.state()));
            Ok(())
        }
    };

    scheduler.set_timeout(0, observe("timer")).unwrap();
    scheduler.set_immediate(observe("immediate")).unwrap();
    scheduler
        .schedule_io_callback(Box::new(observe("io")))
        .unwrap();
    scheduler.next_tick(observe("next tick")).unwrap();
    scheduler.run(observe("main")).unwrap();

    assert_eq!(
        *states.borrow(),
        vec![
            ("main", SchedulerState::RunningMain),
            ("next tick", SchedulerState::DrainingMicrotasks),
            ("timer", SchedulerState::TimersPhase),
            ("io", SchedulerState::IoPhase),
            ("immediate", SchedulerState::ImmediatePhase),
        ]
    );
}

#[test]
fn test_ping_pong_through_immediates() {
    // Two "processes" taking turns, each handing control back through the
    // immediate queue.
    fn turn(sch: Rc<LocalScheduler>, counter: Rc<Cell<u32>>, remaining: u32) -> TaskResult {
        counter.set(counter.get() + 1);
        if remaining > 0 {
            let next = sch.clone();
            sch.set_immediate(move || turn(next, counter, remaining - 1))?;
        }
        Ok(())
    }

    let scheduler = Rc::new(LocalScheduler::new());
    let counter = Rc::new(Cell::new(0));

    for _ in 0..2 {
        let sch = scheduler.clone();
        let counter = counter.clone();
        scheduler
            .set_immediate(move || turn(sch, counter, 4))
            .unwrap();
    }

    let summary = scheduler.run(|| Ok(())).unwrap();

    assert_eq!(counter.get(), 10);
    assert_eq!(summary.passes, 5);
    assert_eq!(summary.invocations_of(CallbackKind::Immediate), 10);
}

#[test]
fn test_pass_limit_stops_runaway_loop() {
    fn rearm(sch: Rc<LocalScheduler>) -> TaskResult {
        let next = sch.clone();
        sch.set_timeout(1, move || rearm(next))?;
        Ok(())
    }

    let scheduler = Rc::new(LocalScheduler::with_config(
        SchedulerConfig::default().with_max_passes(3),
    ));
    {
        let sch = scheduler.clone();
        scheduler.set_timeout(0, move || rearm(sch)).unwrap();
    }

    let err = scheduler.run(|| Ok(())).unwrap_err();

    assert!(matches!(err, SchedulerError::PassLimitExceeded { limit: 3 }));
    assert_eq!(scheduler.passes(), 3);
    assert!(!scheduler.has_pending_work());
}

#[test]
fn test_scheduling_after_termination_is_rejected() {
    let scheduler = LocalScheduler::new();
    scheduler.run(|| Ok(())).unwrap();

    assert_eq!(
        scheduler.set_timeout(0, || Ok(())).unwrap_err(),
        ScheduleError::Terminated
    );
    assert_eq!(
        scheduler.next_tick(|| Ok(())).unwrap_err(),
        ScheduleError::Terminated
    );
    assert!(!scheduler.has_pending_work());
}
