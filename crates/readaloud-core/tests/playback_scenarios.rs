use readaloud_core::{
    PlaybackController, PlaybackIssue, PlaybackState, PlaybackStatus, PlaybackUpdate, SpeechEngine,
    SpeechError, SpeechEvent, SpeechRequest, SpeechTicket, segment_units,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Engine that records every request and refuses to accept a second one
/// while a unit is still outstanding.
#[derive(Default)]
struct ScriptedEngine {
    outstanding: Cell<Option<SpeechTicket>>,
    requests: Vec<SpeechRequest>,
    cancels: usize,
    can_suspend: bool,
    fail_on_ordinal: Option<usize>,
}

impl SpeechEngine for ScriptedEngine {
    fn speak(&mut self, request: SpeechRequest) -> Result<(), SpeechError> {
        assert!(
            self.outstanding.get().is_none(),
            "second request {:?} issued while {:?} in flight",
            request.ticket,
            self.outstanding.get()
        );
        if self.fail_on_ordinal == Some(request.ticket.ordinal) {
            return Err(SpeechError::Synthesis("voice model crashed".to_string()));
        }
        self.outstanding.set(Some(request.ticket));
        self.requests.push(request);
        Ok(())
    }

    fn cancel_all(&mut self) {
        self.cancels += 1;
        self.outstanding.set(None);
    }

    fn suspend(&mut self) -> bool {
        self.can_suspend
    }
}

fn controller(can_suspend: bool) -> PlaybackController<ScriptedEngine> {
    let engine = ScriptedEngine {
        can_suspend,
        ..ScriptedEngine::default()
    };
    PlaybackController::new(engine, 1.0)
}

/// Deliver the completion for whatever the engine is currently speaking.
fn finish(ctl: &mut PlaybackController<ScriptedEngine>) {
    let ticket = ctl
        .engine()
        .outstanding
        .take()
        .expect("a unit should be in flight");
    ctl.handle_event(SpeechEvent::completed(ticket));
}

#[test]
fn progress_only_grows_and_ends_at_one_hundred() {
    let mut ctl = controller(false);
    ctl.start(segment_units("A. B. C. D. E."));

    let mut last = ctl.progress_pct();
    while ctl.state() == PlaybackState::Playing {
        finish(&mut ctl);
        assert!(ctl.progress_pct() >= last);
        last = ctl.progress_pct();
    }

    assert_eq!(ctl.state(), PlaybackState::Completed);
    assert_eq!(last, 100.0);
    assert_eq!(ctl.engine().requests.len(), 5);
}

#[test]
fn draining_pause_resumes_at_the_next_unit_without_a_duplicate_request() {
    let mut ctl = controller(false);
    ctl.start(segment_units("A. B. C."));

    ctl.pause();
    // Resume before the draining unit ends: still only one request outstanding.
    ctl.resume();
    assert_eq!(ctl.engine().requests.len(), 1);

    ctl.pause();
    finish(&mut ctl);
    assert_eq!(ctl.state(), PlaybackState::Paused);
    assert_eq!(ctl.current_index(), 1);
    assert_eq!(ctl.engine().requests.len(), 1);

    ctl.resume();
    let texts: Vec<&str> = ctl
        .engine()
        .requests
        .iter()
        .map(|request| request.text.as_str())
        .collect();
    assert_eq!(texts, vec!["A.", "B."]);
    assert_eq!(ctl.current_index(), 1);
}

#[test]
fn rate_change_while_suspended_restarts_the_unit_at_the_new_rate() {
    let mut ctl = controller(true);
    ctl.start(segment_units("Slow start. Then more."));
    let first = ctl.in_flight_ticket().expect("first unit in flight");

    ctl.pause();
    assert_eq!(ctl.set_rate(2.0), 2.0);
    ctl.resume();

    let restarted = ctl.engine().requests.last().expect("restart request");
    assert_eq!(restarted.text, "Slow start.");
    assert_eq!(restarted.rate, 2.0);
    assert_ne!(restarted.ticket, first);
    assert_eq!(ctl.engine().cancels, 1);

    // The cancelled ticket's late completion changes nothing.
    ctl.handle_event(SpeechEvent::completed(first));
    assert_eq!(ctl.current_index(), 0);
    assert_eq!(ctl.state(), PlaybackState::Playing);
}

#[test]
fn stop_discards_the_session_and_late_events() {
    let mut ctl = controller(false);
    ctl.start(segment_units("One. Two. Three."));
    finish(&mut ctl);
    let ticket = ctl.in_flight_ticket().expect("second unit in flight");

    ctl.stop();
    ctl.handle_event(SpeechEvent::completed(ticket));

    assert_eq!(ctl.state(), PlaybackState::Idle);
    assert_eq!(ctl.status(), &PlaybackStatus::Stopped);
    assert_eq!(ctl.progress_pct(), 0.0);
    assert_eq!(ctl.current_index(), 0);
    assert!(ctl.units().is_empty());
    assert_eq!(ctl.engine().requests.len(), 2);
}

#[test]
fn immediate_engine_refusal_reports_the_failing_sentence() {
    let engine = ScriptedEngine {
        fail_on_ordinal: Some(1),
        ..ScriptedEngine::default()
    };
    let mut ctl = PlaybackController::new(engine, 1.0);
    ctl.start(segment_units("Fine. Broken. Never."));
    finish(&mut ctl);

    assert_eq!(ctl.state(), PlaybackState::Idle);
    assert_eq!(
        ctl.status(),
        &PlaybackStatus::Issue(PlaybackIssue::SynthesisFailure {
            ordinal: 1,
            message: "synthesis failed: voice model crashed".to_string(),
        })
    );
    assert_eq!(
        ctl.status().to_string(),
        "Speech error on sentence 2: synthesis failed: voice model crashed"
    );
    assert!(ctl.status().is_error());
    assert_eq!(ctl.in_flight_ticket(), None);
}

#[test]
fn restarting_mid_session_invalidates_every_earlier_ticket() {
    let mut ctl = controller(false);
    ctl.start(segment_units("Old one. Old two."));
    let old = ctl.in_flight_ticket().expect("old unit in flight");

    ctl.start(segment_units("New one. New two."));
    ctl.handle_event(SpeechEvent::failed(old, "late failure"));

    assert_eq!(ctl.state(), PlaybackState::Playing);
    assert_eq!(ctl.current_unit().map(|unit| unit.text()), Some("New one."));
    assert!(ctl.generation() > old.generation);
}

#[test]
fn subscribers_see_every_transition_in_order() {
    let seen: Rc<RefCell<Vec<PlaybackUpdate>>> = Rc::new(RefCell::new(Vec::new()));
    let mut ctl = controller(false);
    let sink = Rc::clone(&seen);
    ctl.subscribe(move |update| sink.borrow_mut().push(update.clone()));

    ctl.start(segment_units("Hi. Bye."));
    finish(&mut ctl);
    finish(&mut ctl);

    let statuses: Vec<String> = seen
        .borrow()
        .iter()
        .map(|update| update.status.to_string())
        .collect();
    assert_eq!(
        statuses,
        vec!["Speaking... (1/2)", "Speaking... (2/2)", "Done!"]
    );
    let last = seen.borrow().last().cloned().expect("final update");
    assert_eq!(last.progress_pct, 100.0);
    assert_eq!(last.unit_count, 2);
}
