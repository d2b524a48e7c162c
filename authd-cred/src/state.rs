/// How far a credential transaction has advanced. The furthest-advanced
/// step is the only thing that determines what [`cleanup`] must unwind —
/// this is the same shape as the C++ source's `PamService::m_state` plus
/// `PamService::cleanup(int point)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CredState {
    Clean = 0,
    Started = 1,
    SessionOpened = 2,
}

/// The teardown operations a credential transaction must be able to run in
/// reverse, one per state above `Clean`. Errors are logged by the
/// implementation and otherwise ignored by `cleanup`: every step runs
/// regardless of whether an earlier one failed, so a context never leaks a
/// session or a credential just because one inverse call had trouble.
pub trait Teardown {
    type Err: std::fmt::Display;

    /// Reverses `SessionOpened`: `pam_close_session` followed by
    /// `pam_setcred(DELETE_CRED)`.
    fn close_session_and_delete_cred(&mut self) -> Result<(), Self::Err>;

    /// Reverses `Started`: `pam_end`.
    fn end_transaction(&mut self) -> Result<(), Self::Err>;
}

/// Walks `state` backward to `target`, invoking the inverse of every state
/// strictly above `target`. Never advances, never skips a step, and keeps
/// going even if an individual step reports failure — this is the only safe
/// pattern when each step has a mandatory inverse and any step may fail.
pub fn cleanup<T: Teardown>(teardown: &mut T, state: &mut CredState, target: CredState) {
    while *state > target {
        match *state {
            CredState::SessionOpened => {
                if let Err(e) = teardown.close_session_and_delete_cred() {
                    log::warn!("credential teardown: close_session/delete_cred failed: {}", e);
                }
                *state = CredState::Started;
            }
            CredState::Started => {
                if let Err(e) = teardown.end_transaction() {
                    log::warn!("credential teardown: end failed: {}", e);
                }
                *state = CredState::Clean;
            }
            CredState::Clean => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<&'static str>>,
        fail_close: bool,
    }

    impl Teardown for Recorder {
        type Err = &'static str;

        fn close_session_and_delete_cred(&mut self) -> Result<(), Self::Err> {
            self.calls.borrow_mut().push("close_session_and_delete_cred");
            if self.fail_close {
                Err("boom")
            } else {
                Ok(())
            }
        }

        fn end_transaction(&mut self) -> Result<(), Self::Err> {
            self.calls.borrow_mut().push("end_transaction");
            Ok(())
        }
    }

    #[test]
    fn full_unwind_from_session_opened_calls_both_inverses_in_order() {
        let mut rec = Recorder::default();
        let mut state = CredState::SessionOpened;
        cleanup(&mut rec, &mut state, CredState::Clean);
        assert_eq!(state, CredState::Clean);
        assert_eq!(
            *rec.calls.borrow(),
            vec!["close_session_and_delete_cred", "end_transaction"]
        );
    }

    #[test]
    fn partial_unwind_stops_at_target() {
        let mut rec = Recorder::default();
        let mut state = CredState::SessionOpened;
        cleanup(&mut rec, &mut state, CredState::Started);
        assert_eq!(state, CredState::Started);
        assert_eq!(*rec.calls.borrow(), vec!["close_session_and_delete_cred"]);
    }

    #[test]
    fn clean_state_calls_nothing() {
        let mut rec = Recorder::default();
        let mut state = CredState::Clean;
        cleanup(&mut rec, &mut state, CredState::Clean);
        assert!(rec.calls.borrow().is_empty());
    }

    #[test]
    fn a_failing_step_does_not_stop_the_cascade() {
        let mut rec = Recorder {
            fail_close: true,
            ..Default::default()
        };
        let mut state = CredState::SessionOpened;
        cleanup(&mut rec, &mut state, CredState::Clean);
        // Both steps still ran, and state still walked all the way down.
        assert_eq!(state, CredState::Clean);
        assert_eq!(
            *rec.calls.borrow(),
            vec!["close_session_and_delete_cred", "end_transaction"]
        );
    }

    #[test]
    fn never_advances_state() {
        let mut rec = Recorder::default();
        let mut state = CredState::Clean;
        cleanup(&mut rec, &mut state, CredState::SessionOpened);
        assert_eq!(state, CredState::Clean);
        assert!(rec.calls.borrow().is_empty());
    }
}
