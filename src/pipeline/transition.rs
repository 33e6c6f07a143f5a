//! The transition function: given the stage that just completed and the
//! current state, decide what runs next.

use crate::pipeline::state::RunState;

/// Identifier for each pipeline stage, plus the terminal `Done` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    Clarify,
    Brief,
    Plan,
    Research,
    ExecuteTask,
    IncrementIndex,
    Write,
    Done,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Clarify => "clarify",
            StageId::Brief => "brief",
            StageId::Plan => "plan",
            StageId::Research => "research",
            StageId::ExecuteTask => "execute_task",
            StageId::IncrementIndex => "increment_index",
            StageId::Write => "write",
            StageId::Done => "done",
        }
    }
}

/// Pick the stage that follows `current`.
///
/// Pure function of the state record: no hidden captures. The single branch
/// point routes to `Research` iff `current_index < plan.len()` (strict
/// less-than, checked after `Plan` and after each `IncrementIndex`), so an
/// empty plan goes straight to `Write` with zero research iterations.
pub fn next_stage(current: StageId, state: &RunState) -> StageId {
    use StageId::*;

    match current {
        Clarify => Brief,
        Brief => Plan,
        Plan | IncrementIndex => {
            if state.current_index < state.plan.len() {
                Research
            } else {
                Write
            }
        }
        Research => ExecuteTask,
        ExecuteTask => IncrementIndex,
        Write | Done => Done,
    }
}
