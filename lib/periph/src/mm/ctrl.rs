/*++

Licensed under the Apache-2.0 license.

File Name:

    ctrl.rs

Abstract:

    File contains the operation controller state machine: idle, the input
    synchronizer, the three compute phases and the output synchronizer.

--*/

use smlang::statemachine;

/// Compute phase of a running operation.
///
/// An operation traverses the phases in order: the operand product, the
/// reduction-factor product, and the final accumulate that yields the
/// Montgomery result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Xy,
    Sp,
    Ap,
}

statemachine! {
    transitions: {
        // CurrentState Event [guard] / action = NextState

        // start an operation; Go is only honored when idle.
        *Idle + Go = SyncIn,

        // operands crossed into the compute clock domain, start the first phase.
        SyncIn + SyncDone = CycleXy,

        // the three phases run back to back.
        CycleXy + PhaseDone = CycleSp,
        CycleSp + PhaseDone = CycleAp,

        // last phase done, cross the result back to the bus clock domain.
        CycleAp + PhaseDone = SyncOut,
        SyncOut + SyncDone = Idle,

        // soft reset aborts from any state.
        Idle + Reset = Idle,
        SyncIn + Reset = Idle,
        CycleXy + Reset = Idle,
        CycleSp + Reset = Idle,
        CycleAp + Reset = Idle,
        SyncOut + Reset = Idle,
    }
}

/// State machine extended variables (none).
pub struct Context;

impl StateMachineContext for Context {}

/// The phase a controller state is computing, if any.
pub fn phase_of(state: &States) -> Option<Phase> {
    match state {
        States::CycleXy => Some(Phase::Xy),
        States::CycleSp => Some(Phase::Sp),
        States::CycleAp => Some(Phase::Ap),
        _ => None,
    }
}
