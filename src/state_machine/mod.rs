pub mod tally;
pub mod wrappers;

/// A deterministic command processor: inputs go in through
/// [`process_input`](StateMachine::process_input), results come out of
/// [`poll_output`](StateMachine::poll_output).
///
/// Given the same state and the same inputs, a machine must always produce the same outputs and
/// end in the same state. That lets callers replay a command against freshly loaded state and
/// only persist the result once the whole span succeeded.
///
/// # Rules for implementors
/// - Mutation only through `&mut self`. No cells, locks or reference-counted sharing.
/// - No filesystem, network or other IO. Loading and saving is the caller's job.
/// - No clock reads. The current time arrives as a
///   [`SystemInput::System`](wrappers::input::SystemInput::System) input.
/// - No threads, tasks or blocking. Exclusive access is provided from the outside (see
///   [`SessionCoordinator`](crate::session::SessionCoordinator)).
///
/// Logging is fine as long as behavior never depends on it.
pub trait StateMachine {
    /// The type of input that is [processed](StateMachine::process_input) by the state machine.
    type Input;
    /// The type of output that is [polled](StateMachine::poll_output) by the state machine.
    type Output;

    /// Process the provided `input` into the state machine.
    fn process_input(&mut self, input: Self::Input);

    /// Poll the state machine for output, returning the first available output if present.
    fn poll_output(&mut self) -> Option<Self::Output>;
}
