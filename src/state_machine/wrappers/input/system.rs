use chrono::{Local, NaiveDateTime, SubsecRound};

/// Something only the running system can produce, such as the current time.
///
/// Runners call [`generate`](SystemResource::generate) and feed the value to a
/// [`StateMachine`](crate::state_machine::StateMachine) as [`SystemInput::System`].
pub trait SystemResource {
    fn generate() -> Self;
}

/// Wall clock in local time, truncated to whole seconds to match the stored history format.
impl SystemResource for NaiveDateTime {
    fn generate() -> Self {
        Local::now().naive_local().trunc_subsecs(0)
    }
}

/// Input to a machine that needs system resources: either a regular command or a freshly
/// generated resource.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemInput<I, S> {
    Input(I),
    System(S),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_generated_time_has_second_precision() {
        let now = NaiveDateTime::generate();
        assert_eq!(now.nanosecond(), 0);
    }
}
