//! Race mode transition table.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{plan::RaceMode, route::RouteTag, signal::RaceSignal};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A change of mode decided by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub next: RaceMode,
    pub remembered: Remember,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Events which may change the race mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceEvent {
    /// The lap count increased.
    LapCompleted { limit_reached: bool },

    /// Race control changed the signal.
    Signal(RaceSignal),
}

/// What to do with the mode remembered for a later speed resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remember {
    Keep,
    Set(RaceMode),
    Clear,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decide the mode change caused by an event, `None` if the mode is unaffected.
///
/// `remembered` is the mode active when speed was last reduced.
pub fn transition(
    current: RaceMode,
    remembered: Option<RaceMode>,
    event: RaceEvent,
) -> Option<ModeChange> {
    use comms_if::plan::RaceMode::*;

    let change = |next, remembered| Some(ModeChange { next, remembered });

    match (current, event) {
        // Once heading for the pit nothing brings the vehicle back out
        (PitStop, _) => None,

        (_, RaceEvent::LapCompleted { limit_reached: true }) => change(PitStop, Remember::Clear),

        // A new lap refreshes the route, keeping any special mode active
        (SlowOn, RaceEvent::LapCompleted { .. }) => change(SlowOn, Remember::Keep),
        (Stop, RaceEvent::LapCompleted { .. }) => change(Stop, Remember::Keep),
        (_, RaceEvent::LapCompleted { .. }) => change(Race, Remember::Keep),

        (_, RaceEvent::Signal(RaceSignal::ReturnToPit)) => change(PitStop, Remember::Clear),

        (Stop, RaceEvent::Signal(RaceSignal::Stop)) => None,
        (_, RaceEvent::Signal(RaceSignal::Stop)) => change(Stop, Remember::Keep),

        (SlowOn, RaceEvent::Signal(RaceSignal::ReduceSpeed)) => None,
        (_, RaceEvent::Signal(RaceSignal::ReduceSpeed)) => change(SlowOn, Remember::Set(current)),

        (SlowOn, RaceEvent::Signal(RaceSignal::ResumeSpeed)) => {
            change(remembered.unwrap_or(SlowOff), Remember::Clear)
        }
        (_, RaceEvent::Signal(RaceSignal::ResumeSpeed)) => None,

        (_, RaceEvent::Signal(RaceSignal::None)) | (_, RaceEvent::Signal(RaceSignal::Green)) => None,
    }
}

/// The kind of route driven in each mode.
pub fn route_tag(mode: RaceMode) -> RouteTag {
    match mode {
        RaceMode::AcquireRoute => RouteTag::ToGoal,
        RaceMode::Race | RaceMode::SlowOff | RaceMode::Stop => RouteTag::Race,
        RaceMode::SlowOn => RouteTag::Slow,
        RaceMode::PitStop => RouteTag::PitStop,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::plan::RaceMode::*;

    fn next(current: RaceMode, remembered: Option<RaceMode>, event: RaceEvent) -> Option<RaceMode> {
        transition(current, remembered, event).map(|c| c.next)
    }

    const LAP: RaceEvent = RaceEvent::LapCompleted { limit_reached: false };
    const LAST_LAP: RaceEvent = RaceEvent::LapCompleted { limit_reached: true };

    #[test]
    fn test_laps() {
        assert_eq!(next(AcquireRoute, None, LAP), Some(Race));
        assert_eq!(next(Race, None, LAP), Some(Race));
        assert_eq!(next(SlowOff, None, LAP), Some(Race));
        assert_eq!(next(SlowOn, Some(Race), LAP), Some(SlowOn));
        assert_eq!(next(Stop, None, LAP), Some(Stop));
        assert_eq!(next(PitStop, None, LAP), None);

        assert_eq!(next(Race, None, LAST_LAP), Some(PitStop));
        assert_eq!(next(SlowOn, None, LAST_LAP), Some(PitStop));
    }

    #[test]
    fn test_signals() {
        let sig = |s| RaceEvent::Signal(s);

        assert_eq!(next(Race, None, sig(RaceSignal::ReturnToPit)), Some(PitStop));
        assert_eq!(next(Race, None, sig(RaceSignal::Stop)), Some(Stop));
        assert_eq!(next(Stop, None, sig(RaceSignal::Stop)), None);
        assert_eq!(next(Race, None, sig(RaceSignal::Green)), None);
        assert_eq!(next(PitStop, None, sig(RaceSignal::Stop)), None);

        let c = transition(Race, None, sig(RaceSignal::ReduceSpeed)).unwrap();
        assert_eq!(c.next, SlowOn);
        assert_eq!(c.remembered, Remember::Set(Race));

        let c = transition(SlowOn, Some(Stop), sig(RaceSignal::ResumeSpeed)).unwrap();
        assert_eq!(c.next, Stop);
        assert_eq!(c.remembered, Remember::Clear);

        assert_eq!(next(SlowOn, None, sig(RaceSignal::ResumeSpeed)), Some(SlowOff));
        assert_eq!(next(Race, None, sig(RaceSignal::ResumeSpeed)), None);
    }

    #[test]
    fn test_route_tags() {
        assert_eq!(route_tag(AcquireRoute), RouteTag::ToGoal);
        assert_eq!(route_tag(SlowOn), RouteTag::Slow);
        assert_eq!(route_tag(SlowOff), RouteTag::Race);
        assert_eq!(route_tag(PitStop), RouteTag::PitStop);
    }
}
