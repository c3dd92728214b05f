//! Discussion phase state machine (spec §4.4 "Phase determination").

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initial,
    Exploration,
    Analysis,
    Synthesis,
    Conclusion,
}

impl Phase {
    /// Determine the phase from `current_round`/`max_rounds` per spec §4.4.
    ///
    /// `current_round == 0` is always `Initial` (share viewpoint); for
    /// subsequent rounds the phase is derived from progress
    /// `p = (current_round - 1) / (max_rounds - 1)`.
    pub fn for_round(current_round: u32, max_rounds: u32) -> Self {
        if current_round == 0 {
            return Self::Initial;
        }
        let denom = (max_rounds.saturating_sub(1)).max(1) as f64;
        let p = (current_round.saturating_sub(1)) as f64 / denom;
        if p < 0.4 {
            Self::Exploration
        } else if p < 0.7 {
            Self::Analysis
        } else if p < 0.9 {
            Self::Synthesis
        } else {
            Self::Conclusion
        }
    }

    pub fn guideline(self) -> &'static str {
        match self {
            Self::Initial => {
                "Share your initial viewpoint on the topic. Be clear and concise; this is the \
                 opening contribution, so there is no prior discussion to react to."
            }
            Self::Exploration => {
                "Explore the topic broadly. Raise angles the other participants may not have \
                 considered yet, and note where you agree or disagree with what has been said."
            }
            Self::Analysis => {
                "Analyze the strongest points raised so far. Test claims against evidence and \
                 counterarguments, and sharpen the areas of genuine disagreement."
            }
            Self::Synthesis => {
                "Start drawing threads together. Identify where the group is converging and what \
                 open questions remain."
            }
            Self::Conclusion => {
                "Help bring the discussion to a close. State your final position plainly and \
                 flag anything still unresolved."
            }
        }
    }

    /// Bare fallback user prompt used when no history fits the context
    /// budget (spec §4.4 step 5) and by the Turn Executor's retry path
    /// (spec §4.5 step 3).
    pub fn fallback_prompt(self, topic: &str) -> String {
        match self {
            Self::Initial => format!("Share your initial viewpoint on: {topic}"),
            _ => format!("Continue the discussion about: {topic}. {}", self.guideline()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_zero_is_initial() {
        assert_eq!(Phase::for_round(0, 5), Phase::Initial);
    }

    #[test]
    fn progress_thresholds() {
        // max_rounds = 11 -> denom = 10
        assert_eq!(Phase::for_round(1, 11), Phase::Exploration); // p = 0.0
        assert_eq!(Phase::for_round(4, 11), Phase::Exploration); // p = 0.3
        assert_eq!(Phase::for_round(5, 11), Phase::Analysis); // p = 0.4
        assert_eq!(Phase::for_round(8, 11), Phase::Analysis); // p = 0.7 exactly -> not < 0.7
        assert_eq!(Phase::for_round(9, 11), Phase::Synthesis); // p = 0.8
        assert_eq!(Phase::for_round(10, 11), Phase::Synthesis); // p = 0.9 exactly -> not < 0.9
        assert_eq!(Phase::for_round(11, 11), Phase::Conclusion); // p = 1.0
    }

    #[test]
    fn single_round_discussion_does_not_divide_by_zero() {
        // max_rounds = 1: denom floors to 1.
        assert_eq!(Phase::for_round(0, 1), Phase::Initial);
        assert_eq!(Phase::for_round(1, 1), Phase::Exploration);
    }
}
