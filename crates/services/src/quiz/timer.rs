use studygap_core::model::QuestionId;

/// Elapsed seconds to record for a question, produced by the timer and fed
/// into the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFlush {
    pub question_id: QuestionId,
    pub seconds: u32,
}

/// Per-question elapsed-time tracker driven by explicit tick events.
///
/// The page feeds one `tick` per elapsed second for whichever question is
/// displayed; switching questions flushes the final value for the question
/// being left. Keeping wall-clock scheduling outside this type makes the
/// accounting deterministic under test.
#[derive(Debug, Default)]
pub struct QuestionTimer {
    active: Option<(QuestionId, u32)>,
}

impl QuestionTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The question currently being timed.
    #[must_use]
    pub fn active_question(&self) -> Option<&QuestionId> {
        self.active.as_ref().map(|(id, _)| id)
    }

    /// Start timing a question, continuing from `base_seconds` already
    /// accumulated on it. Returns the final flush for the question being
    /// left, if any.
    pub fn switch_to(&mut self, question_id: QuestionId, base_seconds: u32) -> Option<TimerFlush> {
        let flushed = self.stop();
        self.active = Some((question_id, base_seconds));
        flushed
    }

    /// Record one elapsed second on the active question.
    ///
    /// Returns the updated total so the caller can mirror it into the
    /// session state.
    pub fn tick(&mut self) -> Option<TimerFlush> {
        let (id, seconds) = self.active.as_mut()?;
        *seconds = seconds.saturating_add(1);
        Some(TimerFlush {
            question_id: id.clone(),
            seconds: *seconds,
        })
    }

    /// Stop timing, flushing the final value for the active question.
    pub fn stop(&mut self) -> Option<TimerFlush> {
        self.active.take().map(|(question_id, seconds)| TimerFlush {
            question_id,
            seconds,
        })
    }
}
