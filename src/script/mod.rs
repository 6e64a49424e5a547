//! The interview script: an immutable ordered question list plus the
//! host's current position. Navigation is deliberately independent of the
//! recording lifecycle — the host may look ahead mid-take.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// One scripted interview question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    /// Position in the script; unique, dense, ascending.
    pub order: u32,
    /// The question put to the guest.
    pub prompt: String,
    /// Optional prefilled answer shown on the guest's teleprompter.
    #[serde(default)]
    pub teleprompter_text: Option<String>,
}

/// Ordered script with a clamped cursor.
#[derive(Debug, Clone)]
pub struct InterviewScript {
    questions: Vec<Question>,
    current: usize,
}

impl InterviewScript {
    /// Build a script from the gateway's question list. The list arrives
    /// ordered; sorting here keeps the cursor invariant independent of
    /// gateway behavior.
    pub fn new(mut questions: Vec<Question>) -> Self {
        questions.sort_by_key(|q| q.order);
        Self {
            questions,
            current: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Cursor position; `None` for an empty script.
    pub fn current_index(&self) -> Option<usize> {
        if self.questions.is_empty() {
            None
        } else {
            Some(self.current)
        }
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    /// Advance; clamps at the last question.
    pub fn next(&mut self) -> Option<&Question> {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
        self.current()
    }

    /// Step back; clamps at the first question.
    pub fn previous(&mut self) -> Option<&Question> {
        self.current = self.current.saturating_sub(1);
        self.current()
    }

    /// Jump to an arbitrary question. Out-of-range input is rejected and
    /// the cursor is left where it was.
    pub fn jump_to(&mut self, index: usize) -> Result<&Question> {
        if index >= self.questions.len() {
            return Err(SessionError::QuestionOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        self.current = index;
        Ok(&self.questions[self.current])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(n: u32) -> InterviewScript {
        InterviewScript::new(
            (0..n)
                .map(|i| Question {
                    id: format!("q{i}"),
                    order: i,
                    prompt: format!("Question {i}"),
                    teleprompter_text: None,
                })
                .collect(),
        )
    }

    #[test]
    fn navigation_clamps_at_bounds() {
        let mut s = script(3);
        assert_eq!(s.current_index(), Some(0));
        s.previous();
        assert_eq!(s.current_index(), Some(0));
        s.next();
        s.next();
        assert_eq!(s.current_index(), Some(2));
        s.next();
        assert_eq!(s.current_index(), Some(2));
    }

    #[test]
    fn jump_rejects_out_of_range_without_moving() {
        let mut s = script(3);
        s.jump_to(1).unwrap();
        let err = s.jump_to(3).unwrap_err();
        assert!(matches!(
            err,
            SessionError::QuestionOutOfRange { index: 3, len: 3 }
        ));
        assert_eq!(s.current_index(), Some(1));
    }

    #[test]
    fn unordered_input_is_sorted_by_order() {
        let s = InterviewScript::new(vec![
            Question {
                id: "b".into(),
                order: 1,
                prompt: "second".into(),
                teleprompter_text: None,
            },
            Question {
                id: "a".into(),
                order: 0,
                prompt: "first".into(),
                teleprompter_text: Some("notes".into()),
            },
        ]);
        assert_eq!(s.current().map(|q| q.id.as_str()), Some("a"));
    }

    #[test]
    fn empty_script_is_tolerated() {
        let mut s = script(0);
        assert_eq!(s.current_index(), None);
        assert!(s.next().is_none());
        assert!(s.previous().is_none());
        assert!(s.jump_to(0).is_err());
    }
}
