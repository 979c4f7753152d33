//! What a draw hands back to its caller.

use serde::{Deserialize, Serialize};

use super::display::{DisplayTemplate, compose_display};
use super::mode::RepeatMode;
use crate::domain::{Candidate, DrawScope};
use crate::weight::WeightedCandidate;

/// Either a selection awaiting confirmation, or a request to reset a scope first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawOutcome<T = DrawResult> {
    Selected(T),
    /// Not enough eligible candidates left in this scope's exclusion cycle
    ResetRequired(DrawScope),
}

impl<T> DrawOutcome<T> {
    pub fn is_reset_required(&self) -> bool {
        matches!(self, DrawOutcome::ResetRequired(_))
    }

    pub fn selected(&self) -> Option<&T> {
        match self {
            DrawOutcome::Selected(value) => Some(value),
            DrawOutcome::ResetRequired(_) => None,
        }
    }

    pub fn into_selected(self) -> Option<T> {
        match self {
            DrawOutcome::Selected(value) => Some(value),
            DrawOutcome::ResetRequired(_) => None,
        }
    }
}

/// A weighted selection, not yet recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawResult {
    pub scope: DrawScope,
    pub mode: RepeatMode,
    pub subject: Option<String>,
    /// In pick order, each with the weight it had when drawn
    pub selected: Vec<WeightedCandidate>,
}

impl DrawResult {
    pub fn selected_entities(&self) -> Vec<&Candidate> {
        self.selected.iter().map(|w| &w.candidate).collect()
    }

    pub fn weights_used(&self) -> Vec<f64> {
        self.selected.iter().map(|w| w.weight).collect()
    }
}

/// Who the prizes of a paired draw go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignee {
    /// One weighted student draw per prize
    #[default]
    Student,
    /// One weighted draw among the class's groups per prize, then a random member
    Group,
}

/// One prize and whoever it went to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeAssignment {
    pub prize: Candidate,
    /// Group the prize went to, in group draws
    pub group: Option<String>,
    /// Student the prize went to; in group draws, the member picked to collect it
    pub student: Option<Candidate>,
    pub display: String,
}

impl PrizeAssignment {
    /// A prize given to a drawn student, or to nobody when no student side was drawn.
    pub fn to_student(prize: Candidate, student: Option<Candidate>, template: DisplayTemplate) -> Self {
        let name = student.as_ref().map(|s| s.name.clone());
        Self::compose(prize, None, student, name, template)
    }

    /// A prize given to a drawn group. The group name stands in for a missing member.
    pub fn to_group(prize: Candidate, group: String, member: Option<Candidate>, template: DisplayTemplate) -> Self {
        let name = member
            .as_ref()
            .map(|m| m.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| group.clone());
        Self::compose(prize, Some(group), member, Some(name), template)
    }

    fn compose(
        prize: Candidate,
        group: Option<String>,
        student: Option<Candidate>,
        name: Option<String>,
        template: DisplayTemplate,
    ) -> Self {
        let display = compose_display(
            &prize.name,
            group.as_deref().filter(|_| template.shows_group()),
            name.as_deref().filter(|_| template.shows_student()),
            template,
        );
        Self {
            prize,
            group,
            student,
            display,
        }
    }
}

/// A prize draw, optionally coupled to a draw of the same size on the assignee side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedDraw {
    pub prizes: DrawResult,
    pub assign_to: Assignee,
    /// The student draw, or the group draw when prizes go to groups
    pub students: Option<DrawResult>,
    pub assignments: Vec<PrizeAssignment>,
}
