//! Display strings for a prize drawn together with a student or group.

/// How the parts of a paired draw are joined for display.
///
/// Indices match the lottery "show random" setting; anything unknown behaves like `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayTemplate {
    /// `prize\ngroup - student`, dropping whatever is missing
    #[default]
    Default,
    /// Prize, group and student on separate lines
    PrizeGroupStudentLines,
    /// `prize - group - student`
    PrizeGroupStudentDashed,
    PrizeStudentLines,
    PrizeStudentDashed,
    PrizeGroupLines,
    PrizeGroupDashed,
}

#[derive(Clone, Copy, PartialEq)]
enum Part {
    Prize,
    Group,
    Student,
}

impl DisplayTemplate {
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => DisplayTemplate::PrizeGroupStudentLines,
            2 => DisplayTemplate::PrizeGroupStudentDashed,
            3 => DisplayTemplate::PrizeStudentLines,
            4 => DisplayTemplate::PrizeStudentDashed,
            5 => DisplayTemplate::PrizeGroupLines,
            6 => DisplayTemplate::PrizeGroupDashed,
            _ => DisplayTemplate::Default,
        }
    }

    /// Whether the template shows a group name at all.
    pub fn shows_group(&self) -> bool {
        self.layout().is_none_or(|(_, parts)| parts.contains(&Part::Group))
    }

    /// Whether the template shows a student name at all.
    pub fn shows_student(&self) -> bool {
        self.layout().is_none_or(|(_, parts)| parts.contains(&Part::Student))
    }

    fn layout(&self) -> Option<(&'static str, &'static [Part])> {
        const ALL: &[Part] = &[Part::Prize, Part::Group, Part::Student];
        const STUDENT: &[Part] = &[Part::Prize, Part::Student];
        const GROUP: &[Part] = &[Part::Prize, Part::Group];
        match self {
            DisplayTemplate::Default => None,
            DisplayTemplate::PrizeGroupStudentLines => Some(("\n", ALL)),
            DisplayTemplate::PrizeGroupStudentDashed => Some((" - ", ALL)),
            DisplayTemplate::PrizeStudentLines => Some(("\n", STUDENT)),
            DisplayTemplate::PrizeStudentDashed => Some((" - ", STUDENT)),
            DisplayTemplate::PrizeGroupLines => Some(("\n", GROUP)),
            DisplayTemplate::PrizeGroupDashed => Some((" - ", GROUP)),
        }
    }
}

/// Compose the display string of a prize and whoever it was assigned to.
pub fn compose_display(prize: &str, group: Option<&str>, student: Option<&str>, template: DisplayTemplate) -> String {
    let group = group.unwrap_or("");
    let student = student.unwrap_or("");

    let Some((separator, parts)) = template.layout() else {
        return match (group.is_empty(), student.is_empty()) {
            (false, false) => format!("{}\n{} - {}", prize, group, student),
            (false, true) => format!("{}\n{}", prize, group),
            (true, false) => format!("{}\n{}", prize, student),
            (true, true) => prize.to_string(),
        };
    };

    let shown: Vec<&str> = parts
        .iter()
        .map(|part| match part {
            Part::Prize => prize,
            Part::Group => group,
            Part::Student => student,
        })
        .filter(|value| !value.is_empty())
        .collect();

    if shown.is_empty() {
        prize.to_string()
    } else {
        shown.join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_collapses_missing_parts() {
        let t = DisplayTemplate::Default;
        assert_eq!(compose_display("Pen", Some("G1"), Some("Ann"), t), "Pen\nG1 - Ann");
        assert_eq!(compose_display("Pen", Some("G1"), None, t), "Pen\nG1");
        assert_eq!(compose_display("Pen", None, Some("Ann"), t), "Pen\nAnn");
        assert_eq!(compose_display("Pen", None, None, t), "Pen");
    }

    #[test]
    fn test_numbered_templates() {
        let show = |i| compose_display("Pen", Some("G1"), Some("Ann"), DisplayTemplate::from_index(i));
        assert_eq!(show(1), "Pen\nG1\nAnn");
        assert_eq!(show(2), "Pen - G1 - Ann");
        assert_eq!(show(3), "Pen\nAnn");
        assert_eq!(show(4), "Pen - Ann");
        assert_eq!(show(5), "Pen\nG1");
        assert_eq!(show(6), "Pen - G1");
        assert_eq!(show(42), "Pen\nG1 - Ann");
    }

    #[test]
    fn test_empty_prize_still_shows_assignee() {
        let out = compose_display("", None, Some("Ann"), DisplayTemplate::PrizeStudentDashed);
        assert_eq!(out, "Ann");
    }

    #[test]
    fn test_visibility() {
        assert!(DisplayTemplate::Default.shows_group());
        assert!(!DisplayTemplate::PrizeStudentLines.shows_group());
        assert!(!DisplayTemplate::PrizeGroupDashed.shows_student());
    }
}
