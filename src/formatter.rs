use crate::catalog::Followup;

/// Render follow-up suggestions to append after an answer. Empty when there
/// are none.
pub fn format_followups(followups: &[Followup]) -> String {
    if followups.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\n---\n**Suggested follow-ups:**");
    for f in followups {
        out.push_str("\n- ");
        out.push_str(&f.label);
    }
    out
}
