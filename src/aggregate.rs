//! Per-law aggregation of decisions.

use crate::request::{Decision, DecisionKind};

/// Counts of each decision type recorded under one law
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LawTally {
    pub report: u64,
    pub leak: u64,
    pub silence: u64,
}

impl LawTally {
    fn record(&mut self, kind: Option<DecisionKind>) {
        match kind {
            Some(DecisionKind::Report) => self.report += 1,
            Some(DecisionKind::Leak) => self.leak += 1,
            Some(DecisionKind::Silence) => self.silence += 1,
            // Unrecognised types still register the law but count nowhere
            Some(DecisionKind::Other) | None => {}
        }
    }

    /// Render as `"<law> R:<n>, L:<n>, S:<n>"`, leaving out zero counts
    pub fn render_line(&self, law: &str) -> String {
        let parts: Vec<String> = [('R', self.report), ('L', self.leak), ('S', self.silence)]
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(code, n)| format!("{}:{}", code, n))
            .collect();
        format!("{} {}", law, parts.join(", "))
    }
}

/// Decision counts keyed by law, in first-insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LawSummary {
    entries: Vec<(String, LawTally)>,
}

impl LawSummary {
    pub fn from_decisions(decisions: &[Decision]) -> Self {
        let mut summary = LawSummary::default();
        for decision in decisions {
            summary
                .tally_mut(decision.law_or_unknown())
                .record(decision.kind);
        }
        summary
    }

    fn tally_mut(&mut self, law: &str) -> &mut LawTally {
        let index = match self.entries.iter().position(|(name, _)| name == law) {
            Some(index) => index,
            None => {
                self.entries.push((law.to_string(), LawTally::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    #[cfg(test)]
    fn get(&self, law: &str) -> Option<&LawTally> {
        self.entries
            .iter()
            .find(|(name, _)| name == law)
            .map(|(_, tally)| tally)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LawTally)> {
        self.entries.iter().map(|(law, tally)| (law.as_str(), tally))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    /// One rendered line per law, newline-joined
    pub fn render_block(&self) -> String {
        self.iter()
            .map(|(law, tally)| tally.render_line(law))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
