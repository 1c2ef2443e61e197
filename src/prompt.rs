//! Prompt construction for the profile summary.

use crate::aggregate::LawSummary;
use crate::request::Counters;

const SCENARIO_CONTEXT_HEADER: &str = "Scenario context (id | subject | R=report L=leak S=silence):";

const REPLY_INSTRUCTIONS: &str = r#"Reply with JSON only (no markdown), two keys: "moralSummary" (short paragraph to student, 3–5 sentences, their moral profile — institutions vs transparency vs risk); "lawsExplanation" (short paragraph, 3–5 sentences, how DPA/ICO, CMA, PIDA, FOI etc. apply to their choices, BTEC Unit 1 D/F2)."#;

/// Build the single user message sent to the model. Pure and deterministic.
///
/// The scenario block, header included, is left out when `scenario_context` is empty.
pub fn build_prompt(
    profile_title: &str,
    counters: &Counters,
    law_summary: &LawSummary,
    scenario_context: &str,
) -> String {
    let context_block = if scenario_context.is_empty() {
        String::new()
    } else {
        format!("{}\n{}\n\n", SCENARIO_CONTEXT_HEADER, scenario_context)
    };

    format!(
        "BTEC IT ethical activity (Avery's Inbox). Student completed {total} scenarios. \
         Profile: {title}. Counts R={r} L={l} S={s}.\n\
         \n\
         {context}By law:\n\
         {laws}\n\
         \n\
         {instructions}",
        total = counters.total(),
        title = profile_title,
        r = counters.report,
        l = counters.leak,
        s = counters.silence,
        context = context_block,
        laws = law_summary.render_block(),
        instructions = REPLY_INSTRUCTIONS,
    )
}
