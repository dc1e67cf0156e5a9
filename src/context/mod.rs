//! User-message assembly. System text always comes from a template; what the
//! caller supplied (prompt, answers, remix pairs) is laid out here.

use crate::wire::{Answers, RemixContext};

pub const CLARIFICATION_HEADER: &str = "USER CLARIFICATIONS (Integrate these into the prompt):";

/// Delimited block of the non-blank answers, numbered by original position.
/// Empty when nothing is left after skipping blanks.
pub fn clarification_block(answers: &Answers) -> String {
    let lines: Vec<String> = answers
        .non_empty()
        .into_iter()
        .map(|(n, a)| format!("- Clarification {n}: {a}"))
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    format!("{CLARIFICATION_HEADER}\n{}\n", lines.join("\n"))
}

pub fn analyze_message(prompt: &str) -> String {
    format!("Analyze this prompt for missing details: \"{}\"", prompt.trim())
}

pub fn finalize_message(prompt: &str, answers: &Answers, target: &str) -> String {
    let mut msg = format!("RAW CONCEPT: \"{}\"\n", prompt.trim());
    let block = clarification_block(answers);
    if !block.is_empty() {
        msg.push('\n');
        msg.push_str(&block);
    }
    msg.push_str(&format!(
        "\nTASK: Rewrite the Raw Concept into a professional prompt for {target}, strictly following your System Rules."
    ));
    msg
}

pub fn audit_message(prompt: &str) -> String {
    format!("Audit this prompt:\n\"\"\"\n{}\n\"\"\"", prompt.trim())
}

pub fn enhance_message(prompt: &str) -> String {
    format!(
        "Rewrite this prompt three ways (logical, creative, optimized). Do NOT answer it.\n\"\"\"\n{}\n\"\"\"",
        prompt.trim()
    )
}

/// Simulation sends the prompt as-is.
pub fn simulate_message(prompt: &str) -> String {
    prompt.trim().to_string()
}

/// (question, answer) for every non-blank answer. Questions without an answer
/// are dropped; answers without a question are labelled by position.
pub fn remix_pairs(ctx: &RemixContext) -> Vec<(String, &str)> {
    ctx.answers
        .iter()
        .enumerate()
        .filter_map(|(i, a)| {
            let a = a.trim();
            if a.is_empty() {
                return None;
            }
            let q = match ctx.questions.get(i) {
                Some(q) => q.trim().to_string(),
                None => format!("Answer {}", i + 1),
            };
            Some((q, a))
        })
        .collect()
}

pub fn remix_message(ctx: &RemixContext) -> String {
    let mut msg = format!("TEMPLATE:\n{}\n", ctx.template_body.trim());

    let pairs = remix_pairs(ctx);
    if !pairs.is_empty() {
        msg.push_str("\nUSER ANSWERS:\n");
        for (q, a) in pairs {
            msg.push_str(&format!("- {q} -> {a}\n"));
        }
    }

    let tokens: Vec<&String> = ctx.protected_tokens.iter().filter(|t| !t.is_empty()).collect();
    if !tokens.is_empty() {
        msg.push_str("\nPROTECTED TOKENS (copy each verbatim into the output):\n");
        for t in tokens {
            msg.push_str(&format!("- {t}\n"));
        }
    }

    msg.push_str("\nTASK: Return only the remixed prompt.");
    msg
}
