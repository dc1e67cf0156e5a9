use colored::Colorize;

use crate::wire::{AmbiguityQuestions, AuditResult, Variations};

pub fn show_questions(q: &AmbiguityQuestions) {
    println!("\n{}", "=== QUESTIONS ===".bold());
    for (i, question) in q.questions.iter().enumerate() {
        println!("{}. {}", i + 1, question);
    }
    println!();
}

pub fn show_prompt(label: &str, text: &str) {
    println!("\n{}", format!("=== {label} ===").bold());
    println!("{}\n", text);
}

pub fn score_label(score: f64) -> String {
    let s = format!("{:.0}/100", score);
    if score >= 80.0 {
        s.green().bold().to_string()
    } else if score >= 50.0 {
        s.yellow().bold().to_string()
    } else {
        s.red().bold().to_string()
    }
}

pub fn show_audit(a: &AuditResult) {
    println!("\n{}  {}", "=== AUDIT ===".bold(), score_label(a.score));
    println!(
        "  {}: {:.0}   {}: {:.0}   {}: {:.0}",
        "Clarity".cyan().bold(), a.breakdown.clarity,
        "Context".cyan().bold(), a.breakdown.context,
        "Constraints".cyan().bold(), a.breakdown.constraints
    );
    if !a.issues.is_empty() {
        println!("{}", "\nIssues:".red().bold());
        for i in &a.issues {
            println!(" - {}", i);
        }
    }
    if !a.suggestions.is_empty() {
        println!("{}", "\nSuggestions:".green().bold());
        for s in &a.suggestions {
            println!(" - {}", s);
        }
    }
    println!();
}

pub fn show_variations(v: &Variations) {
    println!("\n{}", "=== VARIATIONS ===".bold());
    println!("{}\n{}\n", "[LOGICAL]".blue().bold(), v.logical);
    println!("{}\n{}\n", "[CREATIVE]".magenta().bold(), v.creative);
    println!("{}\n{}\n", "[OPTIMIZED]".green().bold(), v.optimized);
}
