use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;

use crate::food::api::FoodApi;
use crate::food::models::{Breakdown, ImpactLevel, ImpactReport, PartialImpact};
use crate::food::search::{Phase, QuerySession, SearchOrchestrator};

// Reference maxima for bar scaling, taken from the highest-impact item in
// the bundled dataset (beef).
const BAR_SCALE: [(&str, f64, &str); 5] = [
    ("carbon", 27.0, "kg CO₂"),
    ("water", 15400.0, "L"),
    ("energy", 40.0, "MJ"),
    ("waste", 2.5, "kg"),
    ("deforestation", 9.0, "ha"),
];
const BAR_WIDTH: usize = 24;

pub async fn handle_command<A: FoodApi + 'static>(
    input: &str,
    search: &SearchOrchestrator<A>,
) -> Result<(), String> {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command.to_lowercase().as_str() {
        "search" => {
            search.input_changed(rest).await;
            print_suggestions(&search.session());
        }
        "analyze" => {
            let phase = if rest.is_empty() {
                with_spinner(search.submit()).await
            } else {
                with_spinner(search.submit_query(rest)).await
            };
            report(phase, &search.session());
        }
        "pick" => {
            let session = search.session();
            let suggestion = nth(&session.suggestions, rest, "suggestion")?.clone();
            let phase = with_spinner(search.select_suggestion(&suggestion)).await;
            report(phase, &search.session());
        }
        "alt" => {
            let session = search.session();
            let names: Vec<String> = session.alternatives.iter().map(|a| a.name.clone()).collect();
            let name = nth(&names, rest, "alternative")?.clone();
            let phase = with_spinner(search.select_alternative(&name)).await;
            report(phase, &search.session());
        }
        "dismiss" => {
            search.dismiss_suggestions();
            println!("Suggestions hidden.");
        }
        "clear" => {
            search.clear();
            println!("🧹 Session cleared.");
        }
        "status" => print_session(&search.session()),
        "ai" => {
            let use_ai = match rest.to_lowercase().as_str() {
                "on" => true,
                "off" => false,
                _ => return Err("Usage: ai on|off".to_string()),
            };
            let options = search.recommendation_options();
            search.set_recommendation_options(crate::food::RecommendationOptions { use_ai, ..options });
            println!("AI-ranked alternatives {}", if use_ai { "enabled".green() } else { "disabled".yellow() });
        }
        "limit" => {
            let limit: u32 = rest
                .parse()
                .ok()
                .filter(|n| (1..=20).contains(n))
                .ok_or_else(|| "Usage: limit <1-20>".to_string())?;
            let options = search.recommendation_options();
            search.set_recommendation_options(crate::food::RecommendationOptions { limit, ..options });
            println!("Requesting {} alternatives", limit.to_string().cyan());
        }
        _ => {
            let phase = with_spinner(search.submit_query(input)).await;
            report(phase, &search.session());
        }
    }
    Ok(())
}

fn nth<'a, T>(items: &'a [T], raw: &str, what: &str) -> Result<&'a T, String> {
    if items.is_empty() {
        return Err(format!("No {}s to choose from.", what));
    }
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| items.get(i))
        .ok_or_else(|| format!("Pick a {} between 1 and {}.", what, items.len()))
}

async fn with_spinner<F: Future<Output = Phase>>(work: F) -> Phase {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Analyzing environmental impact...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let phase = work.await;
    spinner.finish_and_clear();
    phase
}

fn report(phase: Phase, session: &QuerySession) {
    if phase == Phase::Analyzing {
        // A newer request took over; its own report follows.
        return;
    }
    print_session(session);
}

fn print_suggestions(session: &QuerySession) {
    if session.suggestions.is_empty() {
        println!("{}", "No suggestions.".dimmed());
        return;
    }
    println!("💡 Suggestions:");
    for (i, suggestion) in session.suggestions.iter().enumerate() {
        println!("  {}. {}", (i + 1).to_string().cyan(), suggestion);
    }
}

pub fn print_session(session: &QuerySession) {
    if let Some(message) = session.error_message() {
        println!("{} {}", "⚠️".yellow(), message.red());
    }

    match &session.impact {
        Some(impact) => print_impact(impact),
        None if session.phase == Phase::Idle && session.last_submitted_query.is_none() => {
            println!("{}", "Nothing analyzed yet. Type a food name to start.".dimmed());
        }
        None => {}
    }

    if !session.alternatives.is_empty() {
        let source = session
            .recommendation_source
            .as_deref()
            .map(|s| format!(" ({})", s.to_uppercase()))
            .unwrap_or_default();
        println!("\n🌱 Lower-impact alternatives{}:", source.dimmed());
        for (i, alt) in session.alternatives.iter().enumerate() {
            println!(
                "  {}. {} {}",
                (i + 1).to_string().cyan(),
                alt.name.bold(),
                format!("+{:.1}% more sustainable", alt.sustainability_improvement).green()
            );
            if !alt.explanation.is_empty() {
                println!("     {}", alt.explanation.truecolor(255, 236, 179));
            }
            if let Some(summary) = partial_summary(&alt.impact) {
                println!("     {}", summary.dimmed());
            }
        }
        println!("\nUse {} to explore an alternative.", "alt <n>".cyan());
    }

    if session.phase == Phase::PartialFailure {
        println!("{}", "Impact data unavailable; showing alternatives only.".dimmed());
    }
    println!();
}

fn print_impact(impact: &ImpactReport) {
    let level = impact.impact_level.map(level_label).unwrap_or_else(|| "Unrated".dimmed());
    println!(
        "\n📊 {} | score {} | impact {}",
        impact.food.bold(),
        format!("{:.1}", impact.score).cyan(),
        level
    );

    for ((name, value), (_, max, unit)) in impact.breakdown.metrics().iter().zip(BAR_SCALE.iter()) {
        println!("  {:<14} {:>10.2} {:<7} {}", name, value, unit, bar(*value, *max));
    }

    if !impact.ingredients.is_empty() {
        println!("  ingredients: {}", impact.ingredients.join(", "));
    }
    if !impact.certifications.is_empty() {
        println!("  certifications: {}", impact.certifications.join(", "));
    }
}

fn bar(value: f64, max: f64) -> ColoredString {
    let ratio = if max > 0.0 { (value / max).clamp(0.0, 1.0) } else { 0.0 };
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    let bar = "█".repeat(filled);
    if ratio > 0.66 {
        bar.red()
    } else if ratio > 0.33 {
        bar.yellow()
    } else {
        bar.green()
    }
}

fn level_label(level: ImpactLevel) -> ColoredString {
    match level {
        ImpactLevel::High => "High".red().bold(),
        ImpactLevel::Medium => "Medium".yellow(),
        ImpactLevel::Low => "Low".green(),
    }
}

fn partial_summary(impact: &PartialImpact) -> Option<String> {
    let parts: Vec<String> = Breakdown::METRICS
        .iter()
        .zip([impact.carbon, impact.water, impact.energy, impact.waste, impact.deforestation])
        .filter_map(|(name, value)| value.map(|v| format!("{} {:.2}", name, v)))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}
