//! Human-readable rendering of decisions

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt::Write;

use crate::signals::{FactorSource, SignalDecision, Verdict};
use crate::votes::Direction;

/// Factors listed in the reasoning summary
const TOP_FACTORS: usize = 3;

pub fn verdict_emoji(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Buy => "🟢",
        Verdict::Sell => "🔴",
        Verdict::Hold => "🟡",
    }
}

pub fn confidence_emoji(confidence: Decimal) -> &'static str {
    if confidence >= dec!(0.8) {
        "🔥"
    } else if confidence >= dec!(0.7) {
        "💪"
    } else if confidence >= dec!(0.6) {
        "👍"
    } else {
        "🤔"
    }
}

fn percent(confidence: Decimal) -> Decimal {
    (confidence * Decimal::ONE_HUNDRED).round_dp(1)
}

/// Multi-line explanation: headline, strongest confluences, market structure
pub fn format_reasoning(decision: &SignalDecision) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {}: net score {} ({}% confidence)",
        decision.verdict,
        decision.instrument,
        decision.timeframe,
        decision.net_score.round_dp(4),
        percent(decision.confidence)
    );

    if decision.reasoning.is_empty() {
        let _ = writeln!(out, "No factor voted");
    } else {
        let agreeing: Vec<_> = decision
            .reasoning
            .iter()
            .filter(|v| match decision.verdict {
                Verdict::Buy => v.direction == Direction::Buy,
                Verdict::Sell => v.direction == Direction::Sell,
                Verdict::Hold => true,
            })
            .take(TOP_FACTORS)
            .collect();
        let _ = writeln!(out, "Top confluences:");
        for vote in agreeing {
            let source = match vote.source {
                FactorSource::Indicator => "indicator",
                FactorSource::Structure => "structure",
            };
            let _ = writeln!(
                out,
                "• {} {} [{} w={}]: {}",
                vote.direction,
                vote.name,
                source,
                vote.weight.round_dp(4),
                vote.detail
            );
        }
        let against = decision
            .reasoning
            .iter()
            .filter(|v| match decision.verdict {
                Verdict::Buy => v.direction == Direction::Sell,
                Verdict::Sell => v.direction == Direction::Buy,
                Verdict::Hold => false,
            })
            .count();
        if against > 0 {
            let _ = writeln!(out, "{} factor(s) disagree", against);
        }
    }

    let _ = write!(out, "Market structure: {}", decision.market_structure);
    if let Some(note) = &decision.note {
        let _ = write!(out, "\nNote: {}", note);
    }
    out
}

/// Compact notification message
pub fn format_notification(decision: &SignalDecision) -> String {
    format!(
        "{} {} {} {} {}\nConfidence: {}%\nPrice: {}\n\n{}\n\n⏰ {}",
        verdict_emoji(decision.verdict),
        decision.verdict,
        decision.instrument,
        decision.timeframe,
        confidence_emoji(decision.confidence),
        percent(decision.confidence),
        decision.price,
        format_reasoning(decision),
        decision.timestamp.format("%Y-%m-%d %H:%M UTC")
    )
}
