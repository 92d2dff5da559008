//! Signal decisions and the weighted-vote decision engine

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use types::{Instrument, Timeframe};

use crate::config::DecisionConfig;
use crate::indicators::IndicatorResult;
use crate::structure::{MarketStructure, StructureEvent};
use crate::votes::{indicator_vote, Direction};

/// Decimal places kept on confidence
pub const CONFIDENCE_DP: u32 = 4;
/// Decimal places kept on decayed weights and contributions
const WEIGHT_DP: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Buy,
    Sell,
    Hold,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Buy => "BUY",
            Verdict::Sell => "SELL",
            Verdict::Hold => "HOLD",
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, Verdict::Hold)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSource {
    Indicator,
    Structure,
}

/// One non-abstaining factor in the reasoning trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorVote {
    /// Indicator label (`rsi_14`) or structure factor (`order_block@...`)
    pub name: String,
    pub source: FactorSource,
    pub direction: Direction,
    pub weight: Decimal,
    /// Signed weight, positive for BUY
    pub contribution: Decimal,
    pub detail: String,
}

/// Join key between a decision and its later outcome
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionKey {
    pub instrument: Instrument,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for DecisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}",
            self.instrument,
            self.timeframe,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Immutable output of one pipeline evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDecision {
    pub instrument: Instrument,
    pub timeframe: Timeframe,
    /// Timestamp of the evaluated bar
    pub timestamp: DateTime<Utc>,
    pub verdict: Verdict,
    pub reasoning: Vec<FactorVote>,
    /// `|net| / total voting weight`, in [0, 1]
    pub confidence: Decimal,
    pub net_score: Decimal,
    /// Close of the evaluated bar
    pub price: Decimal,
    pub market_structure: MarketStructure,
    /// Set when a directional score was demoted to HOLD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SignalDecision {
    pub fn decision_key(&self) -> DecisionKey {
        DecisionKey {
            instrument: self.instrument.clone(),
            timeframe: self.timeframe,
            timestamp: self.timestamp,
        }
    }

    pub fn strength(&self) -> SignalStrength {
        let c = self.confidence;
        if c >= Decimal::new(9, 1) {
            SignalStrength::VeryStrong
        } else if c >= Decimal::new(8, 1) {
            SignalStrength::Strong
        } else if c >= Decimal::new(7, 1) {
            SignalStrength::Moderate
        } else if c >= Decimal::new(6, 1) {
            SignalStrength::Weak
        } else {
            SignalStrength::VeryWeak
        }
    }
}

/// Active structure event with its distance in bars from the evaluated bar
#[derive(Debug, Clone, Copy)]
pub struct AgedEvent<'a> {
    pub event: &'a StructureEvent,
    pub bars_since: u64,
}

/// Everything the decision engine reads for one evaluation
#[derive(Debug, Clone)]
pub struct DecisionInput<'a> {
    pub instrument: &'a Instrument,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub market_structure: MarketStructure,
    pub indicators: &'a IndicatorResult,
    pub structure: Vec<AgedEvent<'a>>,
}

pub struct DecisionEngine {
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Fuse indicator and structure votes into one decision
    pub fn decide(&self, input: &DecisionInput<'_>) -> SignalDecision {
        let mut reasoning = self.indicator_votes(input);
        reasoning.extend(self.structure_votes(input));
        reasoning.extend(self.market_structure_vote(input));
        reasoning.sort_by(|a, b| match b.weight.cmp(&a.weight) {
            Ordering::Equal => a.name.cmp(&b.name),
            other => other,
        });

        let total: Decimal = reasoning.iter().map(|v| v.weight).sum();
        let net: Decimal = reasoning.iter().map(|v| v.contribution).sum();

        let mut verdict = if reasoning.is_empty() {
            Verdict::Hold
        } else if net >= self.config.buy_threshold {
            Verdict::Buy
        } else if net <= -self.config.sell_threshold {
            Verdict::Sell
        } else {
            Verdict::Hold
        };

        let confidence = if total.is_zero() {
            Decimal::ZERO
        } else {
            (net.abs() / total)
                .round_dp_with_strategy(CONFIDENCE_DP, RoundingStrategy::MidpointAwayFromZero)
        };

        let mut note = None;
        if let Some(min) = self.config.min_confidence {
            if verdict.is_directional() && confidence < min {
                note = Some(format!(
                    "{} score {} demoted to HOLD: confidence {} below {}",
                    verdict, net, confidence, min
                ));
                verdict = Verdict::Hold;
            }
        }

        SignalDecision {
            instrument: input.instrument.clone(),
            timeframe: input.timeframe,
            timestamp: input.timestamp,
            verdict,
            reasoning,
            confidence,
            net_score: net,
            price: input.price,
            market_structure: input.market_structure,
            note,
        }
    }

    fn indicator_votes(&self, input: &DecisionInput<'_>) -> Vec<FactorVote> {
        input
            .indicators
            .readings
            .iter()
            .filter_map(|(label, reading)| {
                let output = reading.value.output()?;
                let weight = self.config.indicator_weight(reading.spec.key());
                if weight <= Decimal::ZERO {
                    return None;
                }
                let (direction, detail) =
                    indicator_vote(&reading.spec, output, input.price, &self.config.thresholds)?;
                Some(FactorVote {
                    name: label.clone(),
                    source: FactorSource::Indicator,
                    direction,
                    weight,
                    contribution: weight * direction.sign(),
                    detail,
                })
            })
            .collect()
    }

    fn structure_votes(&self, input: &DecisionInput<'_>) -> Vec<FactorVote> {
        input
            .structure
            .iter()
            .filter(|aged| !aged.event.is_invalidation())
            .filter_map(|aged| {
                let base = self.config.structure_weights.for_kind(&aged.event.kind);
                let weight = (base * self.decay(aged.bars_since)).round_dp(WEIGHT_DP);
                if weight <= Decimal::ZERO {
                    return None;
                }
                let direction = match aged.event.bias {
                    crate::structure::Bias::Bullish => Direction::Buy,
                    crate::structure::Bias::Bearish => Direction::Sell,
                };
                Some(FactorVote {
                    name: aged.event.factor_name(),
                    source: FactorSource::Structure,
                    direction,
                    weight,
                    contribution: weight * direction.sign(),
                    detail: format!("{}, {} bars ago", aged.event.describe(), aged.bars_since),
                })
            })
            .collect()
    }

    /// Prevailing swing trend; a ranging market abstains
    fn market_structure_vote(&self, input: &DecisionInput<'_>) -> Option<FactorVote> {
        let weight = self.config.structure_weights.market_structure;
        if weight <= Decimal::ZERO {
            return None;
        }
        let (direction, detail) = match input.market_structure {
            MarketStructure::Bullish => (Direction::Buy, "higher highs and higher lows"),
            MarketStructure::Bearish => (Direction::Sell, "lower highs and lower lows"),
            MarketStructure::Ranging => return None,
        };
        Some(FactorVote {
            name: "market_structure".to_string(),
            source: FactorSource::Structure,
            direction,
            weight,
            contribution: weight * direction.sign(),
            detail: detail.to_string(),
        })
    }

    fn decay(&self, bars: u64) -> Decimal {
        if self.config.recency_decay == Decimal::ONE {
            Decimal::ONE
        } else {
            self.config.recency_decay.powu(bars)
        }
    }
}

/// Running decision statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct SignalStats {
    pub total_decisions: u64,
    pub buy_signals: u64,
    pub sell_signals: u64,
    pub hold_signals: u64,
    pub avg_confidence: Decimal,
    pub last_decision_at: Option<DateTime<Utc>>,
}

impl SignalStats {
    pub fn record_decision(&mut self, decision: &SignalDecision) {
        self.total_decisions += 1;

        match decision.verdict {
            Verdict::Buy => self.buy_signals += 1,
            Verdict::Sell => self.sell_signals += 1,
            Verdict::Hold => self.hold_signals += 1,
        }

        // Rolling average confidence
        let n = Decimal::from(self.total_decisions);
        let total = self.avg_confidence * (n - Decimal::ONE) + decision.confidence;
        self.avg_confidence = (total / n).round_dp(CONFIDENCE_DP);

        self.last_decision_at = Some(decision.timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{IndicatorOutput, IndicatorReading, IndicatorSpec, IndicatorValue};
    use crate::structure::{BarSpan, Bias, EventId, PriceRange, StructureKind};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn block(id: u64, bias: Bias) -> StructureEvent {
        StructureEvent {
            id: EventId(id),
            kind: StructureKind::OrderBlock,
            bias,
            zone: PriceRange::new(dec!(1.08), dec!(1.09)),
            bars: BarSpan {
                start: ts(),
                end: ts(),
            },
            emitted_at: ts(),
        }
    }

    fn rsi_reading(value: Decimal) -> IndicatorResult {
        let mut result = IndicatorResult::default();
        result.readings.insert(
            "rsi_14".to_string(),
            IndicatorReading {
                spec: IndicatorSpec::Rsi { period: 14 },
                lookback: 15,
                value: IndicatorValue::Ready(IndicatorOutput::scalar(value)),
            },
        );
        result
    }

    fn input<'a>(
        instrument: &'a Instrument,
        indicators: &'a IndicatorResult,
        structure: Vec<AgedEvent<'a>>,
    ) -> DecisionInput<'a> {
        DecisionInput {
            instrument,
            timeframe: Timeframe::M15,
            timestamp: ts(),
            price: dec!(1.085),
            market_structure: MarketStructure::Ranging,
            indicators,
            structure,
        }
    }

    #[test]
    fn test_no_voters_is_hold_with_zero_confidence() {
        let eurusd = Instrument::new("EUR/USD").unwrap();
        let empty = IndicatorResult::default();
        let engine = DecisionEngine::new(DecisionConfig::default());
        let decision = engine.decide(&input(&eurusd, &empty, vec![]));
        assert_eq!(decision.verdict, Verdict::Hold);
        assert_eq!(decision.confidence, Decimal::ZERO);
        assert!(decision.reasoning.is_empty());
    }

    #[test]
    fn test_exact_cancel_is_hold() {
        let eurusd = Instrument::new("EUR/USD").unwrap();
        let empty = IndicatorResult::default();
        let (bull, bear) = (block(0, Bias::Bullish), block(1, Bias::Bearish));
        let aged = vec![
            AgedEvent { event: &bull, bars_since: 2 },
            AgedEvent { event: &bear, bars_since: 2 },
        ];
        let engine = DecisionEngine::new(DecisionConfig::default());
        let decision = engine.decide(&input(&eurusd, &empty, aged));
        assert_eq!(decision.verdict, Verdict::Hold);
        assert_eq!(decision.confidence, Decimal::ZERO);
        assert_eq!(decision.net_score, Decimal::ZERO);
        assert_eq!(decision.reasoning.len(), 2);
    }

    #[test]
    fn test_buy_above_threshold_and_trace_order() {
        let eurusd = Instrument::new("EUR/USD").unwrap();
        let oversold = rsi_reading(dec!(20));
        let bull = block(0, Bias::Bullish);
        let aged = vec![AgedEvent { event: &bull, bars_since: 0 }];
        let engine = DecisionEngine::new(DecisionConfig::default());
        let decision = engine.decide(&input(&eurusd, &oversold, aged));

        // rsi 1.5 + order block 1.5
        assert_eq!(decision.net_score, dec!(3.0));
        assert_eq!(decision.verdict, Verdict::Buy);
        assert_eq!(decision.confidence, dec!(1));
        assert_eq!(decision.strength(), SignalStrength::VeryStrong);
        let names: Vec<&str> = decision.reasoning.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["order_block@2024-03-01T12:00:00Z", "rsi_14"]);
    }

    #[test]
    fn test_recency_decay_shrinks_structure_weight() {
        let eurusd = Instrument::new("EUR/USD").unwrap();
        let empty = IndicatorResult::default();
        let bull = block(0, Bias::Bullish);
        let aged = vec![AgedEvent { event: &bull, bars_since: 2 }];
        let engine = DecisionEngine::new(DecisionConfig::default());
        let decision = engine.decide(&input(&eurusd, &empty, aged));
        // 1.5 * 0.95^2
        assert_eq!(decision.reasoning[0].weight, dec!(1.35375));
    }

    #[test]
    fn test_low_confidence_is_demoted() {
        let eurusd = Instrument::new("EUR/USD").unwrap();
        let empty = IndicatorResult::default();
        let events: Vec<StructureEvent> = vec![
            block(0, Bias::Bullish),
            block(1, Bias::Bullish),
            block(2, Bias::Bullish),
            block(3, Bias::Bearish),
            block(4, Bias::Bearish),
        ];
        let aged = events
            .iter()
            .map(|event| AgedEvent { event, bars_since: 0 })
            .collect();
        let config = DecisionConfig {
            buy_threshold: dec!(1),
            min_confidence: Some(dec!(0.5)),
            ..DecisionConfig::default()
        };
        let decision = DecisionEngine::new(config).decide(&input(&eurusd, &empty, aged));
        // net 1.5 of 7.5 total
        assert_eq!(decision.confidence, dec!(0.2));
        assert_eq!(decision.verdict, Verdict::Hold);
        assert!(decision.note.is_some());
    }

    #[test]
    fn test_net_score_on_the_threshold_is_directional() {
        let eurusd = Instrument::new("EUR/USD").unwrap();
        let empty = IndicatorResult::default();
        let bear = block(0, Bias::Bearish);
        let config = DecisionConfig {
            sell_threshold: dec!(1.5),
            ..DecisionConfig::default()
        };
        let aged = vec![AgedEvent { event: &bear, bars_since: 0 }];
        let decision = DecisionEngine::new(config).decide(&input(&eurusd, &empty, aged));
        assert_eq!(decision.net_score, dec!(-1.5));
        assert_eq!(decision.verdict, Verdict::Sell);
    }

    #[test]
    fn test_market_structure_votes_with_the_trend() {
        let eurusd = Instrument::new("EUR/USD").unwrap();
        let empty = IndicatorResult::default();
        let bull = block(0, Bias::Bullish);
        let engine = DecisionEngine::new(DecisionConfig::default());

        let mut trending = input(&eurusd, &empty, vec![]);
        trending.market_structure = MarketStructure::Bearish;
        let decision = engine.decide(&trending);
        assert_eq!(decision.reasoning.len(), 1);
        let vote = &decision.reasoning[0];
        assert_eq!(vote.name, "market_structure");
        assert_eq!(vote.source, FactorSource::Structure);
        assert_eq!(vote.direction, Direction::Sell);
        assert_eq!(vote.contribution, dec!(-1.5));
        // Unanimous, but short of the default sell threshold of 2
        assert_eq!(decision.confidence, dec!(1));
        assert_eq!(decision.verdict, Verdict::Hold);

        trending.market_structure = MarketStructure::Bullish;
        trending.structure = vec![AgedEvent { event: &bull, bars_since: 0 }];
        let decision = engine.decide(&trending);
        // order block 1.5 + market structure 1.5, ties broken by name
        assert_eq!(decision.net_score, dec!(3.0));
        let names: Vec<&str> = decision.reasoning.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["market_structure", "order_block@2024-03-01T12:00:00Z"]);
        assert_eq!(decision.verdict, Verdict::Buy);
    }

    #[test]
    fn test_ranging_or_unweighted_structure_abstains() {
        let eurusd = Instrument::new("EUR/USD").unwrap();
        let empty = IndicatorResult::default();
        let ranging = input(&eurusd, &empty, vec![]);
        let decision = DecisionEngine::new(DecisionConfig::default()).decide(&ranging);
        assert!(decision.reasoning.is_empty());

        let mut config = DecisionConfig::default();
        config.structure_weights.market_structure = Decimal::ZERO;
        let mut bullish = input(&eurusd, &empty, vec![]);
        bullish.market_structure = MarketStructure::Bullish;
        let decision = DecisionEngine::new(config).decide(&bullish);
        assert_eq!(decision.verdict, Verdict::Hold);
        assert!(decision.reasoning.is_empty());
    }

    #[test]
    fn test_signal_stats() {
        let eurusd = Instrument::new("EUR/USD").unwrap();
        let empty = IndicatorResult::default();
        let engine = DecisionEngine::new(DecisionConfig::default());
        let hold = engine.decide(&input(&eurusd, &empty, vec![]));

        let mut stats = SignalStats::default();
        stats.record_decision(&hold);
        let mut buy = hold.clone();
        buy.verdict = Verdict::Buy;
        buy.confidence = dec!(0.8);
        stats.record_decision(&buy);

        assert_eq!(stats.total_decisions, 2);
        assert_eq!(stats.buy_signals, 1);
        assert_eq!(stats.hold_signals, 1);
        assert_eq!(stats.avg_confidence, dec!(0.4));
    }
}
