//! Trend strength and channel indicators

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use types::Bar;

use super::moving_average::mean;
use super::IndicatorOutput;

const HUNDRED: Decimal = dec!(100);

/// Average Directional Index with simple means
///
/// Directional movement and true range are averaged over `period` bars to
/// give +DI/-DI, and ADX is the mean of the last `period` DX readings. Needs
/// `2 * period + 1` bars.
pub fn adx(bars: &[Bar], period: usize) -> Option<IndicatorOutput> {
    if period == 0 || bars.len() < 2 * period + 1 {
        return None;
    }
    let window = &bars[bars.len() - (2 * period + 1)..];

    let mut plus_dm = Vec::with_capacity(window.len() - 1);
    let mut minus_dm = Vec::with_capacity(window.len() - 1);
    let mut true_range = Vec::with_capacity(window.len() - 1);
    for pair in window.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);
        let up = bar.high - prev.high;
        let down = prev.low - bar.low;
        plus_dm.push(if up > down && up > Decimal::ZERO { up } else { Decimal::ZERO });
        minus_dm.push(if down > up && down > Decimal::ZERO { down } else { Decimal::ZERO });
        true_range.push(bar.true_range(Some(prev.close)));
    }

    let mut readings = Vec::with_capacity(plus_dm.len() + 1 - period);
    for end in period..=plus_dm.len() {
        let start = end - period;
        readings.push(directional_index(
            &plus_dm[start..end],
            &minus_dm[start..end],
            &true_range[start..end],
        )?);
    }

    let last = *readings.last()?;
    let dx: Vec<Decimal> = readings[readings.len() - period..]
        .iter()
        .map(|r| r.dx)
        .collect();
    Some(IndicatorOutput::Directional {
        adx: mean(&dx)?,
        plus_di: last.plus_di,
        minus_di: last.minus_di,
    })
}

#[derive(Debug, Clone, Copy)]
struct DirectionalReading {
    plus_di: Decimal,
    minus_di: Decimal,
    dx: Decimal,
}

fn directional_index(
    plus_dm: &[Decimal],
    minus_dm: &[Decimal],
    true_range: &[Decimal],
) -> Option<DirectionalReading> {
    let atr = mean(true_range)?;
    if atr.is_zero() {
        return Some(DirectionalReading {
            plus_di: Decimal::ZERO,
            minus_di: Decimal::ZERO,
            dx: Decimal::ZERO,
        });
    }
    let plus_di = mean(plus_dm)? / atr * HUNDRED;
    let minus_di = mean(minus_dm)? / atr * HUNDRED;
    let di_sum = plus_di + minus_di;
    let dx = if di_sum.is_zero() {
        Decimal::ZERO
    } else {
        (plus_di - minus_di).abs() / di_sum * HUNDRED
    };
    Some(DirectionalReading {
        plus_di,
        minus_di,
        dx,
    })
}

/// Donchian channel: highest high, lowest low and their midpoint
pub fn donchian(bars: &[Bar], period: usize) -> Option<IndicatorOutput> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    let upper = window.iter().map(|b| b.high).max()?;
    let lower = window.iter().map(|b| b.low).min()?;
    Some(IndicatorOutput::Bands {
        upper,
        middle: (upper + lower) / Decimal::TWO,
        lower,
    })
}
