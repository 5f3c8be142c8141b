use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{GradeError, Result};
use crate::model::{Partials, ScoreBand, ScoreDistribution};

/// Weights of the usual / midterm / final partials, in hundredths.
const USUAL_WEIGHT: i64 = 30;
const MIDTERM_WEIGHT: i64 = 20;
const FINAL_WEIGHT: i64 = 50;

/// Lower bound of each GPA band (score) and the GPA it earns, both in
/// hundredths. Checked top-down; the first bound the total reaches wins.
const GPA_BANDS: [(i64, i64); 9] = [
    (9000, 400),
    (8500, 370),
    (8200, 330),
    (7800, 300),
    (7500, 270),
    (7200, 230),
    (6800, 200),
    (6400, 150),
    (6000, 100),
];

const PASS_MARK: i64 = 6000;

/// Half-up rounding to 2 fractional digits, with the scale pinned at 2.
pub fn round2(x: Decimal) -> Decimal {
    let mut r = x.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    r.rescale(2);
    r
}

pub fn from_hundredths(v: i64) -> Decimal {
    Decimal::new(v, 2)
}

/// Storage form of a 2-digit decimal. Values are rounded first.
pub fn to_hundredths(x: Decimal) -> Result<i64> {
    (round2(x) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| GradeError::BadParams(format!("decimal out of range: {}", x)))
}

/// A partial score must be present and lie in [0, 100]. The accepted value
/// is rounded to 2 fractional digits.
pub fn validate_score(field: &'static str, value: Option<Decimal>) -> Result<Decimal> {
    let Some(v) = value else {
        return Err(GradeError::InvalidScore { field, value: None });
    };
    if v < Decimal::ZERO || v > Decimal::ONE_HUNDRED {
        return Err(GradeError::InvalidScore {
            field,
            value: Some(v),
        });
    }
    Ok(round2(v))
}

pub fn validate_partials(
    usual: Option<Decimal>,
    midterm: Option<Decimal>,
    final_exam: Option<Decimal>,
) -> Result<Partials> {
    Ok(Partials {
        usual: validate_score("usualScore", usual)?,
        midterm: validate_score("midtermScore", midterm)?,
        final_exam: validate_score("finalScore", final_exam)?,
    })
}

/// Weighted total: usual 30%, midterm 20%, final 50%, rounded half-up.
pub fn total_of(
    usual: Option<Decimal>,
    midterm: Option<Decimal>,
    final_exam: Option<Decimal>,
) -> Result<Decimal> {
    let p = validate_partials(usual, midterm, final_exam)?;
    Ok(weighted_total(&p))
}

pub fn weighted_total(p: &Partials) -> Decimal {
    let sum = p.usual * Decimal::new(USUAL_WEIGHT, 2)
        + p.midterm * Decimal::new(MIDTERM_WEIGHT, 2)
        + p.final_exam * Decimal::new(FINAL_WEIGHT, 2);
    round2(sum)
}

/// Banded GPA for a total score. A missing total maps to 0.00.
pub fn gpa_of(total: Option<Decimal>) -> Decimal {
    let Some(total) = total else {
        return from_hundredths(0);
    };
    for (min_score, gpa) in GPA_BANDS {
        if total >= from_hundredths(min_score) {
            return from_hundredths(gpa);
        }
    }
    from_hundredths(0)
}

pub fn band_of(total: Decimal) -> ScoreBand {
    if total >= Decimal::new(90, 0) {
        ScoreBand::Excellent
    } else if total >= Decimal::new(80, 0) {
        ScoreBand::Good
    } else if total >= Decimal::new(70, 0) {
        ScoreBand::Medium
    } else if total >= from_hundredths(PASS_MARK) {
        ScoreBand::Pass
    } else {
        ScoreBand::Fail
    }
}

pub fn is_pass(total: Decimal) -> bool {
    total >= from_hundredths(PASS_MARK)
}

pub fn distribution<I>(totals: I) -> ScoreDistribution
where
    I: IntoIterator<Item = Decimal>,
{
    let mut d = ScoreDistribution::default();
    for t in totals {
        d.counts[band_of(t).index()] += 1;
    }
    d
}

/// Arithmetic mean rounded to 2 digits; `None` for an empty input.
pub fn mean<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let mut sum = Decimal::ZERO;
    let mut count: i64 = 0;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(round2(sum / Decimal::from(count)))
}

/// Mean of a SQL `SUM(...)` over hundredths columns.
pub fn mean_of_hundredths(sum: i64, count: i64) -> Option<Decimal> {
    if count <= 0 {
        return None;
    }
    Some(round2(from_hundredths(sum) / Decimal::from(count)))
}
