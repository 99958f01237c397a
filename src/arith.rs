//! Arithmetic problem generation.
//!
//! Each difficulty stage maps to an immutable `DifficultyProfile`; `generate`
//! draws a problem from it. Every problem has an exact integer answer by
//! construction: subtraction never goes negative unless the profile allows
//! it, and division builds the dividend from a chosen quotient and divisor.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::DrillError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '×',
            Operator::Div => '÷',
        }
    }
}

/// Operand range and operator variety for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyProfile {
    pub min_operand: i64,
    pub max_operand: i64,
    pub operators: Vec<Operator>,
    pub allow_negative: bool,
}

/// Operand ceiling for stages beyond the hand-tuned table.
const MAX_OPERAND_CEILING: i64 = 999;

impl DifficultyProfile {
    /// Pure function of the stage index.
    pub fn for_stage(stage: u32) -> Self {
        use Operator::*;
        match stage {
            0 => DifficultyProfile {
                min_operand: 1,
                max_operand: 9,
                operators: vec![Add],
                allow_negative: false,
            },
            1 => DifficultyProfile {
                min_operand: 1,
                max_operand: 20,
                operators: vec![Add, Sub],
                allow_negative: false,
            },
            2 => DifficultyProfile {
                min_operand: 2,
                max_operand: 20,
                operators: vec![Add, Sub, Mul],
                allow_negative: false,
            },
            3 => DifficultyProfile {
                min_operand: 2,
                max_operand: 50,
                operators: vec![Add, Sub, Mul, Div],
                allow_negative: false,
            },
            n => DifficultyProfile {
                min_operand: 2,
                max_operand: (50 + 25 * (n as i64 - 3)).min(MAX_OPERAND_CEILING),
                operators: vec![Add, Sub, Mul, Div],
                allow_negative: n >= 5,
            },
        }
    }
}

/// One drill question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub a: i64,
    pub b: i64,
    pub op: Operator,
    pub answer: i64,
}

impl Problem {
    /// Display form, e.g. `"12 ÷ 4"`.
    pub fn prompt(&self) -> String {
        format!("{} {} {}", self.a, self.op.symbol(), self.b)
    }

    /// Parse a submitted answer and compare it. Empty or non-numeric input
    /// is rejected without judging it right or wrong.
    pub fn check(&self, input: &str) -> Result<bool, DrillError> {
        let trimmed = input.trim();
        let value: i64 = trimmed.parse().map_err(|_| DrillError::InvalidAnswer {
            input: input.to_string(),
        })?;
        Ok(value == self.answer)
    }
}

/// Draw a problem from `profile`.
pub fn generate<R: Rng + ?Sized>(profile: &DifficultyProfile, rng: &mut R) -> Problem {
    let lo = profile.min_operand.min(profile.max_operand);
    let hi = profile.max_operand.max(profile.min_operand);
    let op = profile
        .operators
        .choose(rng)
        .copied()
        .unwrap_or(Operator::Add);

    match op {
        Operator::Add => {
            let a = rng.gen_range(lo..=hi);
            let b = rng.gen_range(lo..=hi);
            Problem { a, b, op, answer: a + b }
        }
        Operator::Sub => {
            let mut a = rng.gen_range(lo..=hi);
            let mut b = rng.gen_range(lo..=hi);
            if a < b && !profile.allow_negative {
                std::mem::swap(&mut a, &mut b);
            }
            Problem { a, b, op, answer: a - b }
        }
        Operator::Mul => {
            let a = rng.gen_range(lo..=hi);
            let b = rng.gen_range(lo..=hi);
            Problem { a, b, op, answer: a * b }
        }
        Operator::Div => {
            // Divisor is never zero, even if the range includes it.
            let divisor_lo = lo.max(1);
            let divisor_hi = hi.max(divisor_lo);
            let b = rng.gen_range(divisor_lo..=divisor_hi);
            // The dividend stays within the operand range.
            let quotient_hi = (hi / b).max(0);
            let answer = rng.gen_range(lo.clamp(0, quotient_hi)..=quotient_hi);
            Problem {
                a: b * answer,
                b,
                op,
                answer,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn only(op: Operator, lo: i64, hi: i64, allow_negative: bool) -> DifficultyProfile {
        DifficultyProfile {
            min_operand: lo,
            max_operand: hi,
            operators: vec![op],
            allow_negative,
        }
    }

    #[test]
    fn stage_zero_is_single_digit_addition() {
        let p = DifficultyProfile::for_stage(0);
        assert_eq!(p.operators, vec![Operator::Add]);
        assert_eq!((p.min_operand, p.max_operand), (1, 9));
        assert!(!p.allow_negative);
    }

    #[test]
    fn later_stages_widen_and_cap() {
        let p4 = DifficultyProfile::for_stage(4);
        let p5 = DifficultyProfile::for_stage(5);
        assert!(p5.max_operand > p4.max_operand);
        assert!(p5.allow_negative);
        assert_eq!(DifficultyProfile::for_stage(500).max_operand, MAX_OPERAND_CEILING);
    }

    #[test]
    fn division_is_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        let profile = only(Operator::Div, 0, 30, false);
        for _ in 0..2000 {
            let p = generate(&profile, &mut rng);
            assert_ne!(p.b, 0);
            assert_eq!(p.a, p.b * p.answer, "{p:?}");
        }
    }

    #[test]
    fn dividend_stays_within_operand_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let profile = DifficultyProfile::for_stage(3);
        let mut divisions = 0;
        for _ in 0..4000 {
            let p = generate(&profile, &mut rng);
            if p.op != Operator::Div {
                continue;
            }
            divisions += 1;
            assert!(p.a <= profile.max_operand, "{p:?}");
            assert!(p.b >= profile.min_operand, "{p:?}");
            assert!(p.answer >= 1, "{p:?}");
        }
        assert!(divisions > 0);
    }

    #[test]
    fn subtraction_never_negative_when_disallowed() {
        let mut rng = StdRng::seed_from_u64(11);
        let profile = only(Operator::Sub, 1, 20, false);
        for _ in 0..2000 {
            let p = generate(&profile, &mut rng);
            assert!(p.answer >= 0, "{p:?}");
            assert_eq!(p.answer, p.a - p.b);
        }
    }

    #[test]
    fn subtraction_may_go_negative_when_allowed() {
        let mut rng = StdRng::seed_from_u64(3);
        let profile = only(Operator::Sub, 1, 20, true);
        let any_negative = (0..500).any(|_| generate(&profile, &mut rng).answer < 0);
        assert!(any_negative);
    }

    #[test]
    fn operands_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(99);
        let profile = DifficultyProfile::for_stage(2);
        for _ in 0..2000 {
            let p = generate(&profile, &mut rng);
            assert!(profile.operators.contains(&p.op));
            assert!((2..=20).contains(&p.a) && (2..=20).contains(&p.b), "{p:?}");
        }
    }

    #[test]
    fn check_parses_and_compares() {
        let p = Problem {
            a: 3,
            b: 4,
            op: Operator::Add,
            answer: 7,
        };
        assert!(p.check(" 7 ").unwrap());
        assert!(!p.check("8").unwrap());
        assert!(matches!(p.check(""), Err(DrillError::InvalidAnswer { .. })));
        assert!(matches!(p.check("seven"), Err(DrillError::InvalidAnswer { .. })));
        assert_eq!(p.prompt(), "3 + 4");
    }
}
