use serde::Serialize;

/// Everything that went into one reward, returned to the approving caller
/// alongside the final point value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardBreakdown {
    pub material_factor: f64,
    pub base: f64,
    pub size_bonus: f64,
    pub multiplier: f64,
    pub points: f64,
}

/// Per-kilogram factor for a packaging material. Unknown materials still earn
/// a small default so submissions with unrecognized packaging are not worth 0.
fn material_factor(material: &str) -> f64 {
    match material.to_ascii_lowercase().as_str() {
        "plastic" => 20.0,
        "cardboard" => 15.0,
        "glass" => 10.0,
        "metal" => 25.0,
        _ => 5.0,
    }
}

fn size_bonus(size: &str) -> f64 {
    match size.to_ascii_lowercase().as_str() {
        "small" => 2.0,
        "medium" => 5.0,
        "large" => 10.0,
        _ => 0.0,
    }
}

/// Loyalty multiplier over the user's approved-return count, counted
/// *including* the return being approved right now.
fn loyalty_multiplier(approved_count: i64) -> f64 {
    if approved_count > 20 {
        1.5
    } else if approved_count > 5 {
        1.2
    } else {
        1.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pure reward computation. Deterministic and side-effect-free; persisting
/// the result is the lifecycle engine's job.
pub fn compute(material: &str, size: &str, weight_kg: f64, approved_count: i64) -> RewardBreakdown {
    let factor = material_factor(material);
    let weight = if weight_kg.is_finite() && weight_kg >= 0.0 {
        weight_kg
    } else {
        0.0
    };
    let base = factor * weight;
    let bonus = size_bonus(size);
    let multiplier = loyalty_multiplier(approved_count);
    let points = round2((base + bonus) * multiplier);

    RewardBreakdown {
        material_factor: factor,
        base,
        size_bonus: bonus,
        multiplier,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Reference vectors ─────────────────────────────────────────────────────

    #[test]
    fn plastic_large_two_kilos_first_return() {
        // 20 × 2 = 40, +10 large bonus, ×1 multiplier
        assert_eq!(compute("plastic", "large", 2.0, 0).points, 50.0);
    }

    #[test]
    fn unknown_material_small_with_top_tier() {
        // (5 × 1 + 2) × 1.5 = 10.5
        assert_eq!(compute("unknown", "small", 1.0, 25).points, 10.5);
    }

    #[test]
    fn material_table_is_case_insensitive() {
        assert_eq!(compute("Plastic", "Large", 2.0, 0).points, 50.0);
        assert_eq!(compute("CARDBOARD", "medium", 1.0, 0).points, 20.0);
        assert_eq!(compute("Metal", "SMALL", 1.0, 0).points, 27.0);
        assert_eq!(compute("glass", "large", 1.0, 0).points, 20.0);
    }

    #[test]
    fn unrecognized_size_earns_no_bonus() {
        assert_eq!(compute("plastic", "gigantic", 1.0, 0).points, 20.0);
        assert_eq!(compute("plastic", "", 1.0, 0).points, 20.0);
    }

    // ── Multiplier tiers ──────────────────────────────────────────────────────

    #[test]
    fn multiplier_tier_boundaries() {
        assert_eq!(compute("glass", "", 1.0, 5).multiplier, 1.0);
        assert_eq!(compute("glass", "", 1.0, 6).multiplier, 1.2);
        assert_eq!(compute("glass", "", 1.0, 20).multiplier, 1.2);
        assert_eq!(compute("glass", "", 1.0, 21).multiplier, 1.5);
    }

    // ── Shape of the function ─────────────────────────────────────────────────

    #[test]
    fn monotone_in_weight() {
        let materials = ["plastic", "cardboard", "glass", "metal", "mystery"];
        for m in materials {
            let mut last = -1.0;
            for w in [0.0, 0.1, 0.5, 1.0, 2.5, 10.0, 100.0] {
                let points = compute(m, "medium", w, 3).points;
                assert!(
                    points >= last,
                    "{}: points dropped from {} to {} at weight {}",
                    m,
                    last,
                    points,
                    w
                );
                last = points;
            }
        }
    }

    #[test]
    fn invalid_weight_counts_as_zero() {
        assert_eq!(compute("plastic", "small", f64::NAN, 0).points, 2.0);
        assert_eq!(compute("plastic", "small", -3.0, 0).points, 2.0);
    }

    #[test]
    fn never_negative() {
        assert!(compute("", "", 0.0, 0).points >= 0.0);
    }

    #[test]
    fn rounds_half_up_to_two_decimals() {
        // 5 × 0.041 = 0.205 → 0.21 at two decimals
        assert_eq!(compute("mystery", "", 0.041, 0).points, 0.21);
        // 1.2 multiplier over fractional base: (5 × 0.1 + 2) × 1.2 = 3.0
        assert_eq!(compute("mystery", "small", 0.1, 6).points, 3.0);
    }

    #[test]
    fn breakdown_is_consistent() {
        let b = compute("metal", "large", 1.5, 10);
        assert_eq!(b.material_factor, 25.0);
        assert_eq!(b.base, 37.5);
        assert_eq!(b.size_bonus, 10.0);
        assert_eq!(b.multiplier, 1.2);
        assert_eq!(b.points, 57.0);
    }
}
