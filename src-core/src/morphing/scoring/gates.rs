// FICHIER : src-core/src/morphing/scoring/gates.rs

//! Fonctions de transfert bornées utilisées par le scorer.

/// Écart normalisé au-delà duquel une mesure ne correspond plus du tout.
pub const MATCH_CUTOFF: f32 = 1.5;

/// Interpolation d'Hermite 3t² - 2t³, t borné à [0, 1].
pub fn smoothstep(t: f32) -> f32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    t * t * (3.0 - 2.0 * t)
}

/// `(1 - (min(d, 1.5) / 1.5)²)²` : 1 pour un écart nul, 0 dès 1.5.
pub fn match_falloff(normalized_diff: f32) -> f32 {
    if !normalized_diff.is_finite() {
        return 0.0;
    }
    let r = normalized_diff.abs().min(MATCH_CUTOFF) / MATCH_CUTOFF;
    let inner = 1.0 - r * r;
    inner * inner
}

/// Multiplicateur dans `[floor, 1]`, lissé entre `low` et `high`.
/// Ne descend jamais sous `floor` : une branche faible atténue sans annuler.
pub fn soft_gate(score: f32, low: f32, high: f32, floor: f32) -> f32 {
    let floor = floor.clamp(0.0, 1.0);
    let t = if high > low {
        (score - low) / (high - low)
    } else if score >= high {
        1.0
    } else {
        0.0
    };
    floor + (1.0 - floor) * smoothstep(t)
}

/// Pénalité multiplicative linéaire par morceaux sur un attribut auxiliaire.
///
/// Aucun effet sous `tolerance` ; décroît linéairement jusqu'à `minimum`
/// sur `falloff` supplémentaires ; plafonnée à `minimum` au-delà.
pub fn linear_penalty(diff: f32, tolerance: f32, falloff: f32, minimum: f32) -> f32 {
    let diff = if diff.is_finite() { diff.abs() } else { f32::MAX };
    if diff <= tolerance {
        return 1.0;
    }
    if falloff <= 0.0 {
        return minimum;
    }
    let t = ((diff - tolerance) / falloff).min(1.0);
    1.0 - (1.0 - minimum) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_falloff_shape() {
        assert_eq!(match_falloff(0.0), 1.0);
        assert_eq!(match_falloff(1.5), 0.0);
        assert_eq!(match_falloff(4.0), 0.0);
        assert!((match_falloff(0.75) - 0.5625).abs() < 1e-6);
        assert!(match_falloff(0.3) > match_falloff(0.6));
        assert_eq!(match_falloff(f32::NAN), 0.0);
    }

    #[test]
    fn test_soft_gate_bounds_and_monotonicity() {
        let (low, high, floor) = (0.35, 0.75, 0.25);
        assert_eq!(soft_gate(0.0, low, high, floor), floor);
        assert_eq!(soft_gate(0.35, low, high, floor), floor);
        assert_eq!(soft_gate(0.75, low, high, floor), 1.0);
        assert_eq!(soft_gate(1.0, low, high, floor), 1.0);

        let mut prev = 0.0;
        for i in 0..=100 {
            let g = soft_gate(i as f32 / 100.0, low, high, floor);
            assert!(g >= floor && g <= 1.0);
            assert!(g >= prev);
            prev = g;
        }
        assert!((soft_gate(0.55, low, high, floor) - 0.625).abs() < 1e-5);
    }

    #[test]
    fn test_soft_gate_degenerate_thresholds() {
        assert_eq!(soft_gate(0.5, 0.6, 0.6, 0.2), 0.2);
        assert_eq!(soft_gate(0.7, 0.6, 0.6, 0.2), 1.0);
    }

    #[test]
    fn test_linear_penalty() {
        assert_eq!(linear_penalty(0.03, 0.05, 0.30, 0.7), 1.0);
        assert!((linear_penalty(0.20, 0.05, 0.30, 0.7) - 0.85).abs() < 1e-5);
        assert!((linear_penalty(0.90, 0.05, 0.30, 0.7) - 0.7).abs() < 1e-6);
        assert_eq!(linear_penalty(f32::NAN, 0.05, 0.30, 0.7), 0.7);
    }
}
