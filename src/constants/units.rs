// ABOUTME: Unit conversion constants and helpers for weight measurements
// ABOUTME: Provides kg/lb conversion with a fixed factor shared by all components
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

/// Pounds per kilogram conversion factor
pub const LB_PER_KG: f64 = 2.204_622_621_8;

/// Convert kilograms to pounds
#[must_use]
pub fn kg_to_lb(kg: f64) -> f64 {
    kg * LB_PER_KG
}

/// Convert pounds to kilograms
#[must_use]
pub fn lb_to_kg(lb: f64) -> f64 {
    lb / LB_PER_KG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_within_tolerance() {
        // Round-trip must stay within 0.1 kg
        for kg in [0.0, 2.5, 60.0, 102.5, 300.0] {
            let back = lb_to_kg(kg_to_lb(kg));
            assert!((back - kg).abs() <= 0.1, "round trip drifted for {kg}");
        }
    }

    #[test]
    fn test_known_conversion() {
        assert!((kg_to_lb(100.0) - 220.462_262_18).abs() < 1e-6);
    }
}
