use crate::models::{AsnSignals, PenaltyDetail, ScoreBreakdown, Severity};

/// Temporal behavior metrics computed from the event store, independent
/// of the static signals snapshot. Field names match
/// `_calculate_temporal_metrics` in the original scorer one-to-one.
#[derive(Debug, Clone, Default)]
pub struct TemporalMetrics {
    pub upstream_churn_90d: u64,
    pub recent_withdrawals: u64,
    pub current_prefix_count: u64,
    pub recent_threat_count: u64,
    pub avg_upstream_score: f64,
    pub is_predictive_unstable: bool,
}

/// Pure function: signals + temporal metrics in, final clamped score +
/// breakdown + human-readable penalty list + risk level out. No I/O, so
/// every rule in spec.md §4.5 is directly unit-testable.
pub fn apply_scoring_rules(s: &AsnSignals, t: &TemporalMetrics) -> (i32, ScoreBreakdown, Vec<PenaltyDetail>, String) {
    let mut score: i32 = 100;
    let mut breakdown = ScoreBreakdown::default();
    let mut details = Vec::new();

    // --- Category A: routing hygiene ---
    if s.rpki_invalid_percent > 1.0 {
        let penalty = 20;
        score -= penalty;
        breakdown.hygiene -= penalty;
        details.push(PenaltyDetail {
            code: "RPKI_INVALID".into(),
            severity: Severity::High,
            description: format!("{:.1}% of routes have INVALID RPKI status", s.rpki_invalid_percent),
            action: "Review ROA configuration for advertised prefixes.".into(),
        });
    }

    if s.rpki_unknown_percent > 50.0 {
        details.push(PenaltyDetail {
            code: "RPKI_UNKNOWN".into(),
            severity: Severity::Medium,
            description: format!("{:.1}% routes have NO ROA (Unknown)", s.rpki_unknown_percent),
            action: "Create ROAs to protect your prefixes from hijacking.".into(),
        });
    }

    if s.has_route_leaks {
        let penalty = 20;
        score -= penalty;
        breakdown.hygiene -= penalty;
        details.push(PenaltyDetail {
            code: "ROUTE_LEAK".into(),
            severity: Severity::High,
            description: "Valley-free violation detected".into(),
            action: "Investigate BGP filters for accidental transit leakage.".into(),
        });
    }

    if s.has_bogon_ads {
        let penalty = 10;
        score -= penalty;
        breakdown.hygiene -= penalty;
        details.push(PenaltyDetail {
            code: "BOGON_AD".into(),
            severity: Severity::Medium,
            description: "Advertising bogon/reserved prefixes".into(),
            action: "Filter private/reserved ranges from EBGP sessions.".into(),
        });
    }

    if s.prefix_granularity_score > 50 {
        let penalty = 10;
        score -= penalty;
        breakdown.hygiene -= penalty;
        details.push(PenaltyDetail {
            code: "PREFIX_FRAGMENTATION".into(),
            severity: Severity::Medium,
            description: "High Prefix Fragmentation".into(),
            action: "Aggregate advertised prefixes where possible.".into(),
        });
    }

    if s.is_stub_but_transit {
        details.push(PenaltyDetail {
            code: "STUB_TRANSIT".into(),
            severity: Severity::Medium,
            description: "Stub ASN acting as transit".into(),
            action: "Verify if you are unintentionally providing transit to peers.".into(),
        });
    }

    // --- Category B: threat intel ---
    if s.spamhaus_listed {
        let penalty = 30;
        score -= penalty;
        breakdown.threat -= penalty;
        details.push(PenaltyDetail {
            code: "THREAT_SPAMHAUS".into(),
            severity: Severity::Critical,
            description: "Listed on Spamhaus DROP/EDROP".into(),
            action: "Immediate removal required. Contact Spamhaus.".into(),
        });
    }

    if s.botnet_c2_count > 0 {
        let penalty = (s.botnet_c2_count * 20).min(40);
        score -= penalty;
        breakdown.threat -= penalty;
        details.push(PenaltyDetail {
            code: "THREAT_BOTNET".into(),
            severity: Severity::Critical,
            description: format!("Hosting {} Botnet C2 servers", s.botnet_c2_count),
            action: "Identify and terminate C2 infrastructure immediately.".into(),
        });
    }

    if s.spam_emission_rate > 0.1 {
        let penalty = 15;
        score -= penalty;
        breakdown.threat -= penalty;
        details.push(PenaltyDetail {
            code: "THREAT_SPAM".into(),
            severity: Severity::High,
            description: format!("High spam emission rate ({:.3})", s.spam_emission_rate),
            action: "Audit customer networks for compromised hosts.".into(),
        });
    }

    if s.phishing_hosting_count > 0 {
        details.push(PenaltyDetail {
            code: "THREAT_PHISHING".into(),
            severity: Severity::High,
            description: format!("Hosting {} phishing domains", s.phishing_hosting_count),
            action: "Take down reported phishing sites.".into(),
        });
    }

    if s.malware_distribution_count > 0 {
        details.push(PenaltyDetail {
            code: "THREAT_MALWARE".into(),
            severity: Severity::Critical,
            description: format!("Hosting {} malware distribution points", s.malware_distribution_count),
            action: "Isolate infected hosts and remediate.".into(),
        });
    }

    if t.recent_threat_count > 5 {
        let penalty = 10;
        score -= penalty;
        breakdown.threat -= penalty;
        details.push(PenaltyDetail {
            code: "THREAT_RECIDIVISM".into(),
            severity: Severity::Medium,
            description: "Persistent Threat Activity (Recidivism)".into(),
            action: "Review long-running abuse reports for this network.".into(),
        });
    }

    // --- Category C: stability & identity ---
    if t.upstream_churn_90d > 2 {
        let penalty = 25;
        score -= penalty;
        breakdown.stability -= penalty;
        details.push(PenaltyDetail {
            code: "UPSTREAM_CHURN".into(),
            severity: Severity::High,
            description: format!("High Upstream Churn ({} providers in 90d)", t.upstream_churn_90d),
            action: "Investigate frequent transit-provider changes.".into(),
        });
    }

    if t.is_predictive_unstable {
        let penalty = 15;
        score -= penalty;
        breakdown.stability -= penalty;
        details.push(PenaltyDetail {
            code: "PREDICTIVE_INSTABILITY".into(),
            severity: Severity::Medium,
            description: "Predictive model: high probability of instability".into(),
            action: "Monitor this ASN for imminent route flapping.".into(),
        });
    }

    if t.recent_withdrawals > 100 {
        let penalty = 5;
        score -= penalty;
        breakdown.stability -= penalty;
        details.push(PenaltyDetail {
            code: "ROUTE_FLAPPING".into(),
            severity: Severity::Low,
            description: "Significant Route Flapping".into(),
            action: "Dampen unstable routes at the source.".into(),
        });
    }

    if s.has_peeringdb_profile {
        let bonus = 5;
        score += bonus;
        breakdown.stability += bonus;
    }

    if s.upstream_tier1_count > 1 {
        let bonus = 5;
        score += bonus;
        breakdown.stability += bonus;
    }

    // --- Category D: connectivity risk ---
    if t.avg_upstream_score < 50.0 {
        let penalty = 15;
        score -= penalty;
        breakdown.stability -= penalty;
        details.push(PenaltyDetail {
            code: "BAD_NEIGHBORHOOD".into(),
            severity: Severity::High,
            description: format!("Bad Neighborhood (Avg Upstream Score: {})", t.avg_upstream_score as i32),
            action: "Reconsider upstream transit relationships.".into(),
        });
    } else if t.avg_upstream_score < 70.0 {
        let penalty = 5;
        score -= penalty;
        details.push(PenaltyDetail {
            code: "SUSPICIOUS_UPSTREAMS".into(),
            severity: Severity::Low,
            description: "Suspicious Upstreams".into(),
            action: "Review upstream transit reputations.".into(),
        });
    }

    // Metadata warnings (no score impact, informational only, matching
    // the API's separate `generate_penalty_details`)
    if s.is_whois_private {
        details.push(PenaltyDetail {
            code: "META_PRIVATE".into(),
            severity: Severity::Low,
            description: "WHOIS information is private".into(),
            action: "Update RIR records with valid contact info.".into(),
        });
    }
    if !s.has_peeringdb_profile {
        details.push(PenaltyDetail {
            code: "META_NO_PDB".into(),
            severity: Severity::Low,
            description: "No PeeringDB profile".into(),
            action: "Create a PeeringDB profile to improve visibility/trust.".into(),
        });
    }
    if s.upstream_tier1_count == 0 {
        details.push(PenaltyDetail {
            code: "META_NO_TIER1".into(),
            severity: Severity::Medium,
            description: "No direct Tier-1 upstream".into(),
            action: "Consider acquiring transit from a Tier-1 provider for better reachability/trust.".into(),
        });
    }

    let final_score = score.clamp(0, 100);
    let risk_level = if final_score >= 90 {
        "LOW"
    } else if final_score >= 70 {
        "MEDIUM"
    } else if final_score >= 50 {
        "HIGH"
    } else {
        "CRITICAL"
    };

    (final_score, breakdown, details, risk_level.to_string())
}

/// Fixed signals-only mapping used by the score card's `details` field
/// (spec.md §4.6). Deliberately independent of `TemporalMetrics` — unlike
/// `apply_scoring_rules`, this never reports churn/flapping/neighborhood
/// codes, matching `generate_penalty_details` in the original API service.
pub fn generate_penalty_details(s: &AsnSignals) -> Vec<PenaltyDetail> {
    let mut details = Vec::new();

    if s.rpki_invalid_percent > 1.0 {
        details.push(PenaltyDetail {
            code: "RPKI_INVALID".into(),
            severity: Severity::High,
            description: format!("{:.1}% of routes have INVALID RPKI status", s.rpki_invalid_percent),
            action: "Review ROA configuration for advertised prefixes.".into(),
        });
    }

    if s.rpki_unknown_percent > 50.0 {
        details.push(PenaltyDetail {
            code: "RPKI_UNKNOWN".into(),
            severity: Severity::Medium,
            description: format!("{:.1}% routes have NO ROA (Unknown)", s.rpki_unknown_percent),
            action: "Create ROAs to protect your prefixes from hijacking.".into(),
        });
    }

    if s.has_route_leaks {
        details.push(PenaltyDetail {
            code: "ROUTE_LEAK".into(),
            severity: Severity::High,
            description: "Valley-free violation detected".into(),
            action: "Investigate BGP filters for accidental transit leakage.".into(),
        });
    }

    if s.has_bogon_ads {
        details.push(PenaltyDetail {
            code: "BOGON_AD".into(),
            severity: Severity::Medium,
            description: "Advertising bogon/reserved prefixes".into(),
            action: "Filter private/reserved ranges from EBGP sessions.".into(),
        });
    }

    if s.is_stub_but_transit {
        details.push(PenaltyDetail {
            code: "STUB_TRANSIT".into(),
            severity: Severity::Medium,
            description: "Stub ASN acting as transit".into(),
            action: "Verify if you are unintentionally providing transit to peers.".into(),
        });
    }

    if s.spamhaus_listed {
        details.push(PenaltyDetail {
            code: "THREAT_SPAMHAUS".into(),
            severity: Severity::Critical,
            description: "Listed on Spamhaus DROP/EDROP".into(),
            action: "Immediate removal required. Contact Spamhaus.".into(),
        });
    }

    if s.spam_emission_rate > 0.1 {
        details.push(PenaltyDetail {
            code: "THREAT_SPAM".into(),
            severity: Severity::High,
            description: format!("High spam emission rate ({:.3})", s.spam_emission_rate),
            action: "Audit customer networks for compromised hosts.".into(),
        });
    }

    if s.botnet_c2_count > 0 {
        details.push(PenaltyDetail {
            code: "THREAT_BOTNET".into(),
            severity: Severity::Critical,
            description: format!("Hosting {} Botnet C2 servers", s.botnet_c2_count),
            action: "Identify and terminate C2 infrastructure immediately.".into(),
        });
    }

    if s.phishing_hosting_count > 0 {
        details.push(PenaltyDetail {
            code: "THREAT_PHISHING".into(),
            severity: Severity::High,
            description: format!("Hosting {} phishing domains", s.phishing_hosting_count),
            action: "Take down reported phishing sites.".into(),
        });
    }

    if s.malware_distribution_count > 0 {
        details.push(PenaltyDetail {
            code: "THREAT_MALWARE".into(),
            severity: Severity::Critical,
            description: format!("Hosting {} malware distribution points", s.malware_distribution_count),
            action: "Isolate infected hosts and remediate.".into(),
        });
    }

    if s.is_whois_private {
        details.push(PenaltyDetail {
            code: "META_PRIVATE".into(),
            severity: Severity::Low,
            description: "WHOIS information is private".into(),
            action: "Update RIR records with valid contact info.".into(),
        });
    }

    if !s.has_peeringdb_profile {
        details.push(PenaltyDetail {
            code: "META_NO_PDB".into(),
            severity: Severity::Low,
            description: "No PeeringDB profile".into(),
            action: "Create a PeeringDB profile to improve visibility/trust.".into(),
        });
    }

    if s.upstream_tier1_count == 0 {
        details.push(PenaltyDetail {
            code: "META_NO_TIER1".into(),
            severity: Severity::Medium,
            description: "No direct Tier-1 upstream".into(),
            action: "Consider acquiring transit from a Tier-1 provider for better reachability/trust.".into(),
        });
    }

    details
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_slate_scores_perfect_low_risk() {
        let s = AsnSignals::new_default(64512);
        let t = TemporalMetrics { avg_upstream_score: 100.0, ..Default::default() };
        let (score, breakdown, details, level) = apply_scoring_rules(&s, &t);
        assert_eq!(score, 100);
        assert_eq!(breakdown.hygiene, 0);
        assert_eq!(breakdown.threat, 0);
        // clean slate has upstream_tier1_count=1, which is not > 1, so only
        // the +5 peeringdb bonus applies (spec.md Scenario 1).
        assert_eq!(breakdown.stability, 5);
        assert!(details.is_empty());
        assert_eq!(level, "LOW");
    }

    #[test]
    fn spamhaus_listing_drops_to_medium() {
        let mut s = AsnSignals::new_default(666);
        s.spamhaus_listed = true;
        let t = TemporalMetrics { avg_upstream_score: 100.0, ..Default::default() };
        let (score, breakdown, _, level) = apply_scoring_rules(&s, &t);
        assert_eq!(score, 75);
        assert_eq!(breakdown.threat, -30);
        assert_eq!(level, "MEDIUM");
    }

    #[test]
    fn botnet_penalty_caps_at_forty() {
        let mut s = AsnSignals::new_default(666);
        s.botnet_c2_count = 10;
        let t = TemporalMetrics { avg_upstream_score: 100.0, ..Default::default() };
        let (_, breakdown, _, _) = apply_scoring_rules(&s, &t);
        assert_eq!(breakdown.threat, -40);
    }

    #[test]
    fn score_never_drops_below_zero() {
        let mut s = AsnSignals::new_default(666);
        s.rpki_invalid_percent = 5.0;
        s.has_route_leaks = true;
        s.has_bogon_ads = true;
        s.prefix_granularity_score = 99;
        s.spamhaus_listed = true;
        s.botnet_c2_count = 5;
        s.spam_emission_rate = 1.0;
        s.has_peeringdb_profile = false;
        let t = TemporalMetrics {
            upstream_churn_90d: 10,
            recent_withdrawals: 1000,
            recent_threat_count: 100,
            avg_upstream_score: 10.0,
            is_predictive_unstable: true,
            ..Default::default()
        };
        let (score, _, _, level) = apply_scoring_rules(&s, &t);
        assert_eq!(score, 0);
        assert_eq!(level, "CRITICAL");
    }

    #[test]
    fn bad_neighborhood_and_suspicious_upstream_are_mutually_exclusive() {
        let s = AsnSignals::new_default(1);
        let t_bad = TemporalMetrics { avg_upstream_score: 40.0, ..Default::default() };
        let (_, breakdown_bad, details_bad, _) = apply_scoring_rules(&s, &t_bad);
        assert_eq!(breakdown_bad.stability, 5 - 15);
        assert!(details_bad.iter().any(|d| d.code == "BAD_NEIGHBORHOOD"));

        let t_suspicious = TemporalMetrics { avg_upstream_score: 65.0, ..Default::default() };
        let (_, breakdown_susp, details_susp, _) = apply_scoring_rules(&s, &t_suspicious);
        assert_eq!(breakdown_susp.stability, 5);
        assert!(details_susp.iter().any(|d| d.code == "SUSPICIOUS_UPSTREAMS"));
    }

    #[test]
    fn penalty_details_are_signals_only_and_ignore_temporal_state() {
        let s = AsnSignals::new_default(1);
        // clean slate -> no signal-threshold detail fires
        assert!(generate_penalty_details(&s).is_empty());

        let mut s = AsnSignals::new_default(2);
        s.spamhaus_listed = true;
        s.upstream_tier1_count = 0;
        let details = generate_penalty_details(&s);
        assert!(details.iter().any(|d| d.code == "THREAT_SPAMHAUS"));
        assert!(details.iter().any(|d| d.code == "META_NO_TIER1"));
        // no temporal codes exist, regardless of how bad upstream churn/
        // neighborhood scores might be for this ASN
        assert!(!details.iter().any(|d| d.code == "BAD_NEIGHBORHOOD"));
        assert!(!details.iter().any(|d| d.code == "UPSTREAM_CHURN"));
        assert!(!details.iter().any(|d| d.code == "ROUTE_FLAPPING"));
    }
}
