use std::sync::Arc;

use railrm_core::{
    booking_curve::{BookingCurves, BookingProfile, PickupCurve, BIMODAL_LATE_DAYS},
    config::{BookingArchetype, QuotaConfig, RmConfig},
};

#[test]
fn general_curve_boundaries() {
    let curve = PickupCurve::general(120);
    assert_eq!(curve.fraction(120), 0.0, "nothing booked when the window opens");
    assert_eq!(curve.fraction(0), 1.0, "everything booked by departure");
    assert_eq!(curve.fraction(200), 0.0, "days before opening have booked nothing");
}

#[test]
fn general_curve_accelerates_towards_departure() {
    let curve = PickupCurve::general(120);
    for day in 1..=120 {
        assert!(curve.fraction(day - 1) >= curve.fraction(day));
    }
    assert!(
        curve.daily_share(1) > curve.daily_share(119),
        "late days carry more bookings than early days"
    );
}

#[test]
fn bimodal_curve_is_half_booked_between_peaks() {
    let curve = PickupCurve::bimodal(120);
    assert_eq!(curve.fraction(BIMODAL_LATE_DAYS), 0.5);
    assert_eq!(curve.fraction(90), 0.5);
    assert_eq!(curve.fraction(60), 0.5);
    assert_eq!(curve.daily_share(60), 0.0, "no bookings in the quiet middle");
    assert_eq!(curve.fraction(120), 0.0);
    assert_eq!(curve.fraction(0), 1.0);
}

#[test]
fn daily_shares_sum_to_one() {
    for curve in [PickupCurve::general(120), PickupCurve::bimodal(120)] {
        let total: f64 = (1..=curve.window()).map(|d| curve.daily_share(d)).sum();
        assert!((total - 1.0).abs() < 1e-9, "shares summed to {total}");
    }
}

#[test]
fn last_minute_quota_is_a_single_spike() {
    let curves = BookingCurves::build(&RmConfig::reference());
    let tq = curves.profile("TQ").expect("TQ profile");
    assert!(matches!(tq, BookingProfile::Spike { open_day: 1 }));
    assert_eq!(tq.expected_arrivals(1, 20.0), 20.0);
    assert_eq!(tq.expected_arrivals(2, 20.0), 0.0);
}

#[test]
fn curve_profiles_scale_total_demand() {
    let curves = BookingCurves::build(&RmConfig::reference());
    let gn = curves.profile("GN").expect("GN profile");
    let total: f64 = (1..=120).map(|d| gn.expected_arrivals(d, 50.0)).sum();
    assert!((total - 50.0).abs() < 1e-6);
    assert!(curves.profile("XX").is_none());
}

#[test]
fn quotas_with_same_shape_share_one_curve() {
    let mut config = RmConfig::reference();
    config.quotas.push(QuotaConfig {
        code: "SS".into(),
        label: "Senior".into(),
        archetype: BookingArchetype::General,
        window_open: 120,
    });
    let curves = BookingCurves::build(&config);

    match (curves.profile("GN"), curves.profile("SS"), curves.profile("LD")) {
        (
            Some(BookingProfile::Curve(gn)),
            Some(BookingProfile::Curve(ss)),
            Some(BookingProfile::Curve(ld)),
        ) => {
            assert!(Arc::ptr_eq(gn, ss), "same archetype and window reuse the curve");
            assert!(!Arc::ptr_eq(gn, ld));
        }
        other => panic!("unexpected profiles: {other:?}"),
    }
}
