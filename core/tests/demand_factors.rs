use chrono::Weekday;
use railrm_core::{
    factors::{calculate_demand_factors, mean},
    unconstraining::HistoricalRecord,
};

fn rec(sold: u32, holiday: bool, dow: Weekday) -> HistoricalRecord {
    HistoricalRecord::new(1, 0, sold, holiday, dow, "GN")
}

#[test]
fn no_history_means_neutral_factors() {
    let f = calculate_demand_factors(&[]);
    assert_eq!(f.base_mu, 1.0);
    assert_eq!(f.factor_holiday, 1.0);
    assert_eq!(f.factor_weekend, 1.0);
}

#[test]
fn segment_means_drive_factors() {
    let records = vec![
        rec(10, false, Weekday::Wed),
        rec(20, false, Weekday::Tue),
        rec(30, true, Weekday::Mon),
        rec(18, false, Weekday::Fri),
    ];
    let f = calculate_demand_factors(&records);
    assert_eq!(f.base_mu, 15.0);
    assert!((f.factor_holiday - 2.0).abs() < 1e-12);
    assert!((f.factor_weekend - 1.2).abs() < 1e-12);
}

#[test]
fn empty_holiday_segment_defaults_to_one() {
    let records = vec![rec(10, false, Weekday::Wed), rec(14, false, Weekday::Sun)];
    let f = calculate_demand_factors(&records);
    assert_eq!(f.factor_holiday, 1.0, "no holiday data must not scale demand");
    assert!((f.factor_weekend - 1.4).abs() < 1e-12);
}

#[test]
fn holiday_weekends_count_as_holidays_only() {
    // A holiday Sunday belongs to the holiday segment, so the weekend
    // segment is empty here.
    let records = vec![rec(10, false, Weekday::Wed), rec(25, true, Weekday::Sun)];
    let f = calculate_demand_factors(&records);
    assert!((f.factor_holiday - 2.5).abs() < 1e-12);
    assert_eq!(f.factor_weekend, 1.0);
}

#[test]
fn missing_baseline_uses_overall_mean() {
    let records = vec![rec(20, true, Weekday::Fri), rec(10, false, Weekday::Fri)];
    let f = calculate_demand_factors(&records);
    assert_eq!(f.base_mu, 15.0);
    assert!(f.factor_holiday > 1.0);
    assert!(f.factor_weekend < 1.0);
}

#[test]
fn factors_stay_positive_for_zero_sales() {
    let records = vec![rec(10, false, Weekday::Wed), rec(0, true, Weekday::Wed)];
    let f = calculate_demand_factors(&records);
    assert!(f.factor_holiday > 0.0, "a zero ratio degrades to 1.0");
    assert_eq!(f.factor_holiday, 1.0);
}

#[test]
fn mean_of_nothing_is_none() {
    assert_eq!(mean(std::iter::empty()), None);
    assert_eq!(mean([1.0, 2.0, 6.0].into_iter()), Some(3.0));
}
