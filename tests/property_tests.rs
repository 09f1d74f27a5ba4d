//! Property-based tests for distributions and fitted baselines.

use chrono::{TimeZone, Utc};
use fable_forecast::prelude::*;
use proptest::prelude::*;

fn make_ts(values: Vec<f64>) -> TimeSeries {
    let start = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
    TimeSeries::regular(start, Interval::months(1), values).unwrap()
}

/// Positive values with a small drift so the series is never constant.
fn values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..500.0_f64, min_len..max_len).prop_map(|mut v| {
        for (i, val) in v.iter_mut().enumerate() {
            *val += i as f64 * 0.01;
        }
        v
    })
}

proptest! {
    #[test]
    fn wider_levels_nest_narrower_ones(
        mean in -100.0..100.0_f64,
        sd in 0.01..50.0_f64,
    ) {
        let dist = Distribution::normal(mean, sd).unwrap();
        let hilo = dist.hilo(&[50.0, 80.0, 95.0]).unwrap();
        prop_assert!(hilo[0].lower >= hilo[1].lower && hilo[1].lower >= hilo[2].lower);
        prop_assert!(hilo[0].upper <= hilo[1].upper && hilo[1].upper <= hilo[2].upper);
        prop_assert!(hilo[0].contains(mean));
    }

    #[test]
    fn sample_quantiles_are_monotone(draws in prop::collection::vec(-1e3..1e3_f64, 2..200)) {
        let dist = Distribution::sample(draws).unwrap();
        let qs: Vec<f64> = [0.05, 0.25, 0.5, 0.75, 0.95].iter().map(|p| dist.quantile(*p)).collect();
        prop_assert!(qs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn naive_forecast_repeats_last_value(values in values_strategy(5, 60), h in 1usize..24) {
        let last = *values.last().unwrap();
        let model = FittedModel::fit(&ModelSpec::Naive(NaiveSpec::default()), &make_ts(values)).unwrap();
        let dists = model.forecast(Horizon::Steps(h), &ForecastOptions::default()).unwrap();
        prop_assert_eq!(dists.len(), h);
        for (k, d) in dists.iter().enumerate() {
            prop_assert!((d.mean() - last).abs() < 1e-9);
            if k > 0 {
                prop_assert!(d.variance() >= dists[k - 1].variance());
            }
        }
    }

    #[test]
    fn interpolation_fills_only_gaps(
        values in values_strategy(6, 40),
        gaps in prop::collection::vec(any::<bool>(), 40),
    ) {
        let mut holey = values.clone();
        for (v, gap) in holey.iter_mut().zip(&gaps).skip(2) {
            if *gap {
                *v = f64::NAN;
            }
        }
        let model = FittedModel::fit(&ModelSpec::Mean(MeanSpec), &make_ts(holey.clone())).unwrap();
        let filled = model.interpolate().unwrap();
        prop_assert_eq!(filled.len(), holey.len());
        for (orig, new) in holey.iter().zip(filled.values()) {
            prop_assert!(new.is_finite());
            if !orig.is_nan() {
                prop_assert_eq!(orig, new);
            }
        }
    }

    #[test]
    fn state_space_models_fill_every_gap(
        values in values_strategy(20, 60),
        gaps in prop::collection::vec(prop::bool::weighted(0.2), 60),
    ) {
        let mut holey = values.clone();
        for (v, gap) in holey.iter_mut().zip(&gaps) {
            if *gap {
                *v = f64::NAN;
            }
        }
        let series = make_ts(holey.clone());
        let specs = [
            ModelSpec::Arima(ArimaSpec::default().with_order(0, 1, 0).non_seasonal().with_constant(false)),
            ModelSpec::Ets(EtsSpec::default()
                .with_error(ErrorType::Additive)
                .with_trend(TrendType::None)
                .with_season(SeasonalType::None)),
        ];
        for spec in &specs {
            let fitted = FittedModel::fit(spec, &series);
            prop_assume!(fitted.is_ok());
            let model = fitted.unwrap();
            let filled = model.interpolate().unwrap();
            for (orig, new) in holey.iter().zip(filled.values()) {
                prop_assert!(new.is_finite(), "{} left a gap", model.label());
                if !orig.is_nan() {
                    prop_assert_eq!(orig, new);
                }
            }
            let dists = model.forecast(Horizon::Steps(3), &ForecastOptions::default()).unwrap();
            prop_assert!(dists.iter().all(|d| d.mean().is_finite()));
        }
    }
}
