//! Property tests over generated samples

use approx::assert_relative_eq;
use precistat_core::aggregate::describe;
use precistat_core::correction::{adjust_p_values, CorrectionMethod};
use precistat_core::special::{chi_square_sf, f_sf, normal_cdf, students_t_cdf};
use precistat_core::tests::correlation::{kendall, pearson, spearman, CorrelationOptions};
use precistat_core::tests::parametric::{one_way_anova, t_test, AnovaKind, AnovaOptions, TTestKind, TTestOptions};
use precistat_core::{Decimal, PrecisionContext};
use proptest::prelude::*;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

fn ctx() -> PrecisionContext {
    PrecisionContext::default()
}

/// Hundredths in [-50, 50], with repeats likely
fn sample(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(-5000i64..5000, min_len..max_len)
        .prop_map(|values| values.into_iter().map(|v| ctx().int(v).scale10(-2)).collect())
}

fn in_unit_interval(p: &Decimal) -> bool {
    !p.is_negative() && *p <= ctx().one()
}

fn significant_digits(rendered: &str) -> usize {
    rendered
        .chars()
        .take_while(|c| *c != 'e' && *c != 'E')
        .filter(|c| c.is_ascii_digit())
        .skip_while(|c| *c == '0')
        .count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn p_values_stay_in_unit_interval(a in sample(2, 7), b in sample(2, 7)) {
        for kind in [TTestKind::Welch, TTestKind::Student] {
            let options = TTestOptions { kind, ..TTestOptions::default() };
            let result = t_test(&a, &b, &options, ctx()).unwrap();
            prop_assert!(in_unit_interval(&result.p_value));
        }
        let anova = one_way_anova(&[a.clone(), b.clone()], &AnovaOptions::default(), ctx()).unwrap();
        prop_assert!(in_unit_interval(&anova.test.p_value));
    }

    #[test]
    fn constant_groups_never_fail(value in -100i64..100, n1 in 2usize..6, n2 in 2usize..6, shift in 0i64..3) {
        let a = vec![ctx().int(value); n1];
        let b = vec![ctx().int(value + shift); n2];
        let result = t_test(&a, &b, &TTestOptions::default(), ctx()).unwrap();
        prop_assert!(in_unit_interval(&result.p_value));
        prop_assert_eq!(result.extreme_flag, shift != 0);
        let welch = AnovaOptions { kind: AnovaKind::Welch };
        let anova = one_way_anova(&[a, b], &welch, ctx()).unwrap();
        prop_assert!(in_unit_interval(&anova.test.p_value));
    }

    #[test]
    fn correlations_are_bounded(pairs in prop::collection::vec((-5000i64..5000, -5000i64..5000), 3..9)) {
        let x: Vec<Decimal> = pairs.iter().map(|(a, _)| ctx().int(*a)).collect();
        let y: Vec<Decimal> = pairs.iter().map(|(_, b)| ctx().int(*b)).collect();
        let options = CorrelationOptions::default();
        let one = ctx().one();
        for result in [
            pearson(&x, &y, &options, ctx()).unwrap(),
            spearman(&x, &y, &options, ctx()).unwrap(),
            kendall(&x, &y, &options, ctx()).unwrap(),
        ] {
            prop_assert!(result.coefficient.abs() <= one);
            prop_assert!(in_unit_interval(&result.test.p_value));
        }
    }

    #[test]
    fn swapping_samples_flips_the_statistic(a in sample(2, 7), b in sample(2, 7)) {
        let options = TTestOptions::default();
        let forward = t_test(&a, &b, &options, ctx()).unwrap();
        let backward = t_test(&b, &a, &options, ctx()).unwrap();
        prop_assert_eq!(&forward.statistic, &-&backward.statistic);
        prop_assert!((&forward.p_value - &backward.p_value).abs() <= ctx().pow10(-45));
    }

    #[test]
    fn anova_sums_of_squares_decompose(groups in prop::collection::vec(sample(2, 6), 2..5)) {
        let anova = one_way_anova(&groups, &AnovaOptions::default(), ctx()).unwrap();
        let gap = (&anova.ss_between + &anova.ss_within - &anova.ss_total).abs();
        let scale = anova.ss_total.clone().max(ctx().one());
        prop_assert!(gap <= scale * ctx().pow10(-45));
    }

    #[test]
    fn corrections_are_monotone(raw in prop::collection::vec(0i64..=1000, 1..12)) {
        let p: Vec<Decimal> = raw.iter().map(|v| ctx().int(*v).scale10(-3)).collect();
        let mut order: Vec<usize> = (0..p.len()).collect();
        order.sort_by(|&a, &b| p[a].cmp(&p[b]));
        for method in [CorrectionMethod::Holm, CorrectionMethod::BenjaminiHochberg, CorrectionMethod::Sidak] {
            let adjusted = adjust_p_values(&p, method, ctx()).unwrap();
            for &i in &order {
                prop_assert!(adjusted[i] >= p[i]);
                prop_assert!(adjusted[i] <= ctx().one());
            }
            for pair in order.windows(2) {
                prop_assert!(adjusted[pair[0]] <= adjusted[pair[1]]);
            }
        }
    }

    #[test]
    fn describe_keeps_configured_digits(values in sample(2, 8)) {
        let stats = describe(&values, 1, ctx()).unwrap();
        if !stats.variance.is_zero() {
            prop_assert_eq!(significant_digits(&stats.variance.to_string()), 50);
            prop_assert_eq!(significant_digits(&stats.std.to_string()), 50);
        }
    }
}

#[test]
fn describe_matches_reference_digits() {
    let values: Vec<Decimal> = ["1", "2", "2"].iter().map(|v| ctx().parse(v).unwrap()).collect();
    let stats = describe(&values, 1, ctx()).unwrap();
    assert_eq!(stats.mean.to_string(), "1.6666666666666666666666666666666666666666666666667");
    assert_eq!(stats.std.to_string(), "0.57735026918962576450914878050195745564760175127013");
}

#[test]
fn distributions_agree_with_statrs() {
    let c = ctx();
    for (t, df) in [(-2.5, 3.0), (0.7, 10.0), (1.96, 120.0)] {
        let ours = students_t_cdf(&c.from_f64(t).unwrap(), &c.from_f64(df).unwrap()).unwrap();
        let reference = StudentsT::new(0.0, 1.0, df).unwrap().cdf(t);
        assert_relative_eq!(ours.to_f64(), reference, max_relative = 1e-10);
    }
    for (x, k) in [(0.5, 1.0), (3.84, 1.0), (20.0, 4.0)] {
        let ours = chi_square_sf(&c.from_f64(x).unwrap(), &c.from_f64(k).unwrap()).unwrap();
        let reference = 1.0 - ChiSquared::new(k).unwrap().cdf(x);
        assert_relative_eq!(ours.to_f64(), reference, max_relative = 1e-9);
    }
    for (x, d1, d2) in [(1.5, 2.0, 10.0), (4.0, 3.0, 20.0)] {
        let ours = f_sf(&c.from_f64(x).unwrap(), &c.from_f64(d1).unwrap(), &c.from_f64(d2).unwrap()).unwrap();
        let reference = 1.0 - FisherSnedecor::new(d1, d2).unwrap().cdf(x);
        assert_relative_eq!(ours.to_f64(), reference, max_relative = 1e-9);
    }
    let ours = normal_cdf(&c.from_f64(-1.25).unwrap()).unwrap();
    let reference = Normal::new(0.0, 1.0).unwrap().cdf(-1.25);
    assert_relative_eq!(ours.to_f64(), reference, max_relative = 1e-12);
}
