use super::*;
use super::engine::{EXPLANATION_FAILED, IMPORTANCE_FAILED};
use crate::logic::model::logit;
use crate::logic::pipeline::{FeatureTransform, Preprocessor, TransformError};
use crate::models::CustomerRecord;
use crate::test_support::{
    context_from, demo_artifact_json, demo_context, demo_pipeline, linear_artifact_json, loyal_record,
    sample_record,
};

/// Wraps the demo preprocessor, optionally breaking one of its outputs
struct StubTransform {
    inner: Preprocessor,
    fail: bool,
    names: Option<Option<Vec<String>>>,
}

impl StubTransform {
    fn demo() -> Self {
        let pipeline = demo_pipeline();
        Self { inner: pipeline.preprocessor().unwrap().clone(), fail: false, names: None }
    }
}

impl FeatureTransform for StubTransform {
    fn transform(&self, record: &CustomerRecord) -> Result<Vec<f64>, TransformError> {
        if self.fail {
            return Err(TransformError::UnknownCategory {
                column: "Contract".to_string(),
                value: "Quarterly".to_string(),
            });
        }
        self.inner.transform(record)
    }

    fn feature_names_out(&self) -> Option<Vec<String>> {
        match &self.names {
            Some(names) => names.clone(),
            None => self.inner.feature_names_out(),
        }
    }
}

fn demo_explainer() -> Explainer {
    Explainer::select(demo_pipeline().classifier())
}

fn attributions(items: &[ExplanationItem]) -> Vec<(String, f64)> {
    items
        .iter()
        .map(|item| match item {
            ExplanationItem::Attribution { feature, shap_value } => (feature.clone(), *shap_value),
            other => panic!("expected an attribution, got {:?}", other),
        })
        .collect()
}

fn importances(items: &[ExplanationItem]) -> Vec<(String, f64)> {
    items
        .iter()
        .map(|item| match item {
            ExplanationItem::Importance { feature, importance } => (feature.clone(), *importance),
            other => panic!("expected an importance, got {:?}", other),
        })
        .collect()
}

#[test]
fn test_demo_top_three_attributions() {
    let context = demo_context();
    assert_eq!(context.strategy(), ExplanationStrategy::TreeAttribution);

    let items = attributions(&context.explain(&sample_record(), 3).unwrap());

    let features: Vec<&str> = items.iter().map(|(f, _)| f.as_str()).collect();
    assert_eq!(
        features,
        vec!["cat__Contract_Month-to-month", "num__tenure", "cat__InternetService_Fiber optic"]
    );
    assert!((items[0].1 - 0.383569).abs() < 1e-5);
    assert!((items[1].1 - 0.296431).abs() < 1e-5);
    assert!((items[2].1 - 0.257143).abs() < 1e-5);
}

#[test]
fn test_attributions_are_ordered_by_magnitude() {
    let items = attributions(&demo_context().explain(&sample_record(), 10).unwrap());

    assert_eq!(items.len(), 10);
    for pair in items.windows(2) {
        assert!(pair[0].1.abs() >= pair[1].1.abs());
    }
    // negative contributions rank by magnitude too
    assert!(items.iter().any(|(f, v)| f == "num__MonthlyCharges" && *v < 0.0));
}

#[test]
fn test_attributions_sum_to_margin() {
    let pipeline = demo_pipeline();
    let explainer = demo_explainer();
    let record = sample_record();

    let items = attributions(&explain(&explainer, pipeline.preprocessor(), &record, usize::MAX).unwrap());
    let expected = match &explainer {
        Explainer::Tree(tree) => tree.expected_value(),
        _ => panic!("demo model should get the tree explainer"),
    };
    let probability = pipeline.predict(&record).unwrap().probability;

    let total: f64 = items.iter().map(|(_, v)| v).sum();
    assert!((expected + total - logit(probability)).abs() < 1e-9);
}

#[test]
fn test_top_k_larger_than_feature_count() {
    let items = demo_context().explain(&sample_record(), 1000).unwrap();
    assert_eq!(items.len(), 45);
}

#[test]
fn test_top_k_zero_is_empty() {
    assert_eq!(demo_context().explain(&sample_record(), 0), Some(vec![]));
}

#[test]
fn test_attributions_differ_between_records() {
    let context = demo_context();
    let churner = context.explain(&sample_record(), 45).unwrap();
    let loyal = context.explain(&loyal_record(), 45).unwrap();
    assert_ne!(churner, loyal);
}

#[test]
fn test_none_strategy_is_null() {
    let context = context_from(&linear_artifact_json(None, None));
    assert_eq!(context.strategy(), ExplanationStrategy::None);

    for top_k in [0, 1, 5, 100] {
        assert_eq!(context.explain(&sample_record(), top_k), None);
    }
}

#[test]
fn test_attribution_without_preprocessor_is_null() {
    let classifier = demo_artifact_json()["named_steps"]["classifier"].clone();
    let context = context_from(&classifier);
    assert_eq!(context.strategy(), ExplanationStrategy::TreeAttribution);

    assert_eq!(context.explain(&sample_record(), 5), None);
}

#[test]
fn test_raw_importances_are_global_and_descending() {
    let weights: Vec<f64> = (0..45).map(|i| ((i * 7) % 45) as f64 / 100.0).collect();
    let context = context_from(&linear_artifact_json(None, Some(weights)));
    assert_eq!(context.strategy(), ExplanationStrategy::RawImportance);

    let first = importances(&context.explain(&sample_record(), 5).unwrap());
    let second = importances(&context.explain(&loyal_record(), 5).unwrap());

    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
    assert!((first[0].1 - 0.44).abs() < 1e-12);
    for pair in first.windows(2) {
        assert!(pair[0].1 >= pair[1].1);
    }
}

#[test]
fn test_raw_importances_without_preprocessor_use_positional_names() {
    let items = explain::<Preprocessor>(&Explainer::RawImportance(vec![0.1, 0.6, 0.3]), None, &sample_record(), 2);

    assert_eq!(
        importances(&items.unwrap()),
        vec![("f1".to_string(), 0.6), ("f2".to_string(), 0.3)]
    );
}

#[test]
fn test_importance_length_mismatch_is_reported() {
    let context = context_from(&linear_artifact_json(None, Some(vec![0.1; 44])));
    let items = context.explain(&sample_record(), 5).unwrap();

    assert_eq!(items.len(), 1);
    match &items[0] {
        ExplanationItem::Failure { error, detail } => {
            assert_eq!(error, IMPORTANCE_FAILED);
            assert!(detail.contains("45 feature names for 44 values"));
        }
        other => panic!("expected a failure, got {:?}", other),
    }
    // the prediction itself is unaffected
    assert!(context.predict(&sample_record()).is_ok());
}

#[test]
fn test_transform_failure_becomes_descriptor() {
    let stub = StubTransform { fail: true, ..StubTransform::demo() };
    let items = explain(&demo_explainer(), Some(&stub), &sample_record(), 5).unwrap();

    assert_eq!(
        items,
        vec![ExplanationItem::failure(
            EXPLANATION_FAILED,
            "Found unknown categories ['Quarterly'] in column 'Contract' during transform"
        )]
    );
    assert_eq!(
        serde_json::to_value(&items).unwrap(),
        serde_json::json!([{
            "error": "explanation_failed",
            "detail": "Found unknown categories ['Quarterly'] in column 'Contract' during transform"
        }])
    );
}

#[test]
fn test_name_count_mismatch_is_an_explanation_failure() {
    let stub = StubTransform { names: Some(Some(vec!["only".to_string()])), ..StubTransform::demo() };
    let items = explain(&demo_explainer(), Some(&stub), &sample_record(), 5).unwrap();

    assert!(matches!(
        &items[..],
        [ExplanationItem::Failure { error, .. }] if error == EXPLANATION_FAILED
    ));
}

#[test]
fn test_unnamed_transform_uses_positional_names() {
    let stub = StubTransform { names: Some(None), ..StubTransform::demo() };
    let items = attributions(&explain(&demo_explainer(), Some(&stub), &sample_record(), 2).unwrap());

    assert_eq!(items[0].0, "f35");
    assert_eq!(items[1].0, "f0");
}

#[test]
fn test_generic_attribution_for_linear_model() {
    let context = context_from(&linear_artifact_json(Some(vec![0.0; 45]), None));
    assert_eq!(context.strategy(), ExplanationStrategy::GenericAttribution);
    assert_eq!(context.strategy().mode(), "shap");

    let items = attributions(&context.explain(&sample_record(), 3).unwrap());

    assert_eq!(items[0], ("cat__Contract_Month-to-month".to_string(), 1.1));
    assert_eq!(items[1].0, "num__tenure");
    assert!((items[1].1 - (-0.8 * (2.0 - 32.37) / 24.56)).abs() < 1e-9);
    assert_eq!(items[2], ("cat__InternetService_Fiber optic".to_string(), 0.9));
}

#[test]
fn test_top_k_indices_is_stable() {
    assert_eq!(top_k(&[1.0, -3.0, 3.0, 0.5], 3), vec![1, 2, 0]);
}

fn top_k(values: &[f64], k: usize) -> Vec<usize> {
    engine::top_k_indices(values, k, f64::abs)
}

#[test]
fn test_random_forest_explains_the_churn_class() {
    let mut artifact = demo_artifact_json();
    artifact["named_steps"]["classifier"] = serde_json::json!({
        "kind": "random_forest",
        "n_features": 45,
        "trees": [{ "nodes": [
            { "feature": 35, "threshold": 0.5, "left": 1, "right": 2, "cover": 100.0 },
            { "value": 0.1, "cover": 60.0 },
            { "value": 0.6, "cover": 40.0 }
        ]}]
    });
    let context = context_from(&artifact);
    assert_eq!(context.strategy(), ExplanationStrategy::TreeAttribution);

    let items = attributions(&context.explain(&sample_record(), 1).unwrap());

    // month-to-month raises churn probability from 0.3 to 0.6
    assert_eq!(items[0].0, "cat__Contract_Month-to-month");
    assert!((items[0].1 - 0.3).abs() < 1e-12);
}

#[test]
fn test_raw_importances_rank_by_signed_value() {
    let items = explain::<Preprocessor>(&Explainer::RawImportance(vec![-0.9, 0.2, 0.1]), None, &sample_record(), 2);

    assert_eq!(
        importances(&items.unwrap()),
        vec![("f1".to_string(), 0.2), ("f2".to_string(), 0.1)]
    );
}
