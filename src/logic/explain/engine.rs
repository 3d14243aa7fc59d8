use super::strategy::Explainer;
use super::types::ExplanationItem;
use super::{Attribute, ExplainError};
use crate::logic::pipeline::FeatureTransform;
use crate::models::CustomerRecord;

pub const EXPLANATION_FAILED: &str = "explanation_failed";
pub const IMPORTANCE_FAILED: &str = "importance_failed";

/// Explain one record with the startup-selected explainer.
///
/// Returns `None` when no explanation applies (no explainer, or an
/// attribution explainer without a preprocessor). Failures never propagate:
/// they come back as a single error descriptor so the prediction still ships.
pub fn explain<T>(
    explainer: &Explainer,
    transform: Option<&T>,
    record: &CustomerRecord,
    top_k: usize,
) -> Option<Vec<ExplanationItem>>
where
    T: FeatureTransform + ?Sized,
{
    match explainer {
        Explainer::None => None,
        Explainer::Tree(tree) => attribution(tree, transform?, record, top_k),
        Explainer::Generic(linear) => attribution(linear, transform?, record, top_k),
        Explainer::RawImportance(importances) => {
            let items = rank_importances(importances, transform, top_k).unwrap_or_else(|e| {
                tracing::warn!("Feature importance explanation failed: {}", e);
                vec![ExplanationItem::failure(IMPORTANCE_FAILED, e)]
            });
            Some(items)
        }
    }
}

fn attribution<A, T>(
    attributor: &A,
    transform: &T,
    record: &CustomerRecord,
    top_k: usize,
) -> Option<Vec<ExplanationItem>>
where
    A: Attribute + ?Sized,
    T: FeatureTransform + ?Sized,
{
    let items = rank_attributions(attributor, transform, record, top_k).unwrap_or_else(|e| {
        tracing::warn!("Explanation failed: {}", e);
        vec![ExplanationItem::failure(EXPLANATION_FAILED, e)]
    });
    Some(items)
}

fn rank_attributions<A, T>(
    attributor: &A,
    transform: &T,
    record: &CustomerRecord,
    top_k: usize,
) -> Result<Vec<ExplanationItem>, ExplainError>
where
    A: Attribute + ?Sized,
    T: FeatureTransform + ?Sized,
{
    let x = transform.transform(record)?;
    let contributions = attributor
        .attribute(&x)?
        .positive_class()
        .ok_or(ExplainError::EmptyOutput)?;

    let names = transform
        .feature_names_out()
        .unwrap_or_else(|| positional_names(contributions.len()));
    check_names(&names, contributions.len())?;

    Ok(top_k_indices(&contributions, top_k, f64::abs)
        .into_iter()
        .map(|i| ExplanationItem::Attribution {
            feature: names[i].clone(),
            shap_value: contributions[i],
        })
        .collect())
}

fn rank_importances<T>(
    importances: &[f64],
    transform: Option<&T>,
    top_k: usize,
) -> Result<Vec<ExplanationItem>, ExplainError>
where
    T: FeatureTransform + ?Sized,
{
    let names = transform
        .and_then(|t| t.feature_names_out())
        .unwrap_or_else(|| positional_names(importances.len()));
    check_names(&names, importances.len())?;

    if let Some(feature) = importances.iter().position(|v| !v.is_finite()) {
        return Err(ExplainError::NonFinite(feature));
    }

    Ok(top_k_indices(importances, top_k, |v| v)
        .into_iter()
        .map(|i| ExplanationItem::Importance {
            feature: names[i].clone(),
            importance: importances[i],
        })
        .collect())
}

fn check_names(names: &[String], values: usize) -> Result<(), ExplainError> {
    if names.len() != values {
        return Err(ExplainError::NameCountMismatch { names: names.len(), values });
    }
    Ok(())
}

/// `f0, f1, ...` for transforms that cannot name their outputs
pub fn positional_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("f{}", i)).collect()
}

/// Indices of the `top_k` largest values under `key`, largest first
pub fn top_k_indices(values: &[f64], top_k: usize, key: impl Fn(f64) -> f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| key(values[b]).total_cmp(&key(values[a])));
    order.truncate(top_k);
    order
}
