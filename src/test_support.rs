//! Shared fixtures for unit tests

use serde_json::{json, Value};

use crate::logic::artifact::{parse_pipeline, ArtifactInfo, LoadedArtifact};
use crate::logic::pipeline::TrainedPipeline;
use crate::logic::ModelContext;
use crate::models::CustomerRecord;

/// The demo artifact shipped in `model/`
pub const DEMO_ARTIFACT: &str = include_str!("../model/best_baseline_model.json");

/// Month-to-month fiber customer, two months in: churns in the demo model
pub fn sample_record_json() -> Value {
    json!({
        "gender": "Female",
        "SeniorCitizen": 0,
        "Partner": "No",
        "Dependents": "No",
        "tenure": 2,
        "PhoneService": "Yes",
        "MultipleLines": "No",
        "InternetService": "Fiber optic",
        "OnlineSecurity": "No",
        "OnlineBackup": "No",
        "DeviceProtection": "No",
        "TechSupport": "No",
        "StreamingTV": "No",
        "StreamingMovies": "No",
        "Contract": "Month-to-month",
        "PaperlessBilling": "Yes",
        "PaymentMethod": "Electronic check",
        "MonthlyCharges": 70.7,
        "TotalCharges": 151.65
    })
}

/// Long-tenure, two-year DSL customer: stays in the demo model
pub fn loyal_record_json() -> Value {
    let mut body = sample_record_json();
    body["tenure"] = json!(60);
    body["Partner"] = json!("Yes");
    body["InternetService"] = json!("DSL");
    body["OnlineSecurity"] = json!("Yes");
    body["TechSupport"] = json!("Yes");
    body["Contract"] = json!("Two year");
    body["PaymentMethod"] = json!("Credit card (automatic)");
    body["MonthlyCharges"] = json!(55.3);
    body["TotalCharges"] = json!(3318.0);
    body
}

pub fn sample_record() -> CustomerRecord {
    serde_json::from_value(sample_record_json()).unwrap()
}

pub fn loyal_record() -> CustomerRecord {
    serde_json::from_value(loyal_record_json()).unwrap()
}

pub fn demo_artifact_json() -> Value {
    serde_json::from_str(DEMO_ARTIFACT).unwrap()
}

pub fn demo_pipeline() -> TrainedPipeline {
    parse_pipeline(DEMO_ARTIFACT.as_bytes()).unwrap()
}

/// Logistic-regression pipeline over the demo preprocessor (45 features)
pub fn linear_artifact_json(background_mean: Option<Vec<f64>>, feature_importances: Option<Vec<f64>>) -> Value {
    let mut coef = vec![0.0; 45];
    coef[0] = -0.8; // num__tenure
    coef[15] = 0.9; // cat__InternetService_Fiber optic
    coef[35] = 1.1; // cat__Contract_Month-to-month

    let mut artifact = demo_artifact_json();
    artifact["named_steps"]["classifier"] = json!({
        "kind": "logistic_regression",
        "coef": coef,
        "intercept": -1.2,
        "background_mean": background_mean,
        "feature_importances": feature_importances,
    });
    artifact
}

/// Model context over any artifact document
pub fn context_from(artifact: &Value) -> ModelContext {
    let pipeline = parse_pipeline(artifact.to_string().as_bytes()).unwrap();
    ModelContext::new(LoadedArtifact {
        pipeline,
        info: ArtifactInfo {
            source: "test".to_string(),
            sha256: "0".repeat(64),
            loaded_at: chrono::Utc::now(),
        },
    })
}

pub fn demo_context() -> ModelContext {
    context_from(&demo_artifact_json())
}
