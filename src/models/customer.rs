//! Customer record - the closed-vocabulary request schema
//!
//! Every categorical field is an enum whose serde names are the exact,
//! case-sensitive labels the model was trained on. Unknown fields are
//! rejected, nothing is coerced.

use serde::{Deserialize, Serialize};

/// Declares a categorical field: one variant per accepted label, in
/// vocabulary order (the order also drives the raw encoding).
macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// Position of the value in its vocabulary
            pub fn index(self) -> usize {
                self as usize
            }
        }
    };
}

vocabulary!(Gender {
    Male => "Male",
    Female => "Female",
});

vocabulary!(
    /// Plain yes/no answer (Partner, Dependents, PhoneService, PaperlessBilling)
    YesNo {
        Yes => "Yes",
        No => "No",
    }
);

vocabulary!(MultipleLines {
    Yes => "Yes",
    No => "No",
    NoPhoneService => "No phone service",
});

vocabulary!(InternetService {
    Dsl => "DSL",
    FiberOptic => "Fiber optic",
    No => "No",
});

vocabulary!(
    /// Answer for services that depend on an internet subscription
    InternetAddon {
        Yes => "Yes",
        No => "No",
        NoInternetService => "No internet service",
    }
);

vocabulary!(Contract {
    MonthToMonth => "Month-to-month",
    OneYear => "One year",
    TwoYear => "Two year",
});

vocabulary!(PaymentMethod {
    ElectronicCheck => "Electronic check",
    MailedCheck => "Mailed check",
    BankTransfer => "Bank transfer (automatic)",
    CreditCard => "Credit card (automatic)",
});

/// Senior citizen flag, accepted only as the integer literals 0 or 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct SeniorCitizen(bool);

impl SeniorCitizen {
    pub fn as_f64(self) -> f64 {
        if self.0 { 1.0 } else { 0.0 }
    }
}

impl TryFrom<i64> for SeniorCitizen {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self(false)),
            1 => Ok(Self(true)),
            other => Err(format!("SeniorCitizen must be 0 or 1, got {}", other)),
        }
    }
}

impl From<SeniorCitizen> for i64 {
    fn from(value: SeniorCitizen) -> Self {
        value.0 as i64
    }
}

/// One subscriber, as posted to the prediction endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerRecord {
    pub gender: Gender,
    #[serde(rename = "SeniorCitizen")]
    pub senior_citizen: SeniorCitizen,
    #[serde(rename = "Partner")]
    pub partner: YesNo,
    #[serde(rename = "Dependents")]
    pub dependents: YesNo,
    pub tenure: i64,
    #[serde(rename = "PhoneService")]
    pub phone_service: YesNo,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: MultipleLines,
    #[serde(rename = "InternetService")]
    pub internet_service: InternetService,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: InternetAddon,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: InternetAddon,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: InternetAddon,
    #[serde(rename = "TechSupport")]
    pub tech_support: InternetAddon,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: InternetAddon,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: InternetAddon,
    #[serde(rename = "Contract")]
    pub contract: Contract,
    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: YesNo,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: PaymentMethod,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
}

/// Value of a single record field, as seen by column transformers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Category(&'static str),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Category(label) => write!(f, "{}", label),
        }
    }
}

impl CustomerRecord {
    /// Wire names of all fields, in schema order
    pub const FIELDS: [&'static str; 19] = [
        "gender",
        "SeniorCitizen",
        "Partner",
        "Dependents",
        "tenure",
        "PhoneService",
        "MultipleLines",
        "InternetService",
        "OnlineSecurity",
        "OnlineBackup",
        "DeviceProtection",
        "TechSupport",
        "StreamingTV",
        "StreamingMovies",
        "Contract",
        "PaperlessBilling",
        "PaymentMethod",
        "MonthlyCharges",
        "TotalCharges",
    ];

    pub fn is_field(name: &str) -> bool {
        Self::FIELDS.contains(&name)
    }

    /// Fields that can feed numeric transformers
    pub fn is_numeric_field(name: &str) -> bool {
        matches!(name, "SeniorCitizen" | "tenure" | "MonthlyCharges" | "TotalCharges")
    }

    /// Look a field up by its wire name
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        use FieldValue::{Category, Number};

        let value = match name {
            "gender" => Category(self.gender.as_str()),
            "SeniorCitizen" => Number(self.senior_citizen.as_f64()),
            "Partner" => Category(self.partner.as_str()),
            "Dependents" => Category(self.dependents.as_str()),
            "tenure" => Number(self.tenure as f64),
            "PhoneService" => Category(self.phone_service.as_str()),
            "MultipleLines" => Category(self.multiple_lines.as_str()),
            "InternetService" => Category(self.internet_service.as_str()),
            "OnlineSecurity" => Category(self.online_security.as_str()),
            "OnlineBackup" => Category(self.online_backup.as_str()),
            "DeviceProtection" => Category(self.device_protection.as_str()),
            "TechSupport" => Category(self.tech_support.as_str()),
            "StreamingTV" => Category(self.streaming_tv.as_str()),
            "StreamingMovies" => Category(self.streaming_movies.as_str()),
            "Contract" => Category(self.contract.as_str()),
            "PaperlessBilling" => Category(self.paperless_billing.as_str()),
            "PaymentMethod" => Category(self.payment_method.as_str()),
            "MonthlyCharges" => Number(self.monthly_charges),
            "TotalCharges" => Number(self.total_charges),
            _ => return None,
        };
        Some(value)
    }

    /// Encoding used when the artifact carries no preprocessor: one value per
    /// field in schema order, categories replaced by their vocabulary index.
    pub fn raw_features(&self) -> Vec<f64> {
        vec![
            self.gender.index() as f64,
            self.senior_citizen.as_f64(),
            self.partner.index() as f64,
            self.dependents.index() as f64,
            self.tenure as f64,
            self.phone_service.index() as f64,
            self.multiple_lines.index() as f64,
            self.internet_service.index() as f64,
            self.online_security.index() as f64,
            self.online_backup.index() as f64,
            self.device_protection.index() as f64,
            self.tech_support.index() as f64,
            self.streaming_tv.index() as f64,
            self.streaming_movies.index() as f64,
            self.contract.index() as f64,
            self.paperless_billing.index() as f64,
            self.payment_method.index() as f64,
            self.monthly_charges,
            self.total_charges,
        ]
    }
}
