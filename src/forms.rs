//! Create/update form state and its conversion into request payloads.
//!
//! Form fields hold raw text as typed. Conversion parses numeric fields into
//! numbers so the server never receives `"500000"` where it expects `500000`.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;

pub const DISTYL_PRODUCTS: &[&str] = &["Eagle", "Tower", "Penny", "Platform"];

pub const USE_CASES: &[&str] = &[
    "Prior Authorization",
    "Claims Processing",
    "Appeals Management",
    "Case Summarization",
    "Utilization Management",
    "CX for Healthcare",
    "General",
];

pub const PARTNERSHIP_TYPES: &[&str] = &["technology", "channel", "strategic", "OEM", "investor"];

/// Empty → `None`. Otherwise the leading integer is kept and any trailing
/// fraction or text dropped (`"500000.50"` → `500000`); input without a
/// leading integer is rejected.
pub fn parse_optional_int(field: &str, raw: &str) -> Result<Option<i64>, ClientError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let unsigned = raw.strip_prefix(&['-', '+'][..]).unwrap_or(raw);
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let sign_len = raw.len() - unsigned.len();
    raw[..sign_len + digits]
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ClientError::InvalidInput(format!("{} must be a whole number", field)))
}

pub fn parse_required_id(field: &str, raw: &str) -> Result<i64, ClientError> {
    parse_optional_int(field, raw)?
        .ok_or_else(|| ClientError::InvalidInput(format!("{} is required", field)))
}

fn required(field: &str, raw: &str) -> Result<String, ClientError> {
    let value = raw.trim();
    if value.is_empty() {
        Err(ClientError::InvalidInput(format!("{} is required", field)))
    } else {
        Ok(value.to_string())
    }
}

fn optional(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn to_value<T: Serialize>(payload: &T) -> Result<Value, ClientError> {
    serde_json::to_value(payload).map_err(ClientError::from)
}

/// Anything a modal can submit.
pub trait FormPayload {
    fn payload(&self) -> Result<Value, ClientError>;
}

// -----------------------------------------------------------------------------
// Entity
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EntityForm {
    pub name: String,
    pub entity_type: String,
    pub website: String,
    pub description: String,
    pub headquarters: String,
    pub threat_level: String,
    pub distyl_exposure: String,
}

impl Default for EntityForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            entity_type: "competitor".to_string(),
            website: String::new(),
            description: String::new(),
            headquarters: String::new(),
            threat_level: "medium".to_string(),
            distyl_exposure: "low".to_string(),
        }
    }
}

#[derive(Serialize)]
struct EntityPayload {
    name: String,
    entity_type: String,
    website: Option<String>,
    description: Option<String>,
    headquarters: Option<String>,
    threat_level: String,
    distyl_exposure: String,
}

impl FormPayload for EntityForm {
    fn payload(&self) -> Result<Value, ClientError> {
        to_value(&EntityPayload {
            name: required("name", &self.name)?,
            entity_type: self.entity_type.clone(),
            website: optional(&self.website),
            description: optional(&self.description),
            headquarters: optional(&self.headquarters),
            threat_level: self.threat_level.clone(),
            distyl_exposure: self.distyl_exposure.clone(),
        })
    }
}

// -----------------------------------------------------------------------------
// Deal
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DealForm {
    pub account_name: String,
    pub deal_name: String,
    pub stage: String,
    pub value_usd: String,
    pub owner: String,
    pub distyl_product: String,
    pub close_date: String,
    pub loss_competitor_id: String,
}

impl Default for DealForm {
    fn default() -> Self {
        Self {
            account_name: String::new(),
            deal_name: String::new(),
            stage: "prospecting".to_string(),
            value_usd: String::new(),
            owner: String::new(),
            distyl_product: "Eagle".to_string(),
            close_date: String::new(),
            loss_competitor_id: String::new(),
        }
    }
}

#[derive(Serialize)]
struct DealPayload {
    account_name: String,
    deal_name: Option<String>,
    stage: String,
    value_usd: Option<i64>,
    owner: Option<String>,
    distyl_product: String,
    close_date: Option<String>,
    loss_competitor_id: Option<i64>,
}

impl FormPayload for DealForm {
    fn payload(&self) -> Result<Value, ClientError> {
        to_value(&DealPayload {
            account_name: required("account_name", &self.account_name)?,
            deal_name: optional(&self.deal_name),
            stage: self.stage.clone(),
            value_usd: parse_optional_int("value_usd", &self.value_usd)?,
            owner: optional(&self.owner),
            distyl_product: self.distyl_product.clone(),
            close_date: optional(&self.close_date),
            loss_competitor_id: parse_optional_int("loss_competitor_id", &self.loss_competitor_id)?,
        })
    }
}

/// Partial deal update, e.g. a stage change from the pipeline table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DealChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_usd: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_loss_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_reason: Option<String>,
}

impl FormPayload for DealChange {
    fn payload(&self) -> Result<Value, ClientError> {
        to_value(self)
    }
}

// -----------------------------------------------------------------------------
// Person
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PersonForm {
    pub entity_id: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub current_company: String,
    pub email: String,
    pub linkedin_url: String,
    pub person_type: String,
    pub distyl_relationship: String,
}

impl Default for PersonForm {
    fn default() -> Self {
        Self {
            entity_id: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            title: String::new(),
            current_company: String::new(),
            email: String::new(),
            linkedin_url: String::new(),
            person_type: "executive".to_string(),
            distyl_relationship: "unknown".to_string(),
        }
    }
}

#[derive(Serialize)]
struct PersonPayload {
    entity_id: i64,
    first_name: String,
    last_name: String,
    title: Option<String>,
    current_company: Option<String>,
    email: Option<String>,
    linkedin_url: Option<String>,
    person_type: String,
    distyl_relationship: String,
}

impl FormPayload for PersonForm {
    fn payload(&self) -> Result<Value, ClientError> {
        to_value(&PersonPayload {
            entity_id: parse_required_id("entity_id", &self.entity_id)?,
            first_name: required("first_name", &self.first_name)?,
            last_name: required("last_name", &self.last_name)?,
            title: optional(&self.title),
            current_company: optional(&self.current_company),
            email: optional(&self.email),
            linkedin_url: optional(&self.linkedin_url),
            person_type: self.person_type.clone(),
            distyl_relationship: self.distyl_relationship.clone(),
        })
    }
}

// -----------------------------------------------------------------------------
// Partnership
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PartnershipForm {
    pub entity_a_id: String,
    pub entity_b_id: String,
    pub partnership_type: String,
    pub description: String,
    pub strength: String,
    pub source_url: String,
}

impl Default for PartnershipForm {
    fn default() -> Self {
        Self {
            entity_a_id: String::new(),
            entity_b_id: String::new(),
            partnership_type: "technology".to_string(),
            description: String::new(),
            strength: "moderate".to_string(),
            source_url: String::new(),
        }
    }
}

#[derive(Serialize)]
struct PartnershipPayload {
    entity_a_id: i64,
    entity_b_id: i64,
    partnership_type: String,
    description: Option<String>,
    strength: String,
    source_url: Option<String>,
}

impl FormPayload for PartnershipForm {
    fn payload(&self) -> Result<Value, ClientError> {
        let entity_a_id = parse_required_id("entity_a_id", &self.entity_a_id)?;
        let entity_b_id = parse_required_id("entity_b_id", &self.entity_b_id)?;
        if entity_a_id == entity_b_id {
            return Err(ClientError::InvalidInput(
                "a partnership needs two different entities".to_string(),
            ));
        }
        to_value(&PartnershipPayload {
            entity_a_id,
            entity_b_id,
            partnership_type: self.partnership_type.clone(),
            description: optional(&self.description),
            strength: self.strength.clone(),
            source_url: optional(&self.source_url),
        })
    }
}

// -----------------------------------------------------------------------------
// Battle card generation
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BattleCardForm {
    pub entity_id: String,
    pub use_case: String,
    pub distyl_product: String,
}

impl Default for BattleCardForm {
    fn default() -> Self {
        Self {
            entity_id: String::new(),
            use_case: "Claims Processing".to_string(),
            distyl_product: "Tower".to_string(),
        }
    }
}

#[derive(Serialize)]
struct BattleCardPayload {
    entity_id: i64,
    use_case: String,
    distyl_product: String,
}

impl FormPayload for BattleCardForm {
    fn payload(&self) -> Result<Value, ClientError> {
        to_value(&BattleCardPayload {
            entity_id: parse_required_id("entity_id", &self.entity_id)?,
            use_case: self.use_case.clone(),
            distyl_product: self.distyl_product.clone(),
        })
    }
}

// -----------------------------------------------------------------------------
// Modal
// -----------------------------------------------------------------------------

/// Open/closed modal holding a form. Submitting closes it on success and
/// leaves it open (with the form intact) on failure so the user can retry.
#[derive(Debug, Clone)]
pub struct Modal<F> {
    form: Option<F>,
    submitting: bool,
}

impl<F> Default for Modal<F> {
    fn default() -> Self {
        Self {
            form: None,
            submitting: false,
        }
    }
}

impl<F: FormPayload> Modal<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, form: F) {
        self.form = Some(form);
    }

    pub fn close(&mut self) {
        self.form = None;
        self.submitting = false;
    }

    pub fn is_open(&self) -> bool {
        self.form.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn form(&self) -> Option<&F> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut F> {
        self.form.as_mut()
    }

    /// Build the payload and hand it to `send`. Validation failures count as
    /// failures: nothing is sent and the modal stays open.
    pub async fn submit<Fut>(&mut self, send: impl FnOnce(Value) -> Fut) -> Result<Value, ClientError>
    where
        Fut: Future<Output = Result<Value, ClientError>>,
    {
        let Some(form) = &self.form else {
            return Err(ClientError::InvalidInput("form is not open".to_string()));
        };
        let payload = form.payload()?;
        self.submitting = true;
        let result = send(payload).await;
        self.submitting = false;
        if result.is_ok() {
            self.close();
        }
        result
    }
}
