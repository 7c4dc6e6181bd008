//! Organization hierarchy documents
//!
//! A value chain groups macroprocesses into primary, support and
//! management bands. Each macroprocess may carry a SIPOC table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::ProcessError;

/// Band a macroprocess belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroprocessKind {
    /// Core business: delivers value to the customer
    #[serde(alias = "primario")]
    Primary,
    #[serde(alias = "apoio")]
    Support,
    #[serde(alias = "gestao")]
    Management,
}

impl MacroprocessKind {
    /// Bands in drawing order, top first
    pub const ALL: [MacroprocessKind; 3] = [
        MacroprocessKind::Primary,
        MacroprocessKind::Support,
        MacroprocessKind::Management,
    ];
}

impl fmt::Display for MacroprocessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroprocessKind::Primary => write!(f, "primary"),
            MacroprocessKind::Support => write!(f, "support"),
            MacroprocessKind::Management => write!(f, "management"),
        }
    }
}

/// Whether a supplier or customer sits inside the organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOrigin {
    #[serde(alias = "interno")]
    Internal,
    #[serde(alias = "externo")]
    External,
}

/// One supplier, input, output or customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipocItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ItemOrigin>,
}

impl SipocItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            origin: None,
        }
    }
}

/// Suppliers, inputs, process steps, outputs and customers of a process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sipoc {
    pub suppliers: Vec<SipocItem>,
    pub inputs: Vec<SipocItem>,
    pub process_steps: Vec<String>,
    pub outputs: Vec<SipocItem>,
    pub customers: Vec<SipocItem>,
}

impl Sipoc {
    /// Every column has at least one entry
    pub fn is_complete(&self) -> bool {
        !self.suppliers.is_empty()
            && !self.inputs.is_empty()
            && !self.process_steps.is_empty()
            && !self.outputs.is_empty()
            && !self.customers.is_empty()
    }

    /// Suppliers flagged as inside the organization
    pub fn internal_suppliers(&self) -> impl Iterator<Item = &SipocItem> {
        self.suppliers
            .iter()
            .filter(|s| s.origin == Some(ItemOrigin::Internal))
    }

    /// Customers flagged as outside the organization
    pub fn external_customers(&self) -> impl Iterator<Item = &SipocItem> {
        self.customers
            .iter()
            .filter(|c| c.origin == Some(ItemOrigin::External))
    }

    /// Column texts in S, I, P, O, C order
    pub fn columns(&self) -> [Vec<&str>; 5] {
        [
            item_names(&self.suppliers),
            item_names(&self.inputs),
            self.process_steps.iter().map(String::as_str).collect(),
            item_names(&self.outputs),
            item_names(&self.customers),
        ]
    }
}

fn item_names(items: &[SipocItem]) -> Vec<&str> {
    items.iter().map(|i| i.name.as_str()).collect()
}

/// Tactical grouping of processes with a common objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macroprocess {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: MacroprocessKind,
    #[serde(default)]
    pub objective: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_chain_id: Option<String>,
    /// IDs of the child processes
    #[serde(default)]
    pub processes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sipoc: Option<Sipoc>,
    #[serde(default)]
    pub indicators: Vec<String>,
}

impl Macroprocess {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: MacroprocessKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind,
            objective: String::new(),
            owner: None,
            value_chain_id: None,
            processes: Vec::new(),
            sipoc: None,
            indicators: Vec::new(),
        }
    }

    pub fn with_sipoc(mut self, sipoc: Sipoc) -> Self {
        self.sipoc = Some(sipoc);
        self
    }
}

/// Strategic view of all macroprocesses of an organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChain {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    /// Macroprocesses not placed in any band
    #[serde(default)]
    pub macroprocesses: Vec<String>,
    /// Primary band, in value-flow order
    #[serde(default)]
    pub primary_macroprocesses: Vec<String>,
    #[serde(default)]
    pub support_macroprocesses: Vec<String>,
    #[serde(default)]
    pub management_macroprocesses: Vec<String>,
}

impl ValueChain {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// IDs listed for one band
    pub fn band(&self, kind: MacroprocessKind) -> &[String] {
        match kind {
            MacroprocessKind::Primary => &self.primary_macroprocesses,
            MacroprocessKind::Support => &self.support_macroprocesses,
            MacroprocessKind::Management => &self.management_macroprocesses,
        }
    }

    /// Every referenced macroprocess ID, first mention order
    pub fn all_macroprocesses(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        let lists = [
            &self.macroprocesses,
            &self.primary_macroprocesses,
            &self.support_macroprocesses,
            &self.management_macroprocesses,
        ];
        for id in lists.into_iter().flatten() {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Container for a whole organization's process structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationHierarchy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_chain: Option<ValueChain>,
    /// Macroprocesses keyed by ID
    #[serde(default)]
    pub macroprocesses: BTreeMap<String, Macroprocess>,
}

impl OrganizationHierarchy {
    /// Parse a hierarchy document from JSON
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    pub fn macroprocess(&self, id: &str) -> Option<&Macroprocess> {
        self.macroprocesses.get(id)
    }

    pub fn add_macroprocess(&mut self, macroprocess: Macroprocess) {
        trace!(macroprocess_id = %macroprocess.id, kind = %macroprocess.kind, "Adding macroprocess");
        self.macroprocesses.insert(macroprocess.id.clone(), macroprocess);
    }

    /// Macroprocesses of one kind, in ID order
    pub fn by_kind(&self, kind: MacroprocessKind) -> Vec<&Macroprocess> {
        self.macroprocesses.values().filter(|m| m.kind == kind).collect()
    }

    /// Reject blank IDs and names, and map keys that disagree with their ID
    pub fn validate(&self) -> Result<(), ProcessError> {
        if let Some(chain) = &self.value_chain {
            require_text(&chain.id, "value chain", "id")?;
            require_text(&chain.name, &chain.id, "name")?;
        }
        for (key, macroprocess) in &self.macroprocesses {
            require_text(&macroprocess.id, key, "id")?;
            require_text(&macroprocess.name, &macroprocess.id, "name")?;
            if macroprocess.id.trim() != key.trim() {
                return Err(ProcessError::invalid_hierarchy(
                    key.clone(),
                    format!("listed under a different id '{}'", macroprocess.id),
                ));
            }
            if let Some(sipoc) = &macroprocess.sipoc {
                let items = sipoc
                    .suppliers
                    .iter()
                    .chain(&sipoc.inputs)
                    .chain(&sipoc.outputs)
                    .chain(&sipoc.customers);
                for item in items {
                    require_text(&item.name, &macroprocess.id, "SIPOC item name")?;
                }
            }
        }
        Ok(())
    }
}

fn require_text(value: &str, item_id: &str, field: &str) -> Result<(), ProcessError> {
    if value.trim().is_empty() {
        return Err(ProcessError::invalid_hierarchy(
            item_id,
            format!("{} must not be blank", field),
        ));
    }
    Ok(())
}
