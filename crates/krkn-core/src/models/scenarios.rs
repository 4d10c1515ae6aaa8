use super::fields::ScenarioField;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryType {
    Public,
    Private,
}

/// Registry access configuration sent with every scenario registry call.
/// An empty request targets the public default registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScenariosRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub registry_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scenario_repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub skip_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub insecure: Option<bool>,
}

impl ScenariosRequest {
    pub fn registry_type(&self) -> RegistryType {
        if self.registry_url.is_some() || self.scenario_repository.is_some() {
            RegistryType::Private
        } else {
            RegistryType::Public
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioTag {
    pub name: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenariosResponse {
    #[serde(default)]
    pub scenarios: Vec<ScenarioTag>,
}

/// Field schema of one scenario. The globals endpoint returns the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDetail {
    pub name: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<ScenarioField>,
}

pub type ScenarioGlobals = ScenarioDetail;

impl ScenarioDetail {
    pub fn required_fields(&self) -> impl Iterator<Item = &ScenarioField> {
        self.fields.iter().filter(|f| f.meta.required)
    }

    pub fn optional_fields(&self) -> impl Iterator<Item = &ScenarioField> {
        self.fields.iter().filter(|f| !f.meta.required)
    }

    pub fn field(&self, variable: &str) -> Option<&ScenarioField> {
        self.fields.iter().find(|f| f.meta.variable == variable)
    }
}
