use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTargetResponse {
    pub uuid: String,
}

/// Readiness of a target request, derived from the status code of
/// `GET /targets/{uuid}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    Ready,
    Pending,
    NotFound,
    Unexpected(u16),
}

impl From<u16> for TargetStatus {
    fn from(code: u16) -> Self {
        match code {
            200 => Self::Ready,
            100 | 102 | 202 => Self::Pending,
            404 => Self::NotFound,
            other => Self::Unexpected(other),
        }
    }
}

/// A named Kubernetes endpoint exposed by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(rename = "cluster-name")]
    pub name: String,
    #[serde(rename = "cluster-api-url", default)]
    pub api_url: String,
}

/// Discovered clusters grouped by provider (operator) name
pub type ClusterMap = BTreeMap<String, Vec<Cluster>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClustersResponse {
    #[serde(rename = "targetData", default)]
    pub target_data: ClusterMap,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodesResponse {
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// A cluster the user picked for a run. Identity is (operator, cluster name);
/// the api url is carried along for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedCluster {
    pub operator_name: String,
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_api_url: String,
}

impl SelectedCluster {
    pub fn new(operator_name: &str, cluster: &Cluster) -> Self {
        Self {
            operator_name: operator_name.to_string(),
            cluster_name: cluster.name.clone(),
            cluster_api_url: cluster.api_url.clone(),
        }
    }

    pub fn same_cluster(&self, other: &SelectedCluster) -> bool {
        self.operator_name == other.operator_name && self.cluster_name == other.cluster_name
    }
}

impl PartialEq for SelectedCluster {
    fn eq(&self, other: &Self) -> bool {
        self.same_cluster(other)
    }
}
impl Eq for SelectedCluster {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    Kubeconfig,
    Token,
    Credentials,
}

/// Body of the settings-page target create/update calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetRequest {
    pub cluster_name: String,
    pub secret_type: SecretType,
    #[serde(rename = "clusterAPIURL", skip_serializing_if = "Option::is_none", default)]
    pub cluster_api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ca_bundle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kubeconfig: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResponse {
    pub uuid: String,
    pub cluster_name: String,
    #[serde(rename = "clusterAPIURL", default)]
    pub cluster_api_url: String,
    #[serde(default)]
    pub secret_type: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListTargetsResponse {
    #[serde(default)]
    pub targets: Vec<TargetResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOperationResponse {
    pub uuid: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned by the operator on non-success responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_status_from_code() {
        assert_eq!(TargetStatus::from(200), TargetStatus::Ready);
        assert_eq!(TargetStatus::from(202), TargetStatus::Pending);
        assert_eq!(TargetStatus::from(404), TargetStatus::NotFound);
        assert_eq!(TargetStatus::from(500), TargetStatus::Unexpected(500));
    }

    #[test]
    fn test_clusters_response_parsing() {
        let payload = r#"{
            "targetData": {
                "krkn-operator": [
                    {"cluster-name": "prod", "cluster-api-url": "https://prod:6443"}
                ],
                "krkn-operator-acm": [
                    {"cluster-name": "edge-1", "cluster-api-url": "https://edge-1:6443"},
                    {"cluster-name": "edge-2"}
                ]
            },
            "status": "ready"
        }"#;
        let resp: ClustersResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(resp.target_data.len(), 2);
        assert_eq!(resp.target_data["krkn-operator-acm"][1].name, "edge-2");
        assert_eq!(resp.target_data["krkn-operator-acm"][1].api_url, "");
    }

    #[test]
    fn test_selected_cluster_identity_ignores_url() {
        let a = SelectedCluster {
            operator_name: "op".to_string(),
            cluster_name: "c1".to_string(),
            cluster_api_url: "https://a".to_string(),
        };
        let b = SelectedCluster {
            cluster_api_url: "https://b".to_string(),
            ..a.clone()
        };
        let c = SelectedCluster {
            operator_name: "other".to_string(),
            ..a.clone()
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_create_target_request_skips_empty_credentials() {
        let req = CreateTargetRequest {
            cluster_name: "lab".to_string(),
            secret_type: SecretType::Token,
            cluster_api_url: Some("https://lab:6443".to_string()),
            ca_bundle: None,
            kubeconfig: None,
            token: Some("t0k3n".to_string()),
            username: None,
            password: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["secretType"], "token");
        assert_eq!(json["clusterAPIURL"], "https://lab:6443");
        assert!(json.get("kubeconfig").is_none());
    }
}
