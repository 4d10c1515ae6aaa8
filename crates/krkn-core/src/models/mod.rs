/// Wire and domain models exchanged with the operator API
mod fields;
mod runs;
mod scenarios;
mod targets;

pub use fields::{FieldKind, FieldMeta, FormValue, FormValues, ScenarioField, TouchedFields};
pub use runs::{
    ClusterJob, ClusterJobPhase, CreateScenarioRunResponse, ScenarioFileMount, ScenarioRun,
    ScenarioRunPhase, ScenarioRunRequest, ScenarioRunStatusResponse, ScenarioRunsResponse,
};
pub use scenarios::{
    RegistryType, ScenarioDetail, ScenarioGlobals, ScenarioTag, ScenariosRequest,
    ScenariosResponse,
};
pub use targets::{
    Cluster, ClusterMap, ClustersResponse, CreateTargetRequest, CreateTargetResponse,
    ErrorResponse, ListTargetsResponse, NodesResponse, SecretType, SelectedCluster,
    TargetOperationResponse, TargetResponse, TargetStatus,
};
