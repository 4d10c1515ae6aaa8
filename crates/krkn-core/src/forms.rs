/// Dynamic scenario form handling: one handler per field kind for option
/// parsing, validation and conversion into the run request payload.
use crate::exceptions::GenericError;
use crate::models::{
    FieldKind, FormValue, FormValues, ScenarioDetail, ScenarioField, ScenarioFileMount,
    ScenarioGlobals, ScenariosRequest, SelectedCluster, TouchedFields,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Split an enum field's `allowed_values` on its separator
pub fn enum_options(separator: &str, allowed_values: &str) -> Vec<String> {
    if separator.is_empty() {
        let single = allowed_values.trim();
        return if single.is_empty() {
            vec![]
        } else {
            vec![single.to_string()]
        };
    }
    allowed_values
        .split(separator)
        .map(|opt| opt.trim())
        .filter(|opt| !opt.is_empty())
        .map(|opt| opt.to_string())
        .collect()
}

impl ScenarioField {
    /// Options of an enum field, empty for every other kind
    pub fn options(&self) -> Vec<String> {
        match &self.kind {
            FieldKind::Enum {
                separator,
                allowed_values,
            } => enum_options(separator, allowed_values),
            _ => vec![],
        }
    }

    /// Check a single value against this field's constraints
    pub fn validate(&self, value: Option<&FormValue>) -> Result<(), String> {
        let label = self.meta.label();
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                return if self.meta.required {
                    Err(format!("{} is required", label))
                } else {
                    Ok(())
                };
            }
        };

        match (&self.kind, value) {
            (
                FieldKind::String {
                    validator,
                    validation_message,
                },
                FormValue::Text(text),
            ) => match validator.as_deref().filter(|v| !v.is_empty()) {
                Some(pattern) => match Regex::new(pattern) {
                    Ok(re) if re.is_match(text) => Ok(()),
                    Ok(_) => Err(validation_message
                        .clone()
                        .unwrap_or_else(|| format!("{} is invalid", label))),
                    Err(e) => {
                        log::warn!("Ignoring invalid validator for {}: {}", self.meta.variable, e);
                        Ok(())
                    }
                },
                None => Ok(()),
            },
            (FieldKind::Number, FormValue::Text(text)) => match text.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(()),
                _ => Err(format!("{} must be a number", label)),
            },
            (FieldKind::Enum { .. }, FormValue::Text(text)) => {
                let options = self.options();
                if options.iter().any(|o| o == text.trim()) {
                    Ok(())
                } else {
                    Err(format!("{} must be one of: {}", label, options.join(", ")))
                }
            }
            (FieldKind::Boolean, FormValue::Bool(_)) => Ok(()),
            (FieldKind::Boolean, FormValue::Text(text)) => match text.trim() {
                "true" | "false" => Ok(()),
                _ => Err(format!("{} must be true or false", label)),
            },
            (FieldKind::File { .. }, FormValue::File { .. }) => Ok(()),
            (FieldKind::FileBase64, FormValue::File { .. } | FormValue::Text(_)) => Ok(()),
            (FieldKind::File { .. } | FieldKind::FileBase64, _) => {
                Err(format!("{} must be a file", label))
            }
            (_, FormValue::File { .. }) => Err(format!("{} does not accept a file", label)),
            (_, FormValue::Bool(_)) => Err(format!("{} does not accept a boolean", label)),
        }
    }
}

/// Validate every field of a form, collecting all messages
pub fn validate_form(fields: &[ScenarioField], values: &FormValues) -> Result<(), GenericError> {
    let errors: Vec<String> = fields
        .iter()
        .filter_map(|f| f.validate(values.get(&f.meta.variable)).err())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GenericError::Validation(errors))
    }
}

/// Environment and file mounts contributed by the scenario and global forms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPayload {
    pub environment: BTreeMap<String, String>,
    pub files: Vec<ScenarioFileMount>,
}

impl RunPayload {
    fn apply(&mut self, field: &ScenarioField, value: Option<&FormValue>, use_default: bool) {
        let variable = &field.meta.variable;
        match (&field.kind, value) {
            (FieldKind::File { mount_path }, Some(FormValue::File { name, content }))
                if !content.is_empty() =>
            {
                self.files.push(ScenarioFileMount {
                    name: name.clone(),
                    content: STANDARD.encode(content),
                    mount_path: mount_path
                        .clone()
                        .filter(|p| !p.is_empty())
                        .unwrap_or_else(|| format!("/config/{}", name)),
                });
            }
            (FieldKind::File { .. }, _) => {}
            (FieldKind::FileBase64, Some(FormValue::File { content, .. })) if !content.is_empty() => {
                self.environment
                    .insert(variable.clone(), STANDARD.encode(content));
            }
            (FieldKind::FileBase64, Some(FormValue::Text(text))) if !text.is_empty() => {
                self.environment
                    .insert(variable.clone(), STANDARD.encode(text.as_bytes()));
            }
            (FieldKind::FileBase64, _) => {}
            (_, Some(FormValue::Text(text))) if !text.trim().is_empty() => {
                self.environment.insert(variable.clone(), text.clone());
            }
            (_, Some(FormValue::Bool(b))) => {
                self.environment.insert(variable.clone(), b.to_string());
            }
            _ => {
                if use_default {
                    if let Some(default) = field.meta.default.as_ref().filter(|d| !d.is_empty()) {
                        self.environment.insert(variable.clone(), default.clone());
                    }
                }
            }
        }
    }
}

/// Convert form values into the environment and files of a run request.
/// Scenario fields fall back to their defaults; global fields only
/// contribute when the user touched them.
pub fn build_run_payload(
    detail: &ScenarioDetail,
    values: &FormValues,
    globals: Option<(&ScenarioGlobals, &FormValues, &TouchedFields)>,
) -> RunPayload {
    let mut payload = RunPayload::default();
    for field in &detail.fields {
        payload.apply(field, values.get(&field.meta.variable), true);
    }
    if let Some((globals, global_values, touched)) = globals {
        for field in &globals.fields {
            if touched.get(&field.meta.variable).copied().unwrap_or(false) {
                payload.apply(field, global_values.get(&field.meta.variable), false);
            }
        }
    }
    payload
}

/// Image reference for a scenario: the private registry when both url and
/// repository are configured, the default public image otherwise.
pub fn scenario_image(
    registry: Option<&ScenariosRequest>,
    scenario_name: &str,
    default_image: &str,
) -> String {
    match registry {
        Some(ScenariosRequest {
            registry_url: Some(url),
            scenario_repository: Some(repo),
            ..
        }) if !url.is_empty() && !repo.is_empty() => {
            format!(
                "{}/{}:{}",
                url.trim_end_matches('/'),
                repo.trim_matches('/'),
                scenario_name
            )
        }
        _ => format!("{}:{}", default_image, scenario_name),
    }
}

/// Group the selected clusters by provider, preserving selection order
pub fn group_clusters(selected: &[SelectedCluster]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for cluster in selected {
        grouped
            .entry(cluster.operator_name.clone())
            .or_default()
            .push(cluster.cluster_name.clone());
    }
    grouped
}

/// Messages for an invalid cluster name list, empty when valid
pub fn validate_cluster_names(names: &[String]) -> Vec<String> {
    let mut errors = Vec::new();
    if names.is_empty() {
        errors.push("At least one cluster name is required".to_string());
        return errors;
    }
    if names.iter().any(|n| n.trim().is_empty()) {
        errors.push("Cluster names cannot be empty".to_string());
    }
    let unique: HashSet<&String> = names.iter().collect();
    if unique.len() != names.len() {
        errors.push("Duplicate cluster names found".to_string());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldMeta;

    fn field(variable: &str, kind: FieldKind, required: bool, default: Option<&str>) -> ScenarioField {
        ScenarioField {
            meta: FieldMeta {
                name: variable.to_lowercase(),
                short_description: variable.to_string(),
                title: None,
                description: String::new(),
                variable: variable.to_string(),
                default: default.map(|d| d.to_string()),
                required,
                secret: false,
            },
            kind,
        }
    }

    fn detail(fields: Vec<ScenarioField>) -> ScenarioDetail {
        ScenarioDetail {
            name: "pod-scenarios".to_string(),
            digest: None,
            size: None,
            last_modified: None,
            title: "Pod Scenarios".to_string(),
            description: String::new(),
            fields,
        }
    }

    #[test]
    fn test_enum_options() {
        assert_eq!(enum_options(",", "a, b ,,c"), vec!["a", "b", "c"]);
        assert_eq!(enum_options("|", "x|y"), vec!["x", "y"]);
        assert_eq!(enum_options("", " only "), vec!["only"]);
        assert!(enum_options(",", "").is_empty());
    }

    #[test]
    fn test_required_validation() {
        let fields = vec![
            field("NAMESPACE", FieldKind::String { validator: None, validation_message: None }, true, None),
            field("COUNT", FieldKind::Number, false, Some("1")),
        ];
        let err = validate_form(&fields, &FormValues::new()).unwrap_err();
        assert_eq!(err, GenericError::Validation(vec!["NAMESPACE is required".to_string()]));

        let values = FormValues::from([("NAMESPACE".to_string(), FormValue::from("default"))]);
        assert!(validate_form(&fields, &values).is_ok());
    }

    #[test]
    fn test_kind_specific_validation() {
        let string = field(
            "LABEL",
            FieldKind::String {
                validator: Some("^[a-z]+=[a-z]+$".to_string()),
                validation_message: Some("use key=value".to_string()),
            },
            false,
            None,
        );
        assert_eq!(string.validate(Some(&"app=web".into())), Ok(()));
        assert_eq!(string.validate(Some(&"app".into())), Err("use key=value".to_string()));

        let number = field("COUNT", FieldKind::Number, false, None);
        assert!(number.validate(Some(&"3.5".into())).is_ok());
        assert_eq!(
            number.validate(Some(&"three".into())),
            Err("COUNT must be a number".to_string())
        );

        let mode = field(
            "MODE",
            FieldKind::Enum { separator: ",".to_string(), allowed_values: "soft,hard".to_string() },
            false,
            None,
        );
        assert!(mode.validate(Some(&"hard".into())).is_ok());
        assert_eq!(
            mode.validate(Some(&"medium".into())),
            Err("MODE must be one of: soft, hard".to_string())
        );

        let file = field("CONFIG", FieldKind::File { mount_path: None }, true, None);
        assert_eq!(
            file.validate(Some(&"/tmp/config".into())),
            Err("CONFIG must be a file".to_string())
        );
    }

    #[test]
    fn test_build_run_payload_per_kind() {
        let d = detail(vec![
            field("NAMESPACE", FieldKind::String { validator: None, validation_message: None }, true, None),
            field("COUNT", FieldKind::Number, false, Some("1")),
            field("ENABLED", FieldKind::Boolean, false, None),
            field("CONFIG", FieldKind::File { mount_path: Some("/etc/app.yaml".to_string()) }, false, None),
            field("EXTRA", FieldKind::File { mount_path: None }, false, None),
            field("KUBECONFIG_B64", FieldKind::FileBase64, false, None),
        ]);
        let values = FormValues::from([
            ("NAMESPACE".to_string(), FormValue::from("default")),
            ("ENABLED".to_string(), FormValue::from(true)),
            (
                "CONFIG".to_string(),
                FormValue::File { name: "app.yaml".to_string(), content: b"a: 1".to_vec() },
            ),
            (
                "EXTRA".to_string(),
                FormValue::File { name: "extra.txt".to_string(), content: b"hi".to_vec() },
            ),
            (
                "KUBECONFIG_B64".to_string(),
                FormValue::File { name: "kubeconfig".to_string(), content: b"kube".to_vec() },
            ),
        ]);
        let payload = build_run_payload(&d, &values, None);

        assert_eq!(payload.environment["NAMESPACE"], "default");
        assert_eq!(payload.environment["COUNT"], "1");
        assert_eq!(payload.environment["ENABLED"], "true");
        assert_eq!(payload.environment["KUBECONFIG_B64"], "a3ViZQ==");
        assert!(!payload.environment.contains_key("CONFIG"));
        assert_eq!(payload.files.len(), 2);
        assert_eq!(payload.files[0].mount_path, "/etc/app.yaml");
        assert_eq!(payload.files[0].content, "YTogMQ==");
        assert_eq!(payload.files[1].mount_path, "/config/extra.txt");
    }

    #[test]
    fn test_globals_only_when_touched() {
        let d = detail(vec![]);
        let globals = detail(vec![
            field("WAIT_DURATION", FieldKind::Number, false, Some("60")),
            field("ES_SERVER", FieldKind::String { validator: None, validation_message: None }, false, None),
            field("CERBERUS", FieldKind::Boolean, false, Some("false")),
        ]);
        let values = FormValues::from([
            ("WAIT_DURATION".to_string(), FormValue::from("120")),
            ("ES_SERVER".to_string(), FormValue::from("http://es:9200")),
        ]);
        let touched = TouchedFields::from([
            ("ES_SERVER".to_string(), true),
            ("WAIT_DURATION".to_string(), false),
            ("CERBERUS".to_string(), true),
        ]);
        let payload = build_run_payload(&d, &FormValues::new(), Some((&globals, &values, &touched)));
        assert_eq!(
            payload.environment,
            BTreeMap::from([("ES_SERVER".to_string(), "http://es:9200".to_string())])
        );
    }

    #[test]
    fn test_scenario_image() {
        let private = ScenariosRequest {
            registry_url: Some("registry.local:5000/".to_string()),
            scenario_repository: Some("chaos/scenarios".to_string()),
            ..Default::default()
        };
        assert_eq!(
            scenario_image(Some(&private), "pod-scenarios", "quay.io/krkn-chaos/krkn-hub"),
            "registry.local:5000/chaos/scenarios:pod-scenarios"
        );
        let partial = ScenariosRequest {
            registry_url: Some("registry.local".to_string()),
            ..Default::default()
        };
        assert_eq!(
            scenario_image(Some(&partial), "node-cpu-hog", "quay.io/krkn-chaos/krkn-hub"),
            "quay.io/krkn-chaos/krkn-hub:node-cpu-hog"
        );
        assert_eq!(
            scenario_image(None, "node-cpu-hog", "quay.io/krkn-chaos/krkn-hub"),
            "quay.io/krkn-chaos/krkn-hub:node-cpu-hog"
        );
    }

    #[test]
    fn test_group_clusters() {
        let selected = vec![
            SelectedCluster { operator_name: "acm".into(), cluster_name: "edge-2".into(), cluster_api_url: String::new() },
            SelectedCluster { operator_name: "krkn".into(), cluster_name: "prod".into(), cluster_api_url: String::new() },
            SelectedCluster { operator_name: "acm".into(), cluster_name: "edge-1".into(), cluster_api_url: String::new() },
        ];
        let grouped = group_clusters(&selected);
        assert_eq!(grouped["acm"], vec!["edge-2", "edge-1"]);
        assert_eq!(grouped["krkn"], vec!["prod"]);
    }

    #[test]
    fn test_validate_cluster_names() {
        assert_eq!(validate_cluster_names(&[]), vec!["At least one cluster name is required"]);
        assert_eq!(
            validate_cluster_names(&["a".to_string(), " ".to_string(), "a".to_string()]),
            vec!["Cluster names cannot be empty", "Duplicate cluster names found"]
        );
        assert!(validate_cluster_names(&["a".to_string(), "b".to_string()]).is_empty());
    }
}
