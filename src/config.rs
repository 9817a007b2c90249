//! Adapter configuration.
//!
//! The adapter is configured once, before the session is created. Every field
//! has a default matching the conventional names used by the host setup, so an
//! empty JSON object is a valid configuration.

use std::path::Path;

use crate::coupling_error::CouplingError;
use crate::topology::region::DEFAULT_REGION_ROLE;

/// What to do with displacements received from the coupling service.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplacementPolicy {
    /// Record displacements and their magnitude; geometry updates are left to the host.
    #[default]
    ReportOnly,
    /// Move every updated node to `initial + displacement`.
    ApplyToGeometry,
}

/// Static adapter configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Participant name announced to the coupling service.
    pub participant: String,
    /// Path of the coupling service configuration file.
    pub config_path: String,
    /// Name of the coupled mesh.
    pub mesh_name: String,
    /// Name of the outbound force field.
    pub force_data: String,
    /// Name of the inbound displacement field.
    pub displacement_data: String,
    /// Role tag a dynamic region must start with to be coupled.
    pub region_role: String,
    /// Handling of received displacements.
    pub displacement_policy: DisplacementPolicy,
    /// Recount wet nodes before every force write.
    pub check_write_positions: bool,
    /// Recount pending nodes before every displacement read.
    pub check_read_positions: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            participant: "Fluent".into(),
            config_path: "precice-config.xml".into(),
            mesh_name: "moving_base".into(),
            force_data: "Forces".into(),
            displacement_data: "Displacements".into(),
            region_role: DEFAULT_REGION_ROLE.into(),
            displacement_policy: DisplacementPolicy::ReportOnly,
            check_write_positions: true,
            check_read_positions: false,
        }
    }
}

impl AdapterConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, CouplingError> {
        let cfg: AdapterConfig =
            serde_json::from_str(json).map_err(|e| CouplingError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CouplingError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CouplingError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Reject configurations the adapter cannot run with.
    pub fn validate(&self) -> Result<(), CouplingError> {
        let required = [
            ("participant", &self.participant),
            ("mesh_name", &self.mesh_name),
            ("force_data", &self.force_data),
            ("displacement_data", &self.displacement_data),
            ("region_role", &self.region_role),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(CouplingError::Config(format!("`{field}` must not be empty")));
        }
        if self.force_data == self.displacement_data {
            return Err(CouplingError::Config(
                "force and displacement data must be distinct fields".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = AdapterConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, AdapterConfig::default());
        assert_eq!(cfg.region_role, "gridmotions");
    }

    #[test]
    fn partial_override() {
        let cfg = AdapterConfig::from_json_str(
            r#"{ "participant": "Fluid", "displacement_policy": "apply_to_geometry" }"#,
        )
        .unwrap();
        assert_eq!(cfg.participant, "Fluid");
        assert_eq!(cfg.displacement_policy, DisplacementPolicy::ApplyToGeometry);
        assert_eq!(cfg.mesh_name, "moving_base");
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            AdapterConfig::from_json_str(r#"{ "mesh_name": "" }"#),
            Err(CouplingError::Config(_))
        ));
        assert!(matches!(
            AdapterConfig::from_json_str(r#"{ "force_data": "X", "displacement_data": "X" }"#),
            Err(CouplingError::Config(_))
        ));
        assert!(matches!(
            AdapterConfig::from_json_str("not json"),
            Err(CouplingError::Config(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = AdapterConfig::from_path("/nonexistent/adapter.json").unwrap_err();
        match err {
            CouplingError::Config(msg) => assert!(msg.contains("/nonexistent/adapter.json")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
