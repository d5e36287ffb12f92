use crate::error::{Error, Result};

use super::PortalLinkRequest;

const MAX_PORTAL_LINK_NAME_LEN: usize = 100;
const MAX_IDENTIFIER_LEN: usize = 255;
const MAX_SCOPE_ENDPOINTS: usize = 1000;

/// A request with trimmed fields and a deduplicated endpoint list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidatedRequest {
    pub name: String,
    pub owner_id: Option<String>,
    pub endpoints: Vec<String>,
    pub can_manage_endpoint: bool,
}

fn validate_identifier(value: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Validation(format!("{field} cannot be empty")));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::Validation(format!(
            "{field} cannot exceed {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(Error::Validation(format!(
            "{field} cannot contain control characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_request(req: &PortalLinkRequest) -> Result<ValidatedRequest> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("name is required".into()));
    }
    if name.chars().count() > MAX_PORTAL_LINK_NAME_LEN {
        return Err(Error::Validation(format!(
            "name cannot exceed {MAX_PORTAL_LINK_NAME_LEN} characters"
        )));
    }

    let owner_id = req
        .owner_id
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string);
    if let Some(owner_id) = &owner_id {
        validate_identifier(owner_id, "owner_id")?;
    }

    if req.endpoints.len() > MAX_SCOPE_ENDPOINTS {
        return Err(Error::Validation(format!(
            "endpoints cannot list more than {MAX_SCOPE_ENDPOINTS} ids"
        )));
    }

    let mut endpoints: Vec<String> = Vec::with_capacity(req.endpoints.len());
    for endpoint_id in &req.endpoints {
        let endpoint_id = endpoint_id.trim();
        validate_identifier(endpoint_id, "endpoint id")?;
        if !endpoints.iter().any(|e| e == endpoint_id) {
            endpoints.push(endpoint_id.to_string());
        }
    }

    require_scope(&endpoints, owner_id.as_deref())?;

    Ok(ValidatedRequest {
        name: name.to_string(),
        owner_id,
        endpoints,
        can_manage_endpoint: req.can_manage_endpoint,
    })
}

/// An empty endpoint list is only meaningful when an owner defines the scope.
pub(crate) fn require_scope(endpoints: &[String], owner_id: Option<&str>) -> Result<()> {
    if endpoints.is_empty() && owner_id.is_none() {
        return Err(Error::Validation(
            "owner_id or endpoints must be present".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, owner_id: Option<&str>, endpoints: &[&str]) -> PortalLinkRequest {
        PortalLinkRequest {
            name: name.to_string(),
            owner_id: owner_id.map(str::to_string),
            endpoints: endpoints.iter().map(|s| s.to_string()).collect(),
            can_manage_endpoint: false,
        }
    }

    #[test]
    fn test_trims_and_dedupes() {
        let validated = validate_request(&request(" Acme ", None, &["ep2", "ep1", " ep2"])).unwrap();
        assert_eq!(validated.name, "Acme");
        assert_eq!(validated.endpoints, vec!["ep2", "ep1"]);
    }

    #[test]
    fn test_name_rules() {
        assert!(matches!(
            validate_request(&request("   ", None, &["ep1"])),
            Err(Error::Validation(_))
        ));
        let long = "x".repeat(101);
        assert!(validate_request(&request(&long, None, &["ep1"])).is_err());
        assert!(validate_request(&request(&"x".repeat(100), None, &["ep1"])).is_ok());
    }

    #[test]
    fn test_empty_scope_requires_owner() {
        assert!(matches!(
            validate_request(&request("Acme", None, &[])),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_request(&request("Acme", Some("  "), &[])),
            Err(Error::Validation(_))
        ));

        let validated = validate_request(&request("Acme", Some("owner-1"), &[])).unwrap();
        assert_eq!(validated.owner_id.as_deref(), Some("owner-1"));
        assert!(validated.endpoints.is_empty());
    }

    #[test]
    fn test_endpoint_list_is_capped() {
        let ids: Vec<String> = (0..=MAX_SCOPE_ENDPOINTS).map(|i| format!("ep{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        assert!(matches!(
            validate_request(&request("Acme", None, &refs)),
            Err(Error::Validation(_))
        ));

        let validated = validate_request(&request("Acme", None, &refs[..MAX_SCOPE_ENDPOINTS])).unwrap();
        assert_eq!(validated.endpoints.len(), MAX_SCOPE_ENDPOINTS);
    }

    #[test]
    fn test_blank_endpoint_id_is_rejected() {
        assert!(validate_request(&request("Acme", None, &["ep1", ""])).is_err());
    }
}
