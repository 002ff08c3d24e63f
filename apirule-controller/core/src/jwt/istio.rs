use super::INVALID_URI;
use crate::{
    handler::{read_json_failure, HandlerValidator, EMPTY_CONFIG},
    k8s::{
        jwt::{ory::JwtAccStrConfig, JwtAuthentication, JwtAuthorization, JwtConfig},
        Handler, RawExtension,
    },
    validate_uri, Failure, InvalidUri,
};

/// Validates `jwt` configuration enforced by Istio request authentication.
#[derive(Copy, Clone, Debug, Default)]
pub struct JwtValidator;

impl HandlerValidator for JwtValidator {
    fn validate(&self, attribute_path: &str, handler: &Handler) -> Vec<Failure> {
        let config_path = format!("{attribute_path}.config");
        let config = match handler.config.as_ref().filter(|c| !c.is_empty()) {
            Some(config) => config,
            None => return vec![Failure::new(config_path, EMPTY_CONFIG)],
        };

        let template = match config.decode::<JwtConfig>() {
            Ok(template) => template,
            Err(error) => return vec![read_json_failure(&config_path, error)],
        };

        let mut failures = check_for_ory_config(&config_path, config);
        failures.extend(check_authorizations(
            &config_path,
            template.authorizations.as_deref(),
        ));
        failures.extend(check_authentications(
            attribute_path,
            &config_path,
            &template.authentications,
        ));
        failures
    }
}

fn check_for_ory_config(config_path: &str, config: &RawExtension) -> Vec<Failure> {
    let template = match config.decode::<JwtAccStrConfig>() {
        Ok(template) => template,
        Err(error) => return vec![read_json_failure(config_path, error)],
    };

    // Scopes are reported by their plural name.
    let fields = [
        ("jwks_urls", template.jwks_urls.is_empty()),
        ("required_scopes", template.required_scope.is_empty()),
        ("trusted_issuers", template.trusted_issuers.is_empty()),
        ("target_audience", template.target_audience.is_empty()),
    ];
    fields
        .into_iter()
        .filter(|(_, empty)| !empty)
        .map(|(field, _)| {
            Failure::new(
                format!("{config_path}.{field}"),
                format!("Configuration for {field} is not supported with Istio handler"),
            )
        })
        .collect()
}

fn check_authorizations(
    config_path: &str,
    authorizations: Option<&[Option<JwtAuthorization>]>,
) -> Vec<Failure> {
    let authorizations = match authorizations {
        Some(authorizations) => authorizations,
        None => return vec![],
    };
    if authorizations.is_empty() {
        return vec![Failure::new(
            format!("{config_path}.authorizations"),
            "value is empty",
        )];
    }

    let mut failures = vec![];
    for (i, authorization) in authorizations.iter().enumerate() {
        let path = format!("{config_path}.authorizations[{i}]");
        let authorization = match authorization {
            Some(authorization) => authorization,
            None => {
                failures.push(Failure::new(path, "authorization is empty"));
                continue;
            }
        };

        if let Some(message) = check_claim_values(authorization.required_scopes.as_deref(), "scope")
        {
            failures.push(Failure::new(format!("{path}.requiredScopes"), message));
        }
        if let Some(message) = check_claim_values(authorization.audiences.as_deref(), "audience") {
            failures.push(Failure::new(format!("{path}.audiences"), message));
        }
    }
    failures
}

/// An absent list is fine. A present one must be non-empty and hold no empty
/// values.
fn check_claim_values(values: Option<&[String]>, kind: &str) -> Option<String> {
    let values = values?;
    if values.is_empty() {
        return Some("value is empty".to_string());
    }
    if values.iter().any(String::is_empty) {
        return Some(format!("{kind} value is empty"));
    }
    None
}

fn check_authentications(
    attribute_path: &str,
    config_path: &str,
    authentications: &[JwtAuthentication],
) -> Vec<Failure> {
    if authentications.is_empty() {
        return vec![Failure::new(
            attribute_path,
            "Authentications are required when using JWT access handler",
        )];
    }

    let mut failures = vec![];
    let (mut from_headers, mut from_params) = (false, false);
    for (i, authn) in authentications.iter().enumerate() {
        let path = format!("{config_path}.authentications[{i}]");

        if let Err(error) = validate_issuer(&authn.issuer) {
            failures.push(Failure::new(
                format!("{path}.issuer"),
                format!("{INVALID_URI} err={error}"),
            ));
        }
        if let Err(error) = validate_uri(&authn.jwks_uri) {
            failures.push(Failure::new(
                format!("{path}.jwksUri"),
                format!("{INVALID_URI} err={error}"),
            ));
        }

        // Tokens are extracted either from headers or from query parameters,
        // never both.
        if !authn.from_headers.is_empty() {
            if from_params {
                failures.push(Failure::new(
                    format!("{path}.fromHeaders"),
                    "mixture of multiple fromHeaders and fromParams is not supported",
                ));
            }
            from_headers = true;
        }
        if !authn.from_params.is_empty() {
            if from_headers {
                failures.push(Failure::new(
                    format!("{path}.fromParams"),
                    "mixture of multiple fromHeaders and fromParams is not supported",
                ));
            }
            from_params = true;
        }

        if authn.from_headers.len() > 1 {
            failures.push(Failure::new(
                format!("{path}.fromHeaders"),
                "multiple fromHeaders are not supported",
            ));
        }
        if authn.from_params.len() > 1 {
            failures.push(Failure::new(
                format!("{path}.fromParams"),
                "multiple fromParams are not supported",
            ));
        }
    }
    failures
}

/// Issuers that contain a colon must be URIs (RFC 7519, section 4.1.1).
fn validate_issuer(issuer: &str) -> Result<(), InvalidUri> {
    if issuer.is_empty() {
        return Err(InvalidUri::Empty);
    }
    if issuer.contains(':') {
        validate_uri(issuer)?;
    }
    Ok(())
}
