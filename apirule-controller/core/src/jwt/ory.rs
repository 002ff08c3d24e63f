use super::INVALID_URI;
use crate::{
    handler::{read_json_failure, HandlerValidator, EMPTY_CONFIG},
    k8s::{
        jwt::{ory::JwtAccStrConfig, JwtConfig},
        Handler, RawExtension,
    },
    validate_uri, Failure,
};

/// Validates `jwt` configuration enforced by Ory Oathkeeper.
#[derive(Copy, Clone, Debug, Default)]
pub struct JwtValidator;

impl HandlerValidator for JwtValidator {
    fn validate(&self, attribute_path: &str, handler: &Handler) -> Vec<Failure> {
        let config_path = format!("{attribute_path}.config");
        let config = match handler.config.as_ref().filter(|c| !c.is_empty()) {
            Some(config) => config,
            None => return vec![Failure::new(config_path, EMPTY_CONFIG)],
        };

        let template = match config.decode::<JwtAccStrConfig>() {
            Ok(template) => template,
            Err(error) => return vec![read_json_failure(&config_path, error)],
        };

        let mut failures = check_for_istio_config(&config_path, config);

        // Issuers and key sets are URIs so that tokens are verified against a
        // well-known location.
        for (i, issuer) in template.trusted_issuers.iter().enumerate() {
            if let Err(error) = validate_uri(issuer) {
                failures.push(Failure::new(
                    format!("{config_path}.trusted_issuers[{i}]"),
                    format!("{INVALID_URI} err={error}"),
                ));
            }
        }

        for (i, jwks_url) in template.jwks_urls.iter().enumerate() {
            if let Err(error) = validate_uri(jwks_url) {
                failures.push(Failure::new(
                    format!("{config_path}.jwks_urls[{i}]"),
                    format!("{INVALID_URI} err={error}"),
                ));
            }
        }

        failures
    }
}

fn check_for_istio_config(config_path: &str, config: &RawExtension) -> Vec<Failure> {
    let template = match config.decode::<JwtConfig>() {
        Ok(template) => template,
        Err(error) => return vec![read_json_failure(config_path, error)],
    };

    if !template.authentications.is_empty() {
        return vec![Failure::new(
            format!("{config_path}.authentications"),
            "Configuration for authentications is not supported with Ory handler",
        )];
    }

    vec![]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn jwt(config: serde_json::Value) -> Handler {
        Handler::with_config("jwt", RawExtension::from_json(&config).unwrap())
    }

    #[test]
    fn empty_config() {
        let failures = JwtValidator.validate("some.attribute", &Handler::new("jwt"));
        assert_eq!(
            failures,
            vec![Failure::new("some.attribute.config", EMPTY_CONFIG)]
        );

        let failures = JwtValidator.validate("some.attribute", &jwt(json!({})));
        assert_eq!(
            failures,
            vec![Failure::new("some.attribute.config", EMPTY_CONFIG)]
        );
    }

    #[test]
    fn malformed_config() {
        let failures = JwtValidator.validate(
            "some.attribute",
            &jwt(json!({ "trusted_issuers": "https://issuer.test" })),
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].attribute_path, "some.attribute.config");
        assert!(failures[0].message.starts_with("Can't read json: "));
    }

    #[test]
    fn valid_config() {
        let failures = JwtValidator.validate(
            "some.attribute",
            &jwt(json!({
                "trusted_issuers": ["https://dex.kyma.local"],
                "jwks_urls": ["https://dex.kyma.local/keys", "/keys"],
                "required_scope": ["read"],
            })),
        );
        assert_eq!(failures, vec![]);
    }

    #[test]
    fn invalid_uris_are_reported_per_entry() {
        let failures = JwtValidator.validate(
            "some.attribute",
            &jwt(json!({
                "trusted_issuers": ["https://dex.kyma.local", "dex.kyma.local"],
                "jwks_urls": ["", "https://dex.kyma.local/keys"],
            })),
        );
        assert_eq!(failures.len(), 2);
        assert_eq!(
            failures[0].attribute_path,
            "some.attribute.config.trusted_issuers[1]"
        );
        assert!(failures[0].message.starts_with(INVALID_URI));
        assert_eq!(
            failures[1],
            Failure::new(
                "some.attribute.config.jwks_urls[0]",
                "value is empty or not a valid uri err=value is empty"
            )
        );
    }

    #[test]
    fn istio_authentications_are_rejected() {
        let failures = JwtValidator.validate(
            "some.attribute",
            &jwt(json!({
                "authentications": [{
                    "issuer": "https://issuer.test",
                    "jwksUri": "https://issuer.test/keys",
                }],
            })),
        );
        assert_eq!(
            failures,
            vec![Failure::new(
                "some.attribute.config.authentications",
                "Configuration for authentications is not supported with Ory handler"
            )]
        );
    }
}
