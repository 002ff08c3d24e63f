use super::*;
use crate::{
    k8s::{ApiRuleSpec, Handler, HttpMethod, RawExtension},
    LookupError,
};
use maplit::btreemap;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;

const HOST: &str = "httpbin.kyma.local";

/// Resolves every named service to the same selector.
#[derive(Default)]
struct Selectors {
    missing: bool,
    lookups: Mutex<Vec<(String, String)>>,
}

/// Records the injection checks it is asked to perform.
#[derive(Default)]
struct Injection {
    failures: Vec<Failure>,
    error: Option<LookupError>,
    checks: Mutex<Vec<(String, Option<Selector>, String)>>,
}

impl SelectorLookup for Selectors {
    fn lookup_selector(
        &self,
        service: &Service,
        namespace: &str,
    ) -> Result<Option<Selector>, LookupError> {
        let name = service.name.clone().ok_or(LookupError::MissingServiceName)?;
        self.lookups.lock().push((name, namespace.to_string()));
        if self.missing {
            return Err(LookupError::ServiceNotFound {
                namespace: namespace.to_string(),
                name: service.name.clone().unwrap_or_default(),
            });
        }
        Ok(Some(Selector::from_iter(Some(("app", "httpbin")))))
    }
}

impl InjectionCheck for Injection {
    fn check_injection(
        &self,
        attribute_path: &str,
        selector: Option<&Selector>,
        namespace: &str,
    ) -> Result<Vec<Failure>, LookupError> {
        self.checks.lock().push((
            attribute_path.to_string(),
            selector.cloned(),
            namespace.to_string(),
        ));
        match self.error.as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(self.failures.clone()),
        }
    }
}

fn config(jwt_handler: JwtHandler) -> Config {
    Config {
        jwt_handler,
        default_domain: Some("kyma.local".to_string()),
        ..Default::default()
    }
}

fn service(name: &str) -> Service {
    Service {
        name: Some(name.to_string()),
        port: Some(8000),
        ..Default::default()
    }
}

fn apirule(service: Option<Service>, rules: Vec<Rule>) -> ApiRule {
    let mut api = ApiRule::new(
        "httpbin",
        ApiRuleSpec {
            host: Some(HOST.to_string()),
            service,
            gateway: Some("kyma-system/kyma-gateway".to_string()),
            rules,
        },
    );
    api.metadata.namespace = Some("apps".to_string());
    api
}

fn rule(path: &str, strategies: Vec<Handler>) -> Rule {
    Rule {
        path: path.to_string(),
        methods: vec![HttpMethod::Get],
        access_strategies: strategies,
        ..Default::default()
    }
}

fn handler(name: &str, config: serde_json::Value) -> Handler {
    Handler::with_config(name, RawExtension::from_json(&config).unwrap())
}

fn istio_jwt(header: &str) -> Handler {
    handler(
        "jwt",
        json!({
            "authentications": [{
                "issuer": "https://issuer.test/",
                "jwksUri": "https://issuer.test/.well-known/jwks.json",
                "fromHeaders": [{ "name": header }],
            }],
        }),
    )
}

fn ory_jwt() -> Handler {
    handler(
        "jwt",
        json!({
            "trusted_issuers": ["https://dex.kyma.local"],
            "jwks_urls": ["https://dex.kyma.local/keys"],
        }),
    )
}

#[test]
fn admits_valid_rule() {
    for (flavor, jwt) in [(JwtHandler::Ory, ory_jwt()), (JwtHandler::Istio, istio_jwt("x-a"))] {
        let config = config(flavor);
        let selectors = Selectors::default();
        let api = apirule(
            Some(service("httpbin")),
            vec![
                rule("/headers", vec![jwt]),
                rule("/img", vec![Handler::new("noop")]),
            ],
        );
        assert_eq!(
            ApiRuleValidator::new(&config, &selectors).validate(&api, &[]),
            vec![],
            "{flavor}"
        );
    }
}

#[test]
fn no_rules() {
    let config = config(JwtHandler::Ory);
    let api = apirule(Some(service("httpbin")), vec![]);
    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![Failure::new(".spec.rules", "No rules defined")]
    );
}

#[test]
fn duplicated_rules_are_reported_once() {
    let config = config(JwtHandler::Ory);
    let noop = || Handler::new("noop");
    let api = apirule(
        Some(service("httpbin")),
        vec![
            rule("/img", vec![noop()]),
            rule("/img", vec![noop()]),
            rule("/img", vec![noop()]),
        ],
    );
    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![Failure::new(
            ".spec.rules",
            "multiple rules defined for the same path and method"
        )]
    );
}

#[test]
fn rule_without_any_service() {
    let config = config(JwtHandler::Ory);
    let selectors = Selectors::default();
    let mut with_service = rule("/img", vec![Handler::new("noop")]);
    with_service.service = Some(service("img"));
    let api = apirule(
        None,
        vec![rule("/headers", vec![Handler::new("bogus")]), with_service],
    );

    // Access strategies of a rule without a service are not checked.
    assert_eq!(
        ApiRuleValidator::new(&config, &selectors).validate(&api, &[]),
        vec![Failure::new(
            ".spec.rules[0].service",
            "No service defined with no main service on spec level"
        )]
    );
    assert_eq!(
        *selectors.lookups.lock(),
        vec![("img".to_string(), "apps".to_string())]
    );
}

#[test]
fn blocklisted_services() {
    let config = Config {
        service_blocklist: btreemap! {
            "apps".to_string() => vec!["httpbin".to_string()],
            "kube-system".to_string() => vec!["kube-dns".to_string()],
        },
        ..config(JwtHandler::Ory)
    };
    let mut dns = rule("/dns", vec![Handler::new("noop")]);
    dns.service = Some(Service {
        namespace: Some("kube-system".to_string()),
        ..service("kube-dns")
    });
    let api = apirule(
        Some(service("httpbin")),
        vec![rule("/headers", vec![Handler::new("noop")]), dns],
    );

    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![
            Failure::new(
                ".spec.service.name",
                "Service httpbin in namespace apps is blocklisted"
            ),
            Failure::new(
                ".spec.rules[1].service.name",
                "Service kube-dns in namespace kube-system is blocklisted"
            ),
        ]
    );
}

#[test]
fn access_strategy_combinations() {
    let config = config(JwtHandler::Ory);
    let api = apirule(
        Some(service("httpbin")),
        vec![
            rule("/a", vec![]),
            rule(
                "/b",
                vec![Handler::new("noop"), Handler::new("allow"), ory_jwt()],
            ),
            rule("/c", vec![Handler::new("basic_auth")]),
        ],
    );

    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![
            Failure::new(".spec.rules[0].accessStrategies", "No accessStrategies defined"),
            Failure::new(
                ".spec.rules[1].accessStrategies[1].handler",
                "allow access strategy is not allowed in combination with other access strategies"
            ),
            Failure::new(
                ".spec.rules[1].accessStrategies[0].handler",
                "noop access strategy is not allowed in combination with other access strategies"
            ),
            Failure::new(
                ".spec.rules[1].accessStrategies",
                "Secure access strategies cannot be used in combination with unsecure access strategies"
            ),
            Failure::new(
                ".spec.rules[2].accessStrategies[0].handler",
                "Unsupported accessStrategy: basic_auth"
            ),
        ]
    );
}

#[test]
fn jwt_is_exclusive_only_with_istio() {
    let strategies = || {
        vec![
            istio_jwt("x-a"),
            handler("oauth2_introspection", json!({ "required_scope": ["read"] })),
        ]
    };

    let config = config(JwtHandler::Istio);
    let api = apirule(Some(service("httpbin")), vec![rule("/headers", strategies())]);
    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![Failure::new(
            ".spec.rules[0].accessStrategies[0].handler",
            "jwt access strategy is not allowed in combination with other access strategies"
        )]
    );

    let config = Config {
        jwt_handler: JwtHandler::Ory,
        ..config
    };
    let api = apirule(
        Some(service("httpbin")),
        vec![rule(
            "/headers",
            vec![ory_jwt(), Handler::new("oauth2_client_credentials")],
        )],
    );
    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![]
    );
}

#[test]
fn no_config_strategies_reject_configuration() {
    let config = config(JwtHandler::Ory);
    let api = apirule(
        Some(service("httpbin")),
        vec![rule(
            "/headers",
            vec![handler("cookie_session", json!({ "only": ["sid"] }))],
        )],
    );
    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![Failure::new(
            ".spec.rules[0].accessStrategies[0].config",
            "strategy: cookie_session does not support configuration"
        )]
    );
}

#[test]
fn injection_is_checked_for_jwt_only() {
    let config = config(JwtHandler::Istio);
    let selectors = Selectors::default();
    let injection = Injection {
        failures: vec![Failure::new(
            ".spec.rules[0].accessStrategies[0].injection",
            "Pod apps/httpbin-0 does not have an injected istio sidecar",
        )],
        ..Default::default()
    };
    let mut other = rule("/img", vec![Handler::new("noop")]);
    other.service = Some(Service {
        namespace: Some("images".to_string()),
        ..service("img")
    });
    let api = apirule(
        Some(service("httpbin")),
        vec![rule("/headers", vec![istio_jwt("x-a")]), other],
    );

    let failures = ApiRuleValidator::new(&config, &selectors)
        .with_injection(&injection)
        .validate(&api, &[]);
    assert_eq!(failures, injection.failures);
    assert_eq!(
        *injection.checks.lock(),
        vec![(
            ".spec.rules[0].accessStrategies[0].injection".to_string(),
            Some(Selector::from_iter(Some(("app", "httpbin")))),
            "apps".to_string(),
        )]
    );
}

#[test]
fn injection_errors_become_failures() {
    let config = config(JwtHandler::Istio);
    let injection = Injection {
        error: Some(LookupError::ServiceNotFound {
            namespace: "apps".to_string(),
            name: "httpbin".to_string(),
        }),
        ..Default::default()
    };
    let api = apirule(
        Some(service("httpbin")),
        vec![rule("/headers", vec![handler("jwt", json!({}))])],
    );

    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default())
            .with_injection(&injection)
            .validate(&api, &[]),
        vec![
            Failure::new(
                ".spec.rules[0].accessStrategies[0].handler",
                "Could not find pod for selected service, err: service apps/httpbin not found"
            ),
            Failure::new(
                ".spec.rules[0].accessStrategies[0].config",
                "supplied config cannot be empty"
            ),
        ]
    );
}

#[test]
fn selector_lookup_errors_are_not_failures() {
    let config = config(JwtHandler::Istio);
    let selectors = Selectors {
        missing: true,
        ..Default::default()
    };
    let injection = Injection::default();
    let api = apirule(
        Some(service("httpbin")),
        vec![rule("/headers", vec![istio_jwt("x-a")])],
    );

    assert_eq!(
        ApiRuleValidator::new(&config, &selectors)
            .with_injection(&injection)
            .validate(&api, &[]),
        vec![]
    );
    assert_eq!(injection.checks.lock()[0].1, None);
}

#[test]
fn cross_rule_jwt_runs_last() {
    let config = config(JwtHandler::Istio);
    let mut second = rule("/img", vec![istio_jwt("x-b")]);
    second.mutators = vec![Handler::new("id_token")];
    let api = apirule(
        Some(service("httpbin")),
        vec![rule("/headers", vec![istio_jwt("x-a")]), second],
    );

    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![
            Failure::new(
                ".spec.rules[1].mutators[0].handler",
                "unsupported mutator: id_token"
            ),
            Failure::new(
                ".spec.rules[1].accessStrategy[0].config.authentications[0]",
                "multiple jwt configurations that differ for the same issuer"
            ),
        ]
    );
}

#[test]
fn ory_skips_mutators_and_cross_rule_jwt() {
    let config = config(JwtHandler::Ory);
    let mut first = rule("/headers", vec![ory_jwt()]);
    first.mutators = vec![Handler::new("id_token")];
    let second = rule(
        "/img",
        vec![handler(
            "oauth2_introspection",
            json!({ "authentications": "not a list" }),
        )],
    );
    let api = apirule(Some(service("httpbin")), vec![first.clone()]);

    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![]
    );

    // Pass-through configuration is only read by the cross-rule JWT check.
    let api = apirule(Some(service("httpbin")), vec![first, second]);
    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![]
    );
}

#[test]
fn stages_are_ordered() {
    let config = config(JwtHandler::Ory);
    let mut api = apirule(None, vec![rule("/headers", vec![])]);
    api.spec.host = None;

    assert_eq!(
        ApiRuleValidator::new(&config, &Selectors::default()).validate(&api, &[]),
        vec![
            Failure::new(".spec.host", "Host was nil"),
            Failure::new(
                ".spec.rules[0].service",
                "No service defined with no main service on spec level"
            ),
        ]
    );
}

#[test]
fn validation_is_idempotent() {
    let config = Config {
        domain_allowlist: vec!["foo.bar".to_string()],
        ..config(JwtHandler::Istio)
    };
    let selectors = Selectors::default();
    let api = apirule(
        Some(service("httpbin")),
        vec![
            rule("/headers", vec![istio_jwt("x-a"), Handler::new("noop")]),
            rule("/headers", vec![istio_jwt("x-b")]),
        ],
    );
    let validator = ApiRuleValidator::new(&config, &selectors);

    let first = validator.validate(&api, &[]);
    assert!(!first.is_empty());
    assert_eq!(validator.validate(&api, &[]), first);
}

#[test]
fn namespace_fallbacks() {
    let mut api = apirule(Some(service("httpbin")), vec![]);
    let mut r = rule("/", vec![]);
    assert_eq!(service_namespace(&api, Some(&r)), "apps");

    api.spec.service.as_mut().unwrap().namespace = Some("spec-ns".to_string());
    assert_eq!(service_namespace(&api, None), "spec-ns");
    assert_eq!(service_namespace(&api, Some(&r)), "spec-ns");

    r.service = Some(Service {
        namespace: Some("rule-ns".to_string()),
        ..service("other")
    });
    assert_eq!(service_namespace(&api, Some(&r)), "rule-ns");
    assert_eq!(service_namespace(&api, None), "spec-ns");

    api.spec.service = None;
    api.metadata.namespace = None;
    assert_eq!(service_namespace(&api, None), "default");
}
