use crate::{
    access_strategy::{check_exclusive, check_secure_and_unsecure},
    handler::{HandlerValidator, NoConfig, PassThrough},
    host,
    k8s::{
        AccessStrategy, ApiRule, Authenticator, ResourceExt, Rule, Selector, Service,
        VirtualService,
    },
    mutators, rules, Failure, InjectionCheck, JwtHandler, SelectorLookup,
};
use std::collections::BTreeMap;
use tracing::info;

#[cfg(test)]
mod tests;

/// Admission policy applied to every APIRule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub jwt_handler: JwtHandler,

    /// Blocked service names, keyed by namespace.
    pub service_blocklist: BTreeMap<String, Vec<String>>,

    /// When non-empty, hosts with a domain must use one of these domains.
    pub domain_allowlist: Vec<String>,

    /// Complete hosts that may not be exposed.
    pub host_blocklist: Vec<String>,

    /// Appended to hosts that carry no domain.
    pub default_domain: Option<String>,
}

/// Validates APIRules against the admission policy and the current cluster
/// state.
pub struct ApiRuleValidator<'a> {
    config: &'a Config,
    selectors: &'a dyn SelectorLookup,
    injection: Option<&'a dyn InjectionCheck>,
}

// === impl Config ===

impl Config {
    fn is_service_blocklisted(&self, name: &str, namespace: &str) -> bool {
        self.service_blocklist
            .get(namespace)
            .map_or(false, |names| names.iter().any(|n| n == name))
    }
}

/// The namespace of the service backing `rule`, or of the spec-level service
/// when `rule` is `None`.
///
/// Falls back to the APIRule's namespace and finally to `default`.
pub fn service_namespace(api: &ApiRule, rule: Option<&Rule>) -> String {
    let rule_ns = rule
        .and_then(|r| r.service.as_ref())
        .and_then(|s| s.namespace.as_deref());
    let spec_ns = api.spec.service.as_ref().and_then(|s| s.namespace.as_deref());

    let namespace = match rule_ns.or(spec_ns) {
        Some(ns) => ns.to_string(),
        None => api.namespace().unwrap_or_default(),
    };
    if namespace.is_empty() {
        return "default".to_string();
    }
    namespace
}

// === impl ApiRuleValidator ===

impl<'a> ApiRuleValidator<'a> {
    pub fn new(config: &'a Config, selectors: &'a dyn SelectorLookup) -> Self {
        Self {
            config,
            selectors,
            injection: None,
        }
    }

    /// Enables the sidecar injection check for `jwt` access strategies.
    pub fn with_injection(mut self, injection: &'a dyn InjectionCheck) -> Self {
        self.injection = Some(injection);
        self
    }

    /// Returns every failure found in `api`. An empty list means the APIRule
    /// is admissible.
    pub fn validate(&self, api: &ApiRule, virtual_services: &[VirtualService]) -> Vec<Failure> {
        let mut failures = vec![];

        if let Some(service) = api.spec.service.as_ref() {
            failures.extend(self.check_service_blocklist(
                ".spec.service.name",
                service,
                &service_namespace(api, None),
            ));
        }

        failures.extend(host::validate(
            ".spec.host",
            api,
            self.config,
            virtual_services,
        ));
        failures.extend(self.validate_rules(".spec.rules", api));
        failures
    }

    fn validate_rules(&self, attribute_path: &str, api: &ApiRule) -> Vec<Failure> {
        let rules = &api.spec.rules;
        if rules.is_empty() {
            return vec![Failure::new(attribute_path, "No rules defined")];
        }

        let mut failures = vec![];
        if rules::has_path_and_method_duplicates(rules) {
            failures.push(Failure::new(
                attribute_path,
                "multiple rules defined for the same path and method",
            ));
        }

        for (i, rule) in rules.iter().enumerate() {
            let rule_path = format!("{attribute_path}[{i}]");
            let namespace = service_namespace(api, Some(rule));

            match (rule.service.as_ref(), api.spec.service.as_ref()) {
                (Some(service), _) => {
                    let selector = self.lookup_selector(service, &namespace);
                    failures.extend(self.validate_access_strategies(
                        &rule_path,
                        &rule.access_strategies,
                        selector.as_ref(),
                        &namespace,
                    ));
                    failures.extend(self.check_service_blocklist(
                        &format!("{rule_path}.service.name"),
                        service,
                        &namespace,
                    ));
                }
                (None, Some(service)) => {
                    let selector = self.lookup_selector(service, &namespace);
                    failures.extend(self.validate_access_strategies(
                        &rule_path,
                        &rule.access_strategies,
                        selector.as_ref(),
                        &namespace,
                    ));
                }
                (None, None) => failures.push(Failure::new(
                    format!("{rule_path}.service"),
                    "No service defined with no main service on spec level",
                )),
            }

            if self.config.jwt_handler == JwtHandler::Istio {
                failures.extend(mutators::validate(&rule_path, rule));
            }
        }

        // Mutators and shared JWT authentications are enforced by Istio only.
        if self.config.jwt_handler == JwtHandler::Istio {
            failures.extend(rules::check_jwt_consistency(attribute_path, rules));
        }
        failures
    }

    /// `rule_path` addresses the rule owning the strategies.
    fn validate_access_strategies(
        &self,
        rule_path: &str,
        strategies: &[Authenticator],
        selector: Option<&Selector>,
        namespace: &str,
    ) -> Vec<Failure> {
        let attribute_path = format!("{rule_path}.accessStrategies");
        if strategies.is_empty() {
            return vec![Failure::new(attribute_path, "No accessStrategies defined")];
        }

        let mut failures = vec![];
        for exclusive in self.config.jwt_handler.exclusive_access_strategies() {
            failures.extend(check_exclusive(strategies, *exclusive, rule_path));
        }
        failures.extend(check_secure_and_unsecure(strategies, &attribute_path));

        for (i, strategy) in strategies.iter().enumerate() {
            failures.extend(self.validate_access_strategy(
                &format!("{attribute_path}[{i}]"),
                strategy,
                selector,
                namespace,
            ));
        }
        failures
    }

    fn validate_access_strategy(
        &self,
        attribute_path: &str,
        strategy: &Authenticator,
        selector: Option<&Selector>,
        namespace: &str,
    ) -> Vec<Failure> {
        let kind = match strategy.access_strategy() {
            Some(kind) => kind,
            None => {
                return vec![Failure::new(
                    format!("{attribute_path}.handler"),
                    format!("Unsupported accessStrategy: {}", strategy.name),
                )]
            }
        };

        let mut failures = vec![];
        let validator: &dyn HandlerValidator = match kind {
            AccessStrategy::Allow
            | AccessStrategy::NoAuth
            | AccessStrategy::Noop
            | AccessStrategy::Unauthorized
            | AccessStrategy::Anonymous
            | AccessStrategy::CookieSession => &NoConfig,
            AccessStrategy::OAuth2ClientCredentials | AccessStrategy::OAuth2Introspection => {
                &PassThrough
            }
            AccessStrategy::Jwt => {
                if let Some(injection) = self.injection {
                    let path = format!("{attribute_path}.injection");
                    match injection.check_injection(&path, selector, namespace) {
                        Ok(found) => failures.extend(found),
                        Err(error) => failures.push(Failure::new(
                            format!("{attribute_path}.handler"),
                            format!("Could not find pod for selected service, err: {error}"),
                        )),
                    }
                }
                self.config.jwt_handler.validator()
            }
        };

        failures.extend(validator.validate(attribute_path, strategy));
        failures
    }

    /// Lookup errors are logged and treated as an unknown selector.
    fn lookup_selector(&self, service: &Service, namespace: &str) -> Option<Selector> {
        match self.selectors.lookup_selector(service, namespace) {
            Ok(selector) => selector,
            Err(error) => {
                info!(%error, %namespace, "Couldn't get label selectors for service");
                None
            }
        }
    }

    fn check_service_blocklist(
        &self,
        attribute_path: &str,
        service: &Service,
        namespace: &str,
    ) -> Vec<Failure> {
        let name = match service.name.as_deref() {
            Some(name) => name,
            None => return vec![],
        };

        if self.config.is_service_blocklisted(name, namespace) {
            return vec![Failure::new(
                attribute_path,
                format!("Service {name} in namespace {namespace} is blocklisted"),
            )];
        }
        vec![]
    }
}
