use crate::{
    core::{describe, ApiRuleValidator, Config, Failure},
    index::SharedIndex,
    k8s::{ApiRule, ApiRuleSpec, Resource, ResourceExt},
};
use anyhow::{anyhow, Result};
use futures::future;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use kube::core::DynamicObject;
use prometheus_client::{
    encoding::{EncodeLabelSet, EncodeLabelValue},
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

#[derive(Clone)]
pub struct Admission {
    config: Arc<Config>,
    index: SharedIndex,
    metrics: AdmissionMetrics,
}

/// Counts admission decisions.
#[derive(Clone, Debug, Default)]
pub struct AdmissionMetrics {
    decisions: Family<DecisionLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct DecisionLabels {
    kind: String,
    decision: Decision,
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
enum Decision {
    Allowed,
    Denied,
    Invalid,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(#[from] hyper::Error),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

type Review = kube::core::admission::AdmissionReview<DynamicObject>;
type AdmissionRequest = kube::core::admission::AdmissionRequest<DynamicObject>;
type AdmissionResponse = kube::core::admission::AdmissionResponse;

type Body = http_body_util::Full<bytes::Bytes>;

// === impl AdmissionService ===

impl tower::Service<Request<hyper::body::Incoming>> for Admission {
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<hyper::body::Incoming>) -> Self::Future {
        trace!(?req);
        if req.method() != http::Method::POST || req.uri().path() != "/" {
            return Box::pin(future::ready(not_found()));
        }

        let admission = self.clone();
        Box::pin(async move {
            use bytes::Buf;
            let bytes = req.into_body().collect().await?.to_bytes();
            let review: Review = match serde_json::from_reader(bytes.reader()) {
                Ok(review) => review,
                Err(error) => {
                    warn!(%error, "Failed to parse request body");
                    return json_response(AdmissionResponse::invalid(error).into_review());
                }
            };
            trace!(?review);

            let rsp = match review.try_into() {
                Ok(req) => {
                    debug!(?req);
                    admission.admit(req)
                }
                Err(error) => {
                    warn!(%error, "Invalid admission request");
                    AdmissionResponse::invalid(error)
                }
            };
            debug!(?rsp);
            json_response(rsp.into_review())
        })
    }
}

impl Admission {
    pub fn new(config: Arc<Config>, index: SharedIndex, metrics: AdmissionMetrics) -> Self {
        Self {
            config,
            index,
            metrics,
        }
    }

    fn admit(&self, req: AdmissionRequest) -> AdmissionResponse {
        if is_kind::<ApiRule>(&req) {
            return self.admit_apirule(req);
        }

        self.metrics.record(&req.kind.kind, Decision::Invalid);
        AdmissionResponse::invalid(format_args!(
            "unsupported resource type: {}.{}.{}",
            req.kind.group, req.kind.version, req.kind.kind
        ))
    }

    fn admit_apirule(&self, req: AdmissionRequest) -> AdmissionResponse {
        let rsp = AdmissionResponse::from(&req);

        let kind = req.kind.kind.clone();
        let namespace = req.namespace.clone();
        let (obj, spec) = match parse_spec::<ApiRuleSpec>(req) {
            Ok(spec) => spec,
            Err(error) => {
                info!(%error, "Failed to parse {} spec", kind);
                self.metrics.record(&kind, Decision::Invalid);
                return rsp.deny(error);
            }
        };

        let mut api = ApiRule {
            metadata: obj.metadata,
            spec,
        };
        // Objects being created may not carry their namespace yet.
        if api.metadata.namespace.is_none() {
            api.metadata.namespace = namespace;
        }

        let failures = self.validate(&api);
        match describe(&failures) {
            None => {
                self.metrics.record(&kind, Decision::Allowed);
                rsp
            }
            Some(message) => {
                info!(
                    ns = %api.namespace().unwrap_or_default(),
                    name = %api.name_any(),
                    %kind,
                    failures = failures.len(),
                    "Denied"
                );
                self.metrics.record(&kind, Decision::Denied);
                rsp.deny(message)
            }
        }
    }

    fn validate(&self, api: &ApiRule) -> Vec<Failure> {
        let index = self.index.read();
        let virtual_services = index.virtual_services();
        ApiRuleValidator::new(&self.config, &*index)
            .with_injection(&*index)
            .validate(api, &virtual_services)
    }
}

// === impl AdmissionMetrics ===

impl AdmissionMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let decisions = Family::default();
        reg.register(
            "decisions",
            "Count of admission decisions by resource kind",
            decisions.clone(),
        );
        Self { decisions }
    }

    fn record(&self, kind: &str, decision: Decision) {
        self.decisions
            .get_or_create(&DecisionLabels {
                kind: kind.to_string(),
                decision,
            })
            .inc();
    }
}

fn is_kind<T>(req: &AdmissionRequest) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    req.kind.group.eq_ignore_ascii_case(&T::group(&dt))
        && req.kind.kind.eq_ignore_ascii_case(&T::kind(&dt))
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(http::StatusCode::NOT_FOUND)
        .body(Body::default())
        .expect("not found response must be valid"))
}

fn json_response(rsp: Review) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(&rsp)?;
    Ok(Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("admission review response must be valid"))
}

/// Handler configurations are kept as raw JSON, so the spec is decoded from
/// its text rather than from the parsed value.
fn parse_spec<T: DeserializeOwned>(req: AdmissionRequest) -> Result<(DynamicObject, T)> {
    let obj = req
        .object
        .ok_or_else(|| anyhow!("admission request missing 'object"))?;

    let spec = {
        let data = obj
            .data
            .get("spec")
            .ok_or_else(|| anyhow!("admission request missing 'spec'"))?;
        serde_json::from_str(&data.to_string())?
    };

    Ok((obj, spec))
}
