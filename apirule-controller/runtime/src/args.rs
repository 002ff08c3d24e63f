use crate::{
    admission::{Admission, AdmissionMetrics},
    config::{self, Domains, ServiceBlocklist, Subdomains},
    core::JwtHandler,
    default_domain,
    index::{self, Index},
    k8s::{self, api::core::v1 as corev1},
};
use anyhow::{bail, Result};
use clap::Parser;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "apirule", about = "An admission controller for APIRule resources")]
pub struct Args {
    #[clap(
        long,
        default_value = "apirule=info,warn",
        env = "APIRULE_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Disables the admission controller server.
    #[clap(long)]
    admission_controller_disabled: bool,

    /// The handler JWT access strategies are validated for, `ory` or `istio`.
    #[clap(long, default_value = "ory")]
    jwt_handler: JwtHandler,

    /// Domains hosts may be exposed on. When empty, any domain is allowed.
    #[clap(long, default_value = "")]
    domain_allowlist: Domains,

    /// Services that may not be exposed, as `<service>.<namespace>`.
    #[clap(long, default_value = "")]
    service_blocklist: ServiceBlocklist,

    /// Subdomains of the default domain that may not be exposed.
    #[clap(long, default_value = "api")]
    subdomain_blocklist: Subdomains,

    /// Domain appended to hosts without one.
    ///
    /// Discovered from the cluster's main gateway when unset.
    #[clap(long)]
    default_domain: Option<String>,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
            admission_controller_disabled,
            jwt_handler,
            domain_allowlist,
            service_blocklist,
            subdomain_blocklist,
            default_domain,
        } = self;

        let server = if admission_controller_disabled {
            None
        } else {
            Some(server)
        };

        // Build the index of cluster state the admission checks consult.
        let index = Index::shared();

        let mut prom = <Registry>::default();
        index::metrics::register(prom.sub_registry_with_prefix("index"), index.clone());
        let admission_metrics =
            AdmissionMetrics::register(prom.sub_registry_with_prefix("admission"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_optional_server(server)
            .build()
            .await?;

        let default_domain = match default_domain {
            Some(domain) => Some(domain),
            None => default_domain::discover(runtime.client()).await?,
        };
        info!(
            default_domain = %default_domain.as_deref().unwrap_or("<none>"),
            %jwt_handler,
            "Configured"
        );
        let config = Arc::new(config::build(
            jwt_handler,
            domain_allowlist,
            service_blocklist,
            &subdomain_blocklist,
            default_domain,
        ));

        // Spawn resource watches.

        let virtual_services =
            runtime.watch_all::<k8s::VirtualService>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), virtual_services)
                .instrument(info_span!("virtualservices")),
        );

        let services = runtime.watch_all::<corev1::Service>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), services).instrument(info_span!("services")),
        );

        let pods = runtime.watch_all::<corev1::Pod>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), pods).instrument(info_span!("pods")),
        );

        let runtime = runtime.spawn_server(move || Admission::new(config, index, admission_metrics));

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
